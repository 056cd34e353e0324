//! Download, edit and store vehicle parameters over MAVLink UDP.
//!
//! Waits for the vehicle to show up, fetches its full parameter list, then
//! optionally writes new values and asks the vehicle to persist them.
//!
//! Usage:
//!   cargo run --bin param_sync -- [OPTIONS]
//!
//! Options:
//!   --bind <ADDR>            Local UDP address (default: 0.0.0.0:14550)
//!   --vehicle <ADDR>         Vehicle UDP address (default: learned from traffic)
//!   --target-system <ID>     Vehicle system id (default: 1)
//!   --config <FILE>          JSON protocol config
//!   --set <NAME=VALUE>       Write a parameter after download (repeatable)
//!   --persist                Store parameters on the vehicle after writing
//!   --dump                   Print every parameter after download
//!   --timeout <SECS>         Give up after this long per phase (default: 60)
//!
//! Log output is controlled by RUST_LOG; PARAM_* variables override the
//! protocol config.

use std::env;
use std::net::SocketAddr;
use std::process;
use std::time::Duration;

use pico_trail_gcs::communication::mavlink::{
    LinkIdentity, ParamSyncService, UdpParamLink, MAVLINK_UDP_PORT,
};
use pico_trail_gcs::core::traits::MonotonicTime;
use pico_trail_gcs::parameters::ParamType;
use pico_trail_gcs::sync::ParamEvent;
use pico_trail_gcs::{
    InMemoryDataModel, ParamCommsConfig, ParamCommsManager, ParamValue, ParameterDataModel,
    StatusLevel,
};
use tokio::sync::broadcast;
use tokio::time::{sleep, timeout, Instant};

type Service = ParamSyncService<UdpParamLink, InMemoryDataModel, MonotonicTime>;

struct Args {
    bind: String,
    vehicle: Option<SocketAddr>,
    target_system: u8,
    config: Option<String>,
    set: Vec<(String, f64)>,
    persist: bool,
    dump: bool,
    timeout_secs: u64,
}

fn parse_args() -> Args {
    let mut args = Args {
        bind: format!("0.0.0.0:{MAVLINK_UDP_PORT}"),
        vehicle: None,
        target_system: 1,
        config: None,
        set: Vec::new(),
        persist: false,
        dump: false,
        timeout_secs: 60,
    };

    let raw: Vec<String> = env::args().collect();
    let mut i = 1;
    while i < raw.len() {
        match raw[i].as_str() {
            "--bind" => {
                i += 1;
                args.bind = value_arg(&raw, i, "bind").to_string();
            }
            "--vehicle" => {
                i += 1;
                args.vehicle = Some(parse_arg(&raw, i, "vehicle"));
            }
            "--target-system" => {
                i += 1;
                args.target_system = parse_arg(&raw, i, "target-system");
            }
            "--config" => {
                i += 1;
                args.config = Some(value_arg(&raw, i, "config").to_string());
            }
            "--set" => {
                i += 1;
                let assignment = value_arg(&raw, i, "set");
                let Some((name, value)) = assignment.split_once('=') else {
                    eprintln!("Error: --set expects NAME=VALUE, got {assignment}");
                    process::exit(1);
                };
                let Ok(value) = value.trim().parse::<f64>() else {
                    eprintln!("Error: invalid value for {name}: {value}");
                    process::exit(1);
                };
                args.set.push((name.trim().to_string(), value));
            }
            "--persist" => args.persist = true,
            "--dump" => args.dump = true,
            "--timeout" => {
                i += 1;
                args.timeout_secs = parse_arg(&raw, i, "timeout");
            }
            "-h" | "--help" => {
                print_usage();
                process::exit(0);
            }
            other => {
                eprintln!("Unknown option: {other}");
                print_usage();
                process::exit(1);
            }
        }
        i += 1;
    }

    args
}

fn value_arg<'a>(raw: &'a [String], i: usize, name: &str) -> &'a str {
    raw.get(i).map(String::as_str).unwrap_or_else(|| {
        eprintln!("Error: --{name} requires a value");
        process::exit(1);
    })
}

fn parse_arg<T: std::str::FromStr>(raw: &[String], i: usize, name: &str) -> T {
    value_arg(raw, i, name).parse().unwrap_or_else(|_| {
        eprintln!("Error: invalid value for --{name}");
        process::exit(1);
    })
}

fn print_usage() {
    eprintln!(
        "Usage: param_sync [OPTIONS]\n\
         \n\
         Options:\n\
         \x20 --bind <ADDR>            Local UDP address (default: 0.0.0.0:14550)\n\
         \x20 --vehicle <ADDR>         Vehicle UDP address (default: learned from traffic)\n\
         \x20 --target-system <ID>     Vehicle system id (default: 1)\n\
         \x20 --config <FILE>          JSON protocol config\n\
         \x20 --set <NAME=VALUE>       Write a parameter after download (repeatable)\n\
         \x20 --persist                Store parameters on the vehicle after writing\n\
         \x20 --dump                   Print every parameter after download\n\
         \x20 --timeout <SECS>         Give up after this long per phase (default: 60)\n\
         \x20 -h, --help               Show this help"
    );
}

fn load_config(path: Option<&str>) -> ParamCommsConfig {
    let config = match path {
        Some(path) => ParamCommsConfig::load(path),
        None => Ok(ParamCommsConfig::default()),
    }
    .and_then(ParamCommsConfig::with_env_overrides);

    config.unwrap_or_else(|e| {
        eprintln!("Error: {e}");
        process::exit(1);
    })
}

/// Wait until the receive loop has seen the vehicle
async fn wait_for_vehicle(service: &Service, deadline: Instant) -> Option<SocketAddr> {
    loop {
        if let Some(addr) = service.with_manager(|m| m.link().vehicle_addr()) {
            return Some(addr);
        }
        if Instant::now() >= deadline {
            return None;
        }
        sleep(Duration::from_millis(100)).await;
    }
}

/// Print events until `done` says stop; false on failure or timeout
async fn follow_events(
    events: &mut broadcast::Receiver<ParamEvent>,
    deadline: Instant,
    mut done: impl FnMut(&ParamEvent) -> bool,
) -> bool {
    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        let event = match timeout(remaining, events.recv()).await {
            Ok(Ok(event)) => event,
            Ok(Err(broadcast::error::RecvError::Lagged(n))) => {
                pico_trail_gcs::log_debug!("Skipped {n} events");
                continue;
            }
            Ok(Err(broadcast::error::RecvError::Closed)) | Err(_) => return false,
        };

        match &event {
            ParamEvent::StatusMessage { text, level } => {
                println!("[{level:?}] {text}");
                if *level == StatusLevel::Error {
                    return false;
                }
            }
            ParamEvent::ValueConfirmed {
                component,
                count,
                index,
                name,
                value,
                ..
            } => {
                pico_trail_gcs::log_debug!("{component}: [{index}/{count}] {name} = {value}");
            }
            _ => {}
        }

        if done(&event) {
            return true;
        }
    }
}

#[tokio::main]
async fn main() {
    env_logger::init();
    let args = parse_args();
    let config = load_config(args.config.as_deref());
    let phase = Duration::from_secs(args.timeout_secs);

    let identity = LinkIdentity {
        target_system: args.target_system,
        ..LinkIdentity::default()
    };
    let mut link = UdpParamLink::bind(args.bind.as_str(), identity)
        .await
        .unwrap_or_else(|e| {
            eprintln!("Error: cannot bind {}: {e}", args.bind);
            process::exit(1);
        });
    if let Some(addr) = args.vehicle {
        link = link.with_vehicle_addr(addr);
    }
    let source = link.receiver();

    let manager = ParamCommsManager::attach(link, InMemoryDataModel::new(), MonotonicTime::new())
        .with_config(config)
        .unwrap_or_else(|e| {
            eprintln!("Error: {e}");
            process::exit(1);
        });
    let service = ParamSyncService::spawn(manager, source);
    let mut events = service.subscribe();

    println!("=== pico_trail parameter sync ===");
    let Some(vehicle) = wait_for_vehicle(&service, Instant::now() + phase).await else {
        eprintln!("No vehicle {} seen on {}", args.target_system, args.bind);
        process::exit(2);
    };
    println!("Vehicle {} at {vehicle}", args.target_system);

    service.with_manager(|m| m.request_parameter_list());
    // The list-mode check covers a ListUpToDate lost to receiver lag
    let listed = follow_events(&mut events, Instant::now() + phase, |e| {
        matches!(e, ParamEvent::ListUpToDate) || service.with_manager(|m| !m.is_list_mode())
    })
    .await;
    if !listed {
        let progress = service.with_manager(|m| m.progress());
        eprintln!(
            "Parameter download incomplete: {} missing",
            progress.missing_reads
        );
        process::exit(2);
    }

    let component = service.with_manager(|m| m.config().default_component);
    if args.dump {
        service.with_manager(|m| {
            for (name, param) in m.data_model().params(component) {
                println!("{:4} {:16} {}", param.index, name, param.value);
            }
        });
    }
    let count = service.with_manager(|m| m.data_model().count(component));
    println!("Received {count} parameters from component {component}");

    if args.set.is_empty() {
        if args.persist {
            service.with_manager(|m| m.write_params_to_persistent_storage());
        }
        return;
    }

    service.with_manager(|m| {
        for (name, value) in &args.set {
            let param_type = m
                .data_model()
                .get(component, name)
                .map_or(ParamType::Float, |p| p.value.param_type());
            let value = ParamValue::from_wire(*value as f32, param_type);
            m.data_model_mut().record_pending(component, name, value);
        }
        m.send_pending_parameters(args.persist);
    });

    let written = follow_events(&mut events, Instant::now() + phase, |_| {
        service.with_manager(|m| m.progress().pending_writes == 0)
    })
    .await;
    if !written {
        eprintln!("Not every write was acknowledged");
        process::exit(2);
    }
}
