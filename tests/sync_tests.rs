//! End-to-end protocol scenarios against a simulated vehicle on a lossy link.

use pico_trail_gcs::communication::mock::{LinkRequest, MockLink};
use pico_trail_gcs::core::traits::MockTime;
use pico_trail_gcs::{
    ComponentId, IncomingParamValue, InMemoryDataModel, ParamCommsConfig, ParamCommsManager,
    ParamEvent, ParamRef, ParamValue, ParameterDataModel, StatusLevel,
};
use tokio::sync::broadcast;

type Manager<'a> = ParamCommsManager<MockLink, InMemoryDataModel, &'a MockTime>;

/// Vehicle answering parameter requests, losing replies by sequence number
struct SimVehicle {
    component: ComponentId,
    params: Vec<(String, ParamValue)>,
    replies: usize,
    lose: fn(usize) -> bool,
    online: bool,
}

impl SimVehicle {
    fn new(count: usize, lose: fn(usize) -> bool) -> Self {
        let params = (0..count)
            .map(|i| (format!("PARAM_{:03}", i), ParamValue::Float(i as f32 * 0.5)))
            .collect();
        Self {
            component: 1,
            params,
            replies: 0,
            lose,
            online: true,
        }
    }

    fn value(&self, index: usize) -> IncomingParamValue {
        let (name, value) = &self.params[index];
        IncomingParamValue {
            uas: 1,
            component: self.component,
            total_count: self.params.len() as u16,
            index: index as u16,
            name: name.clone(),
            value: *value,
        }
    }

    fn answer(&mut self, request: &LinkRequest) -> Vec<IncomingParamValue> {
        if !self.online {
            return Vec::new();
        }
        let answers = match request {
            LinkRequest::List { component } if *component == self.component => {
                (0..self.params.len()).map(|i| self.value(i)).collect()
            }
            LinkRequest::Read { target, .. } => {
                let index = match target {
                    ParamRef::Index(i) => Some(*i as usize),
                    ParamRef::Name(name) => self.params.iter().position(|(n, _)| n == name),
                };
                index
                    .filter(|&i| i < self.params.len())
                    .map(|i| vec![self.value(i)])
                    .unwrap_or_default()
            }
            LinkRequest::Write { name, value, .. } => {
                match self.params.iter().position(|(n, _)| n == name) {
                    Some(i) => {
                        self.params[i].1 = *value;
                        vec![self.value(i)]
                    }
                    None => Vec::new(),
                }
            }
            _ => Vec::new(),
        };

        answers
            .into_iter()
            .filter(|_| {
                self.replies += 1;
                !(self.lose)(self.replies)
            })
            .collect()
    }
}

/// Deliver every pending request to the vehicle and its replies back
fn pump(mgr: &mut Manager<'_>, vehicle: &mut SimVehicle) {
    for request in mgr.link_mut().take_sent() {
        for reply in vehicle.answer(&request) {
            mgr.ingest(&reply);
        }
    }
}

fn drain(rx: &mut broadcast::Receiver<ParamEvent>) -> Vec<ParamEvent> {
    std::iter::from_fn(|| rx.try_recv().ok()).collect()
}

#[test]
fn lossy_list_download_converges() {
    let time = MockTime::new();
    let mut mgr = ParamCommsManager::attach(MockLink::new(), InMemoryDataModel::new(), &time);
    let mut rx = mgr.subscribe();
    let mut vehicle = SimVehicle::new(40, |n| n % 3 == 0);

    mgr.request_parameter_list();
    let mut previous: Option<Vec<bool>> = None;
    let mut up_to_date = 0;

    for _ in 0..500 {
        pump(&mut mgr, &mut vehicle);

        // Mask entries never revert
        if let Some(mask) = mgr.received_mask(1) {
            if let Some(prev) = &previous {
                assert_eq!(prev.len(), mask.len());
                assert!(prev.iter().zip(mask).all(|(&p, &m)| !p || m));
            }
            previous = Some(mask.to_vec());
        }

        let events = drain(&mut rx);
        up_to_date += events
            .iter()
            .filter(|e| matches!(e, ParamEvent::ListUpToDate))
            .count();
        if up_to_date > 0 {
            break;
        }

        time.advance_ms(100);
        mgr.retransmission_guard_tick();
    }

    assert_eq!(up_to_date, 1);
    assert_eq!(mgr.data_model().count(1), 40);
    assert!(mgr.progress().is_idle());
    assert!(!mgr.is_failed());
}

#[test]
fn bursts_never_exceed_configured_size() {
    let time = MockTime::new();
    let config = ParamCommsConfig {
        retransmission_burst_size: 3,
        ..ParamCommsConfig::default()
    };
    let mut mgr = ParamCommsManager::attach(MockLink::new(), InMemoryDataModel::new(), &time)
        .with_config(config)
        .unwrap();
    // Only the first reply of the list gets through
    let mut vehicle = SimVehicle::new(20, |n| n > 1 && n <= 20);

    mgr.request_parameter_list();
    pump(&mut mgr, &mut vehicle);

    for _ in 0..100 {
        time.advance_ms(100);
        mgr.retransmission_guard_tick();
        let burst = mgr.link().sent().len();
        assert!(burst <= 3, "burst of {}", burst);
        pump(&mut mgr, &mut vehicle);
        if mgr.progress().is_idle() {
            break;
        }
    }

    assert_eq!(mgr.data_model().count(1), 20);
}

#[test]
fn lost_write_is_resent_and_acknowledged() {
    let time = MockTime::new();
    let mut mgr = ParamCommsManager::attach(MockLink::new(), InMemoryDataModel::new(), &time);
    let mut rx = mgr.subscribe();
    let mut vehicle = SimVehicle::new(10, |n| n == 1);

    mgr.set_parameter(1, "PARAM_004", ParamValue::Float(9.5));
    pump(&mut mgr, &mut vehicle);
    assert!(mgr.pending_write(1, "PARAM_004").is_some());

    time.advance_ms(1000);
    mgr.retransmission_guard_tick();
    pump(&mut mgr, &mut vehicle);

    assert!(mgr.pending_write(1, "PARAM_004").is_none());
    assert_eq!(
        mgr.data_model().get(1, "PARAM_004").map(|p| p.value),
        Some(ParamValue::Float(9.5))
    );
    let ok: Vec<_> = drain(&mut rx)
        .into_iter()
        .filter_map(|e| match e {
            ParamEvent::StatusMessage {
                text,
                level: StatusLevel::Ok,
            } => Some(text),
            _ => None,
        })
        .collect();
    assert!(ok.iter().any(|t| t.starts_with("SUCCESS: Wrote PARAM_004")));
}

#[test]
fn silent_vehicle_fails_then_recovers() {
    let time = MockTime::new();
    let mut mgr = ParamCommsManager::attach(MockLink::new(), InMemoryDataModel::new(), &time);
    let mut rx = mgr.subscribe();
    let mut vehicle = SimVehicle::new(5, |_| false);
    vehicle.online = false;

    mgr.request_parameter_list();
    for _ in 0..400 {
        time.advance_ms(100);
        mgr.retransmission_guard_tick();
        pump(&mut mgr, &mut vehicle);
    }

    let errors = drain(&mut rx)
        .into_iter()
        .filter(|e| {
            matches!(
                e,
                ParamEvent::StatusMessage {
                    level: StatusLevel::Error,
                    ..
                }
            )
        })
        .count();
    assert_eq!(errors, 1);
    assert!(mgr.is_failed());

    vehicle.online = true;
    mgr.request_parameter_list();
    pump(&mut mgr, &mut vehicle);

    assert!(drain(&mut rx).contains(&ParamEvent::ListUpToDate));
    assert!(!mgr.is_failed());
    assert_eq!(mgr.data_model().count(1), 5);
}

#[test]
fn pending_changes_are_written_then_persisted() {
    let time = MockTime::new();
    let mut mgr = ParamCommsManager::attach(MockLink::new(), InMemoryDataModel::new(), &time);
    let mut vehicle = SimVehicle::new(8, |_| false);

    mgr.request_parameter_list();
    pump(&mut mgr, &mut vehicle);
    assert!(!mgr.is_list_mode());

    mgr.data_model_mut()
        .record_pending(1, "PARAM_001", ParamValue::Float(4.0));
    mgr.data_model_mut()
        .record_pending(1, "PARAM_006", ParamValue::Float(-1.0));
    mgr.send_pending_parameters(true);

    let writes = mgr.link().writes();
    assert_eq!(writes.len(), 2);
    pump(&mut mgr, &mut vehicle);

    assert_eq!(mgr.data_model().pending_count(), 0);
    // Storage write goes out once the last echo arrives
    assert_eq!(mgr.link().sent(), &[LinkRequest::Commit]);
    assert!(mgr.progress().is_idle());
}
