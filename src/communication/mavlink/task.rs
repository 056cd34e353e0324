//! Parameter sync service
//!
//! Runs a [`ParamCommsManager`] on tokio with two tasks:
//!
//! 1. **Guard ticker**: calls `retransmission_guard_tick` every
//!    `guard_interval_ms`
//! 2. **Receive loop**: feeds every value from a [`ParamValueSource`] into
//!    the manager
//!
//! Both lock the same mutex, so a guard tick never interleaves with the
//! ingestion of a value. Callers drive the protocol through
//! [`ParamSyncService::with_manager`].
//!
//! # Usage
//!
//! ```ignore
//! let link = UdpParamLink::bind(("0.0.0.0", MAVLINK_UDP_PORT), LinkIdentity::default()).await?;
//! let source = link.receiver();
//! let manager = ParamCommsManager::attach(link, InMemoryDataModel::new(), MonotonicTime::new());
//! let service = ParamSyncService::spawn(manager, source);
//! service.with_manager(|m| m.request_parameter_list());
//! ```

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};

use crate::communication::link::{ParamLink, ParamValueSource};
use crate::core::traits::TimeSource;
use crate::error::LinkError;
use crate::parameters::ParameterDataModel;
use crate::sync::{EventBus, ParamCommsManager, ParamEvent};

/// Manager shared between the service tasks and the caller
pub type SharedManager<L, M, T> = Arc<Mutex<ParamCommsManager<L, M, T>>>;

/// Running parameter sync service
///
/// Dropping the service stops both tasks.
pub struct ParamSyncService<L, M, T> {
    manager: SharedManager<L, M, T>,
    events: EventBus,
    guard_task: JoinHandle<()>,
    receive_task: JoinHandle<()>,
}

impl<L, M, T> ParamSyncService<L, M, T>
where
    L: ParamLink + Send + 'static,
    M: ParameterDataModel + Send + 'static,
    T: TimeSource + 'static,
{
    /// Spawn the guard ticker and the receive loop on the current runtime
    pub fn spawn<S>(manager: ParamCommsManager<L, M, T>, source: S) -> Self
    where
        S: ParamValueSource + 'static,
    {
        let events = manager.events().clone();
        let guard_interval = Duration::from_millis(manager.config().guard_interval_ms.max(1));
        let manager = Arc::new(Mutex::new(manager));

        let guard_task = tokio::spawn(guard_loop(Arc::clone(&manager), guard_interval));
        let receive_task = tokio::spawn(receive_loop(Arc::clone(&manager), source));

        crate::log_info!(
            "Parameter sync service started (guard interval {:?})",
            guard_interval
        );

        Self {
            manager,
            events,
            guard_task,
            receive_task,
        }
    }

    /// Shared manager handle
    pub fn manager(&self) -> SharedManager<L, M, T> {
        Arc::clone(&self.manager)
    }

    /// Run `f` with exclusive access to the manager
    pub fn with_manager<R>(&self, f: impl FnOnce(&mut ParamCommsManager<L, M, T>) -> R) -> R {
        f(&mut lock(&self.manager))
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ParamEvent> {
        self.events.subscribe()
    }

    /// The receive loop has ended (source closed)
    pub fn is_receive_finished(&self) -> bool {
        self.receive_task.is_finished()
    }
}

impl<L, M, T> ParamSyncService<L, M, T> {
    /// Stop both tasks
    pub fn shutdown(&self) {
        self.guard_task.abort();
        self.receive_task.abort();
    }
}

impl<L, M, T> Drop for ParamSyncService<L, M, T> {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn lock<X>(mutex: &Mutex<X>) -> MutexGuard<'_, X> {
    // Manager state is consistent between calls, so poisoning is ignored
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

async fn guard_loop<L, M, T>(manager: SharedManager<L, M, T>, period: Duration)
where
    L: ParamLink,
    M: ParameterDataModel,
    T: TimeSource,
{
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        ticker.tick().await;
        lock(&manager).retransmission_guard_tick();
    }
}

async fn receive_loop<L, M, T, S>(manager: SharedManager<L, M, T>, mut source: S)
where
    L: ParamLink,
    M: ParameterDataModel,
    T: TimeSource,
    S: ParamValueSource,
{
    loop {
        match source.next_param_value().await {
            Ok(value) => {
                lock(&manager).ingest(&value);
            }
            Err(LinkError::Closed) => {
                crate::log_info!("Parameter source closed, receive loop stopped");
                break;
            }
            Err(e) => crate::log_warn!("Parameter receive error: {}", e),
        }
    }
}
