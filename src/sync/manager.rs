//! Parameter communications manager
//!
//! Public operation surface of the sync protocol. Owns the read and write
//! trackers and the retransmission guard, drives the link, feeds the data
//! model and publishes [`ParamEvent`]s.
//!
//! The manager is a plain `&mut self` state machine with no internal
//! locking. Concurrent callers (the guard ticker and the receive loop)
//! share it behind a mutex, see
//! [`ParamSyncService`](crate::communication::mavlink::task::ParamSyncService).
//!
//! # Session lifecycle
//!
//! ```text
//! idle --request_parameter_list--> list transfer --all received--> idle (ListUpToDate)
//! idle --request/set parameter---> targeted     --all acked-----> idle ("All received")
//! any  --max_retries exhausted---> failed (state kept, guard dormant)
//! failed --any new request-------> resumed
//! ```

use std::collections::BTreeSet;

use tokio::sync::broadcast;

use crate::communication::link::{IncomingParamValue, ParamLink};
use crate::config::ParamCommsConfig;
use crate::core::traits::TimeSource;
use crate::error::ConfigError;
use crate::parameters::{ComponentId, ParamRef, ParamValue, ParameterDataModel};

use super::events::{EventBus, ParamEvent, StatusLevel};
use super::guard::RetransmissionGuard;
use super::read_tracker::{MissingReadTracker, ReadAnomaly};
use super::write_tracker::{AckOutcome, PendingWrite, PendingWriteTracker};

/// RC calibration parameters refreshed per channel
const RC_CALIBRATION_SUFFIXES: [&str; 4] = ["MIN", "MAX", "TRIM", "REV"];

/// Transfer progress of one component
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ComponentProgress {
    pub component: ComponentId,
    /// Table entries received in this transfer
    pub received: usize,
    /// Table size, once the first list reply arrived
    pub total: Option<usize>,
}

/// Snapshot of the sync session
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SyncProgress {
    pub components: Vec<ComponentProgress>,
    /// Outstanding read references
    pub missing_reads: usize,
    /// Writes not yet acknowledged
    pub pending_writes: usize,
    pub list_mode: bool,
    /// Retries were exhausted
    pub failed: bool,
}

impl SyncProgress {
    /// Nothing outstanding
    pub fn is_idle(&self) -> bool {
        self.missing_reads == 0 && self.pending_writes == 0 && !self.list_mode
    }
}

/// Parameter sync orchestrator
pub struct ParamCommsManager<L, M, T> {
    link: L,
    model: M,
    time: T,
    config: ParamCommsConfig,
    reads: MissingReadTracker,
    writes: PendingWriteTracker,
    guard: RetransmissionGuard,
    events: EventBus,
    list_mode: bool,
    transmission_active: bool,
    persist_after_send: bool,
    status: Option<(String, StatusLevel)>,
}

impl<L, M, T> ParamCommsManager<L, M, T>
where
    L: ParamLink,
    M: ParameterDataModel,
    T: TimeSource,
{
    /// Create a manager bound to its link, data model and clock
    pub fn attach(link: L, model: M, time: T) -> Self {
        let config = ParamCommsConfig::default();
        Self {
            link,
            model,
            time,
            reads: MissingReadTracker::new(),
            writes: PendingWriteTracker::new(),
            guard: RetransmissionGuard::new(&config),
            events: EventBus::new(config.event_capacity),
            list_mode: false,
            transmission_active: false,
            persist_after_send: false,
            status: None,
            config,
        }
    }

    /// Replace the tunables
    ///
    /// Recreates the event bus, so subscribe afterwards.
    pub fn with_config(mut self, config: ParamCommsConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        self.guard = RetransmissionGuard::new(&config);
        self.events = EventBus::new(config.event_capacity);
        self.config = config;
        Ok(self)
    }

    // ------------------------------------------------------------------
    // Requests
    // ------------------------------------------------------------------

    /// Request the full parameter table of every known component
    ///
    /// Restarts the session: earlier read tracking is discarded, so late
    /// replies to an earlier request simply count toward the new one.
    pub fn request_parameter_list(&mut self) {
        let now = self.time.now_us();
        let components = self.known_components();

        self.reads.clear();
        self.list_mode = true;
        self.transmission_active = true;
        self.guard.resume(now);

        for &component in &components {
            self.reads.start_list(component, now);
            if let Err(e) = self.link.request_parameter_list(component) {
                crate::log_warn!("Parameter list request to component {} failed: {}", component, e);
            }
        }

        self.set_parameter_status_msg(
            format!("Requested parameter list from {} component(s).", components.len()),
            StatusLevel::Ok,
        );
    }

    /// Request a single parameter by name
    ///
    /// Uses the table index when the data model knows it.
    pub fn request_parameter_update(&mut self, component: ComponentId, name: &str) {
        let now = self.time.now_us();
        let index = self.model.index_of(component, name);
        let target = self.reads.request_update(component, index, name);

        self.transmission_active = true;
        self.guard.resume(now);
        self.send_read(component, &target);
    }

    /// Refresh the RC calibration parameters of the default component
    pub fn request_rc_calibration_params_update(&mut self) {
        if self.list_mode {
            crate::log_info!("RC calibration refresh skipped: parameter list transfer in progress");
            return;
        }

        let component = self.config.default_component;
        for channel in 1..=self.config.rc_channel_count {
            for suffix in RC_CALIBRATION_SUFFIXES {
                self.request_parameter_update(component, &format!("RC{}_{}", channel, suffix));
            }
        }
    }

    /// Write a parameter value
    ///
    /// A newer value for a parameter already in flight replaces the older
    /// one; only the newest value counts as acknowledged.
    pub fn set_parameter(&mut self, component: ComponentId, name: &str, value: ParamValue) {
        if !value.is_wire_exact() {
            self.set_parameter_status_msg(
                format!("FAILURE: {} = {} cannot be sent without rounding", name, value),
                StatusLevel::Error,
            );
            return;
        }

        let now = self.time.now_us();
        self.model.record_pending(component, name, value);
        self.writes.insert(component, name, value, now);

        self.transmission_active = true;
        self.guard.resume(now);
        self.send_write(component, name, value);
    }

    /// Send every locally changed value
    ///
    /// With `copy_to_persistent` the vehicle is asked to store its
    /// parameters once the last write is acknowledged.
    pub fn send_pending_parameters(&mut self, copy_to_persistent: bool) {
        let changes = self.model.pending_changes();
        if changes.is_empty() {
            self.set_parameter_status_msg(
                "No transmission: no changed values.",
                StatusLevel::Warning,
            );
            if copy_to_persistent {
                self.write_params_to_persistent_storage();
            }
            return;
        }

        self.persist_after_send |= copy_to_persistent;
        for (component, name, value) in &changes {
            self.set_parameter(*component, name, *value);
        }
        self.set_parameter_status_msg(
            format!("Transmitting {} parameters.", changes.len()),
            StatusLevel::Ok,
        );
    }

    /// Ask the vehicle to copy its live parameters to persistent storage
    ///
    /// Not tracked or retried; the vehicle sends no acknowledgement the
    /// protocol could wait for.
    pub fn write_params_to_persistent_storage(&mut self) {
        match self.link.commit_persistent_storage() {
            Ok(()) => self.set_parameter_status_msg(
                "Requested write to persistent storage",
                StatusLevel::Ok,
            ),
            Err(e) => self.set_parameter_status_msg(
                format!("Write to persistent storage not sent: {}", e),
                StatusLevel::Warning,
            ),
        }
    }

    /// Abandon the session and drop all tracking state
    pub fn reset(&mut self) {
        self.reads.clear();
        self.writes.clear();
        self.guard = RetransmissionGuard::new(&self.config);
        self.list_mode = false;
        self.transmission_active = false;
        self.persist_after_send = false;
        crate::log_info!("Parameter sync state reset");
    }

    // ------------------------------------------------------------------
    // Ingestion
    // ------------------------------------------------------------------

    /// Handle a PARAM_VALUE from the vehicle
    pub fn received_parameter_update(
        &mut self,
        uas: u8,
        component: ComponentId,
        total_count: u16,
        index: u16,
        name: &str,
        value: ParamValue,
    ) {
        let now = self.time.now_us();

        if !self.reads.has_component(component) {
            if self.list_mode {
                crate::log_info!("Component {} joined the parameter list transfer", component);
                self.reads.join_list(component);
            } else if !self.writes.has_component(component) {
                self.set_parameter_status_msg(
                    format!(
                        "Unsolicited value from component {}: {} = {}",
                        component, name, value
                    ),
                    StatusLevel::Warning,
                );
            }
        }

        let outcome = self
            .reads
            .record(component, total_count, index, name, self.list_mode);
        match outcome.anomaly {
            Some(ReadAnomaly::IndexOutOfRange { index, size }) => self.set_parameter_status_msg(
                format!(
                    "Component {}: {} has index {} beyond table size {}",
                    component, name, index, size
                ),
                StatusLevel::Warning,
            ),
            Some(ReadAnomaly::CountMismatch { known, announced }) => self
                .set_parameter_status_msg(
                    format!(
                        "Component {}: parameter count changed from {} to {}",
                        component, known, announced
                    ),
                    StatusLevel::Warning,
                ),
            None => {}
        }

        let mut progressed = outcome.newly_received || outcome.cleared;
        match self.writes.acknowledge(component, name, &value) {
            AckOutcome::NotPending => {}
            AckOutcome::Acknowledged => {
                progressed = true;
                self.set_parameter_status_msg(
                    format!("SUCCESS: Wrote {} ({}): {}", name, index, value),
                    StatusLevel::Ok,
                );
                if self.writes.is_empty() && self.persist_after_send {
                    self.persist_after_send = false;
                    self.write_params_to_persistent_storage();
                }
            }
            AckOutcome::Mismatch { sent, first: true } => self.set_parameter_status_msg(
                format!(
                    "FAILURE: Wrote {} ({}): sent {} != onboard {}",
                    name, index, sent, value
                ),
                StatusLevel::Warning,
            ),
            AckOutcome::Mismatch { first: false, .. } => {
                crate::log_debug!("{} still differs onboard: {}", name, value);
            }
        }

        // Duplicates and repeated clamps keep the retry count running
        if progressed {
            self.guard.note_activity(now);
        }

        self.model.confirm_value(component, index, name, value);
        self.events.publish(ParamEvent::ParameterChanged {
            component,
            index,
            value,
        });
        self.events.publish(ParamEvent::ValueConfirmed {
            uas,
            component,
            count: total_count,
            index,
            name: name.to_string(),
            value,
        });

        self.finish_if_complete();
    }

    /// [`received_parameter_update`](Self::received_parameter_update) for a decoded value
    pub fn ingest(&mut self, incoming: &IncomingParamValue) {
        self.received_parameter_update(
            incoming.uas,
            incoming.component,
            incoming.total_count,
            incoming.index,
            &incoming.name,
            incoming.value,
        );
    }

    // ------------------------------------------------------------------
    // Retransmission
    // ------------------------------------------------------------------

    /// Run one retransmission guard round
    ///
    /// Call at the configured guard interval. Re-sending never counts as
    /// activity, so an unresponsive vehicle eventually exhausts retries.
    pub fn retransmission_guard_tick(&mut self) {
        let now = self.time.now_us();
        let plan = self.guard.plan(now, &self.reads, &self.writes);

        if plan.gave_up {
            self.set_parameter_status_msg(
                format!(
                    "Parameter transfer failed after {} retries: {} reads and {} writes unanswered",
                    self.config.max_retries,
                    self.reads.missing_count(),
                    self.writes.len()
                ),
                StatusLevel::Error,
            );
            return;
        }

        for component in plan.list_requests {
            self.set_parameter_status_msg(
                format!(
                    "No reply from component {} to list request, requesting again",
                    component
                ),
                StatusLevel::Warning,
            );
            self.reads.mark_list_reissued(component, now);
            if let Err(e) = self.link.request_parameter_list(component) {
                crate::log_warn!("Parameter list request to component {} failed: {}", component, e);
            }
        }

        if !plan.reads.is_empty() {
            crate::log_debug!(
                "Re-requesting {} of {} missing parameters",
                plan.reads.len(),
                self.reads.missing_count()
            );
        }
        for (component, target) in &plan.reads {
            self.send_read(*component, target);
        }

        for (component, name, value) in plan.writes {
            self.writes.mark_resent(component, &name, now);
            self.send_write(component, &name, value);
        }
    }

    // ------------------------------------------------------------------
    // Status
    // ------------------------------------------------------------------

    /// Report a status message to the operator
    pub fn set_parameter_status_msg(&mut self, text: impl Into<String>, level: StatusLevel) {
        let text = text.into();
        match level {
            StatusLevel::Ok => crate::log_info!("{}", text),
            StatusLevel::Warning => crate::log_warn!("{}", text),
            StatusLevel::Error => crate::log_error!("{}", text),
        }
        self.status = Some((text.clone(), level));
        self.events.publish(ParamEvent::StatusMessage { text, level });
    }

    /// Latest status message
    pub fn status_message(&self) -> Option<(&str, StatusLevel)> {
        self.status.as_ref().map(|(text, level)| (text.as_str(), *level))
    }

    /// Snapshot of the session
    pub fn progress(&self) -> SyncProgress {
        let components = self
            .reads
            .components()
            .into_iter()
            .filter_map(|component| {
                self.reads
                    .progress(component)
                    .map(|(received, total)| ComponentProgress {
                        component,
                        received,
                        total,
                    })
            })
            .collect();

        SyncProgress {
            components,
            missing_reads: self.reads.missing_count(),
            pending_writes: self.writes.len(),
            list_mode: self.list_mode,
            failed: self.guard.is_failed(),
        }
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ParamEvent> {
        self.events.subscribe()
    }

    pub fn link(&self) -> &L {
        &self.link
    }

    pub fn link_mut(&mut self) -> &mut L {
        &mut self.link
    }

    pub fn data_model(&self) -> &M {
        &self.model
    }

    pub fn data_model_mut(&mut self) -> &mut M {
        &mut self.model
    }

    pub fn config(&self) -> &ParamCommsConfig {
        &self.config
    }

    pub fn is_list_mode(&self) -> bool {
        self.list_mode
    }

    pub fn is_failed(&self) -> bool {
        self.guard.is_failed()
    }

    /// Write in flight for a parameter
    pub fn pending_write(&self, component: ComponentId, name: &str) -> Option<&PendingWrite> {
        self.writes.get(component, name)
    }

    /// Outstanding read references of a component
    pub fn missing_reads(&self, component: ComponentId) -> Vec<ParamRef> {
        self.reads.missing(component)
    }

    /// Received mask of a component in the current list transfer
    pub fn received_mask(&self, component: ComponentId) -> Option<&[bool]> {
        self.reads.received_mask(component)
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    fn known_components(&self) -> BTreeSet<ComponentId> {
        let mut components: BTreeSet<_> = self.model.components().into_iter().collect();
        components.insert(self.config.default_component);
        components
    }

    fn send_read(&mut self, component: ComponentId, target: &ParamRef) {
        if let Err(e) = self.link.request_parameter(component, target) {
            crate::log_warn!("Request for {} on component {} failed: {}", target, component, e);
        }
        self.events.publish(ParamEvent::UpdateRequested {
            component,
            target: target.clone(),
        });
    }

    fn send_write(&mut self, component: ComponentId, name: &str, value: ParamValue) {
        if let Err(e) = self.link.write_parameter(component, name, &value) {
            crate::log_warn!("Write of {} on component {} failed: {}", name, component, e);
        }
        self.events.publish(ParamEvent::CommitPending {
            component,
            name: name.to_string(),
            value,
        });
    }

    fn finish_if_complete(&mut self) {
        if !self.transmission_active || !self.reads.is_complete() || !self.writes.is_empty() {
            return;
        }

        self.transmission_active = false;
        self.reads.clear();
        if self.list_mode {
            self.list_mode = false;
            self.set_parameter_status_msg("All parameters received.", StatusLevel::Ok);
            self.events.publish(ParamEvent::ListUpToDate);
        } else {
            self.set_parameter_status_msg("All received.", StatusLevel::Ok);
        }
    }
}
