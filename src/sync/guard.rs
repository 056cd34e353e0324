//! Retransmission guard
//!
//! Runs on a fixed cadence and decides what has been lost. The guard only
//! plans; the manager performs the sends so link errors and events stay in
//! one place.
//!
//! Timing rules:
//!
//! - Reads are re-requested once the link has been silent for the
//!   retransmission timeout, at most once per timeout period.
//! - Writes are re-sent once the link has been silent for the rewrite
//!   timeout and the write itself was last sent at least that long ago.
//! - A list request that got no reply at all is re-issued after the list
//!   receive timeout.
//! - Every non-empty round counts one retry. Incoming data that makes
//!   progress resets the count. After `max_retries` rounds the session fails and the guard goes
//!   dormant until a new request resumes it.

use crate::config::ParamCommsConfig;
use crate::parameters::{ComponentId, ParamRef, ParamValue};

use super::read_tracker::MissingReadTracker;
use super::write_tracker::PendingWriteTracker;

/// Work for one guard tick
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GuardPlan {
    /// Parameters to request again
    pub reads: Vec<(ComponentId, ParamRef)>,
    /// Components whose list request is re-issued
    pub list_requests: Vec<ComponentId>,
    /// Writes to send again with the value last sent
    pub writes: Vec<(ComponentId, String, ParamValue)>,
    /// Retries are exhausted; the session failed on this tick
    pub gave_up: bool,
}

impl GuardPlan {
    pub fn is_empty(&self) -> bool {
        self.reads.is_empty() && self.list_requests.is_empty() && self.writes.is_empty()
    }
}

/// Retransmission timer state
#[derive(Debug, Clone)]
pub struct RetransmissionGuard {
    retransmission_timeout_us: u64,
    rewrite_timeout_us: u64,
    list_receive_timeout_us: u64,
    burst_size: usize,
    max_retries: u32,
    last_activity_us: u64,
    last_read_burst_us: Option<u64>,
    retry_rounds: u32,
    failed: bool,
}

impl RetransmissionGuard {
    pub fn new(config: &ParamCommsConfig) -> Self {
        Self {
            retransmission_timeout_us: config.retransmission_timeout_us(),
            rewrite_timeout_us: config.rewrite_timeout_us(),
            list_receive_timeout_us: config.list_receive_timeout_us(),
            burst_size: config.retransmission_burst_size,
            max_retries: config.max_retries,
            last_activity_us: 0,
            last_read_burst_us: None,
            retry_rounds: 0,
            failed: false,
        }
    }

    /// The vehicle answered something outstanding
    pub fn note_activity(&mut self, now_us: u64) {
        self.last_activity_us = now_us;
        self.last_read_burst_us = None;
        self.retry_rounds = 0;
    }

    /// A new request was issued; restarts a failed session
    pub fn resume(&mut self, now_us: u64) {
        self.note_activity(now_us);
        self.failed = false;
    }

    pub fn is_failed(&self) -> bool {
        self.failed
    }

    pub fn retry_rounds(&self) -> u32 {
        self.retry_rounds
    }

    pub fn last_activity_us(&self) -> u64 {
        self.last_activity_us
    }

    /// Decide what to send on this tick
    pub fn plan(
        &mut self,
        now_us: u64,
        reads: &MissingReadTracker,
        writes: &PendingWriteTracker,
    ) -> GuardPlan {
        if self.failed || (reads.is_idle() && writes.is_empty()) {
            return GuardPlan::default();
        }

        let elapsed = now_us.saturating_sub(self.last_activity_us);
        let mut plan = GuardPlan {
            list_requests: reads.unanswered_lists(now_us, self.list_receive_timeout_us),
            ..GuardPlan::default()
        };

        let read_burst_due = self
            .last_read_burst_us
            .map_or(true, |t| now_us.saturating_sub(t) >= self.retransmission_timeout_us);
        if elapsed >= self.retransmission_timeout_us && read_burst_due {
            plan.reads = reads.select_burst(self.burst_size);
        }

        if elapsed >= self.rewrite_timeout_us {
            plan.writes = writes.due(now_us, self.rewrite_timeout_us, self.burst_size);
        }

        if plan.is_empty() {
            return plan;
        }

        if self.retry_rounds >= self.max_retries {
            self.failed = true;
            return GuardPlan {
                gave_up: true,
                ..GuardPlan::default()
            };
        }

        self.retry_rounds += 1;
        if !plan.reads.is_empty() {
            self.last_read_burst_us = Some(now_us);
        }
        plan
    }
}
