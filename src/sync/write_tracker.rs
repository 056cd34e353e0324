//! Pending-write tracking
//!
//! A write stays pending until the vehicle echoes a PARAM_VALUE with the
//! same name and an equal value. An echo with a different value does not
//! clear it: the write may have been rejected or clamped onboard, and the
//! operator's value is sent again.

use std::collections::BTreeMap;

use crate::parameters::{ComponentId, ParamValue};

/// A write in flight
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PendingWrite {
    /// Value last sent to the vehicle
    pub value: ParamValue,
    /// When the value was last handed to the link
    pub last_sent_us: u64,
    /// Number of re-sends so far
    pub retries: u32,
    /// A differing echo was already reported for this value
    pub mismatch_reported: bool,
}

/// Result of matching an incoming value against pending writes
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AckOutcome {
    /// No write pending for this name
    NotPending,
    /// Echo matches; the write is complete
    Acknowledged,
    /// Echo differs from what was sent; the write stays pending
    ///
    /// `first` is set only for the first differing echo of the value sent.
    Mismatch { sent: ParamValue, first: bool },
}

/// Pending-write tracker for all components
#[derive(Debug, Default)]
pub struct PendingWriteTracker {
    components: BTreeMap<ComponentId, BTreeMap<String, PendingWrite>>,
}

impl PendingWriteTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Track a write that was just sent, replacing any older value for the name
    pub fn insert(&mut self, component: ComponentId, name: &str, value: ParamValue, now_us: u64) {
        self.components.entry(component).or_default().insert(
            name.to_string(),
            PendingWrite {
                value,
                last_sent_us: now_us,
                retries: 0,
                mismatch_reported: false,
            },
        );
    }

    /// Match an incoming value against the pending write for `name`
    pub fn acknowledge(
        &mut self,
        component: ComponentId,
        name: &str,
        value: &ParamValue,
    ) -> AckOutcome {
        let Some(writes) = self.components.get_mut(&component) else {
            return AckOutcome::NotPending;
        };
        let Some(pending) = writes.get_mut(name) else {
            return AckOutcome::NotPending;
        };

        if pending.value != *value {
            let first = !pending.mismatch_reported;
            pending.mismatch_reported = true;
            return AckOutcome::Mismatch {
                sent: pending.value,
                first,
            };
        }

        writes.remove(name);
        if writes.is_empty() {
            self.components.remove(&component);
        }
        AckOutcome::Acknowledged
    }

    /// Get the pending write for a parameter
    pub fn get(&self, component: ComponentId, name: &str) -> Option<&PendingWrite> {
        self.components.get(&component)?.get(name)
    }

    pub fn has_component(&self, component: ComponentId) -> bool {
        self.components.contains_key(&component)
    }

    /// Writes not re-sent for at least `timeout_us`, at most `limit` of them
    ///
    /// Ordered by component, then by how long they have waited, then name.
    pub fn due(
        &self,
        now_us: u64,
        timeout_us: u64,
        limit: usize,
    ) -> Vec<(ComponentId, String, ParamValue)> {
        let mut due: Vec<_> = self
            .components
            .iter()
            .flat_map(|(&c, writes)| {
                writes
                    .iter()
                    .filter(|(_, w)| now_us.saturating_sub(w.last_sent_us) >= timeout_us)
                    .map(move |(name, w)| (c, w.last_sent_us, name.clone(), w.value))
            })
            .collect();
        due.sort_by(|a, b| (a.0, a.1, &a.2).cmp(&(b.0, b.1, &b.2)));
        due.into_iter()
            .take(limit)
            .map(|(c, _, name, value)| (c, name, value))
            .collect()
    }

    /// Record a re-send of the pending write
    pub fn mark_resent(&mut self, component: ComponentId, name: &str, now_us: u64) {
        if let Some(pending) = self
            .components
            .get_mut(&component)
            .and_then(|writes| writes.get_mut(name))
        {
            pending.last_sent_us = now_us;
            pending.retries += 1;
        }
    }

    /// Number of writes in flight
    pub fn len(&self) -> usize {
        self.components.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    /// Drop all pending writes
    pub fn clear(&mut self) {
        self.components.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matching_echo_acknowledges() {
        let mut tracker = PendingWriteTracker::new();
        tracker.insert(1, "THR_MIN", ParamValue::Float(0.05), 0);

        assert_eq!(
            tracker.acknowledge(1, "THR_MIN", &ParamValue::Float(0.05)),
            AckOutcome::Acknowledged
        );
        assert!(tracker.is_empty());
    }

    #[test]
    fn test_mismatch_keeps_write() {
        let mut tracker = PendingWriteTracker::new();
        tracker.insert(1, "THR_MIN", ParamValue::Float(0.05), 0);

        assert_eq!(
            tracker.acknowledge(1, "THR_MIN", &ParamValue::Float(0.0)),
            AckOutcome::Mismatch {
                sent: ParamValue::Float(0.05),
                first: true
            }
        );
        assert_eq!(tracker.len(), 1);

        // Repeats of the same clamp are flagged as already seen
        assert_eq!(
            tracker.acknowledge(1, "THR_MIN", &ParamValue::Float(0.0)),
            AckOutcome::Mismatch {
                sent: ParamValue::Float(0.05),
                first: false
            }
        );

        // A new value gets its own report
        tracker.insert(1, "THR_MIN", ParamValue::Float(0.1), 10);
        assert!(matches!(
            tracker.acknowledge(1, "THR_MIN", &ParamValue::Float(0.0)),
            AckOutcome::Mismatch { first: true, .. }
        ));
    }

    #[test]
    fn test_other_component_not_acknowledged() {
        let mut tracker = PendingWriteTracker::new();
        tracker.insert(1, "THR_MIN", ParamValue::Float(0.05), 0);

        assert_eq!(
            tracker.acknowledge(2, "THR_MIN", &ParamValue::Float(0.05)),
            AckOutcome::NotPending
        );
        assert_eq!(tracker.len(), 1);
    }

    #[test]
    fn test_newer_value_replaces_older() {
        let mut tracker = PendingWriteTracker::new();
        tracker.insert(1, "CRUISE_SPEED", ParamValue::Float(2.0), 0);
        tracker.mark_resent(1, "CRUISE_SPEED", 500);
        tracker.insert(1, "CRUISE_SPEED", ParamValue::Float(3.0), 700);

        let pending = tracker.get(1, "CRUISE_SPEED").unwrap();
        assert_eq!(pending.value, ParamValue::Float(3.0));
        assert_eq!(pending.retries, 0);
        assert_eq!(pending.last_sent_us, 700);

        // The stale value no longer counts as an ack
        assert!(matches!(
            tracker.acknowledge(1, "CRUISE_SPEED", &ParamValue::Float(2.0)),
            AckOutcome::Mismatch { .. }
        ));
    }

    #[test]
    fn test_due_respects_timeout_and_limit() {
        let mut tracker = PendingWriteTracker::new();
        tracker.insert(1, "A", ParamValue::Int32(1), 0);
        tracker.insert(1, "B", ParamValue::Int32(2), 300);
        tracker.insert(1, "C", ParamValue::Int32(3), 100);
        tracker.insert(2, "D", ParamValue::Int32(4), 0);

        let due = tracker.due(1_000, 800, 10);
        let names: Vec<_> = due.iter().map(|(c, n, _)| (*c, n.as_str())).collect();
        assert_eq!(names, vec![(1, "A"), (1, "C"), (2, "D")]);

        assert_eq!(tracker.due(1_000, 800, 2).len(), 2);
    }

    #[test]
    fn test_mark_resent_restarts_timeout() {
        let mut tracker = PendingWriteTracker::new();
        tracker.insert(1, "A", ParamValue::Int32(1), 0);
        tracker.mark_resent(1, "A", 1_000);

        assert!(tracker.due(1_500, 1_000, 5).is_empty());
        assert_eq!(tracker.due(2_000, 1_000, 5).len(), 1);
        assert_eq!(tracker.get(1, "A").unwrap().retries, 1);
    }
}
