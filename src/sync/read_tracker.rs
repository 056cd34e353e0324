//! Missing-read tracking
//!
//! Per component: which table entries have arrived (the received mask),
//! which requested parameters are still outstanding, and whether a full
//! list request is waiting for its first reply.
//!
//! # Invariants
//!
//! - The received mask is sized once, from the first reply of a list
//!   transfer, and never resized afterwards.
//! - Mask entries only ever go from `false` to `true`.
//! - `ParamRef::Index(i)` is missing only while `mask[i]` is `false`.

use std::collections::{BTreeMap, BTreeSet};

use crate::parameters::{ComponentId, ParamRef};

/// Read-side state of one component
#[derive(Debug, Clone, Default)]
struct ComponentReads {
    received: Vec<bool>,
    size_known: bool,
    missing: BTreeSet<ParamRef>,
    /// Part of the current list transfer
    in_list: bool,
    /// Time of the last list request sent to this component
    list_requested_at_us: Option<u64>,
    reported_out_of_range: BTreeSet<u16>,
    reported_count_mismatch: bool,
}

impl ComponentReads {
    fn list(now_us: u64) -> Self {
        Self {
            in_list: true,
            list_requested_at_us: Some(now_us),
            ..Self::default()
        }
    }

    fn is_received(&self, index: u16) -> bool {
        self.received.get(index as usize).copied().unwrap_or(false)
    }

    fn list_complete(&self) -> bool {
        !self.in_list || (self.size_known && self.received.iter().all(|&r| r))
    }
}

/// Anomaly found while recording an incoming value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadAnomaly {
    /// Index outside the announced table size
    IndexOutOfRange { index: u16, size: usize },
    /// Announced count differs from the size fixed by the first reply
    CountMismatch { known: usize, announced: u16 },
}

/// Result of recording an incoming value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RecordOutcome {
    /// The component has read tracking state
    pub tracked: bool,
    /// The value filled a mask slot that was still empty
    pub newly_received: bool,
    /// The value answered an outstanding read reference
    pub cleared: bool,
    /// First occurrence of an anomaly; repeats are not reported again
    pub anomaly: Option<ReadAnomaly>,
}

/// Missing-read tracker for all components
#[derive(Debug, Default)]
pub struct MissingReadTracker {
    components: BTreeMap<ComponentId, ComponentReads>,
}

impl MissingReadTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a list transfer for a component, discarding its previous state
    ///
    /// The whole record is replaced in one assignment so no reply can see a
    /// half-reset component.
    pub fn start_list(&mut self, component: ComponentId, now_us: u64) {
        self.components
            .insert(component, ComponentReads::list(now_us));
    }

    /// Record that the list request for `component` was sent again
    pub fn mark_list_reissued(&mut self, component: ComponentId, now_us: u64) {
        if let Some(state) = self.components.get_mut(&component) {
            if state.in_list {
                state.list_requested_at_us = Some(now_us);
            }
        }
    }

    /// Add a component to the running list transfer
    ///
    /// Used for components that reply to a list request without having been
    /// addressed by name. Existing state is kept.
    pub fn join_list(&mut self, component: ComponentId) {
        self.components.entry(component).or_default().in_list = true;
    }

    pub fn has_component(&self, component: ComponentId) -> bool {
        self.components.contains_key(&component)
    }

    /// Track a single-parameter request
    ///
    /// Requests by index when the index is known and not already received
    /// in the current transfer, otherwise by name. Returns the reference
    /// that was tracked.
    pub fn request_update(
        &mut self,
        component: ComponentId,
        index: Option<u16>,
        name: &str,
    ) -> ParamRef {
        let state = self.components.entry(component).or_default();
        let target = match index {
            Some(i) if !state.is_received(i) => ParamRef::Index(i),
            _ => ParamRef::Name(name.to_string()),
        };
        state.missing.insert(target.clone());
        target
    }

    /// Record an incoming value
    ///
    /// In list mode the first reply from a component sizes its mask and
    /// marks every entry not yet received as missing.
    pub fn record(
        &mut self,
        component: ComponentId,
        total_count: u16,
        index: u16,
        name: &str,
        list_mode: bool,
    ) -> RecordOutcome {
        let Some(state) = self.components.get_mut(&component) else {
            return RecordOutcome::default();
        };
        let mut outcome = RecordOutcome {
            tracked: true,
            ..RecordOutcome::default()
        };

        if list_mode && state.in_list && !state.size_known {
            state.received = vec![false; total_count as usize];
            state.size_known = true;
            for i in 0..total_count {
                state.missing.insert(ParamRef::Index(i));
            }
        }

        if state.size_known {
            let size = state.received.len();
            if (index as usize) >= size {
                if state.reported_out_of_range.insert(index) {
                    outcome.anomaly = Some(ReadAnomaly::IndexOutOfRange { index, size });
                }
            } else {
                let slot = &mut state.received[index as usize];
                outcome.newly_received = !*slot;
                *slot = true;
            }

            if total_count as usize != size
                && outcome.anomaly.is_none()
                && !state.reported_count_mismatch
            {
                state.reported_count_mismatch = true;
                outcome.anomaly = Some(ReadAnomaly::CountMismatch {
                    known: size,
                    announced: total_count,
                });
            }
        }

        let by_index = state.missing.remove(&ParamRef::Index(index));
        let by_name = state.missing.remove(&ParamRef::Name(name.to_string()));
        outcome.cleared = by_index || by_name;
        outcome
    }

    /// Total outstanding references across all components
    pub fn missing_count(&self) -> usize {
        self.components.values().map(|s| s.missing.len()).sum()
    }

    /// Outstanding references of one component, lowest index first
    pub fn missing(&self, component: ComponentId) -> Vec<ParamRef> {
        self.components
            .get(&component)
            .map(|s| s.missing.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Received mask of a component, once its size is known
    pub fn received_mask(&self, component: ComponentId) -> Option<&[bool]> {
        self.components
            .get(&component)
            .filter(|s| s.size_known)
            .map(|s| s.received.as_slice())
    }

    /// `(received, total)` for a component; total is None until sized
    pub fn progress(&self, component: ComponentId) -> Option<(usize, Option<usize>)> {
        self.components.get(&component).map(|s| {
            let received = s.received.iter().filter(|&&r| r).count();
            (received, s.size_known.then_some(s.received.len()))
        })
    }

    /// Components with tracking state
    pub fn components(&self) -> Vec<ComponentId> {
        self.components.keys().copied().collect()
    }

    /// List requests that got no reply at all within `timeout_us`
    pub fn unanswered_lists(&self, now_us: u64, timeout_us: u64) -> Vec<ComponentId> {
        self.components
            .iter()
            .filter(|(_, s)| s.in_list && !s.size_known)
            .filter_map(|(&c, s)| {
                let requested = s.list_requested_at_us?;
                (now_us.saturating_sub(requested) >= timeout_us).then_some(c)
            })
            .collect()
    }

    /// Whether any list request is still waiting for its first reply
    pub fn awaiting_list(&self) -> bool {
        self.components
            .values()
            .any(|s| s.in_list && !s.size_known)
    }

    /// Every list transfer has a full mask and nothing is missing
    pub fn is_complete(&self) -> bool {
        self.components
            .values()
            .all(|s| s.missing.is_empty() && s.list_complete())
    }

    /// Nothing for the guard to do on the read side
    pub fn is_idle(&self) -> bool {
        self.missing_count() == 0 && !self.awaiting_list()
    }

    /// Pick up to `limit` references to re-request
    ///
    /// Lowest component first, then lowest index, then names.
    pub fn select_burst(&self, limit: usize) -> Vec<(ComponentId, ParamRef)> {
        self.components
            .iter()
            .flat_map(|(&c, s)| s.missing.iter().map(move |r| (c, r.clone())))
            .take(limit)
            .collect()
    }

    /// Drop all read tracking state
    pub fn clear(&mut self) {
        self.components.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn list_tracker(component: ComponentId) -> MissingReadTracker {
        let mut tracker = MissingReadTracker::new();
        tracker.start_list(component, 0);
        tracker
    }

    #[test]
    fn test_first_reply_sizes_mask() {
        let mut tracker = list_tracker(1);
        assert!(tracker.awaiting_list());
        assert_eq!(tracker.received_mask(1), None);

        let outcome = tracker.record(1, 3, 0, "A", true);
        assert!(outcome.tracked);
        assert!(outcome.newly_received);
        assert!(outcome.cleared);
        assert_eq!(tracker.received_mask(1), Some(&[true, false, false][..]));
        assert_eq!(
            tracker.missing(1),
            vec![ParamRef::Index(1), ParamRef::Index(2)]
        );
        assert!(!tracker.awaiting_list());
    }

    #[test]
    fn test_out_of_order_and_duplicates() {
        let mut tracker = list_tracker(1);
        tracker.record(1, 4, 3, "D", true);
        tracker.record(1, 4, 1, "B", true);
        let dup = tracker.record(1, 4, 3, "D", true);
        assert!(!dup.newly_received);
        assert!(!dup.cleared);
        assert_eq!(dup.anomaly, None);

        tracker.record(1, 4, 0, "A", true);
        assert!(!tracker.is_complete());
        tracker.record(1, 4, 2, "C", true);
        assert!(tracker.is_complete());
        assert_eq!(tracker.missing_count(), 0);
    }

    #[test]
    fn test_out_of_range_reported_once() {
        let mut tracker = list_tracker(1);
        tracker.record(1, 2, 0, "A", true);

        let first = tracker.record(1, 2, 5, "X", true);
        assert_eq!(
            first.anomaly,
            Some(ReadAnomaly::IndexOutOfRange { index: 5, size: 2 })
        );
        let again = tracker.record(1, 2, 5, "X", true);
        assert_eq!(again.anomaly, None);

        // Mask not resized
        assert_eq!(tracker.received_mask(1).map(<[bool]>::len), Some(2));
    }

    #[test]
    fn test_count_mismatch_keeps_size() {
        let mut tracker = list_tracker(1);
        tracker.record(1, 3, 0, "A", true);

        let outcome = tracker.record(1, 2, 1, "B", true);
        assert_eq!(
            outcome.anomaly,
            Some(ReadAnomaly::CountMismatch {
                known: 3,
                announced: 2
            })
        );
        assert!(outcome.newly_received);
        assert_eq!(tracker.received_mask(1), Some(&[true, true, false][..]));
    }

    #[test]
    fn test_untracked_component() {
        let mut tracker = list_tracker(1);
        let outcome = tracker.record(9, 3, 0, "A", true);
        assert!(!outcome.tracked);
        assert!(!tracker.has_component(9));
    }

    #[test]
    fn test_joined_component_is_sized() {
        let mut tracker = list_tracker(1);
        tracker.join_list(42);
        tracker.record(42, 2, 1, "CAM_MODE", true);

        assert_eq!(tracker.received_mask(42), Some(&[false, true][..]));
        assert_eq!(tracker.missing(42), vec![ParamRef::Index(0)]);
        // Never requested, so never re-requested as a whole
        assert!(tracker.unanswered_lists(u64::MAX, 0).contains(&1));
        assert!(!tracker.unanswered_lists(u64::MAX, 0).contains(&42));
    }

    #[test]
    fn test_request_update_by_index_or_name() {
        let mut tracker = MissingReadTracker::new();
        assert_eq!(
            tracker.request_update(1, Some(4), "RC1_MIN"),
            ParamRef::Index(4)
        );
        assert_eq!(
            tracker.request_update(1, None, "RC1_MAX"),
            ParamRef::Name("RC1_MAX".into())
        );
        assert_eq!(tracker.missing_count(), 2);

        // Reply clears both the index and the name reference
        tracker.record(1, 10, 4, "RC1_MIN", false);
        tracker.record(1, 10, 5, "RC1_MAX", false);
        assert_eq!(tracker.missing_count(), 0);
        assert!(tracker.is_complete());
    }

    #[test]
    fn test_request_for_received_index_tracks_name() {
        let mut tracker = list_tracker(1);
        tracker.record(1, 2, 0, "A", true);
        assert_eq!(
            tracker.request_update(1, Some(0), "A"),
            ParamRef::Name("A".into())
        );
    }

    #[test]
    fn test_select_burst_order_and_limit() {
        let mut tracker = MissingReadTracker::new();
        tracker.start_list(2, 0);
        tracker.start_list(1, 0);
        tracker.record(1, 4, 0, "A", true);
        tracker.record(2, 3, 2, "Z", true);

        let burst = tracker.select_burst(4);
        assert_eq!(
            burst,
            vec![
                (1, ParamRef::Index(1)),
                (1, ParamRef::Index(2)),
                (1, ParamRef::Index(3)),
                (2, ParamRef::Index(0)),
            ]
        );
    }

    #[test]
    fn test_unanswered_lists() {
        let mut tracker = MissingReadTracker::new();
        tracker.start_list(1, 0);
        tracker.start_list(2, 0);
        tracker.record(2, 1, 0, "A", true);

        assert!(tracker.unanswered_lists(4_999_999, 5_000_000).is_empty());
        assert_eq!(tracker.unanswered_lists(5_000_000, 5_000_000), vec![1]);

        tracker.mark_list_reissued(1, 5_000_000);
        assert!(tracker.unanswered_lists(6_000_000, 5_000_000).is_empty());
    }

    #[test]
    fn test_restart_replaces_state() {
        let mut tracker = list_tracker(1);
        tracker.record(1, 3, 0, "A", true);
        tracker.start_list(1, 100);

        assert_eq!(tracker.received_mask(1), None);
        assert_eq!(tracker.missing_count(), 0);
        assert!(tracker.awaiting_list());
    }
}
