//! Parameter synchronization protocol
//!
//! Keeps a ground-side mirror of the vehicle's parameters consistent over a
//! lossy link. [`ParamCommsManager`] is the entry point; the trackers and
//! the guard are its building blocks and are exposed for inspection.

pub mod events;
pub mod guard;
pub mod manager;
pub mod read_tracker;
pub mod write_tracker;

pub use events::{EventBus, ParamEvent, StatusLevel};
pub use guard::{GuardPlan, RetransmissionGuard};
pub use manager::{ComponentProgress, ParamCommsManager, SyncProgress};
pub use read_tracker::{MissingReadTracker, ReadAnomaly, RecordOutcome};
pub use write_tracker::{AckOutcome, PendingWrite, PendingWriteTracker};
