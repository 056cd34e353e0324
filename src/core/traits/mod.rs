//! Time abstraction used by the protocol logic.
//!
//! The trait and the mock live in `pico_trail_gcs_core` so the timing rules
//! can be tested without a runtime; the host implementation lives here.

pub mod time;

pub use pico_trail_gcs_core::traits::{MockTime, TimeSource};
pub use time::MonotonicTime;
