//! Trait abstractions that keep protocol logic independent of the host.

pub mod time;

pub use time::{MockTime, TimeSource};
