//! Core infrastructure: logging macros and time sources.

pub mod logging;
pub mod traits;
