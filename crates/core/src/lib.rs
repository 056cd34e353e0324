//! pico_trail_gcs_core - Pure no_std types for ground-side parameter sync
//!
//! Types shared by the protocol logic and the MAVLink adapter that can be
//! tested on host without any runtime.
//!
//! # Design Principles
//!
//! - **Zero cfg**: No `#[cfg(feature = ...)]` directives
//! - **Pure no_std**: No std library dependencies
//! - **Trait abstractions**: Time injected via [`traits::TimeSource`]
//!
//! # Modules
//!
//! - [`traits`]: Monotonic time abstraction (TimeSource, MockTime)
//! - [`parameters`]: Parameter values, type tags and param_id encoding

#![no_std]

pub mod parameters;
pub mod traits;
