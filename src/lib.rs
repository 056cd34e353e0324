//! pico_trail_gcs - Ground-side parameter synchronization for MAVLink vehicles
//!
//! Keeps a ground station's copy of a vehicle's parameters consistent over a
//! lossy telemetry link: full and targeted reads, acknowledged writes,
//! timeout-driven retransmission in bounded bursts, and persistent-storage
//! commits.

// Core infrastructure: logging macros, time sources
pub mod core;

// Tunables
pub mod config;

// Error types
pub mod error;

// Parameter identity and data model
pub mod parameters;

// Sync protocol (trackers, guard, manager)
pub mod sync;

// Links to the vehicle
pub mod communication;

pub use communication::{ChannelParamSource, IncomingParamValue, ParamLink, ParamValueSource};
pub use config::ParamCommsConfig;
pub use error::{ConfigError, LinkError};
pub use parameters::{ComponentId, InMemoryDataModel, ParamRef, ParamValue, ParameterDataModel};
pub use sync::{ParamCommsManager, ParamEvent, StatusLevel, SyncProgress};
