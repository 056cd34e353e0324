//! MAVLink 2.0 parameter protocol adapter
//!
//! Connects the sync protocol to a vehicle speaking MAVLink, such as
//! ArduPilot, PX4 or pico_trail.
//!
//! # Architecture
//!
//! - **Codec**: builds PARAM_* requests and decodes PARAM_VALUE
//! - **Transport**: UDP link with vehicle discovery
//! - **Task**: tokio service running the guard ticker and receive loop

pub mod codec;
pub mod task;
pub mod transport;

pub use task::{ParamSyncService, SharedManager};
pub use transport::{LinkIdentity, UdpParamLink, UdpParamReceiver, MAVLINK_UDP_PORT};
