//! MAVLink transports for the parameter link.
//!
//! Each transport implements [`ParamLink`](crate::communication::ParamLink)
//! for requests and [`ParamValueSource`](crate::communication::ParamValueSource)
//! for replies.

pub mod udp;

pub use udp::{LinkIdentity, UdpParamLink, UdpParamReceiver, MAVLINK_UDP_PORT};
