//! Communication with the vehicle
//!
//! The sync protocol talks to the vehicle only through the [`ParamLink`]
//! and [`ParamValueSource`] traits defined here.
//!
//! # Links
//!
//! - **MAVLink 2.0 over UDP**: [`mavlink::UdpParamLink`]
//! - **Channel**: [`ChannelParamSource`], values from any producer
//! - **Mock**: [`mock::MockLink`], records requests for host testing

pub mod link;
pub mod mavlink;
pub mod mock;

pub use link::{ChannelParamSource, IncomingParamValue, ParamLink, ParamValueSource};
