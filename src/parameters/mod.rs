//! Parameter identity and the ground-side data model.
//!
//! Value types come from `pico_trail_gcs_core`; this module adds how a
//! parameter is addressed (component, index or name) and the
//! [`ParameterDataModel`] seam to the authoritative value store.

pub mod data_model;

use std::fmt;

pub use data_model::{InMemoryDataModel, OnboardParam, ParameterDataModel};
pub use pico_trail_gcs_core::parameters::{
    decode_param_id, encode_param_id, ParamType, ParamValue, ParameterError, PARAM_ID_LEN,
};

/// MAVLink component id of a remote subsystem
pub type ComponentId = u8;

/// MAV_COMP_ID_AUTOPILOT1
pub const MAV_COMP_ID_AUTOPILOT1: ComponentId = 1;

/// Reference to one parameter of a component
///
/// Ordering puts every index before every name, indices ascending, so a
/// burst drains the list front to back before falling back to names.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ParamRef {
    /// Position in the component's parameter table
    Index(u16),
    /// Parameter name, used while the index is unknown
    Name(String),
}

impl fmt::Display for ParamRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamRef::Index(index) => write!(f, "#{}", index),
            ParamRef::Name(name) => f.write_str(name),
        }
    }
}
