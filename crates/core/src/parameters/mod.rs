//! Parameter types shared by the ground station and the protocol layer
//!
//! Values, type tags and the 16-byte name encoding used by the MAVLink
//! parameter protocol. Nothing here knows about links or sessions.

pub mod error;
pub mod id;
pub mod value;

pub use error::ParameterError;
pub use id::{decode_param_id, encode_param_id, PARAM_ID_LEN};
pub use value::{ParamType, ParamValue};
