//! Parameter error types

/// Errors from parameter name and value handling
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParameterError {
    /// Name is longer than the 16-byte MAVLink param_id field
    NameTooLong,
    /// Name is empty or not valid UTF-8
    InvalidName,
    /// MAV_PARAM_TYPE not representable in a PARAM_VALUE float
    UnsupportedType(u8),
    /// Integer value that the f32 wire field would round
    InexactValue,
}

impl core::fmt::Display for ParameterError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            ParameterError::NameTooLong => write!(f, "parameter name longer than 16 bytes"),
            ParameterError::InvalidName => write!(f, "invalid parameter name"),
            ParameterError::UnsupportedType(id) => {
                write!(f, "unsupported parameter type {}", id)
            }
            ParameterError::InexactValue => {
                write!(f, "value does not fit the float field exactly")
            }
        }
    }
}
