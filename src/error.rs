use pico_trail_gcs_core::parameters::ParameterError;

/// Errors raised while handing a request to the link or decoding a reply.
///
/// None of these are fatal to a sync session: the request stays tracked and
/// the retransmission guard sends it again.
#[derive(Debug, thiserror::Error)]
pub enum LinkError {
    #[error("No vehicle endpoint known yet")]
    NotConnected,

    #[error("Invalid parameter: {0}")]
    Parameter(ParameterError),

    #[error("Encoding failed: {0}")]
    Encode(String),

    #[error("Link closed")]
    Closed,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<ParameterError> for LinkError {
    fn from(err: ParameterError) -> Self {
        LinkError::Parameter(err)
    }
}

/// Errors from loading or validating [`crate::config::ParamCommsConfig`].
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid value for {name}: {value}")]
    InvalidValue { name: &'static str, value: String },

    #[error("Invalid config: {0}")]
    Invalid(&'static str),
}
