//! Parameter protocol tuning
//!
//! Timeouts and burst sizes depend on the link: a 57600 baud telemetry radio
//! needs longer timeouts and smaller bursts than UDP over WiFi. Values come
//! from [`Default`], an optional JSON file and `PARAM_*` environment
//! variables, applied in that order.

use std::env;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::parameters::{ComponentId, MAV_COMP_ID_AUTOPILOT1};

/// Upper bound for every timeout and the guard interval (one hour)
pub const MAX_TIMEOUT_MS: u64 = 3_600_000;

/// Tunables for the parameter sync protocol
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParamCommsConfig {
    /// Time without incoming data before missing reads are re-requested
    pub retransmission_timeout_ms: u64,
    /// Time without a matching echo before a write is sent again
    pub rewrite_timeout_ms: u64,
    /// Time to wait for the first reply to a full list request
    pub list_receive_timeout_ms: u64,
    /// Maximum re-requests issued per guard tick, for reads and for writes
    pub retransmission_burst_size: usize,
    /// Retransmission rounds without progress before the session fails
    pub max_retries: u32,
    /// Guard tick cadence
    pub guard_interval_ms: u64,
    /// Component addressed when the data model knows none yet
    pub default_component: ComponentId,
    /// Number of RC channels covered by the calibration refresh
    pub rc_channel_count: u8,
    /// Capacity of the event broadcast channel
    pub event_capacity: usize,
}

impl Default for ParamCommsConfig {
    fn default() -> Self {
        Self {
            retransmission_timeout_ms: 1000,
            rewrite_timeout_ms: 1000,
            list_receive_timeout_ms: 5000,
            retransmission_burst_size: 5,
            max_retries: 5,
            guard_interval_ms: 100,
            default_component: MAV_COMP_ID_AUTOPILOT1,
            rc_channel_count: 8,
            event_capacity: 256,
        }
    }
}

impl ParamCommsConfig {
    /// Parse a JSON document; missing fields keep their defaults
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a JSON config file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// Apply `PARAM_*` environment variable overrides
    ///
    /// Recognized: `PARAM_RETRANSMISSION_TIMEOUT_MS`, `PARAM_REWRITE_TIMEOUT_MS`,
    /// `PARAM_LIST_RECEIVE_TIMEOUT_MS`, `PARAM_RETRANSMISSION_BURST_SIZE`,
    /// `PARAM_MAX_RETRIES`, `PARAM_GUARD_INTERVAL_MS`.
    pub fn with_env_overrides(mut self) -> Result<Self, ConfigError> {
        if let Some(v) = env_number("PARAM_RETRANSMISSION_TIMEOUT_MS")? {
            self.retransmission_timeout_ms = v;
        }
        if let Some(v) = env_number("PARAM_REWRITE_TIMEOUT_MS")? {
            self.rewrite_timeout_ms = v;
        }
        if let Some(v) = env_number("PARAM_LIST_RECEIVE_TIMEOUT_MS")? {
            self.list_receive_timeout_ms = v;
        }
        if let Some(v) = env_number("PARAM_RETRANSMISSION_BURST_SIZE")? {
            self.retransmission_burst_size = v as usize;
        }
        if let Some(v) = env_number("PARAM_MAX_RETRIES")? {
            self.max_retries = v.min(u32::MAX as u64) as u32;
        }
        if let Some(v) = env_number("PARAM_GUARD_INTERVAL_MS")? {
            self.guard_interval_ms = v;
        }
        self.validate()?;
        Ok(self)
    }

    /// Reject settings that would stall or flood the link
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.retransmission_burst_size == 0 {
            return Err(ConfigError::Invalid(
                "retransmission_burst_size must be at least 1",
            ));
        }
        if self.retransmission_timeout_ms == 0 || self.rewrite_timeout_ms == 0 {
            return Err(ConfigError::Invalid("timeouts must be non-zero"));
        }
        if self.guard_interval_ms == 0 {
            return Err(ConfigError::Invalid("guard_interval_ms must be non-zero"));
        }
        if [
            self.retransmission_timeout_ms,
            self.rewrite_timeout_ms,
            self.list_receive_timeout_ms,
            self.guard_interval_ms,
        ]
        .iter()
        .any(|&ms| ms > MAX_TIMEOUT_MS)
        {
            return Err(ConfigError::Invalid("timeouts must not exceed one hour"));
        }
        if self.event_capacity == 0 {
            return Err(ConfigError::Invalid("event_capacity must be non-zero"));
        }
        Ok(())
    }

    pub(crate) fn retransmission_timeout_us(&self) -> u64 {
        self.retransmission_timeout_ms.saturating_mul(1000)
    }

    pub(crate) fn rewrite_timeout_us(&self) -> u64 {
        self.rewrite_timeout_ms.saturating_mul(1000)
    }

    pub(crate) fn list_receive_timeout_us(&self) -> u64 {
        self.list_receive_timeout_ms.saturating_mul(1000)
    }
}

fn env_number(name: &'static str) -> Result<Option<u64>, ConfigError> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue { name, value: raw }),
        Err(_) => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn clear_env() {
        for name in [
            "PARAM_RETRANSMISSION_TIMEOUT_MS",
            "PARAM_REWRITE_TIMEOUT_MS",
            "PARAM_LIST_RECEIVE_TIMEOUT_MS",
            "PARAM_RETRANSMISSION_BURST_SIZE",
            "PARAM_MAX_RETRIES",
            "PARAM_GUARD_INTERVAL_MS",
        ] {
            env::remove_var(name);
        }
    }

    #[test]
    fn test_defaults_are_valid() {
        let config = ParamCommsConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.retransmission_burst_size, 5);
        assert_eq!(config.default_component, 1);
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config =
            ParamCommsConfig::from_json_str(r#"{ "rewrite_timeout_ms": 2500 }"#).unwrap();
        assert_eq!(config.rewrite_timeout_ms, 2500);
        assert_eq!(config.retransmission_timeout_ms, 1000);
    }

    #[test]
    fn test_zero_burst_rejected() {
        let result = ParamCommsConfig::from_json_str(r#"{ "retransmission_burst_size": 0 }"#);
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_oversized_timeout_rejected() {
        let result = ParamCommsConfig::from_json_str(
            r#"{ "retransmission_timeout_ms": 18446744073709551615 }"#,
        );
        assert!(matches!(result, Err(ConfigError::Invalid(_))));

        let config = ParamCommsConfig {
            list_receive_timeout_ms: u64::MAX,
            ..ParamCommsConfig::default()
        };
        assert!(config.validate().is_err());
        assert_eq!(config.list_receive_timeout_us(), u64::MAX);
    }

    #[test]
    fn test_malformed_json() {
        let result = ParamCommsConfig::from_json_str("{ not json");
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    #[serial]
    fn test_env_overrides() {
        clear_env();
        env::set_var("PARAM_RETRANSMISSION_TIMEOUT_MS", "350");
        env::set_var("PARAM_RETRANSMISSION_BURST_SIZE", " 3 ");

        let config = ParamCommsConfig::default().with_env_overrides().unwrap();
        assert_eq!(config.retransmission_timeout_ms, 350);
        assert_eq!(config.retransmission_burst_size, 3);
        assert_eq!(config.rewrite_timeout_ms, 1000);

        clear_env();
    }

    #[test]
    #[serial]
    fn test_env_override_invalid_number() {
        clear_env();
        env::set_var("PARAM_MAX_RETRIES", "many");

        let result = ParamCommsConfig::default().with_env_overrides();
        match result {
            Err(ConfigError::InvalidValue { name, value }) => {
                assert_eq!(name, "PARAM_MAX_RETRIES");
                assert_eq!(value, "many");
            }
            other => panic!("Expected InvalidValue, got {:?}", other),
        }

        clear_env();
    }
}
