//! Connection configuration.
//!
//! Every field has a default, so a JSON document only needs the values it
//! overrides:
//!
//! ```
//! use cqlwire_client::ConnectionConfig;
//!
//! let config = ConnectionConfig::from_json(r#"{"outbound_capacity": 64}"#).unwrap();
//! assert_eq!(config.outbound_capacity, 64);
//! assert_eq!(config.cql_version, "3.0.0");
//! ```

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::protocol::{DEFAULT_BUFFER_CAPACITY, MAX_FRAME_LENGTH, PROTOCOL_VERSION};

/// Default CQL version announced in `STARTUP`.
pub const DEFAULT_CQL_VERSION: &str = "3.0.0";

/// Default capacity of the outbound frame queue.
pub const DEFAULT_OUTBOUND_CAPACITY: usize = 1024;

/// Default capacity of the event broadcast ring.
pub const DEFAULT_EVENT_CAPACITY: usize = 256;

/// Tunables for a connection and its transport adapter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionConfig {
    /// Protocol version written to request headers and expected on responses.
    pub protocol_version: u8,
    /// Value of `CQL_VERSION` in the `STARTUP` options.
    pub cql_version: String,
    /// Frames queued towards the writer before `send` waits.
    pub outbound_capacity: usize,
    /// Events buffered per subscriber before the slowest one lags.
    pub event_capacity: usize,
    /// Largest accepted response body.
    pub max_frame_length: u32,
    /// Size of the transport read buffer.
    pub read_buffer_size: usize,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            protocol_version: PROTOCOL_VERSION,
            cql_version: DEFAULT_CQL_VERSION.to_string(),
            outbound_capacity: DEFAULT_OUTBOUND_CAPACITY,
            event_capacity: DEFAULT_EVENT_CAPACITY,
            max_frame_length: MAX_FRAME_LENGTH,
            read_buffer_size: DEFAULT_BUFFER_CAPACITY,
        }
    }
}

impl ConnectionConfig {
    /// Parse a config from JSON, filling missing fields with defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CqlError;

    #[test]
    fn test_defaults() {
        let config = ConnectionConfig::default();
        assert_eq!(config.protocol_version, 4);
        assert_eq!(config.outbound_capacity, 1024);
        assert_eq!(config.event_capacity, 256);
        assert_eq!(config.max_frame_length, 256 * 1024 * 1024);
        assert_eq!(config.read_buffer_size, 64 * 1024);
    }

    #[test]
    fn test_json_round_trip() {
        let config = ConnectionConfig {
            cql_version: "3.4.5".to_string(),
            event_capacity: 8,
            ..Default::default()
        };
        let json = serde_json::to_string(&config).unwrap();
        assert_eq!(ConnectionConfig::from_json(&json).unwrap(), config);
    }

    #[test]
    fn test_invalid_json() {
        let err = ConnectionConfig::from_json(r#"{"event_capacity": "many"}"#).unwrap_err();
        assert!(matches!(err, CqlError::Config(_)));
    }
}
