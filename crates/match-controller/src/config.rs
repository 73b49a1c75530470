//! Match Controller configuration.
//!
//! Configuration is loaded from environment variables. Every field has a
//! sensible default; a variable that is present but unparsable fails startup
//! instead of silently falling back.

use std::collections::HashMap;
use std::env;
use thiserror::Error;

/// Default HTTP/WebSocket bind address.
pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:8080";

/// Default coordinator mailbox capacity.
pub const DEFAULT_MAILBOX_BUFFER: usize = 1024;

/// Default per-connection outbound channel capacity.
pub const DEFAULT_OUTBOUND_BUFFER: usize = 64;

/// Default instance ID prefix.
pub const DEFAULT_INSTANCE_ID_PREFIX: &str = "match";

/// Match Controller configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP/WebSocket server bind address (default: "0.0.0.0:8080").
    pub bind_address: String,

    /// Unique identifier for this instance.
    pub instance_id: String,

    /// Coordinator mailbox capacity (default: 1024).
    pub mailbox_buffer: usize,

    /// Per-connection outbound channel capacity (default: 64). A connection
    /// whose buffer is full loses events rather than stalling the coordinator.
    pub outbound_buffer: usize,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&env::vars().collect())
    }

    /// Load configuration from a `HashMap` (for testing).
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let bind_address = vars
            .get("MATCH_BIND_ADDRESS")
            .cloned()
            .unwrap_or_else(|| DEFAULT_BIND_ADDRESS.to_string());

        let mailbox_buffer =
            parse_buffer(vars, "MATCH_MAILBOX_BUFFER", DEFAULT_MAILBOX_BUFFER)?;
        let outbound_buffer =
            parse_buffer(vars, "MATCH_OUTBOUND_BUFFER", DEFAULT_OUTBOUND_BUFFER)?;

        let instance_id = vars.get("MATCH_INSTANCE_ID").cloned().unwrap_or_else(|| {
            let hostname = std::env::var("HOSTNAME").unwrap_or_else(|_| "unknown".to_string());
            let uuid_suffix = uuid::Uuid::new_v4().to_string();
            let short_suffix = uuid_suffix.get(..8).unwrap_or("00000000");
            format!("{DEFAULT_INSTANCE_ID_PREFIX}-{hostname}-{short_suffix}")
        });

        Ok(Config {
            bind_address,
            instance_id,
            mailbox_buffer,
            outbound_buffer,
        })
    }
}

/// Parse a positive buffer size, defaulting only when the variable is absent.
fn parse_buffer(
    vars: &HashMap<String, String>,
    name: &str,
    default: usize,
) -> Result<usize, ConfigError> {
    match vars.get(name) {
        None => Ok(default),
        Some(raw) => match raw.parse::<usize>() {
            Ok(value) if value > 0 => Ok(value),
            _ => Err(ConfigError::InvalidValue(format!(
                "{name} must be a positive integer, got {raw:?}"
            ))),
        },
    }
}
