//! Router configuration: scheduling-entry kind, listen address, and peer
//! transport settings, loadable from and savable to JSON.
//!
//! Grounded on the teacher's `message_router/config.rs` builder/validate/
//! JSON load-save pattern.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::scheduling::SchedulingKind;
use crate::transport::HttpServerConfig;

/// A router's complete runtime configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouterConfig {
    /// The address this router listens on, e.g. `0.0.0.0:8080`.
    pub listen_addr: String,
    /// The scheduling-entry kind both of this router's tables materialize.
    pub scheduling_kind: SchedulingKind,
    /// The optimizer this router feeds completion samples into.
    pub optimizer: String,
    /// Per-request timeout when forwarding to a peer.
    #[serde(with = "humantime_secs")]
    pub peer_timeout: Duration,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:8080".to_string(),
            scheduling_kind: SchedulingKind::LeastImpedance,
            optimizer: "none".to_string(),
            peer_timeout: Duration::from_secs(5),
        }
    }
}

impl RouterConfig {
    /// Validate this configuration, returning a human-readable error if
    /// any field is malformed.
    ///
    /// # Errors
    /// Returns an error string describing the first invalid field found.
    pub fn validate(&self) -> Result<(), String> {
        if self.listen_addr.parse::<std::net::SocketAddr>().is_err() {
            return Err(format!("invalid listen address: {}", self.listen_addr));
        }
        if self.peer_timeout.is_zero() {
            return Err("peer_timeout must be positive".to_string());
        }
        Ok(())
    }

    /// Load a configuration from a JSON file, validating it before return.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read, is not valid JSON, or
    /// fails [`RouterConfig::validate`].
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&raw)?;
        config.validate().map_err(anyhow::Error::msg)?;
        Ok(config)
    }

    /// Save this configuration as pretty-printed JSON.
    ///
    /// # Errors
    /// Returns an error if serialization or the write fails.
    pub fn save(&self, path: impl AsRef<Path>) -> anyhow::Result<()> {
        let raw = serde_json::to_string_pretty(self)?;
        std::fs::write(path, raw)?;
        Ok(())
    }

    /// Build an [`HttpServerConfig`] for the peer transport client from
    /// this router's settings.
    #[must_use]
    pub fn http_client_config(&self) -> HttpServerConfig {
        HttpServerConfig {
            request_timeout: self.peer_timeout,
        }
    }
}

mod humantime_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(value.as_secs_f64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Ok(Duration::from_secs_f64(secs))
    }
}
