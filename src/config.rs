//! Client configuration.
//!
//! All settings have defaults and can be loaded from JSON by the host
//! service (missing keys fall back to the defaults):
//!
//! ```
//! use bmc_wire::config::ClientConfig;
//!
//! let config = ClientConfig::from_json(r#"{
//!     "timeout_ms": 2000,
//!     "retry": { "max_retries": 4 },
//!     "bridge": { "max_polls": 20 }
//! }"#).unwrap();
//!
//! assert_eq!(config.timeout().as_millis(), 2000);
//! assert_eq!(config.retry.max_retries, 4);
//! assert!(config.retry.retry_timeouts);
//! assert_eq!(config.bridge.max_polls, 20);
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::transport::TransportError;

/// Default per-exchange timeout.
pub const DEFAULT_TIMEOUT_MS: u64 = 5_000;

/// Default number of retries after the first attempt.
pub const DEFAULT_MAX_RETRIES: u32 = 2;

/// Default number of "get message" polls per bridged call.
pub const DEFAULT_MAX_POLLS: u32 = 10;

/// Default timeout of a single "get message" poll.
pub const DEFAULT_POLL_TIMEOUT_MS: u64 = 1_000;

/// Which transport failures are repeated, and how often.
///
/// Retries are immediate; there is no backoff.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Retries allowed after the first attempt.
    pub max_retries: u32,
    /// Retry when the transport times out.
    pub retry_timeouts: bool,
    /// Retry when the transport reports a channel failure.
    pub retry_failures: bool,
}

impl RetryPolicy {
    /// Never retry.
    pub const fn none() -> Self {
        Self {
            max_retries: 0,
            retry_timeouts: false,
            retry_failures: false,
        }
    }

    /// Retry both timeouts and failures up to `max_retries` times.
    pub const fn retries(max_retries: u32) -> Self {
        Self {
            max_retries,
            retry_timeouts: true,
            retry_failures: true,
        }
    }

    /// Whether another attempt is allowed after `retries_done` retries
    /// ended in `error`.
    pub fn permits(&self, retries_done: u32, error: &TransportError) -> bool {
        if retries_done >= self.max_retries {
            return false;
        }
        match error {
            TransportError::Timeout(_) => self.retry_timeouts,
            TransportError::Failure(_) => self.retry_failures,
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::retries(DEFAULT_MAX_RETRIES)
    }
}

/// Bridged messaging settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Maximum "get message" round trips before the inner call times out.
    pub max_polls: u32,
    /// Timeout of one "get message" round trip, in milliseconds.
    pub poll_timeout_ms: u64,
}

impl BridgeConfig {
    /// Poll timeout as a `Duration`.
    pub fn poll_timeout(&self) -> Duration {
        Duration::from_millis(self.poll_timeout_ms)
    }
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            max_polls: DEFAULT_MAX_POLLS,
            poll_timeout_ms: DEFAULT_POLL_TIMEOUT_MS,
        }
    }
}

/// Top-level client settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Per-exchange timeout, in milliseconds.
    pub timeout_ms: u64,
    /// Transport retry policy.
    pub retry: RetryPolicy,
    /// Bridged messaging settings.
    pub bridge: BridgeConfig,
}

impl ClientConfig {
    /// Parse a JSON document. Missing keys take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Serialize to pretty-printed JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Per-exchange timeout as a `Duration`.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            timeout_ms: DEFAULT_TIMEOUT_MS,
            retry: RetryPolicy::default(),
            bridge: BridgeConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ClientConfig::default();
        assert_eq!(config.timeout(), Duration::from_millis(DEFAULT_TIMEOUT_MS));
        assert_eq!(config.retry, RetryPolicy::retries(DEFAULT_MAX_RETRIES));
        assert_eq!(config.bridge.max_polls, DEFAULT_MAX_POLLS);
        assert_eq!(
            config.bridge.poll_timeout(),
            Duration::from_millis(DEFAULT_POLL_TIMEOUT_MS)
        );
    }

    #[test]
    fn test_empty_json_gives_defaults() {
        let config: ClientConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, ClientConfig::default());
    }

    #[test]
    fn test_json_roundtrip() {
        let config = ClientConfig {
            timeout_ms: 250,
            retry: RetryPolicy {
                max_retries: 1,
                retry_timeouts: true,
                retry_failures: false,
            },
            bridge: BridgeConfig {
                max_polls: 3,
                poll_timeout_ms: 50,
            },
        };

        let json = config.to_json().unwrap();
        let parsed = ClientConfig::from_json(&json).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_invalid_json_is_config_error() {
        let err = ClientConfig::from_json(r#"{"timeout_ms": "soon"}"#).unwrap_err();
        assert!(matches!(err, crate::ProtocolError::Config(_)));
    }

    #[test]
    fn test_retry_permits() {
        let timeout = TransportError::Timeout(Duration::ZERO);
        let failure = TransportError::Failure("down".to_string());

        let policy = RetryPolicy::retries(2);
        assert!(policy.permits(0, &timeout));
        assert!(policy.permits(1, &failure));
        assert!(!policy.permits(2, &timeout));

        let none = RetryPolicy::none();
        assert!(!none.permits(0, &timeout));
    }

    #[test]
    fn test_retry_kinds_selectable() {
        let policy = RetryPolicy {
            max_retries: 5,
            retry_timeouts: true,
            retry_failures: false,
        };
        assert!(policy.permits(0, &TransportError::Timeout(Duration::ZERO)));
        assert!(!policy.permits(0, &TransportError::Failure("x".to_string())));
    }
}
