//! Reconciler configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Poll backoff policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackoffConfig {
    /// First poll interval
    pub initial_delay_ms: u64,

    /// Upper bound for any single interval
    pub max_delay_ms: u64,

    /// Backoff multiplier
    pub multiplier: f64,

    /// Fraction of each interval that is randomized away (0.0 - 1.0)
    pub jitter: f64,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            initial_delay_ms: 1000,
            max_delay_ms: 30_000,
            multiplier: 2.0,
            jitter: 0.2,
        }
    }
}

/// Timeouts and polling policy for the reconciler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconcilerConfig {
    /// How long create waits for verification when the spec asks for it.
    pub verification_timeout_secs: u64,

    /// How long create waits to observe the new object when not verifying.
    pub visibility_timeout_secs: u64,

    /// Window after create in which `NotFound` is treated as not-yet-visible.
    pub not_found_grace_secs: u64,

    pub backoff: BackoffConfig,
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            verification_timeout_secs: 900,
            visibility_timeout_secs: 60,
            not_found_grace_secs: 30,
            backoff: BackoffConfig::default(),
        }
    }
}

impl ReconcilerConfig {
    /// Parses a JSON document; missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn verification_timeout(&self) -> Duration {
        Duration::from_secs(self.verification_timeout_secs)
    }

    pub fn visibility_timeout(&self) -> Duration {
        Duration::from_secs(self.visibility_timeout_secs)
    }

    pub fn not_found_grace(&self) -> Duration {
        Duration::from_secs(self.not_found_grace_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = ReconcilerConfig::from_json(
            r#"{"verification_timeout_secs": 5, "backoff": {"jitter": 0.0}}"#,
        )
        .unwrap();
        assert_eq!(config.verification_timeout(), Duration::from_secs(5));
        assert_eq!(config.visibility_timeout_secs, 60);
        assert_eq!(config.backoff.jitter, 0.0);
        assert_eq!(config.backoff.initial_delay_ms, 1000);
    }
}
