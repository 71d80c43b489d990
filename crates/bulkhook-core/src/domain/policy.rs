//! Fetch bounds (timeouts / status-check budget).
//!
//! Durations are kept as milliseconds so the policy can be read from JSON
//! or flags without a duration parser.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Bounds applied by the client to one fetch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchPolicy {
    /// Maximum time for each wait: acquiring the tenant gate, and each
    /// completion wait.
    pub wait_timeout_ms: u64,

    /// Maximum status checks per fetch. Each premature wake (operation still
    /// pending) uses one.
    pub max_status_checks: u32,
}

impl FetchPolicy {
    pub fn new(wait_timeout: Duration, max_status_checks: u32) -> Self {
        Self {
            wait_timeout_ms: wait_timeout.as_millis() as u64,
            max_status_checks,
        }
    }

    pub fn wait_timeout(&self) -> Duration {
        Duration::from_millis(self.wait_timeout_ms)
    }
}

impl Default for FetchPolicy {
    fn default() -> Self {
        Self {
            // Bulk exports of large stores routinely take minutes.
            wait_timeout_ms: 10 * 60 * 1000,
            max_status_checks: 10,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_policy_is_reasonable() {
        let p = FetchPolicy::default();
        assert_eq!(p.wait_timeout(), Duration::from_secs(600));
        assert_eq!(p.max_status_checks, 10);
    }

    #[test]
    fn partial_json_falls_back_to_defaults() {
        let p: FetchPolicy = serde_json::from_str(r#"{ "max_status_checks": 3 }"#).unwrap();
        assert_eq!(p.max_status_checks, 3);
        assert_eq!(p.wait_timeout_ms, FetchPolicy::default().wait_timeout_ms);
    }

    #[test]
    fn new_converts_duration() {
        let p = FetchPolicy::new(Duration::from_millis(250), 2);
        assert_eq!(p.wait_timeout_ms, 250);
        assert_eq!(p.wait_timeout(), Duration::from_millis(250));
    }
}
