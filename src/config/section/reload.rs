//! `[reload]` section configuration.
//!
//! # Example
//!
//! ```toml
//! [reload]
//! poll_interval_ms = 1000         # How often manifests are stat'ed
//! on_failure = "stay-stopped"     # or "restart-previous"
//! content_hash = false            # Ignore mtime-only changes (touch)
//! stop_timeout_ms = 30000         # Give up waiting for a drain (unset = wait forever)
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::{ConfigDiagnostics, FieldPath};

/// What to do when a reload cannot bring up the edited worker set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailurePolicy {
    /// Leave workers stopped until the next change resolves cleanly.
    #[default]
    StayStopped,
    /// Start the last set that ran successfully again.
    RestartPrevious,
}

impl FailurePolicy {
    pub const fn label(self) -> &'static str {
        match self {
            Self::StayStopped => "stay-stopped",
            Self::RestartPrevious => "restart-previous",
        }
    }
}

/// Reload loop settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReloadConfig {
    /// Sleep between polls, in milliseconds.
    pub poll_interval_ms: u64,

    pub on_failure: FailurePolicy,

    /// Compare blake3 content hashes when an mtime moves.
    pub content_hash: bool,

    /// Maximum drain wait per stop, in milliseconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop_timeout_ms: Option<u64>,
}

impl Default for ReloadConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 1000,
            on_failure: FailurePolicy::StayStopped,
            content_hash: false,
            stop_timeout_ms: None,
        }
    }
}

impl ReloadConfig {
    pub const POLL_INTERVAL: FieldPath = FieldPath::new("reload.poll_interval_ms");
    pub const STOP_TIMEOUT: FieldPath = FieldPath::new("reload.stop_timeout_ms");

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn stop_timeout(&self) -> Option<Duration> {
        self.stop_timeout_ms.map(Duration::from_millis)
    }

    pub fn validate(&self, diag: &mut ConfigDiagnostics) {
        if self.poll_interval_ms == 0 {
            diag.error(Self::POLL_INTERVAL, "must be greater than zero");
        }
        if self.stop_timeout_ms == Some(0) {
            diag.error_with_hint(
                Self::STOP_TIMEOUT,
                "must be greater than zero",
                "remove the key to wait for drains without a limit",
            );
        }
    }
}
