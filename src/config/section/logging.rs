//! `[logging]` section configuration.
//!
//! ```toml
//! [logging]
//! level = "debug"     # "info" (default) or "debug"
//! timestamps = true   # Prefix log lines with HH:MM:SS (UTC)
//! ```

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    #[default]
    Info,
    Debug,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: LogLevel,
    pub timestamps: bool,
}

impl LoggingConfig {
    /// Install these settings into the global logger.
    ///
    /// `--verbose` wins over a configured `info` level.
    pub fn apply(&self, verbose: bool) {
        crate::logger::set_verbose(verbose || self.level == LogLevel::Debug);
        crate::logger::set_timestamps(self.timestamps);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_parse_config;

    #[test]
    fn test_logging_defaults() {
        let config = test_parse_config("");
        assert_eq!(config.logging, LoggingConfig::default());
        assert_eq!(config.logging.level, LogLevel::Info);
    }

    #[test]
    fn test_logging_block() {
        let config = test_parse_config("[logging]\nlevel = \"debug\"\ntimestamps = true");
        assert_eq!(config.logging.level, LogLevel::Debug);
        assert!(config.logging.timestamps);
    }
}
