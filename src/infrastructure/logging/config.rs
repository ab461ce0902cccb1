use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Configuration key of the logging section.
pub const LOGGER_CONFIG_KEY: &str = "logger";

/// Logging configuration, read from the `logger` section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format (json, pretty, compact)
    #[serde(default, alias = "formatter")]
    pub format: LogFormat,

    /// Directory for log files (optional, if None logs only to stdout)
    #[serde(default)]
    pub log_dir: Option<PathBuf>,

    /// File name prefix for rotated log files
    #[serde(default = "default_file_name")]
    pub file_name: String,

    /// Enable stdout logging
    #[serde(default = "default_true")]
    pub enable_stdout: bool,

    /// Log rotation policy
    #[serde(default)]
    pub rotation: RotationPolicy,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Json,
    Pretty,
    #[default]
    #[serde(alias = "text")]
    Compact,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RotationPolicy {
    #[default]
    Daily,
    Hourly,
    Never,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
            log_dir: None,
            file_name: default_file_name(),
            enable_stdout: true,
            rotation: RotationPolicy::default(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_file_name() -> String {
    "application.log".to_string()
}

const fn default_true() -> bool {
    true
}
