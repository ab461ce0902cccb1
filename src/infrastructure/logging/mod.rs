//! Logging infrastructure
//!
//! Structured logging using tracing and tracing-subscriber:
//! - JSON, pretty and compact stdout formats
//! - Optional rolling JSON log files

pub mod config;
pub mod logger;

pub use config::{LogConfig, LogFormat, RotationPolicy, LOGGER_CONFIG_KEY};
pub use logger::LoggerImpl;
