use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while loading or reading configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Unable to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Unable to parse config {origin}: {source}")]
    Parse {
        origin: String,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Could not fetch remote config at {url}: {source}")]
    RemoteFetch {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Remote config at {url} answered with status {status}")]
    RemoteStatus { url: String, status: u16 },

    #[error("Invalid configuration at key `{key}`: {source}")]
    Extract {
        key: String,
        #[source]
        source: Box<figment::Error>,
    },
}

/// Result type alias for configuration operations
pub type Result<T> = std::result::Result<T, ConfigError>;
