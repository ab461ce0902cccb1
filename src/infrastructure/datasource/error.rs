use thiserror::Error;

use crate::infrastructure::config::ConfigError;

/// Errors raised when resolving or opening a datasource
#[derive(Error, Debug)]
pub enum DatasourceError {
    #[error("Datasource not configured: {0}")]
    NotConfigured(String),

    #[error("Datasource {name} uses unsupported driver `{driver}`")]
    UnsupportedDriver { name: String, driver: String },

    #[error("Datasource {0} has no migration_path")]
    MigrationPathMissing(String),

    #[error("Invalid datasource configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("Failed to connect to datasource {name}: {source}")]
    Connection {
        name: String,
        #[source]
        source: sqlx::Error,
    },

    #[error("Migration of datasource {name} failed: {source}")]
    Migration {
        name: String,
        #[source]
        source: sqlx::migrate::MigrateError,
    },

    #[error("Query on datasource {name} failed: {source}")]
    Query {
        name: String,
        #[source]
        source: sqlx::Error,
    },
}
