//! Named SQL datasources
//!
//! Connection settings live under the `datasource` section, keyed by name.
//! Pools are opened on demand with the configured limits.

pub mod config;
pub mod error;

use std::collections::BTreeMap;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use tracing::debug;

pub use config::{DatasourceConfig, DATASOURCE_CONFIG_KEY, DEFAULT_DATASOURCE_NAME};
pub use error::DatasourceError;

use crate::infrastructure::config::ConfigStore;

const SUPPORTED_DRIVERS: [&str; 2] = ["sqlite", "sqlite3"];

/// Registry of datasource configurations by name
#[derive(Debug, Clone, Default)]
pub struct Datasource {
    config: BTreeMap<String, DatasourceConfig>,
}

impl Datasource {
    /// Read the `datasource` section of the store.
    pub fn from_config(store: &ConfigStore) -> Result<Self, DatasourceError> {
        let config = store.unmarshal_key(DATASOURCE_CONFIG_KEY)?;
        Ok(Self::load(config))
    }

    pub const fn load(config: BTreeMap<String, DatasourceConfig>) -> Self {
        Self { config }
    }

    /// Single datasource registered under [`DEFAULT_DATASOURCE_NAME`].
    pub fn with_default(config: DatasourceConfig) -> Self {
        Self::load(BTreeMap::from([(DEFAULT_DATASOURCE_NAME.to_string(), config)]))
    }

    /// Configuration of a named datasource.
    pub fn config(&self, name: &str) -> Result<&DatasourceConfig, DatasourceError> {
        self.config
            .get(name)
            .ok_or_else(|| DatasourceError::NotConfigured(name.to_string()))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.config.keys().map(String::as_str)
    }

    /// Open a connection pool for a named datasource.
    pub async fn connection(&self, name: &str) -> Result<SqlitePool, DatasourceError> {
        let config = self.config(name)?;
        if !SUPPORTED_DRIVERS.contains(&config.driver_name.to_lowercase().as_str()) {
            return Err(DatasourceError::UnsupportedDriver {
                name: name.to_string(),
                driver: config.driver_name.clone(),
            });
        }

        let connection_error = |source| DatasourceError::Connection {
            name: name.to_string(),
            source,
        };

        let options = config
            .connection_string
            .parse::<SqliteConnectOptions>()
            .map_err(connection_error)?
            .create_if_missing(true);

        let mut pool = SqlitePoolOptions::new()
            .min_connections(config.max_idle_connections)
            .idle_timeout(non_zero(config.max_connection_idle_time))
            .max_lifetime(non_zero(config.max_connection_life_time));
        if config.max_open_connections > 0 {
            pool = pool
                .max_connections(config.max_open_connections)
                .min_connections(config.max_idle_connections.min(config.max_open_connections));
        }

        debug!(datasource = %name, "Opening connection pool");
        pool.connect_with(options).await.map_err(connection_error)
    }

    /// Open the pool registered under [`DEFAULT_DATASOURCE_NAME`].
    pub async fn default_connection(&self) -> Result<SqlitePool, DatasourceError> {
        self.connection(DEFAULT_DATASOURCE_NAME).await
    }
}

fn non_zero(duration: Duration) -> Option<Duration> {
    (!duration.is_zero()).then_some(duration)
}
