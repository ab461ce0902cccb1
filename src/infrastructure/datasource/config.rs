use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::domain::models::duration;

/// Configuration key of the datasource section.
pub const DATASOURCE_CONFIG_KEY: &str = "datasource";

/// Name used by [`super::Datasource::with_default`] and `default_connection`.
pub const DEFAULT_DATASOURCE_NAME: &str = "default";

/// One named entry of the `datasource` section
///
/// ```yaml
/// datasource:
///   default:
///     connection_string: sqlite://data/app.db
///     driver_name: sqlite
///     max_open_connections: 10
///     max_connection_life_time: 30m
///     migration_path: ./migrations
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasourceConfig {
    pub connection_string: String,

    #[serde(default = "default_driver")]
    pub driver_name: String,

    /// Upper bound of pooled connections; 0 keeps the pool default.
    #[serde(default)]
    pub max_open_connections: u32,

    /// Connections kept open while idle; 0 keeps none.
    #[serde(default)]
    pub max_idle_connections: u32,

    /// 0 means connections are never retired for age.
    #[serde(default, with = "duration")]
    pub max_connection_life_time: Duration,

    /// 0 means idle connections are never closed.
    #[serde(default, with = "duration")]
    pub max_connection_idle_time: Duration,

    /// Directory with migration scripts; a `file://` prefix is accepted.
    #[serde(default)]
    pub migration_path: Option<String>,
}

fn default_driver() -> String {
    "sqlite".to_string()
}

impl DatasourceConfig {
    /// Migration directory with any `file://` scheme stripped.
    pub fn migration_dir(&self) -> Option<PathBuf> {
        self.migration_path
            .as_deref()
            .filter(|p| !p.is_empty())
            .map(|p| PathBuf::from(p.strip_prefix("file://").unwrap_or(p)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::config::ConfigStore;
    use std::collections::BTreeMap;

    #[test]
    fn test_section_deserializes() {
        let store = ConfigStore::from_yaml_str(
            "datasource:\n  default:\n    connection_string: sqlite::memory:\n    max_open_connections: \"4\"\n    max_connection_life_time: 30m\n    migration_path: file://db/migrations\n  reporting:\n    connection_string: reports.db\n    driver_name: postgres\n",
        )
        .unwrap();
        let section: BTreeMap<String, DatasourceConfig> =
            store.unmarshal_key(DATASOURCE_CONFIG_KEY).unwrap();

        let default = &section["default"];
        assert_eq!(default.driver_name, "sqlite");
        assert_eq!(default.max_open_connections, 4);
        assert_eq!(default.max_connection_life_time, Duration::from_secs(1800));
        assert_eq!(default.max_connection_idle_time, Duration::ZERO);
        assert_eq!(default.migration_dir(), Some(PathBuf::from("db/migrations")));
        assert_eq!(section["reporting"].driver_name, "postgres");
        assert_eq!(section["reporting"].migration_dir(), None);
    }
}
