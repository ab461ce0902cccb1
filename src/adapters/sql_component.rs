//! SQL migration component.
//!
//! `sql --datasource <name> migrate` applies the scripts under the
//! datasource's `migration_path`; `sql --datasource <name> version` prints the
//! latest applied version and whether it failed.

use std::sync::Arc;

use async_trait::async_trait;
use clap::{Arg, ArgMatches, Command};
use sqlx::migrate::Migrator;
use tracing::{error, info};

use crate::domain::ports::Component;
use crate::infrastructure::config::ConfigStore;
use crate::infrastructure::datasource::{Datasource, DatasourceError};

/// Registry and command name of the component.
pub const SQL_COMPONENT_NAME: &str = "sql";

const FLAG_DATASOURCE: &str = "datasource";
const MIGRATE_COMMAND: &str = "migrate";
const VERSION_COMMAND: &str = "version";

/// Latest applied migration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchemaVersion {
    pub version: i64,
    /// The migration did not complete successfully.
    pub dirty: bool,
}

/// Factory for the registry, reading the `datasource` section.
pub fn create_component(store: &ConfigStore) -> anyhow::Result<Arc<dyn Component>> {
    Ok(Arc::new(SqlComponent::new(Datasource::from_config(store)?)))
}

pub struct SqlComponent {
    datasource: Datasource,
}

impl SqlComponent {
    pub const fn new(datasource: Datasource) -> Self {
        Self { datasource }
    }

    /// Apply pending migrations of a named datasource.
    pub async fn migrate(&self, name: &str) -> Result<(), DatasourceError> {
        let config = self.datasource.config(name)?;
        let dir = config
            .migration_dir()
            .ok_or_else(|| DatasourceError::MigrationPathMissing(name.to_string()))?;
        info!(datasource = %name, path = %dir.display(), "Applying migrations");

        let migration_error = |source| DatasourceError::Migration {
            name: name.to_string(),
            source,
        };
        let migrator = Migrator::new(dir).await.map_err(migration_error)?;
        let pool = self.datasource.connection(name).await?;
        let result = migrator.run(&pool).await.map_err(migration_error);
        pool.close().await;

        if let Err(ref e) = result {
            error!(datasource = %name, error = %e, "Error applying datasource migration");
        }
        result
    }

    /// Latest applied migration of a named datasource, `None` if none ran yet.
    pub async fn version(&self, name: &str) -> Result<Option<SchemaVersion>, DatasourceError> {
        let pool = self.datasource.connection(name).await?;
        let query_error = |source| DatasourceError::Query {
            name: name.to_string(),
            source,
        };

        let (tables,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = '_sqlx_migrations'",
        )
        .fetch_one(&pool)
        .await
        .map_err(query_error)?;

        let version = if tables == 0 {
            None
        } else {
            sqlx::query_as::<_, (i64, bool)>(
                "SELECT version, success FROM _sqlx_migrations ORDER BY version DESC LIMIT 1",
            )
            .fetch_optional(&pool)
            .await
            .map_err(query_error)?
            .map(|(version, success)| SchemaVersion {
                version,
                dirty: !success,
            })
        };

        pool.close().await;
        Ok(version)
    }
}

#[async_trait]
impl Component for SqlComponent {
    fn command(&self) -> Command {
        Command::new(SQL_COMPONENT_NAME)
            .about("Sql database operations")
            .subcommand_required(true)
            .arg(
                Arg::new(FLAG_DATASOURCE)
                    .long(FLAG_DATASOURCE)
                    .visible_alias("ds")
                    .value_name("NAME")
                    .help("Datasource name")
                    .required(true),
            )
            .subcommand(
                Command::new(MIGRATE_COMMAND)
                    .visible_alias("m")
                    .about("Apply migration scripts"),
            )
            .subcommand(
                Command::new(VERSION_COMMAND)
                    .visible_alias("v")
                    .about("Fetch database schema version"),
            )
    }

    async fn execute(&self, matches: &ArgMatches) -> anyhow::Result<()> {
        let name = matches
            .get_one::<String>(FLAG_DATASOURCE)
            .map(String::as_str)
            .unwrap_or_default();

        match matches.subcommand_name() {
            Some(MIGRATE_COMMAND) => {
                self.migrate(name).await?;
                info!(datasource = %name, "Migrations applied");
            }
            Some(VERSION_COMMAND) => match self.version(name).await? {
                Some(v) => println!("Datasource {name} version {}, dirty {}", v.version, v.dirty),
                None => println!("Datasource {name} has no applied migrations"),
            },
            other => anyhow::bail!("unknown sql command: {}", other.unwrap_or_default()),
        }
        Ok(())
    }
}
