//! Application entry point: configuration, logging, CLI and lifecycle wiring.

use std::collections::BTreeMap;
use std::ffi::OsString;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use clap::ArgMatches;
use thiserror::Error;
use tracing::instrument::WithSubscriber;
use tracing::{debug, info};
use tracing_subscriber::util::TryInitError;

use super::orchestrator::Orchestrator;
use super::registry::Registry;
use super::signals::spawn_signal_listener;
use crate::cli::{disabled_servers, root_command, start_command, GlobalArgs, START_COMMAND};
use crate::domain::error::{LifecycleError, RegistryError};
use crate::domain::models::{LifecycleConfig, LIFECYCLE_CONFIG_KEY};
use crate::domain::ports::{Component, Server};
use crate::infrastructure::config::{ApplicationConfig, ConfigError, ConfigStore};
use crate::infrastructure::logging::{LogConfig, LoggerImpl, LOGGER_CONFIG_KEY};

const DEFAULT_APPLICATION_NAME: &str = "app";

type ShutdownFuture = Pin<Box<dyn Future<Output = ()> + Send>>;

/// Errors that end [`Application::run`] with a non-zero exit status.
#[derive(Error, Debug)]
pub enum BootstrapError {
    #[error("Unable to load configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("Unable to configure logger: {0:#}")]
    Logger(#[source] anyhow::Error),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),

    #[error(transparent)]
    Cli(#[from] clap::Error),

    #[error("Unable to listen for shutdown signals: {0}")]
    Signal(#[source] std::io::Error),

    #[error("Command \"{name}\" failed: {source:#}")]
    Command {
        name: String,
        #[source]
        source: anyhow::Error,
    },
}

impl BootstrapError {
    /// Server, component or command the error is about, if any.
    pub fn unit_name(&self) -> Option<&str> {
        match self {
            Self::Lifecycle(e) => e.unit_name(),
            Self::Registry(e) => Some(e.name()),
            Self::Command { name, .. } => Some(name),
            _ => None,
        }
    }

    /// Process exit status for this error. Help and version output exit with 0.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Cli(e) => e.exit_code(),
            _ => 1,
        }
    }
}

/// An application assembled from registered servers and components.
///
/// ```no_run
/// # async fn example() -> Result<(), wizapp::application::BootstrapError> {
/// use wizapp::application::Application;
///
/// let mut app = Application::new("orders").about("Order service");
/// app.register_component("sql", wizapp::adapters::sql_component::create_component)?;
/// app.run(std::env::args_os(), |_config| Ok(())).await
/// # }
/// ```
pub struct Application {
    name: String,
    about: Option<String>,
    version: Option<String>,
    registry: Registry,
    config: Option<ConfigStore>,
    shutdown: Option<ShutdownFuture>,
}

impl Application {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            about: None,
            version: None,
            registry: Registry::new(),
            config: None,
            shutdown: None,
        }
    }

    /// Application named after the running executable.
    pub fn from_executable() -> Self {
        let name = std::env::args_os()
            .next()
            .and_then(|arg0| {
                std::path::Path::new(&arg0)
                    .file_stem()
                    .map(|stem| stem.to_string_lossy().into_owned())
            })
            .unwrap_or_else(|| DEFAULT_APPLICATION_NAME.to_string());
        Self::new(name)
    }

    #[must_use]
    pub fn about(mut self, about: impl Into<String>) -> Self {
        self.about = Some(about.into());
        self
    }

    #[must_use]
    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    /// Use `store` instead of loading the process-wide configuration.
    #[must_use]
    pub fn with_config(mut self, store: ConfigStore) -> Self {
        self.config = Some(store);
        self
    }

    /// End `start` when `shutdown` completes instead of on SIGINT/SIGTERM.
    #[must_use]
    pub fn with_shutdown<F>(mut self, shutdown: F) -> Self
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.shutdown = Some(Box::pin(shutdown));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn register_server<F>(
        &mut self,
        name: impl Into<String>,
        factory: F,
    ) -> Result<(), RegistryError>
    where
        F: Fn(&ConfigStore) -> anyhow::Result<Arc<dyn Server>> + Send + Sync + 'static,
    {
        self.registry.register_server(name, factory)
    }

    pub fn register_component<F>(
        &mut self,
        name: impl Into<String>,
        factory: F,
    ) -> Result<(), RegistryError>
    where
        F: Fn(&ConfigStore) -> anyhow::Result<Arc<dyn Component>> + Send + Sync + 'static,
    {
        self.registry.register_component(name, factory)
    }

    /// Load configuration, install logging, parse `args` and run the selected
    /// sub-command.
    ///
    /// `setup` runs before `start` constructs any server; it is where handlers
    /// and routes are contributed to the server adapters. It is not called for
    /// component sub-commands.
    pub async fn run<I, T, S>(mut self, args: I, setup: S) -> Result<(), BootstrapError>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString>,
        S: FnOnce(&ConfigStore) -> anyhow::Result<()>,
    {
        let args: Vec<OsString> = args.into_iter().map(Into::into).collect();
        let global = GlobalArgs::pre_parse(&args);

        let store = match self.config.take() {
            Some(store) => store,
            None => ApplicationConfig::get_or_load(global.load_options())
                .with_subscriber(LoggerImpl::bootstrap_subscriber())
                .await?
                .clone(),
        };
        let _logger = init_logger(&store)?;
        info!(app = %self.name, "Application configured");

        let mut command = root_command(&self.name, self.about.as_deref(), self.version.as_deref())
            .subcommand(start_command(self.registry.server_names()));
        let mut components: BTreeMap<String, Arc<dyn Component>> = BTreeMap::new();
        for (_, component) in self.registry.build_components(&store)? {
            let sub = component.command();
            components.insert(sub.get_name().to_string(), component);
            command = command.subcommand(sub);
        }
        let matches = command.try_get_matches_from(&args)?;

        match matches.subcommand() {
            Some((START_COMMAND, sub)) => self.start(&store, sub, setup).await,
            Some((name, sub)) => {
                let Some(component) = components.get(name) else {
                    return Err(RegistryError::UnknownComponent(name.to_string()).into());
                };
                debug!(command = %name, "Running component command");
                component
                    .execute(sub)
                    .await
                    .map_err(|source| BootstrapError::Command {
                        name: name.to_string(),
                        source,
                    })
            }
            None => Ok(()),
        }
    }

    async fn start<S>(
        self,
        store: &ConfigStore,
        matches: &ArgMatches,
        setup: S,
    ) -> Result<(), BootstrapError>
    where
        S: FnOnce(&ConfigStore) -> anyhow::Result<()>,
    {
        let disabled = disabled_servers(matches, self.registry.server_names());
        for name in &disabled {
            info!(server = %name, "Server disabled from the command line");
        }

        setup(store).map_err(LifecycleError::Setup)?;
        let servers = self.registry.build_servers(store, &disabled)?;
        let lifecycle: LifecycleConfig = store.unmarshal_key(LIFECYCLE_CONFIG_KEY)?;

        let shutdown = match self.shutdown {
            Some(shutdown) => shutdown,
            None => {
                let signal = spawn_signal_listener().map_err(BootstrapError::Signal)?;
                Box::pin(async move {
                    if signal.await.is_err() {
                        std::future::pending::<()>().await;
                    }
                })
            }
        };

        let orchestrator = Orchestrator::new(servers, lifecycle);
        info!(
            servers = ?orchestrator.server_names().collect::<Vec<_>>(),
            "Starting servers"
        );
        let report = orchestrator.run(shutdown).await?;
        info!(cause = ?report.cause, clean = report.is_clean(), "Application stopped");
        Ok(())
    }
}

/// Install the logger described by the `logger` section.
///
/// An already installed global subscriber is kept.
fn init_logger(store: &ConfigStore) -> Result<Option<LoggerImpl>, BootstrapError> {
    let config: LogConfig = store.unmarshal_key(LOGGER_CONFIG_KEY)?;
    match LoggerImpl::init(&config) {
        Ok(logger) => {
            if !store.is_set(LOGGER_CONFIG_KEY) {
                debug!("No logger configuration found, using defaults");
            }
            Ok(Some(logger))
        }
        Err(e) if e.is::<TryInitError>() => {
            debug!("Global subscriber already installed, keeping it");
            Ok(None)
        }
        Err(e) => Err(BootstrapError::Logger(e)),
    }
}
