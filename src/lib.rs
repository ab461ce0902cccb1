//! Wizapp - Application Bootstrap Runtime
//!
//! Wizapp merges layered configuration into one resolved settings tree and
//! drives a set of pluggable long-running servers from concurrent start to
//! graceful shutdown.
//!
//! # Architecture
//!
//! This crate follows Clean Architecture / Hexagonal Architecture principles:
//!
//! - **Domain Layer** (`domain`): Configuration tree, lifecycle states, port traits
//! - **Application Layer** (`application`): Registry, orchestrator, bootstrap
//! - **Infrastructure Layer** (`infrastructure`): Config loading, logging, datasources
//! - **Adapters** (`adapters`): HTTP server and SQL migration component
//! - **CLI Layer** (`cli`): Command-line surface
//!
//! # Example
//!
//! ```no_run
//! use wizapp::adapters::http_server::{self, HttpRoutes, HTTP_SERVER_NAME};
//! use wizapp::application::Application;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), wizapp::application::BootstrapError> {
//!     let routes = HttpRoutes::new();
//!     let mut app = Application::new("orders");
//!     app.register_server(HTTP_SERVER_NAME, http_server::server_factory(routes.clone()))?;
//!     app.run(std::env::args_os(), |_config| Ok(())).await
//! }
//! ```

pub mod adapters;
pub mod application;
pub mod cli;
pub mod domain;
pub mod infrastructure;

// Re-export commonly used types for convenience
pub use application::{Application, BootstrapError, Orchestrator, Registry};
pub use domain::models::{ConfigNode, LifecycleConfig, ServerState, StartFailurePolicy};
pub use domain::ports::{Component, Server, UnimplementedServer};
pub use domain::{LifecycleError, RegistryError};
pub use infrastructure::config::{ApplicationConfig, ConfigError, ConfigLoader, ConfigStore, LoadOptions};
