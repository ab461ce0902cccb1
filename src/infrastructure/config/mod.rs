//! Configuration resolution engine
//!
//! Layered configuration built into one resolved tree:
//! - `application.yaml` and `application-<profile>.yaml` files
//! - An optional remote YAML document
//! - Environment variable overrides
//! - `${name:default}` placeholder substitution
//! - Typed extraction into serde structs through figment

pub mod environment;
pub mod error;
pub mod loader;
pub mod overlay;
pub mod remote;
pub mod resolver;
pub mod store;

pub use environment::Environment;
pub use error::ConfigError;
pub use loader::{ConfigLoader, LoadOptions};
pub use remote::RemoteConfigClient;
pub use resolver::PlaceholderResolver;
pub use store::{ApplicationConfig, ConfigStore};
