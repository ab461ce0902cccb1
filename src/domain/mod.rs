//! Domain layer for the wizapp runtime
//!
//! This module contains the configuration tree model, the lifecycle state
//! machine and the capability contracts implemented by pluggable adapters.

pub mod error;
pub mod models;
pub mod ports;

// Re-export error types for convenient access
pub use error::{LifecycleError, RegistryError};
