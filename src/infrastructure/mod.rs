//! Infrastructure layer module
//!
//! This module contains the adapters to the outside world:
//! - Configuration resolution (files, remote server, environment)
//! - Logging infrastructure
//! - SQL datasources (SQLite with sqlx)

pub mod config;
pub mod datasource;
pub mod logging;
