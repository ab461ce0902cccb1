//! Server and component adapters shipped with the runtime.

pub mod http_server;
pub mod sql_component;
