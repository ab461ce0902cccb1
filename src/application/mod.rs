//! Application layer
//!
//! Wires configuration, the factory registry and the lifecycle orchestrator
//! into a runnable application.

pub mod bootstrap;
pub mod orchestrator;
pub mod registry;
pub mod signals;

pub use bootstrap::{Application, BootstrapError};
pub use orchestrator::{
    Orchestrator, RunOutcome, ServerExit, ServerReport, ShutdownCause, ShutdownReport,
};
pub use registry::{ComponentFactory, Registry, ServerFactory};
pub use signals::{spawn_signal_listener, ShutdownSignal};
