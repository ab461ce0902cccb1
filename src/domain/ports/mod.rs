//! Port trait definitions (Hexagonal Architecture)
//!
//! This module defines the capability contracts that pluggable adapters implement:
//! - Server: long-running unit with blocking start and idempotent stop
//! - Component: CLI-exposed utility with its own sub-command
//!
//! The runtime only ever sees these traits; concrete protocol adapters live
//! outside the core.

pub mod component;
pub mod server;

pub use component::Component;
pub use server::{Server, UnimplementedServer};
