//! Server Port
//!
//! A server is a long-running unit (RPC listener, HTTP gateway, queue worker)
//! supervised by the lifecycle orchestrator.

use async_trait::async_trait;

/// Long-running unit with a blocking run loop and an idempotent stop.
///
/// # Contract
///
/// - `start` runs for the server's entire lifetime and returns once the server
///   has stopped (`Ok`) or failed (`Err`). It is called at most once.
/// - `stop` asks a running `start` to return. It may be called concurrently with
///   `start`, before `start`, or after `start` failed. Calling it more than once
///   is a no-op.
#[async_trait]
pub trait Server: Send + Sync {
    /// Run the server until it is stopped or fails.
    async fn start(&self) -> anyhow::Result<()>;

    /// Request shutdown of the run loop.
    async fn stop(&self) -> anyhow::Result<()>;
}

/// Placeholder server for adapters still under construction.
///
/// Both operations fail, so a misconfigured registration is caught at startup.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnimplementedServer;

#[async_trait]
impl Server for UnimplementedServer {
    async fn start(&self) -> anyhow::Result<()> {
        anyhow::bail!("method start not implemented")
    }

    async fn stop(&self) -> anyhow::Result<()> {
        anyhow::bail!("method stop not implemented")
    }
}
