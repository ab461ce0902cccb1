//! Termination signal capture.

use std::fmt;

use tokio::sync::oneshot;
use tracing::{info, warn};

/// OS signal that requested shutdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownSignal {
    Interrupt,
    Terminate,
}

impl fmt::Display for ShutdownSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Interrupt => f.write_str("SIGINT"),
            Self::Terminate => f.write_str("SIGTERM"),
        }
    }
}

/// Register interrupt and termination handlers and wait for the first one.
///
/// Handlers are installed before this function returns, so a signal sent right
/// afterwards is not lost. Only the first signal is delivered; the listener
/// task exits after sending it.
///
/// # Errors
/// Fails if the handlers cannot be registered.
#[cfg(unix)]
pub fn spawn_signal_listener() -> std::io::Result<oneshot::Receiver<ShutdownSignal>> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut terminate = signal(SignalKind::terminate())?;
    let mut interrupt = signal(SignalKind::interrupt())?;
    let (tx, rx) = oneshot::channel();

    tokio::spawn(async move {
        let received = tokio::select! {
            _ = terminate.recv() => ShutdownSignal::Terminate,
            _ = interrupt.recv() => ShutdownSignal::Interrupt,
        };
        info!(signal = %received, "Shutdown signal received");
        if tx.send(received).is_err() {
            warn!("Shutdown signal arrived after the orchestrator finished");
        }
    });

    Ok(rx)
}

/// Register the Ctrl-C handler and wait for it.
#[cfg(not(unix))]
pub fn spawn_signal_listener() -> std::io::Result<oneshot::Receiver<ShutdownSignal>> {
    let (tx, rx) = oneshot::channel();

    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Unable to listen for Ctrl-C");
            return;
        }
        info!(signal = %ShutdownSignal::Interrupt, "Shutdown signal received");
        let _ = tx.send(ShutdownSignal::Interrupt);
    });

    Ok(rx)
}
