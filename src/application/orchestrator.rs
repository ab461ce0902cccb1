//! Concurrent start, supervision and graceful shutdown of servers.

use std::any::Any;
use std::future::Future;
use std::sync::Arc;

use futures::future::join_all;
use tokio::sync::mpsc;
use tokio::time::{timeout, timeout_at, Instant};
use tracing::{debug, error, info, warn};

use crate::domain::error::LifecycleError;
use crate::domain::models::duration;
use crate::domain::models::{LifecycleConfig, ServerState, StartFailurePolicy};
use crate::domain::ports::Server;

/// Message sent by a supervised start task when `start` returns.
#[derive(Debug)]
pub struct ServerExit {
    pub name: String,
    pub result: anyhow::Result<()>,
}

/// How a server's run loop ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// `start` returned `Ok`.
    Exited,
    /// `start` returned an error.
    Failed(String),
    /// `start` had not returned when the drain deadline passed.
    StillRunning,
}

/// What ended the supervision loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownCause {
    Signal,
    AllExited,
    ServerFailed,
}

/// Final status of one server.
#[derive(Debug, Clone)]
pub struct ServerReport {
    pub name: String,
    pub state: ServerState,
    pub run: RunOutcome,
    pub stop_error: Option<String>,
}

/// Summary returned once every server has been stopped or abandoned.
#[derive(Debug, Clone)]
pub struct ShutdownReport {
    pub cause: ShutdownCause,
    pub servers: Vec<ServerReport>,
}

impl ShutdownReport {
    pub fn get(&self, name: &str) -> Option<&ServerReport> {
        self.servers.iter().find(|s| s.name == name)
    }

    /// No server failed and every run loop returned.
    pub fn is_clean(&self) -> bool {
        self.servers
            .iter()
            .all(|s| s.state == ServerState::Stopped && s.run == RunOutcome::Exited)
    }
}

struct ServerHandle {
    name: String,
    server: Arc<dyn Server>,
    state: ServerState,
    run: Option<RunOutcome>,
    stop_error: Option<String>,
}

impl ServerHandle {
    fn transition(&mut self, next: ServerState) {
        if self.state.can_transition_to(next) {
            debug!(server = %self.name, from = %self.state, to = %next, "Server state changed");
            self.state = next;
        } else {
            debug!(server = %self.name, from = %self.state, to = %next, "Ignoring state change");
        }
    }
}

/// Owns the constructed servers and drives them from start to shutdown.
///
/// Every server runs in its own task. The orchestrator waits on the shutdown
/// future and on the exits reported by those tasks, then stops every server
/// that is still running. Stop failures are logged and never prevent the other
/// servers from being stopped.
pub struct Orchestrator {
    handles: Vec<ServerHandle>,
    config: LifecycleConfig,
}

impl Orchestrator {
    pub fn new(servers: Vec<(String, Arc<dyn Server>)>, config: LifecycleConfig) -> Self {
        let handles = servers
            .into_iter()
            .map(|(name, server)| ServerHandle {
                name,
                server,
                state: ServerState::Created,
                run: None,
                stop_error: None,
            })
            .collect();
        Self { handles, config }
    }

    pub fn server_names(&self) -> impl Iterator<Item = &str> {
        self.handles.iter().map(|h| h.name.as_str())
    }

    /// Start every server and supervise them until `shutdown` completes.
    ///
    /// Returns early when every run loop has returned, or, under
    /// [`StartFailurePolicy::Abort`], when one of them fails. In the abort case
    /// the remaining servers are still stopped before the error is returned.
    pub async fn run<F>(mut self, shutdown: F) -> Result<ShutdownReport, LifecycleError>
    where
        F: Future<Output = ()> + Send,
    {
        let (exit_tx, mut exit_rx) = mpsc::unbounded_channel();
        for handle in &mut self.handles {
            handle.transition(ServerState::Starting);
            spawn_supervised(handle, exit_tx.clone());
            handle.transition(ServerState::Running);
            info!(server = %handle.name, "Server started");
        }
        drop(exit_tx);

        let mut failure: Option<(String, anyhow::Error)> = None;
        tokio::pin!(shutdown);

        let cause = loop {
            tokio::select! {
                () = &mut shutdown => {
                    info!("Shutdown requested, stopping servers");
                    break ShutdownCause::Signal;
                }
                Some(exit) = exit_rx.recv(), if self.has_running() => {
                    let name = exit.name.clone();
                    if let Some(e) = self.record_exit(exit) {
                        if self.config.start_failure_policy == StartFailurePolicy::Abort {
                            failure = Some((name, e));
                            break ShutdownCause::ServerFailed;
                        }
                    }
                    if !self.has_running() {
                        info!("All servers exited");
                        break ShutdownCause::AllExited;
                    }
                }
            }
        };

        self.stop_running().await;
        self.drain(&mut exit_rx).await;

        let report = self.report(cause);
        match failure {
            Some((name, source)) => {
                error!(server = %name, "Server failed, application aborted");
                Err(LifecycleError::ServerFailed { name, source })
            }
            None => {
                info!(servers = report.servers.len(), "Shutdown complete");
                Ok(report)
            }
        }
    }

    fn has_running(&self) -> bool {
        self.handles.iter().any(|h| h.run.is_none())
    }

    /// Record a run-loop exit. Returns the error if the server failed while
    /// it was still supposed to be running.
    fn record_exit(&mut self, exit: ServerExit) -> Option<anyhow::Error> {
        let handle = self.handles.iter_mut().find(|h| h.name == exit.name)?;
        match exit.result {
            Ok(()) => {
                info!(server = %handle.name, "Server exited");
                handle.run = Some(RunOutcome::Exited);
                if handle.state == ServerState::Running {
                    handle.transition(ServerState::Stopped);
                }
                None
            }
            Err(e) => {
                handle.run = Some(RunOutcome::Failed(format!("{e:#}")));
                if handle.state == ServerState::Running {
                    error!(server = %handle.name, error = %format!("{e:#}"), "Server failed");
                    handle.transition(ServerState::Failed);
                    Some(e)
                } else {
                    warn!(server = %handle.name, error = %format!("{e:#}"), "Server returned an error while stopping");
                    None
                }
            }
        }
    }

    /// Call `stop` concurrently on every server still running.
    async fn stop_running(&mut self) {
        let stop_timeout = self.config.stop_timeout;
        let mut stops = Vec::new();
        for (index, handle) in self.handles.iter_mut().enumerate() {
            if handle.state != ServerState::Running {
                continue;
            }
            handle.transition(ServerState::Stopping);
            let server = Arc::clone(&handle.server);
            let name = handle.name.clone();
            stops.push(async move {
                info!(server = %name, "Stopping server");
                let result = match timeout(stop_timeout, server.stop()).await {
                    Ok(result) => result,
                    Err(_) => Err(anyhow::anyhow!(
                        "stop timed out after {}",
                        duration::format(stop_timeout)
                    )),
                };
                (index, result)
            });
        }

        for (index, result) in join_all(stops).await {
            let handle = &mut self.handles[index];
            match result {
                Ok(()) => {
                    info!(server = %handle.name, "Server stopped");
                    handle.transition(ServerState::Stopped);
                }
                Err(e) => {
                    warn!(server = %handle.name, error = %format!("{e:#}"), "Error stopping server");
                    handle.stop_error = Some(format!("{e:#}"));
                    handle.transition(ServerState::Failed);
                }
            }
        }
    }

    /// Wait up to the drain timeout for run loops to return.
    async fn drain(&mut self, exit_rx: &mut mpsc::UnboundedReceiver<ServerExit>) {
        let deadline = Instant::now() + self.config.drain_timeout;
        while self.has_running() {
            match timeout_at(deadline, exit_rx.recv()).await {
                Ok(Some(exit)) => {
                    self.record_exit(exit);
                }
                Ok(None) => break,
                Err(_) => {
                    for handle in self.handles.iter_mut().filter(|h| h.run.is_none()) {
                        warn!(server = %handle.name, "Server still running at shutdown");
                        handle.run = Some(RunOutcome::StillRunning);
                    }
                }
            }
        }
    }

    fn report(&self, cause: ShutdownCause) -> ShutdownReport {
        ShutdownReport {
            cause,
            servers: self
                .handles
                .iter()
                .map(|h| ServerReport {
                    name: h.name.clone(),
                    state: h.state,
                    run: h.run.clone().unwrap_or(RunOutcome::StillRunning),
                    stop_error: h.stop_error.clone(),
                })
                .collect(),
        }
    }
}

/// Run `start` in its own task and report how it ended, panics included.
fn spawn_supervised(handle: &ServerHandle, exit_tx: mpsc::UnboundedSender<ServerExit>) {
    let server = Arc::clone(&handle.server);
    let name = handle.name.clone();
    tokio::spawn(async move {
        let run = tokio::spawn(async move { server.start().await });
        let result = match run.await {
            Ok(result) => result,
            Err(e) if e.is_panic() => Err(anyhow::anyhow!(
                "server panicked: {}",
                panic_message(&*e.into_panic())
            )),
            Err(e) => Err(anyhow::anyhow!("server task cancelled: {e}")),
        };
        if exit_tx.send(ServerExit { name, result }).is_err() {
            debug!("Orchestrator gone before server exit was reported");
        }
    });
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("non-string panic payload")
}
