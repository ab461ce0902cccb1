//! Common test utilities for integration tests
//!
//! Provides shared fixtures and mock servers used across multiple
//! integration test files.

#![allow(dead_code)]

use std::fs;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tempfile::TempDir;
use tokio::sync::Notify;
use wizapp::Server;

/// Create a temporary directory holding the given config files
pub fn config_dir(files: &[(&str, &str)]) -> TempDir {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    for (name, content) in files {
        fs::write(dir.path().join(name), content).expect("Failed to write config file");
    }
    dir
}

/// Shared, ordered record of lifecycle calls across servers
#[derive(Clone, Default)]
pub struct EventLog(Arc<Mutex<Vec<String>>>);

impl EventLog {
    pub fn push(&self, event: impl Into<String>) {
        self.0.lock().unwrap().push(event.into());
    }

    pub fn events(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }

    pub fn contains(&self, event: &str) -> bool {
        self.events().iter().any(|e| e == event)
    }
}

/// Server that runs until stopped and records every call
pub struct RecordingServer {
    name: String,
    log: EventLog,
    fail_stop: bool,
    stopped: AtomicBool,
    stop_calls: AtomicUsize,
    stop_logic_runs: AtomicUsize,
    wake: Notify,
}

impl RecordingServer {
    fn build(name: &str, log: &EventLog, fail_stop: bool) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            log: log.clone(),
            fail_stop,
            stopped: AtomicBool::new(false),
            stop_calls: AtomicUsize::new(0),
            stop_logic_runs: AtomicUsize::new(0),
            wake: Notify::new(),
        })
    }

    pub fn new(name: &str, log: &EventLog) -> Arc<Self> {
        Self::build(name, log, false)
    }

    /// A server whose stop tears down but reports an error
    pub fn failing_stop(name: &str, log: &EventLog) -> Arc<Self> {
        Self::build(name, log, true)
    }

    pub fn stop_calls(&self) -> usize {
        self.stop_calls.load(Ordering::SeqCst)
    }

    pub fn stop_logic_runs(&self) -> usize {
        self.stop_logic_runs.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Server for RecordingServer {
    async fn start(&self) -> anyhow::Result<()> {
        self.log.push(format!("start:{}", self.name));
        self.wake.notified().await;
        self.log.push(format!("exit:{}", self.name));
        Ok(())
    }

    async fn stop(&self) -> anyhow::Result<()> {
        self.stop_calls.fetch_add(1, Ordering::SeqCst);
        if self.stopped.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        self.stop_logic_runs.fetch_add(1, Ordering::SeqCst);
        self.log.push(format!("stop:{}", self.name));
        self.wake.notify_one();
        if self.fail_stop {
            anyhow::bail!("{} refused to stop cleanly", self.name);
        }
        Ok(())
    }
}

/// Server whose run loop fails immediately
pub struct CrashingServer;

#[async_trait]
impl Server for CrashingServer {
    async fn start(&self) -> anyhow::Result<()> {
        anyhow::bail!("listener closed unexpectedly")
    }

    async fn stop(&self) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Poll `condition` until it holds or `timeout` elapses
pub async fn wait_until<F>(timeout: Duration, mut condition: F) -> bool
where
    F: FnMut() -> bool,
{
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    condition()
}
