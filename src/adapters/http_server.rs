//! HTTP server adapter.
//!
//! Serves an axum router on `http.host:http.port` until stopped. Routes are
//! contributed through [`HttpRoutes`] by the application's setup callback,
//! before the server is constructed.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, OnceLock, PoisonError};

use anyhow::Context;
use async_trait::async_trait;
use axum::Router;
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tokio::sync::watch;
use tower_http::trace::TraceLayer;
use tracing::{debug, info};

use crate::domain::ports::Server;
use crate::infrastructure::config::ConfigStore;

/// Registry name of the HTTP server.
pub const HTTP_SERVER_NAME: &str = "http";

/// Configuration key of the HTTP section.
pub const HTTP_CONFIG_KEY: &str = "http";

/// Configuration for the HTTP server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Host to bind to.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to listen on; 0 picks a free port.
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

const fn default_port() -> u16 {
    8080
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Routes shared between the setup callback and the server factory.
#[derive(Clone, Default)]
pub struct HttpRoutes {
    router: Arc<Mutex<Router>>,
}

impl HttpRoutes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge `routes` into the router served by the HTTP server.
    pub fn register(&self, routes: Router) {
        let mut router = self.router.lock().unwrap_or_else(PoisonError::into_inner);
        *router = std::mem::take(&mut *router).merge(routes);
    }

    /// Snapshot of the routes registered so far.
    pub fn router(&self) -> Router {
        self.router
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

/// Factory for the registry: builds an [`HttpServer`] from the `http` section
/// and the routes registered in `routes` at construction time.
pub fn server_factory(
    routes: HttpRoutes,
) -> impl Fn(&ConfigStore) -> anyhow::Result<Arc<dyn Server>> + Send + Sync + 'static {
    move |store| {
        let config: HttpConfig = store.unmarshal_key(HTTP_CONFIG_KEY)?;
        Ok(Arc::new(HttpServer::new(config, routes.router())) as Arc<dyn Server>)
    }
}

/// HTTP server with an idempotent, graceful stop.
pub struct HttpServer {
    config: HttpConfig,
    router: Router,
    started: AtomicBool,
    stopped: AtomicBool,
    shutdown_tx: watch::Sender<bool>,
    local_addr: OnceLock<SocketAddr>,
}

impl HttpServer {
    pub fn new(config: HttpConfig, router: Router) -> Self {
        let (shutdown_tx, _) = watch::channel(false);
        Self {
            config,
            router,
            started: AtomicBool::new(false),
            stopped: AtomicBool::new(false),
            shutdown_tx,
            local_addr: OnceLock::new(),
        }
    }

    /// Address the listener is bound to, once `start` has bound it.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr.get().copied()
    }
}

#[async_trait]
impl Server for HttpServer {
    async fn start(&self) -> anyhow::Result<()> {
        if self.started.swap(true, Ordering::SeqCst) {
            debug!("HTTP server already started");
            return Ok(());
        }

        let mut shutdown_rx = self.shutdown_tx.subscribe();
        if *shutdown_rx.borrow() {
            info!("HTTP server stopped before it started");
            return Ok(());
        }

        let addr = format!("{}:{}", self.config.host, self.config.port);
        let listener = TcpListener::bind(&addr)
            .await
            .with_context(|| format!("Failed to bind HTTP server to {addr}"))?;
        let local_addr = listener.local_addr()?;
        let _ = self.local_addr.set(local_addr);

        info!(addr = %local_addr, "HTTP server listening");

        let router = self.router.clone().layer(TraceLayer::new_for_http());
        axum::serve(listener, router)
            .with_graceful_shutdown(async move {
                let _ = shutdown_rx.wait_for(|stopped| *stopped).await;
            })
            .await
            .context("HTTP server failed")?;

        info!("HTTP server stopped");
        Ok(())
    }

    async fn stop(&self) -> anyhow::Result<()> {
        if self.stopped.swap(true, Ordering::SeqCst) {
            debug!("HTTP server already stopped");
            return Ok(());
        }
        self.shutdown_tx.send_replace(true);
        Ok(())
    }
}
