//! Integration tests for server registration, startup and graceful shutdown

mod common;

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use clap::{ArgMatches, Command};
use tokio::sync::oneshot;
use tokio_test::{assert_err, assert_ok};
use wizapp::adapters::http_server::{HttpConfig, HttpServer};
use wizapp::application::{BootstrapError, ShutdownCause};
use wizapp::{
    Application, Component, ConfigStore, LifecycleConfig, LifecycleError, Orchestrator,
    RegistryError, Server, ServerState,
};

use common::{wait_until, CrashingServer, EventLog, RecordingServer};

fn quick_lifecycle() -> LifecycleConfig {
    LifecycleConfig {
        stop_timeout: Duration::from_secs(2),
        drain_timeout: Duration::from_secs(2),
        ..Default::default()
    }
}

fn test_store() -> ConfigStore {
    ConfigStore::from_yaml_str("lifecycle:\n  stop_timeout: 2s\n  drain_timeout: 2s\n").unwrap()
}

#[tokio::test]
async fn test_shutdown_stops_every_running_server() {
    let log = EventLog::default();
    let servers: Vec<Arc<RecordingServer>> = ["grpc", "http", "worker"]
        .iter()
        .map(|name| RecordingServer::new(name, &log))
        .collect();
    let orchestrator = Orchestrator::new(
        ["grpc", "http", "worker"]
            .iter()
            .zip(&servers)
            .map(|(name, s)| (name.to_string(), Arc::clone(s) as Arc<dyn Server>))
            .collect(),
        quick_lifecycle(),
    );

    let (tx, rx) = oneshot::channel::<()>();
    let run = tokio::spawn(orchestrator.run(async move {
        let _ = rx.await;
    }));

    let started = {
        let log = log.clone();
        wait_until(Duration::from_secs(2), move || {
            ["grpc", "http", "worker"]
                .iter()
                .all(|name| log.contains(&format!("start:{name}")))
        })
        .await
    };
    assert!(started, "servers did not start: {:?}", log.events());

    tx.send(()).unwrap();
    let report = run.await.unwrap().unwrap();

    assert_eq!(report.cause, ShutdownCause::Signal);
    assert!(report.is_clean(), "{report:?}");
    for server in &servers {
        assert_eq!(server.stop_calls(), 1);
    }
    for name in ["grpc", "http", "worker"] {
        assert!(log.contains(&format!("stop:{name}")));
        assert!(log.contains(&format!("exit:{name}")));
        assert_eq!(report.get(name).unwrap().state, ServerState::Stopped);
    }
}

#[tokio::test]
async fn test_failing_stop_does_not_block_other_servers() {
    let log = EventLog::default();
    let bad = RecordingServer::failing_stop("bad", &log);
    let good = RecordingServer::new("good", &log);
    let orchestrator = Orchestrator::new(
        vec![
            ("bad".to_string(), Arc::clone(&bad) as Arc<dyn Server>),
            ("good".to_string(), Arc::clone(&good) as Arc<dyn Server>),
        ],
        quick_lifecycle(),
    );

    let report = orchestrator
        .run(tokio::time::sleep(Duration::from_millis(50)))
        .await
        .unwrap();

    assert_eq!(bad.stop_calls(), 1);
    assert_eq!(good.stop_calls(), 1);
    let bad_report = report.get("bad").unwrap();
    assert_eq!(bad_report.state, ServerState::Failed);
    assert!(bad_report.stop_error.as_deref().unwrap().contains("refused"));
    assert_eq!(report.get("good").unwrap().state, ServerState::Stopped);
    assert!(!report.is_clean());
}

#[tokio::test]
async fn test_crashing_server_aborts_and_stops_the_rest() {
    let log = EventLog::default();
    let survivor = RecordingServer::new("survivor", &log);
    let orchestrator = Orchestrator::new(
        vec![
            ("crash".to_string(), Arc::new(CrashingServer) as Arc<dyn Server>),
            ("survivor".to_string(), Arc::clone(&survivor) as Arc<dyn Server>),
        ],
        quick_lifecycle(),
    );

    let err = assert_err!(orchestrator.run(std::future::pending::<()>()).await);

    assert!(matches!(err, LifecycleError::ServerFailed { ref name, .. } if name == "crash"));
    assert_eq!(survivor.stop_calls(), 1);
}

#[test]
fn test_duplicate_server_registration_is_rejected() {
    let mut app = Application::new("dup");
    let log = EventLog::default();
    let first = RecordingServer::new("a", &log);
    app.register_server("grpc", move |_| Ok(Arc::clone(&first) as Arc<dyn Server>))
        .unwrap();

    let err = app
        .register_server("grpc", |_| anyhow::bail!("never built"))
        .unwrap_err();
    assert!(matches!(err, RegistryError::DuplicateServer(ref name) if name == "grpc"));
    assert!(log.events().is_empty());
}

#[tokio::test]
async fn test_factory_error_aborts_before_any_server_starts() {
    let log = EventLog::default();
    let mut app = Application::new("broken")
        .with_config(test_store())
        .with_shutdown(std::future::pending());

    let healthy = RecordingServer::new("healthy", &log);
    app.register_server("a-healthy", move |_| {
        Ok(Arc::clone(&healthy) as Arc<dyn Server>)
    })
    .unwrap();
    app.register_server("b-broken", |_| anyhow::bail!("missing listener address"))
        .unwrap();

    let err = app.run(["broken", "start"], |_| Ok(())).await.unwrap_err();

    assert_eq!(err.unit_name(), Some("b-broken"));
    assert!(log.events().is_empty(), "{:?}", log.events());
}

#[tokio::test]
async fn test_disabled_server_is_never_constructed() {
    let log = EventLog::default();
    let built = Arc::new(AtomicUsize::new(0));
    let mut app = Application::new("svc")
        .with_config(test_store())
        .with_shutdown(tokio::time::sleep(Duration::from_millis(50)));

    let kept = RecordingServer::new("kept", &log);
    let kept_for_factory = Arc::clone(&kept);
    app.register_server("kept", move |_| {
        Ok(Arc::clone(&kept_for_factory) as Arc<dyn Server>)
    })
    .unwrap();
    let counter = Arc::clone(&built);
    app.register_server("skipped", move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
        anyhow::bail!("should not be built")
    })
    .unwrap();

    app.run(["svc", "start", "--disable-skipped"], |_| Ok(()))
        .await
        .unwrap();

    assert_eq!(built.load(Ordering::SeqCst), 0);
    assert_eq!(kept.stop_calls(), 1);
    assert!(log.contains("start:kept"));
}

#[tokio::test]
async fn test_setup_runs_before_server_factories() {
    let log = EventLog::default();
    let mut app = Application::new("ordered")
        .with_config(test_store())
        .with_shutdown(tokio::time::sleep(Duration::from_millis(20)));

    let factory_log = log.clone();
    let server = RecordingServer::new("srv", &log);
    app.register_server("srv", move |_| {
        factory_log.push("factory");
        Ok(Arc::clone(&server) as Arc<dyn Server>)
    })
    .unwrap();

    let setup_log = log.clone();
    app.run(["ordered", "start"], move |_| {
        setup_log.push("setup");
        Ok(())
    })
    .await
    .unwrap();

    let events = log.events();
    assert_eq!(&events[..2], ["setup", "factory"]);
}

#[tokio::test]
async fn test_setup_error_prevents_start() {
    let log = EventLog::default();
    let mut app = Application::new("nosetup").with_config(test_store());
    let server = RecordingServer::new("srv", &log);
    app.register_server("srv", move |_| Ok(Arc::clone(&server) as Arc<dyn Server>))
        .unwrap();

    let err = app
        .run(["nosetup", "start"], |_| anyhow::bail!("no routes"))
        .await
        .unwrap_err();

    assert!(matches!(err, BootstrapError::Lifecycle(LifecycleError::Setup(_))));
    assert!(log.events().is_empty());
}

struct EchoComponent {
    ran: Arc<AtomicBool>,
}

#[async_trait]
impl Component for EchoComponent {
    fn command(&self) -> Command {
        Command::new("echo").arg(clap::Arg::new("word").required(true))
    }

    async fn execute(&self, matches: &ArgMatches) -> anyhow::Result<()> {
        let word = matches.get_one::<String>("word").map(String::as_str);
        anyhow::ensure!(word == Some("hello"), "unexpected word {word:?}");
        self.ran.store(true, Ordering::SeqCst);
        Ok(())
    }
}

#[tokio::test]
async fn test_component_command_dispatch() {
    let ran = Arc::new(AtomicBool::new(false));
    let mut app = Application::new("tools").with_config(test_store());
    let flag = Arc::clone(&ran);
    app.register_component("echo", move |_| {
        Ok(Arc::new(EchoComponent {
            ran: Arc::clone(&flag),
        }) as Arc<dyn Component>)
    })
    .unwrap();

    app.run(["tools", "echo", "hello"], |_| {
        anyhow::bail!("setup is only for start")
    })
    .await
    .unwrap();

    assert!(ran.load(Ordering::SeqCst));
}

#[tokio::test]
async fn test_unknown_sub_command_is_a_cli_error() {
    let app = Application::new("tools").with_config(test_store());
    let err = app.run(["tools", "bogus"], |_| Ok(())).await.unwrap_err();

    assert!(matches!(err, BootstrapError::Cli(_)));
    assert_ne!(err.exit_code(), 0);
}

#[tokio::test]
async fn test_http_server_stop_is_idempotent() {
    let server = Arc::new(HttpServer::new(
        HttpConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
        },
        axum::Router::new(),
    ));

    let runner = {
        let server = Arc::clone(&server);
        tokio::spawn(async move { server.start().await })
    };
    let bound = {
        let server = Arc::clone(&server);
        wait_until(Duration::from_secs(2), move || server.local_addr().is_some()).await
    };
    assert!(bound);

    assert_ok!(server.stop().await);
    assert_ok!(server.stop().await);
    let finished = tokio::time::timeout(Duration::from_secs(2), runner).await;
    assert_ok!(finished.unwrap().unwrap());
}

struct CountingComponent {
    command_builds: Arc<AtomicUsize>,
    ran: Arc<AtomicBool>,
}

#[async_trait]
impl Component for CountingComponent {
    fn command(&self) -> Command {
        self.command_builds.fetch_add(1, Ordering::SeqCst);
        Command::new("report")
    }

    async fn execute(&self, _matches: &ArgMatches) -> anyhow::Result<()> {
        self.ran.store(true, Ordering::SeqCst);
        Ok(())
    }
}

#[tokio::test]
async fn test_component_dispatch_uses_command_name() {
    let builds = Arc::new(AtomicUsize::new(0));
    let ran = Arc::new(AtomicBool::new(false));
    let mut app = Application::new("tools").with_config(test_store());
    let (factory_builds, factory_ran) = (Arc::clone(&builds), Arc::clone(&ran));
    app.register_component("reporting", move |_| {
        Ok(Arc::new(CountingComponent {
            command_builds: Arc::clone(&factory_builds),
            ran: Arc::clone(&factory_ran),
        }) as Arc<dyn Component>)
    })
    .unwrap();

    app.run(["tools", "report"], |_| Ok(())).await.unwrap();

    assert!(ran.load(Ordering::SeqCst));
    assert_eq!(builds.load(Ordering::SeqCst), 1);
}
