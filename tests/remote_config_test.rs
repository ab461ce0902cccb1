//! Integration tests for merging a remote configuration document

mod common;

use mockito::Server;
use wizapp::infrastructure::config::{ConfigLoader, Environment, LoadOptions};

use common::config_dir;

#[tokio::test]
async fn test_remote_document_overrides_profile_files() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/orders-prod.yaml")
        .with_status(200)
        .with_header("content-type", "application/x-yaml")
        .with_body("grpc:\n  port: 9443\nfeature:\n  enabled: true\n")
        .create_async()
        .await;

    let dir = config_dir(&[
        ("application.yaml", "grpc:\n  host: 0.0.0.0\n  port: 8080\n"),
        ("application-prod.yaml", "grpc:\n  port: 443\n"),
    ]);
    let env = Environment::from_pairs([
        ("ACTIVE_PROFILES", "prod".to_string()),
        ("APP_NAME", "orders".to_string()),
        ("SPRING_CLOUD_CONFIG_URI", format!("{}/", server.url())),
    ]);

    let store = ConfigLoader::new(LoadOptions {
        config_path: Some(dir.path().to_path_buf()),
        ..Default::default()
    })
    .with_environment(env)
    .load()
    .await
    .unwrap();

    mock.assert_async().await;
    assert_eq!(store.get_string("grpc.port"), "9443");
    assert_eq!(store.get_string("grpc.host"), "0.0.0.0");
    assert_eq!(store.get_string("feature.enabled"), "true");
}

#[tokio::test]
async fn test_remote_path_joins_profiles_and_uses_file_settings() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/billing-dev,eu.yaml")
        .with_status(200)
        .with_body("region: eu-west\n")
        .create_async()
        .await;

    let base = format!(
        "app_name: billing\nactive_profiles: \"dev,eu\"\nspring_cloud_config_uri: \"{}\"\nregion: local\n",
        server.url()
    );
    let dir = config_dir(&[("application.yaml", base.as_str())]);

    let store = ConfigLoader::new(LoadOptions {
        config_path: Some(dir.path().to_path_buf()),
        ..Default::default()
    })
    .with_environment(Environment::default())
    .load()
    .await
    .unwrap();

    mock.assert_async().await;
    assert_eq!(store.get_string("region"), "eu-west");
}

#[tokio::test]
async fn test_remote_server_error_keeps_local_configuration() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/app.yaml")
        .with_status(500)
        .with_body("internal error")
        .create_async()
        .await;

    let dir = config_dir(&[("application.yaml", "name: local\n")]);
    let store = ConfigLoader::new(LoadOptions {
        config_path: Some(dir.path().to_path_buf()),
        remote_uri: Some(server.url()),
        ..Default::default()
    })
    .with_environment(Environment::default())
    .load()
    .await
    .unwrap();

    mock.assert_async().await;
    assert_eq!(store.get_string("name"), "local");
}

#[tokio::test]
async fn test_unreachable_remote_keeps_local_configuration() {
    let dir = config_dir(&[(
        "application.yaml",
        "name: local\nremote_config:\n  timeout: 500ms\n",
    )]);
    let store = ConfigLoader::new(LoadOptions {
        config_path: Some(dir.path().to_path_buf()),
        remote_uri: Some("http://127.0.0.1:1".to_string()),
        ..Default::default()
    })
    .with_environment(Environment::default())
    .load()
    .await
    .unwrap();

    assert_eq!(store.get_string("name"), "local");
}

#[tokio::test]
async fn test_remote_placeholders_are_resolved() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("GET", "/app.yaml")
        .with_status(200)
        .with_body("endpoint: \"${UPSTREAM:http://localhost:9000}\"\n")
        .create_async()
        .await;

    let dir = config_dir(&[("application.yaml", "name: local\n")]);
    let store = ConfigLoader::new(LoadOptions {
        config_path: Some(dir.path().to_path_buf()),
        remote_uri: Some(server.url()),
        ..Default::default()
    })
    .with_environment(Environment::from_pairs([("UPSTREAM", "http://upstream:80")]))
    .load()
    .await
    .unwrap();

    assert_eq!(store.get_string("endpoint"), "http://upstream:80");
}
