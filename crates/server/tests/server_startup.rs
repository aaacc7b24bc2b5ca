use std::io::Write;
use std::net::TcpListener;
use std::time::Duration;

use reqwest::Client;
use tempfile::{NamedTempFile, TempDir};
use tokio::process::Command;
use tokio::time::{sleep, timeout};

/// Find an available port
fn get_available_port() -> u16 {
    TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port()
}

/// Command for the server binary with a clean LABSYNC_* environment
fn server_command() -> Command {
    let mut command = Command::new(env!("CARGO_BIN_EXE_labsync"));
    for (key, _) in std::env::vars() {
        if key.starts_with("LABSYNC_") {
            command.env_remove(key);
        }
    }
    command.env("RUST_LOG", "error").kill_on_drop(true);
    command
}

/// Command configured entirely through environment variables
fn env_configured(port: u16, db_dir: &TempDir) -> Command {
    let mut command = server_command();
    command
        .env("LABSYNC_SERVER__HOST", "127.0.0.1")
        .env("LABSYNC_SERVER__PORT", port.to_string())
        .env(
            "LABSYNC_DATABASE__PATH",
            db_dir.path().join("labsync.db").display().to_string(),
        )
        .env("LABSYNC_UPSTREAM__URL", "http://127.0.0.1:9/api")
        .env("LABSYNC_UPSTREAM__USERNAME", "svc")
        .env("LABSYNC_UPSTREAM__PASSWORD", "s3cr3t-value");
    command
}

/// Wait for server to be ready
async fn wait_for_server(port: u16, max_attempts: u32) -> bool {
    let client = Client::new();
    for _ in 0..max_attempts {
        if client
            .get(format!("http://127.0.0.1:{}/api/v1/health", port))
            .send()
            .await
            .is_ok()
        {
            return true;
        }
        sleep(Duration::from_millis(50)).await;
    }
    false
}

/// Run the binary to completion, expecting it to exit on its own
async fn run_to_exit(mut command: Command) -> std::process::Output {
    timeout(Duration::from_secs(10), command.output())
        .await
        .expect("Command timed out")
        .expect("Failed to execute command")
}

#[tokio::test]
async fn test_health_endpoint_with_env_config() {
    let port = get_available_port();
    let db_dir = TempDir::new().unwrap();

    let mut server = env_configured(port, &db_dir)
        .spawn()
        .expect("Failed to spawn server");

    assert!(
        wait_for_server(port, 100).await,
        "Server did not start in time"
    );

    let response = Client::new()
        .get(format!("http://127.0.0.1:{}/api/v1/health", port))
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());
    let json: serde_json::Value = response.json().await.expect("Failed to parse JSON");
    assert_eq!(json["status"], "ok");

    server.kill().await.ok();
}

#[tokio::test]
async fn test_config_file_with_env_override() {
    let port = get_available_port();
    let db_dir = TempDir::new().unwrap();

    let mut config_file = NamedTempFile::new().unwrap();
    write!(
        config_file,
        r#"
[server]
host = "127.0.0.1"
port = 1

[database]
path = "{}"

[upstream]
url = "http://127.0.0.1:9/api"
username = "svc"
password = "from-file"

[sync]
concurrency = 2
"#,
        db_dir.path().join("labsync.db").display()
    )
    .unwrap();
    config_file.flush().unwrap();

    let mut server = server_command()
        .env("LABSYNC_CONFIG", config_file.path())
        .env("LABSYNC_SERVER__PORT", port.to_string())
        .spawn()
        .expect("Failed to spawn server");

    assert!(
        wait_for_server(port, 100).await,
        "Server did not start in time"
    );

    let json: serde_json::Value = Client::new()
        .get(format!("http://127.0.0.1:{}/api/v1/config", port))
        .send()
        .await
        .expect("Failed to send request")
        .json()
        .await
        .expect("Failed to parse JSON");

    assert_eq!(json["server"]["port"], port);
    assert_eq!(json["sync"]["concurrency"], 2);
    assert_eq!(json["upstream"]["password_configured"], true);
    assert!(!json.to_string().contains("from-file"));

    server.kill().await.ok();
}

#[tokio::test]
async fn test_sync_against_unreachable_upstream_returns_500() {
    let port = get_available_port();
    let db_dir = TempDir::new().unwrap();

    let mut server = env_configured(port, &db_dir)
        .env("LABSYNC_UPSTREAM__TIMEOUT_SECS", "2")
        .spawn()
        .expect("Failed to spawn server");

    assert!(
        wait_for_server(port, 100).await,
        "Server did not start in time"
    );

    let response = Client::new()
        .post(format!("http://127.0.0.1:{}/api/v1/sync", port))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status().as_u16(), 500);
    assert_eq!(
        response.headers()["access-control-allow-origin"],
        "*"
    );
    let json: serde_json::Value = response.json().await.expect("Failed to parse JSON");
    assert_eq!(json["success"], false);

    server.kill().await.ok();
}

#[tokio::test]
async fn test_missing_config_file_exits_with_error() {
    let mut command = server_command();
    command.env("LABSYNC_CONFIG", "/nonexistent/config.toml");

    let result = run_to_exit(command).await;

    assert!(!result.status.success());
}

#[tokio::test]
async fn test_missing_upstream_section_exits_with_error() {
    let port = get_available_port();
    let mut command = server_command();
    command.env("LABSYNC_SERVER__PORT", port.to_string());

    let result = run_to_exit(command).await;

    assert!(!result.status.success());
}

#[tokio::test]
async fn test_empty_password_exits_with_error() {
    let port = get_available_port();
    let db_dir = TempDir::new().unwrap();
    let mut command = env_configured(port, &db_dir);
    command.env("LABSYNC_UPSTREAM__PASSWORD", "");

    let result = run_to_exit(command).await;

    assert!(!result.status.success());
}
