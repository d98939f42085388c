use std::time::Duration;

use anyhow::{Result, anyhow};
use rand::Rng as _;
use reqwest::{StatusCode, Url};
use serde_json::json;
use shelf_server::config::{Parser, ServerConfig};
use tempfile::TempDir;
use tracing::{debug, info};

pub mod rest;

fn random_port() -> Result<u16> {
    let mut rng = rand::rng();

    let mut retries = 3;
    while retries > 0 {
        let port: u16 = rng.random_range(3030..4030);
        let addr: std::net::SocketAddr = format!("127.0.0.1:{}", port).parse()?;
        match std::net::TcpStream::connect_timeout(&addr, std::time::Duration::from_millis(100)) {
            Err(e) if e.kind() == std::io::ErrorKind::ConnectionRefused => return Ok(port),
            Err(_) => retries -= 1,
            Ok(_) => retries -= 1,
        }
    }

    Err(anyhow!("Could not find a free port"))
}

pub struct ConfigGuard {
    #[allow(dead_code)]
    data_dir: TempDir,
}

/// Server configuration with fresh data directory, removed when guard is dropped
pub async fn prepare_env(test_name: &str) -> Result<(ServerConfig, ConfigGuard)> {
    let tmp_data_dir = TempDir::with_prefix(format!("{}_", test_name))?;
    let data_dir = tmp_data_dir.path().to_string_lossy().to_string();
    let port = random_port()?.to_string();
    let args = &[
        "shelf-e2e-tests",
        "--data-dir",
        &data_dir,
        "--port",
        &port,
        "--secret",
        "e2e-test-secret",
    ];
    let config = ServerConfig::try_parse_from(args)?;
    Ok((
        config,
        ConfigGuard {
            data_dir: tmp_data_dir,
        },
    ))
}

pub fn base_url(config: &ServerConfig) -> Url {
    Url::parse(&format!("http://127.0.0.1:{}/", config.port)).expect("valid base url")
}

/// Starts server in background and waits until it is healthy
pub async fn spawn_server(args: ServerConfig) -> Result<()> {
    let state = shelf_server::build_state(&args).await?;
    let url = base_url(&args).join("health")?;
    tokio::spawn(async move {
        if let Err(e) = shelf_server::run_with_state(args, state).await {
            tracing::error!("Server error: {e}");
        }
    });

    let client = reqwest::Client::new();
    for _ in 0..50 {
        match client.get(url.clone()).send().await {
            Ok(response) if response.status() == StatusCode::OK => {
                info!("Server is ready");
                return Ok(());
            }
            Ok(response) => debug!("Server not ready: {}", response.status()),
            Err(e) => debug!("Server not ready: {e}"),
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    Err(anyhow!("Server did not start"))
}

pub fn extend_url(url: &Url, segment: impl ToString) -> Url {
    let mut url = url.clone();
    url.path_segments_mut()
        .expect("base url")
        .push(&segment.to_string());
    url
}

/// Registers new user and logs them in, returns user id and bearer token
pub async fn register_and_login(
    client: &reqwest::Client,
    base_url: &Url,
    username: &str,
    password: &str,
) -> Result<(i64, String)> {
    let credentials = json!({"username": username, "password": password});
    let response = client
        .post(base_url.join("register")?)
        .json(&credentials)
        .send()
        .await?;
    if response.status() != StatusCode::OK {
        return Err(anyhow!("Registration failed: {}", response.status()));
    }
    let body: serde_json::Value = response.json().await?;
    let user_id = body["user_id"]
        .as_i64()
        .ok_or_else(|| anyhow!("Missing user_id"))?;

    let response = client
        .post(base_url.join("login")?)
        .json(&credentials)
        .send()
        .await?;
    if response.status() != StatusCode::OK {
        return Err(anyhow!("Login failed: {}", response.status()));
    }
    let body: serde_json::Value = response.json().await?;
    let token = body["token"]
        .as_str()
        .ok_or_else(|| anyhow!("Missing token"))?
        .to_string();
    Ok((user_id, token))
}

/// Starts server and returns client with bearer token of new user
pub async fn launch_env(args: ServerConfig, username: &str) -> Result<(reqwest::Client, i64)> {
    let base_url = base_url(&args);
    spawn_server(args).await?;
    let anonymous = reqwest::Client::new();
    let (user_id, token) = register_and_login(&anonymous, &base_url, username, "password").await?;

    let mut headers = reqwest::header::HeaderMap::new();
    headers.insert(
        reqwest::header::AUTHORIZATION,
        format!("Bearer {token}").parse()?,
    );
    let client = reqwest::Client::builder()
        .default_headers(headers)
        .build()?;
    Ok((client, user_id))
}
