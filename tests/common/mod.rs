#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::OnceLock;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use reqwest::StatusCode;
use serde_json::{json, Value};
use tempfile::TempDir;

use wardrobe_auth::config::AppConfig;
use wardrobe_auth::{app, AppState};

static SERVER: OnceLock<TestServer> = OnceLock::new();
static NAMES: AtomicUsize = AtomicUsize::new(0);

pub struct TestServer {
    pub base_url: String,
    pub data_dir: TempDir,
}

impl TestServer {
    /// Serve the real router on an ephemeral port from a dedicated thread,
    /// with file storage in a fresh temp directory.
    pub fn start(configure: impl FnOnce(&mut AppConfig)) -> Result<Self> {
        let data_dir = tempfile::tempdir().context("failed to create data dir")?;

        let mut config = AppConfig::development();
        config.storage.database_url = None;
        config.storage.data_dir = data_dir.path().to_path_buf();
        config.api.enable_rate_limiting = false;
        config.api.enable_request_logging = false;
        config.security.password_memory_kib = 8 * 1024;
        config.security.password_iterations = 1;
        configure(&mut config);

        let listener = std::net::TcpListener::bind("127.0.0.1:0").context("failed to bind test port")?;
        listener.set_nonblocking(true)?;
        let addr = listener.local_addr()?;

        // The server outlives any single #[tokio::test] runtime
        std::thread::spawn(move || {
            let runtime = tokio::runtime::Builder::new_multi_thread()
                .worker_threads(2)
                .enable_all()
                .build()
                .expect("failed to build server runtime");

            runtime.block_on(async move {
                let state = AppState::from_config(&config).await.expect("failed to build app state");
                let router = app(state, &config);
                let listener = tokio::net::TcpListener::from_std(listener).expect("failed to adopt listener");
                axum::serve(listener, router.into_make_service_with_connect_info::<SocketAddr>())
                    .await
                    .expect("server exited");
            });
        });

        Ok(Self {
            base_url: format!("http://{}", addr),
            data_dir,
        })
    }

    pub async fn wait_ready(&self, timeout: Duration) -> Result<()> {
        let client = reqwest::Client::new();
        let deadline = Instant::now() + timeout;
        loop {
            if Instant::now() > deadline {
                break;
            }
            let url = format!("{}/health", self.base_url);
            if let Ok(resp) = client.get(&url).send().await {
                if resp.status() == StatusCode::OK {
                    return Ok(());
                }
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        anyhow::bail!("server did not become ready on {} within {:?}", self.base_url, timeout)
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

/// Shared server for a test binary, rate limiting off.
pub async fn ensure_server() -> Result<&'static TestServer> {
    let server = SERVER.get_or_init(|| TestServer::start(|_| {}).expect("failed to start test server"));
    server.wait_ready(Duration::from_secs(10)).await?;
    Ok(server)
}

/// A username no other test in this binary uses.
pub fn unique_name(prefix: &str) -> String {
    format!("{}{}", prefix, NAMES.fetch_add(1, Ordering::SeqCst))
}

/// Register through the API; returns (token, user).
pub async fn register(server: &TestServer, username: &str, password: &str) -> Result<(String, Value)> {
    let res = reqwest::Client::new()
        .post(server.url("/api/auth/register"))
        .json(&json!({ "username": username, "password": password }))
        .send()
        .await?;
    anyhow::ensure!(res.status() == StatusCode::CREATED, "register failed: {}", res.status());

    let body: Value = res.json().await?;
    let token = body["token"].as_str().context("missing token")?.to_string();
    Ok((token, body["user"].clone()))
}

pub async fn login(server: &TestServer, username: &str, password: &str) -> Result<reqwest::Response> {
    Ok(reqwest::Client::new()
        .post(server.url("/api/auth/login"))
        .json(&json!({ "username": username, "password": password }))
        .send()
        .await?)
}
