#![allow(dead_code)]

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{header::HeaderMap, Method, StatusCode};
use serde_json::{json, Value};

use nakama_api::auth::{issue_nonce, Capability, NONCE_HEADER};
use nakama_api::config::AppConfig;
use nakama_api::database::{install, Database};
use nakama_api::license::{LicenseClient, LicenseError, RemoteReply};
use nakama_api::state::AppState;

pub const GOOD_KEY: &str = "good-key";

/// License server stand-in: accepts `GOOD_KEY` only
pub struct FakeLicenseClient;

#[async_trait]
impl LicenseClient for FakeLicenseClient {
    async fn validate(&self, key: &str, _instance_name: &str) -> Result<RemoteReply, LicenseError> {
        Ok(RemoteReply { status: 200, body: json!({ "success": key == GOOD_KEY }) })
    }

    async fn activate(&self, key: &str, _instance_name: &str) -> Result<RemoteReply, LicenseError> {
        let ok = key == GOOD_KEY;
        Ok(RemoteReply {
            status: if ok { 200 } else { 400 },
            body: json!({
                "activated": ok,
                "instance": { "id": 7 },
                "license_key": { "status": "active", "activation_usage": 2, "activation_limit": 5 },
            }),
        })
    }

    async fn deactivate(&self, _key: &str, _instance_id: &str) -> Result<RemoteReply, LicenseError> {
        Ok(RemoteReply { status: 200, body: json!({ "deactivated": true }) })
    }
}

/// Response status, headers and JSON body (null when the body is not JSON)
pub struct Reply {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

impl Reply {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

/// The app served in-process over its own in-memory database
pub struct TestServer {
    pub port: u16,
    pub base_url: String,
    pub config: Arc<AppConfig>,
    client: reqwest::Client,
}

impl TestServer {
    pub async fn start() -> Result<Self> {
        let mut config = AppConfig::development();
        config.database.url = "sqlite::memory:".to_string();
        config.database.enable_query_logging = false;
        Self::start_with(config).await
    }

    pub async fn start_with(config: AppConfig) -> Result<Self> {
        let db = Database::connect(&config.database).await.context("failed to open database")?;
        install::install(&db).await.context("failed to install schema")?;

        // Pick an unused port for isolation
        let port = portpicker::pick_unused_port().context("failed to pick free port")?;
        let base_url = format!("http://127.0.0.1:{}", port);
        let listener = tokio::net::TcpListener::bind(("127.0.0.1", port))
            .await
            .context("failed to bind test port")?;

        let config = Arc::new(config);
        let state = AppState::new(db, config.clone(), Arc::new(FakeLicenseClient));
        tokio::spawn(async move {
            let _ = axum::serve(listener, nakama_api::app(state)).await;
        });

        let server = Self { port, base_url, config, client: reqwest::Client::new() };
        server.wait_ready(Duration::from_secs(10)).await?;
        Ok(server)
    }

    async fn wait_ready(&self, timeout: Duration) -> Result<()> {
        let deadline = Instant::now() + timeout;
        while Instant::now() < deadline {
            if let Ok(resp) = self.client.get(format!("{}/health", self.base_url)).send().await {
                if resp.status() == StatusCode::OK {
                    return Ok(());
                }
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        anyhow::bail!("server did not become ready on {} within {:?}", self.base_url, timeout)
    }

    /// URL of a namespaced route, e.g. `api("boards/1")`
    pub fn api(&self, path: &str) -> String {
        format!("{}{}/{}", self.base_url, self.config.route_base(), path)
    }

    pub fn nonce(&self, caps: &[Capability]) -> Result<String> {
        Ok(issue_nonce(&self.config.security, 1, caps)?)
    }

    /// Nonce carrying every capability
    pub fn editor(&self) -> Result<String> {
        self.nonce(&[Capability::EditPosts, Capability::DeletePosts])
    }

    pub async fn call(&self, method: Method, url: &str, token: Option<&str>, body: Option<Value>) -> Result<Reply> {
        let mut request = self.client.request(method, url);
        if let Some(token) = token {
            request = request.header(NONCE_HEADER, token);
        }
        if let Some(body) = body {
            request = request.json(&body);
        }
        let response = request.send().await?;
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = response.bytes().await?;
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        Ok(Reply { status, headers, body })
    }

    pub async fn get(&self, path: &str) -> Result<Reply> {
        self.call(Method::GET, &self.api(path), None, None).await
    }

    /// Authorized write with every capability
    pub async fn write(&self, method: Method, path: &str, body: Value) -> Result<Reply> {
        let token = self.editor()?;
        self.call(method, &self.api(path), Some(&token), Some(body)).await
    }

    /// Create a board and return its id
    pub async fn create_board(&self, title: &str) -> Result<i64> {
        let reply = self.write(Method::POST, "boards", json!({ "title": title })).await?;
        anyhow::ensure!(reply.status == StatusCode::OK, "board create failed: {}", reply.body);
        reply.body["data"]["board_id"].as_i64().context("missing board_id")
    }

    /// Create a board with a registered card table
    pub async fn create_card_board(&self, title: &str) -> Result<i64> {
        let board_id = self.create_board(title).await?;
        let reply = self.write(Method::POST, &format!("boardTable/{}", board_id), json!({})).await?;
        anyhow::ensure!(reply.status == StatusCode::OK, "table create failed: {}", reply.body);
        Ok(board_id)
    }

    pub async fn create_card(&self, board_id: i64, fields: Value) -> Result<i64> {
        let mut body = fields;
        body["board_id"] = json!(board_id);
        let reply = self.write(Method::POST, "cards", body).await?;
        anyhow::ensure!(reply.status == StatusCode::OK, "card create failed: {}", reply.body);
        reply.body["data"]["card_id"].as_i64().context("missing card_id")
    }
}
