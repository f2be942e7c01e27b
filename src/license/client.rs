use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{info, warn};

use super::LicenseError;
use crate::config::LicenseConfig;

/// Status code and decoded JSON body returned by the license server
#[derive(Debug, Clone)]
pub struct RemoteReply {
    pub status: u16,
    pub body: Value,
}

impl RemoteReply {
    pub fn success(&self) -> bool {
        self.body.get("success").and_then(Value::as_bool).unwrap_or(false)
    }

    pub fn activated(&self) -> bool {
        self.body.get("activated").and_then(Value::as_bool).unwrap_or(false)
    }
}

/// Remote license server operations
#[async_trait]
pub trait LicenseClient: Send + Sync {
    async fn validate(&self, key: &str, instance_name: &str) -> Result<RemoteReply, LicenseError>;

    async fn activate(&self, key: &str, instance_name: &str) -> Result<RemoteReply, LicenseError>;

    async fn deactivate(&self, key: &str, instance_id: &str) -> Result<RemoteReply, LicenseError>;
}

/// `LicenseClient` talking to the license server over HTTPS
pub struct HttpLicenseClient {
    client: reqwest::Client,
    base_url: String,
}

impl HttpLicenseClient {
    pub fn new(config: &LicenseConfig) -> Result<Self, LicenseError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| LicenseError::Remote(e.to_string()))?;
        Ok(Self {
            client,
            base_url: config.server_url.trim_end_matches('/').to_string(),
        })
    }

    async fn get(&self, action: &str, params: &[(&str, &str)]) -> Result<RemoteReply, LicenseError> {
        let url = url::Url::parse_with_params(&format!("{}/{}", self.base_url, action), params)
            .map_err(|e| LicenseError::Remote(format!("Invalid license server URL: {}", e)))?;

        info!("License server request: {}", action);
        let response = self.client.get(url).send().await.map_err(|e| {
            warn!("License server unreachable: {}", e);
            LicenseError::Remote("License server is unreachable.".to_string())
        })?;

        let status = response.status().as_u16();
        let body = response.json::<Value>().await.map_err(|e| {
            warn!("License server sent an unreadable body: {}", e);
            LicenseError::Remote("License server sent an invalid response.".to_string())
        })?;
        Ok(RemoteReply { status, body })
    }
}

#[async_trait]
impl LicenseClient for HttpLicenseClient {
    async fn validate(&self, key: &str, instance_name: &str) -> Result<RemoteReply, LicenseError> {
        self.get("update", &[("license_key", key), ("instance_name", instance_name)]).await
    }

    async fn activate(&self, key: &str, instance_name: &str) -> Result<RemoteReply, LicenseError> {
        self.get("activate", &[("license_key", key), ("instance_name", instance_name)]).await
    }

    async fn deactivate(&self, key: &str, instance_id: &str) -> Result<RemoteReply, LicenseError> {
        self.get("deactivate", &[("license_key", key), ("instance_id", instance_id)]).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::Query;
    use axum::routing::get;
    use axum::{Json, Router};
    use serde_json::json;
    use std::collections::HashMap;

    async fn spawn_license_server() -> String {
        let app = Router::new()
            .route(
                "/update",
                get(|Query(q): Query<HashMap<String, String>>| async move {
                    Json(json!({"success": q.get("license_key").map(String::as_str) == Some("good")}))
                }),
            )
            .route(
                "/activate",
                get(|Query(q): Query<HashMap<String, String>>| async move {
                    Json(json!({
                        "activated": true,
                        "instance": {"id": 42, "name": q.get("instance_name").cloned().unwrap_or_default()},
                    }))
                }),
            )
            .route("/deactivate", get(|| async { Json(json!({"deactivated": true})) }));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }

    fn client_for(base_url: String) -> HttpLicenseClient {
        HttpLicenseClient::new(&LicenseConfig { server_url: base_url, timeout_secs: 5 }).unwrap()
    }

    #[tokio::test]
    async fn validates_against_update_endpoint() {
        let client = client_for(spawn_license_server().await);
        assert!(client.validate("good", "localhost").await.unwrap().success());
        assert!(!client.validate("bad", "localhost").await.unwrap().success());
    }

    #[tokio::test]
    async fn activation_reports_instance() {
        let client = client_for(spawn_license_server().await);
        let reply = client.activate("good", "example.com").await.unwrap();
        assert_eq!(reply.status, 200);
        assert!(reply.activated());
        assert_eq!(reply.body["instance"]["name"], "example.com");
    }

    #[tokio::test]
    async fn unreachable_server_is_remote_error() {
        let port = portpicker::pick_unused_port().unwrap();
        let client = client_for(format!("http://127.0.0.1:{}", port));
        assert!(matches!(client.validate("good", "x").await, Err(LicenseError::Remote(_))));
    }
}
