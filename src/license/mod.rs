//! License key storage and the activation flow against the remote license server.

pub mod client;

use serde_json::{json, Value};
use sqlx::AnyConnection;
use thiserror::Error;
use tracing::info;

use crate::config::SiteConfig;
use crate::database::StoreError;
use crate::options::{OptionsStore, LICENSE_KEY, LICENSE_MESSAGE};

pub use client::{HttpLicenseClient, LicenseClient, RemoteReply};

#[derive(Debug, Error)]
pub enum LicenseError {
    #[error("License key is required.")]
    KeyRequired,

    #[error("Invalid License Key.")]
    InvalidKey,

    #[error("License key already exists.")]
    AlreadyExists,

    #[error("License key is missing.")]
    KeyMissing,

    #[error("License key already activated.")]
    AlreadyActivated,

    #[error("License key already deactivated.")]
    AlreadyDeactivated,

    #[error("Instance id is missing.")]
    MissingInstance,

    #[error("{0}")]
    Remote(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Instance name reported to the license server: the host of the site home URL
pub fn instance_name(site: &SiteConfig) -> String {
    url::Url::parse(&site.home_url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_string))
        .unwrap_or_else(|| site.home_url.clone())
}

async fn stored_message(options: &OptionsStore, conn: &mut AnyConnection) -> Result<Option<Value>, StoreError> {
    Ok(options
        .get(conn, LICENSE_MESSAGE)
        .await?
        .and_then(|raw| serde_json::from_str::<Value>(&raw).ok())
        .filter(|v| !v.is_null()))
}

fn is_activated(message: &Value) -> bool {
    match message.pointer("/data/activated").or_else(|| message.get("activated")) {
        Some(Value::Bool(b)) => *b,
        Some(Value::Null) | None => false,
        Some(_) => true,
    }
}

/// `{status, usage, limit}` summary of the stored license
pub async fn status(options: &OptionsStore, conn: &mut AnyConnection) -> Result<Value, LicenseError> {
    if options.get(conn, LICENSE_KEY).await?.is_none() {
        return Ok(json!({"status": "not found", "usage": 0, "limit": 0}));
    }
    match stored_message(options, conn).await? {
        Some(message) if is_activated(&message) => {
            let key = message
                .pointer("/data/license_key")
                .or_else(|| message.get("license_key"))
                .cloned()
                .unwrap_or(Value::Null);
            Ok(json!({
                "status": key.get("status").cloned().unwrap_or_else(|| json!("active")),
                "usage": key.get("activation_usage").cloned().unwrap_or_else(|| json!(0)),
                "limit": key.get("activation_limit").cloned().unwrap_or_else(|| json!(0)),
            }))
        }
        _ => Ok(json!({"status": "inactive", "usage": 0, "limit": 0})),
    }
}

/// Validate `key` remotely and store it
pub async fn set_key(
    options: &OptionsStore,
    conn: &mut AnyConnection,
    client: &dyn LicenseClient,
    site: &SiteConfig,
    key: &str,
) -> Result<(), LicenseError> {
    let key = key.trim();
    if key.is_empty() {
        return Err(LicenseError::KeyRequired);
    }
    if !client.validate(key, &instance_name(site)).await?.success() {
        return Err(LicenseError::InvalidKey);
    }
    if options.get(conn, LICENSE_KEY).await?.as_deref() == Some(key) {
        return Err(LicenseError::AlreadyExists);
    }
    options.set(conn, LICENSE_KEY, key).await?;
    info!("Stored a new license key");
    Ok(())
}

/// Forget the key and any activation message
pub async fn delete(options: &OptionsStore, conn: &mut AnyConnection) -> Result<(), LicenseError> {
    if !options.delete(conn, LICENSE_KEY).await? {
        return Err(LicenseError::KeyMissing);
    }
    options.delete(conn, LICENSE_MESSAGE).await?;
    Ok(())
}

pub async fn activate(
    options: &OptionsStore,
    conn: &mut AnyConnection,
    client: &dyn LicenseClient,
    site: &SiteConfig,
) -> Result<(), LicenseError> {
    let key = options.get(conn, LICENSE_KEY).await?.ok_or(LicenseError::KeyMissing)?;
    if stored_message(options, conn).await?.is_some_and(|m| is_activated(&m)) {
        return Err(LicenseError::AlreadyActivated);
    }

    let reply = client.activate(&key, &instance_name(site)).await?;
    if !matches!(reply.status, 200 | 400) || !reply.activated() {
        return Err(LicenseError::Remote("License activation was rejected.".to_string()));
    }
    // Stored in the `{data: ...}` shape the status summary reads
    let message = json!({"data": reply.body});
    options.set(conn, LICENSE_MESSAGE, &message.to_string()).await?;
    info!("License activated");
    Ok(())
}

pub async fn deactivate(
    options: &OptionsStore,
    conn: &mut AnyConnection,
    client: &dyn LicenseClient,
) -> Result<(), LicenseError> {
    let message = stored_message(options, conn).await?.ok_or(LicenseError::AlreadyDeactivated)?;
    let instance_id = match message.pointer("/data/instance/id") {
        Some(Value::String(s)) if !s.is_empty() => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => return Err(LicenseError::MissingInstance),
    };
    let key = options.get(conn, LICENSE_KEY).await?.ok_or(LicenseError::KeyMissing)?;

    let reply = client.deactivate(&key, &instance_id).await?;
    if reply.status == 200 {
        options.delete(conn, LICENSE_MESSAGE).await?;
        info!("License deactivated");
    }
    Ok(())
}


#[cfg(test)]
mod tests {
    use super::fake::FakeLicenseClient;
    use super::*;
    use crate::testing::TestContext;

    #[test]
    fn instance_name_is_home_host() {
        let mut site = crate::config::AppConfig::development().site;
        site.home_url = "https://boards.example.com/sub".to_string();
        assert_eq!(instance_name(&site), "boards.example.com");
    }

    #[tokio::test]
    async fn full_activation_cycle() {
        let ctx = TestContext::new().await.unwrap();
        let options = OptionsStore::new(&ctx.db);
        let client = FakeLicenseClient::default();
        let site = &ctx.config.site;
        let mut conn = ctx.db.pool().acquire().await.unwrap();

        assert_eq!(status(&options, &mut conn).await.unwrap()["status"], "not found");
        assert!(matches!(set_key(&options, &mut conn, &client, site, " ").await, Err(LicenseError::KeyRequired)));
        assert!(matches!(set_key(&options, &mut conn, &client, site, "nope").await, Err(LicenseError::InvalidKey)));

        set_key(&options, &mut conn, &client, site, "good-key").await.unwrap();
        assert!(matches!(
            set_key(&options, &mut conn, &client, site, "good-key").await,
            Err(LicenseError::AlreadyExists)
        ));
        assert_eq!(status(&options, &mut conn).await.unwrap()["status"], "inactive");

        activate(&options, &mut conn, &client, site).await.unwrap();
        let summary = status(&options, &mut conn).await.unwrap();
        assert_eq!(summary["status"], "active");
        assert_eq!(summary["usage"], 1);
        assert_eq!(summary["limit"], 3);
        assert!(matches!(
            activate(&options, &mut conn, &client, site).await,
            Err(LicenseError::AlreadyActivated)
        ));

        deactivate(&options, &mut conn, &client).await.unwrap();
        assert_eq!(status(&options, &mut conn).await.unwrap()["status"], "inactive");
        assert!(matches!(deactivate(&options, &mut conn, &client).await, Err(LicenseError::AlreadyDeactivated)));

        delete(&options, &mut conn).await.unwrap();
        assert!(matches!(delete(&options, &mut conn).await, Err(LicenseError::KeyMissing)));
    }
}
