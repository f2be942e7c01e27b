use std::sync::Arc;

use crate::config::AppConfig;
use crate::database::{install, Database};

/// In-memory database with the full schema installed
pub struct TestContext {
    pub db: Database,
    pub config: Arc<AppConfig>,
}

impl TestContext {
    pub async fn new() -> anyhow::Result<Self> {
        Self::with_config(Self::memory_config()).await
    }

    pub async fn with_config(config: AppConfig) -> anyhow::Result<Self> {
        let db = Database::connect(&config.database)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to open test database: {}", e))?;
        install::install(&db)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to install test schema: {}", e))?;

        Ok(Self { db, config: Arc::new(config) })
    }

    /// Development profile pointed at a private in-memory database
    pub fn memory_config() -> AppConfig {
        let mut config = AppConfig::development();
        config.database.url = "sqlite::memory:".to_string();
        config
    }
}
