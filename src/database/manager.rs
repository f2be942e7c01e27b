use sqlx::any::AnyPoolOptions;
use sqlx::AnyPool;
use std::time::Duration;
use thiserror::Error;
use tracing::info;

use crate::config::DatabaseConfig;
use crate::database::schema::Entity;
use crate::database::store::StoreError;

/// Errors from Database
#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("Missing configuration: {0}")]
    ConfigMissing(&'static str),

    #[error("Unsupported database URL: {0}")]
    UnsupportedUrl(String),

    #[error("Invalid identifier: {0}")]
    InvalidIdentifier(String),

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// SQL flavour behind the `Any` pool
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    Postgres,
    Sqlite,
}

impl Dialect {
    pub fn from_url(url: &str) -> Result<Self, DatabaseError> {
        if url.starts_with("postgres://") || url.starts_with("postgresql://") {
            Ok(Dialect::Postgres)
        } else if url.starts_with("sqlite:") {
            Ok(Dialect::Sqlite)
        } else {
            Err(DatabaseError::UnsupportedUrl(url.to_string()))
        }
    }

    /// Column definition for an auto-increment 64-bit primary key
    pub fn serial_primary_key(&self) -> &'static str {
        match self {
            Dialect::Postgres => "BIGSERIAL PRIMARY KEY",
            Dialect::Sqlite => "INTEGER PRIMARY KEY AUTOINCREMENT",
        }
    }
}

/// Shared connection pool plus the table prefix every logical name is resolved against
#[derive(Debug, Clone)]
pub struct Database {
    pool: AnyPool,
    dialect: Dialect,
    prefix: String,
}

impl Database {
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, DatabaseError> {
        if config.url.is_empty() {
            return Err(DatabaseError::ConfigMissing("DATABASE_URL"));
        }
        if !Self::is_valid_prefix(&config.table_prefix) {
            return Err(DatabaseError::InvalidIdentifier(config.table_prefix.clone()));
        }
        let dialect = Dialect::from_url(&config.url)?;
        sqlx::any::install_default_drivers();

        let mut options = AnyPoolOptions::new()
            .max_connections(config.max_connections.max(1))
            .acquire_timeout(Duration::from_secs(config.connection_timeout));

        // An in-memory SQLite database lives and dies with its one connection
        if Self::is_memory_url(&config.url) {
            options = options
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None);
        }

        let pool = options.connect(&config.url).await?;
        info!("Created {:?} database pool (prefix {:?})", dialect, config.table_prefix);

        Ok(Self {
            pool,
            dialect,
            prefix: config.table_prefix.clone(),
        })
    }

    pub fn pool(&self) -> &AnyPool {
        &self.pool
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Physical table name of a fixed entity table
    pub fn table(&self, entity: Entity) -> String {
        entity.schema().table_name(&self.prefix)
    }

    /// Pings the pool to ensure connectivity
    pub async fn health_check(&self) -> Result<(), DatabaseError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    pub async fn close(&self) {
        self.pool.close().await;
        info!("Closed database pool");
    }

    /// Quote SQL identifier to prevent injection
    pub fn quote_identifier(name: &str) -> String {
        format!("\"{}\"", name.replace('"', "\"\""))
    }

    fn is_memory_url(url: &str) -> bool {
        url.starts_with("sqlite:") && (url.contains(":memory:") || url.contains("mode=memory"))
    }

    /// Prefixes are pasted in front of identifiers, so they may only hold [A-Za-z0-9_].
    fn is_valid_prefix(prefix: &str) -> bool {
        prefix.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
            && !prefix.starts_with(|c: char| c.is_ascii_digit())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_dialect_from_url() {
        assert_eq!(Dialect::from_url("postgres://u:p@localhost/nakama").unwrap(), Dialect::Postgres);
        assert_eq!(Dialect::from_url("sqlite::memory:").unwrap(), Dialect::Sqlite);
        assert!(matches!(Dialect::from_url("mysql://localhost/x"), Err(DatabaseError::UnsupportedUrl(_))));
    }

    #[test]
    fn validates_prefixes() {
        assert!(Database::is_valid_prefix("wp_"));
        assert!(Database::is_valid_prefix(""));
        assert!(!Database::is_valid_prefix("wp-"));
        assert!(!Database::is_valid_prefix("1wp_"));
        assert!(!Database::is_valid_prefix("wp_\"; DROP"));
    }

    #[test]
    fn recognises_memory_urls() {
        assert!(Database::is_memory_url("sqlite::memory:"));
        assert!(Database::is_memory_url("sqlite://file?mode=memory&cache=shared"));
        assert!(!Database::is_memory_url("sqlite://nakama.db"));
    }

    #[test]
    fn quotes_identifiers() {
        assert_eq!(Database::quote_identifier("wp_cards"), "\"wp_cards\"");
        assert_eq!(Database::quote_identifier("a\"b"), "\"a\"\"b\"");
    }

    #[tokio::test]
    async fn connects_to_in_memory_sqlite() {
        let config = DatabaseConfig {
            url: "sqlite::memory:".to_string(),
            max_connections: 4,
            connection_timeout: 5,
            table_prefix: "wp_".to_string(),
            enable_query_logging: false,
        };
        let db = Database::connect(&config).await.unwrap();
        assert_eq!(db.dialect(), Dialect::Sqlite);
        assert_eq!(db.table(Entity::Board), "wp_wpnakama_boards");
        db.health_check().await.unwrap();
    }
}
