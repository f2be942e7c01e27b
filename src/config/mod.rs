use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub database: DatabaseConfig,
    pub api: ApiConfig,
    pub site: SiteConfig,
    pub security: SecurityConfig,
    pub license: LicenseConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub connection_timeout: u64,
    /// Prepended to every logical table name, e.g. `wp_` + `wpnakama_boards`.
    pub table_prefix: String,
    pub enable_query_logging: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub namespace: String,
    pub version: String,
    pub port: u16,
    pub default_per_page: i64,
    pub max_per_page: i64,
    pub max_request_size_bytes: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteConfig {
    pub home_url: String,
    pub blogname: String,
    pub pretty_permalinks: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    pub enable_cors: bool,
    pub cors_origins: Vec<String>,
    pub nonce_secret: String,
    pub nonce_expiry_hours: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LicenseConfig {
    pub server_url: String,
    pub timeout_secs: u64,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let environment = match env::var("APP_ENV").as_deref() {
            Ok("production") | Ok("prod") => Environment::Production,
            Ok("staging") | Ok("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        // Set defaults based on environment, then override with specific env vars
        match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Development => Self::development(),
        }
        .with_env_overrides()
    }

    fn with_env_overrides(mut self) -> Self {
        // Database overrides
        if let Ok(v) = env::var("DATABASE_URL") {
            self.database.url = v;
        }
        if let Ok(v) = env::var("DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = v.parse().unwrap_or(self.database.max_connections);
        }
        if let Ok(v) = env::var("DATABASE_CONNECTION_TIMEOUT") {
            self.database.connection_timeout = v.parse().unwrap_or(self.database.connection_timeout);
        }
        if let Ok(v) = env::var("DATABASE_TABLE_PREFIX") {
            self.database.table_prefix = v;
        }
        if let Ok(v) = env::var("DATABASE_ENABLE_QUERY_LOGGING") {
            self.database.enable_query_logging = v.parse().unwrap_or(self.database.enable_query_logging);
        }

        // API overrides
        if let Ok(v) = env::var("API_NAMESPACE") {
            self.api.namespace = v;
        }
        if let Ok(v) = env::var("NAKAMA_API_PORT").or_else(|_| env::var("PORT")) {
            self.api.port = v.parse().unwrap_or(self.api.port);
        }
        if let Ok(v) = env::var("API_DEFAULT_PER_PAGE") {
            self.api.default_per_page = v.parse().unwrap_or(self.api.default_per_page);
        }
        if let Ok(v) = env::var("API_MAX_PER_PAGE") {
            self.api.max_per_page = v.parse().unwrap_or(self.api.max_per_page);
        }
        if let Ok(v) = env::var("API_MAX_REQUEST_SIZE_BYTES") {
            self.api.max_request_size_bytes = v.parse().unwrap_or(self.api.max_request_size_bytes);
        }

        // Site overrides
        if let Ok(v) = env::var("SITE_HOME_URL") {
            self.site.home_url = v.trim_end_matches('/').to_string();
        }
        if let Ok(v) = env::var("SITE_BLOGNAME") {
            self.site.blogname = v;
        }
        if let Ok(v) = env::var("SITE_PRETTY_PERMALINKS") {
            self.site.pretty_permalinks = v.parse().unwrap_or(self.site.pretty_permalinks);
        }

        // Security overrides
        if let Ok(v) = env::var("SECURITY_ENABLE_CORS") {
            self.security.enable_cors = v.parse().unwrap_or(self.security.enable_cors);
        }
        if let Ok(v) = env::var("SECURITY_CORS_ORIGINS") {
            self.security.cors_origins = v.split(',').map(|s| s.trim().to_string()).collect();
        }
        if let Ok(v) = env::var("SECURITY_NONCE_SECRET") {
            self.security.nonce_secret = v;
        }
        if let Ok(v) = env::var("SECURITY_NONCE_EXPIRY_HOURS") {
            self.security.nonce_expiry_hours = v.parse().unwrap_or(self.security.nonce_expiry_hours);
        }

        // License overrides
        if let Ok(v) = env::var("LICENSE_SERVER_URL") {
            self.license.server_url = v.trim_end_matches('/').to_string();
        }
        if let Ok(v) = env::var("LICENSE_TIMEOUT_SECS") {
            self.license.timeout_secs = v.parse().unwrap_or(self.license.timeout_secs);
        }

        self
    }

    /// Base path every registered route lives under, e.g. `/WPNakama/v1`.
    pub fn route_base(&self) -> String {
        format!("/{}/{}", self.api.namespace, self.api.version)
    }

    pub fn development() -> Self {
        Self {
            environment: Environment::Development,
            database: DatabaseConfig {
                url: "sqlite://nakama.db?mode=rwc".to_string(),
                max_connections: 5,
                connection_timeout: 30,
                table_prefix: "wp_".to_string(),
                enable_query_logging: true,
            },
            api: ApiConfig {
                namespace: "WPNakama".to_string(),
                version: "v1".to_string(),
                port: 3000,
                default_per_page: 10,
                max_per_page: 100,
                max_request_size_bytes: 10 * 1024 * 1024, // 10MB
            },
            site: SiteConfig {
                home_url: "http://localhost:3000".to_string(),
                blogname: "Nakama".to_string(),
                pretty_permalinks: true,
            },
            security: SecurityConfig {
                enable_cors: true,
                cors_origins: vec!["http://localhost:3000".to_string(), "http://localhost:5173".to_string()],
                nonce_secret: "development-nonce-secret".to_string(),
                nonce_expiry_hours: 24,
            },
            license: LicenseConfig {
                server_url: "https://updater.qdonow.com/wp-json/lsq/v1".to_string(),
                timeout_secs: 10,
            },
        }
    }

    fn staging() -> Self {
        let mut config = Self::development();
        config.environment = Environment::Staging;
        config.database.url = "postgres://localhost/nakama".to_string();
        config.database.max_connections = 20;
        config.database.connection_timeout = 10;
        config.api.max_request_size_bytes = 5 * 1024 * 1024; // 5MB
        config.site.home_url = "https://staging.example.com".to_string();
        config.security.cors_origins = vec!["https://staging.example.com".to_string()];
        config.security.nonce_secret = String::new();
        config
    }

    fn production() -> Self {
        let mut config = Self::development();
        config.environment = Environment::Production;
        config.database.url = "postgres://localhost/nakama".to_string();
        config.database.max_connections = 50;
        config.database.connection_timeout = 5;
        config.database.enable_query_logging = false;
        config.api.max_request_size_bytes = 2 * 1024 * 1024; // 2MB
        config.site.home_url = "https://app.example.com".to_string();
        config.security.cors_origins = vec!["https://app.example.com".to_string()];
        // Must come from SECURITY_NONCE_SECRET
        config.security.nonce_secret = String::new();
        config.security.nonce_expiry_hours = 12;
        config
    }
}

// Global singleton config - initialized once at startup
pub static CONFIG: Lazy<AppConfig> = Lazy::new(AppConfig::from_env);

// Convenience function for accessing config
pub fn config() -> &'static AppConfig {
    &CONFIG
}

#[macro_export]
macro_rules! is_development {
    () => {
        matches!($crate::config::CONFIG.environment, $crate::config::Environment::Development)
    };
}
