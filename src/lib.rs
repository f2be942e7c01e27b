pub mod access;
pub mod api;
pub mod auth;
pub mod cli;
pub mod codec;
pub mod config;
pub mod database;
pub mod error;
pub mod filter;
pub mod handlers;
pub mod license;
pub mod middleware;
pub mod options;
pub mod state;

#[cfg(test)]
pub mod testing;

use std::sync::Arc;

use anyhow::Context;
use axum::{
    extract::DefaultBodyLimit,
    http::{HeaderValue, Method},
    routing::get,
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::config::{AppConfig, SecurityConfig};
use crate::database::{install, Database};
use crate::license::HttpLicenseClient;
use crate::middleware::session_middleware;
use crate::state::AppState;

/// Full HTTP surface: the namespaced route table plus the routes outside it
pub fn app(state: AppState) -> Router {
    let config = state.config.clone();
    let api = handlers::route_table().into_router();

    let mut router = Router::new()
        .route("/", get(handlers::public::service_info))
        .route("/health", get(handlers::public::health))
        .route("/wpn/boards/:slug", get(handlers::public::board_page))
        .nest(&config.route_base(), api)
        .layer(axum::middleware::from_fn_with_state(state.clone(), session_middleware))
        .layer(DefaultBodyLimit::max(config.api.max_request_size_bytes));

    if config.security.enable_cors {
        router = router.layer(cors_layer(&config.security));
    }

    router.layer(TraceLayer::new_for_http()).with_state(state)
}

fn cors_layer(security: &SecurityConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = security
        .cors_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin {:?}", origin);
                None
            }
        })
        .collect();

    if origins.is_empty() {
        return CorsLayer::permissive();
    }
    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::PATCH, Method::DELETE, Method::OPTIONS])
        .allow_headers(Any)
        .expose_headers(Any)
}

/// `RUST_LOG` wins; otherwise info for this crate, plus SQL when query logging is on
pub fn init_tracing(config: &AppConfig) {
    let default = if config.database.enable_query_logging {
        "nakama_api=info,nakama_api::database=debug,tower_http=info"
    } else {
        "nakama_api=info,tower_http=info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    // Keep a subscriber that is already installed
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

/// Connect, optionally install the schema, and serve until the process is stopped
pub async fn serve(config: AppConfig, install_first: bool) -> anyhow::Result<()> {
    let db = Database::connect(&config.database)
        .await
        .context("failed to connect to the database")?;
    if install_first {
        install::install(&db).await.context("failed to install the schema")?;
    }
    let license = HttpLicenseClient::new(&config.license).context("failed to build the license client")?;

    let bind_addr = format!("0.0.0.0:{}", config.api.port);
    let base = config.route_base();
    let state = AppState::new(db, Arc::new(config), Arc::new(license));
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;

    info!("Nakama API listening on http://{} (routes under {})", bind_addr, base);
    axum::serve(listener, app(state)).await.context("server error")?;
    Ok(())
}
