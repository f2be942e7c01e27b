use nakama_api::config::config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so cargo run picks up DATABASE_URL, SECURITY_NONCE_SECRET, etc.
    let _ = dotenvy::dotenv();

    let config = config();
    nakama_api::init_tracing(config);
    tracing::info!("Starting Nakama API in {:?} mode", config.environment);

    // Development databases are created on first start; other profiles run `nakama install`
    let install_first = nakama_api::is_development!();
    nakama_api::serve(config.clone(), install_first).await
}
