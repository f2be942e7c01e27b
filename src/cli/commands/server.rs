use crate::config::config;

/// Run the API with the process configuration, optionally on another port
pub async fn handle(install: bool, port: Option<u16>) -> anyhow::Result<()> {
    let mut config = config().clone();
    if let Some(port) = port {
        config.api.port = port;
    }
    crate::serve(config, install).await
}
