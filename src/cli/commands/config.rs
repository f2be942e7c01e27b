use crate::cli::OutputFormat;
use crate::config::{config, AppConfig};

const REDACTED: &str = "********";

/// Effective configuration with secrets masked
fn redacted(config: &AppConfig) -> AppConfig {
    let mut shown = config.clone();
    if !shown.security.nonce_secret.is_empty() {
        shown.security.nonce_secret = REDACTED.to_string();
    }
    shown
}

pub fn handle(output_format: OutputFormat) -> anyhow::Result<()> {
    let shown = redacted(config());
    match output_format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&shown)?),
        OutputFormat::Text => print!("{}", serde_yaml::to_string(&shown)?),
    }
    Ok(())
}
