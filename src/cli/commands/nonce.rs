use anyhow::anyhow;
use serde_json::json;

use crate::auth::{issue_nonce, Capability, NONCE_HEADER};
use crate::cli::OutputFormat;
use crate::config::config;

fn parse_caps(caps: &[String]) -> anyhow::Result<Vec<Capability>> {
    caps.iter()
        .map(|c| Capability::parse(c.trim()).ok_or_else(|| anyhow!("unknown capability: {}", c)))
        .collect()
}

pub fn handle(user: i64, caps: &[String], output_format: OutputFormat) -> anyhow::Result<()> {
    let caps = parse_caps(caps)?;
    let token = issue_nonce(&config().security, user, &caps)?;

    match output_format {
        OutputFormat::Json => {
            let names: Vec<&str> = caps.iter().map(|c| c.as_str()).collect();
            println!(
                "{}",
                serde_json::to_string_pretty(&json!({
                    "header": NONCE_HEADER,
                    "token": token,
                    "user": user,
                    "caps": names,
                    "expires_in_hours": config().security.nonce_expiry_hours,
                }))?
            );
        }
        OutputFormat::Text => println!("{}", token),
    }
    Ok(())
}
