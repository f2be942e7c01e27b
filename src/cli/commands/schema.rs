use anyhow::Context;
use serde_json::json;

use crate::cli::utils::{output_error, output_success};
use crate::cli::OutputFormat;
use crate::config::config;
use crate::database::{install as installer, Database};

async fn connect() -> anyhow::Result<Database> {
    Database::connect(&config().database)
        .await
        .context("failed to connect to the database")
}

pub async fn install(output_format: OutputFormat) -> anyhow::Result<()> {
    let db = connect().await?;
    installer::install(&db).await.context("schema install failed")?;
    db.close().await;

    output_success(
        &output_format,
        "Schema installed",
        Some(json!({ "prefix": config().database.table_prefix })),
    )
}

pub async fn uninstall(yes: bool, output_format: OutputFormat) -> anyhow::Result<()> {
    if !yes {
        output_error(&output_format, "Refusing to drop tables without --yes", Some("confirmation_required"))?;
        anyhow::bail!("uninstall not confirmed");
    }
    let db = connect().await?;
    installer::uninstall(&db).await.context("schema uninstall failed")?;
    db.close().await;

    output_success(&output_format, "Schema dropped", None)
}
