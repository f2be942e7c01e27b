pub mod commands;
pub mod utils;

use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};

#[derive(Parser)]
#[command(name = "nakama")]
#[command(about = "Nakama CLI - serve and administer the kanban board API")]
#[command(version)]
pub struct Cli {
    #[arg(long, global = true, help = "Output in human-readable text format")]
    pub text: bool,

    #[arg(long, global = true, help = "Output in JSON format")]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Run the HTTP server")]
    Serve {
        #[arg(long, help = "Install the schema before serving")]
        install: bool,
        #[arg(long, help = "Port to listen on (overrides NAKAMA_API_PORT)")]
        port: Option<u16>,
    },

    #[command(about = "Create every table and seed default options")]
    Install,

    #[command(about = "Drop every table")]
    Uninstall {
        #[arg(long, help = "Confirm that all data will be lost")]
        yes: bool,
    },

    #[command(about = "Print the registered routes")]
    Routes,

    #[command(about = "Issue a session nonce for the X-WP-Nonce header")]
    Nonce {
        #[arg(long, help = "User id carried by the nonce")]
        user: i64,
        #[arg(long = "cap", help = "Capability to grant (edit_posts, delete_posts); repeatable")]
        caps: Vec<String>,
    },

    #[command(about = "Show the effective configuration")]
    Config,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    pub fn from_cli(cli: &Cli) -> Self {
        if cli.json {
            OutputFormat::Json
        } else {
            OutputFormat::Text
        }
    }
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let output_format = OutputFormat::from_cli(&cli);

    match cli.command {
        Commands::Serve { install, port } => commands::server::handle(install, port).await,
        Commands::Install => commands::schema::install(output_format).await,
        Commands::Uninstall { yes } => commands::schema::uninstall(yes, output_format).await,
        Commands::Routes => commands::routes::handle(output_format),
        Commands::Nonce { user, caps } => commands::nonce::handle(user, &caps, output_format),
        Commands::Config => commands::config::handle(output_format),
    }
}
