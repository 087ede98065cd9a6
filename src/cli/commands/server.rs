use clap::Subcommand;
use serde_json::json;

use crate::cli::client::ApiClient;
use crate::cli::config::{load_config, save_config};
use crate::cli::OutputFormat;

#[derive(Subcommand)]
pub enum ServerCommands {
    #[command(about = "Set the API server URL")]
    Use {
        #[arg(help = "Server URL, e.g. http://localhost:3000")]
        url: String,
    },

    #[command(about = "Show the configured server")]
    Current,

    #[command(about = "Ping the server health endpoint")]
    Health,
}

pub async fn handle(cmd: ServerCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    match cmd {
        ServerCommands::Use { url } => {
            let mut config = load_config()?;
            config.server_url = url.trim_end_matches('/').to_string();
            save_config(&config)?;

            match output_format {
                OutputFormat::Json => {
                    println!("{}", serde_json::to_string_pretty(&json!({"server": config.server_url}))?)
                }
                OutputFormat::Text => println!("Server set to {}", config.server_url),
            }
            Ok(())
        }
        ServerCommands::Current => {
            let config = load_config()?;
            match output_format {
                OutputFormat::Json => {
                    println!("{}", serde_json::to_string_pretty(&json!({"server": config.server_url}))?)
                }
                OutputFormat::Text => println!("{}", config.server_url),
            }
            Ok(())
        }
        ServerCommands::Health => {
            let config = load_config()?;
            let client = ApiClient::from_config(&config);
            let health = client.get("/health").await?;

            match output_format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&health)?),
                OutputFormat::Text => {
                    let status = health.get("status").and_then(|s| s.as_str()).unwrap_or("unknown");
                    println!("{}: {}", config.server_url, status);
                }
            }
            Ok(())
        }
    }
}
