use clap::Subcommand;
use serde_json::json;

use crate::cli::client::ApiClient;
use crate::cli::config::{load_config, save_config};
use crate::cli::OutputFormat;

#[derive(Subcommand)]
pub enum AuthCommands {
    #[command(about = "Log in and store the session token")]
    Login {
        #[arg(help = "Account email")]
        email: String,

        #[arg(long, env = "CAMPUS_PASSWORD", help = "Password (or set CAMPUS_PASSWORD)")]
        password: String,
    },

    #[command(about = "Show the current session")]
    Whoami,

    #[command(about = "Switch the active school")]
    Use {
        #[arg(help = "School id")]
        school_id: i64,
    },

    #[command(about = "Forget the stored session token")]
    Logout,
}

pub async fn handle(cmd: AuthCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    match cmd {
        AuthCommands::Login { email, password } => {
            let mut config = load_config()?;
            let client = ApiClient::from_config(&config);

            let data = client
                .post("/auth/login", json!({"email": email, "password": password}))
                .await?;

            let token = data
                .get("token")
                .and_then(|t| t.as_str())
                .ok_or_else(|| anyhow::anyhow!("login response missing token"))?;

            config.token = Some(token.to_string());
            config.email = Some(email.clone());
            config.school_id = data.get("school_id").and_then(|s| s.as_i64());
            save_config(&config)?;

            match output_format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&data)?),
                OutputFormat::Text => {
                    println!("Logged in as {}", email);
                    match config.school_id {
                        Some(id) => println!("Active school: {}", id),
                        None => println!("No active school; pick one with 'campus auth use <id>'"),
                    }
                }
            }
            Ok(())
        }
        AuthCommands::Whoami => {
            let config = load_config()?;
            let client = ApiClient::from_config(&config);
            let data = client.get("/api/auth/whoami").await?;

            match output_format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&data)?),
                OutputFormat::Text => {
                    let email = data
                        .pointer("/user/email")
                        .and_then(|e| e.as_str())
                        .unwrap_or("<unknown>");
                    println!("User: {}", email);
                    match data.get("school_id").and_then(|s| s.as_i64()) {
                        Some(id) => println!("Active school: {}", id),
                        None => println!("No active school"),
                    }
                }
            }
            Ok(())
        }
        AuthCommands::Use { school_id } => {
            let mut config = load_config()?;
            let client = ApiClient::from_config(&config);

            let data = client
                .post(&format!("/api/auth/school/{}", school_id), json!({}))
                .await?;

            let token = data
                .get("token")
                .and_then(|t| t.as_str())
                .ok_or_else(|| anyhow::anyhow!("switch response missing token"))?;

            config.token = Some(token.to_string());
            config.school_id = Some(school_id);
            save_config(&config)?;

            match output_format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&data)?),
                OutputFormat::Text => {
                    let name = data
                        .pointer("/school/name")
                        .and_then(|n| n.as_str())
                        .unwrap_or("<unnamed>");
                    println!("Active school: {} ({})", name, school_id);
                }
            }
            Ok(())
        }
        AuthCommands::Logout => {
            let mut config = load_config()?;
            config.token = None;
            config.email = None;
            config.school_id = None;
            save_config(&config)?;

            match output_format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&json!({"logged_out": true}))?),
                OutputFormat::Text => println!("Logged out"),
            }
            Ok(())
        }
    }
}
