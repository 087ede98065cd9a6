use clap::Subcommand;
use serde_json::json;

use crate::cli::client::ApiClient;
use crate::cli::config::load_config;
use crate::cli::OutputFormat;

#[derive(Subcommand)]
pub enum RoleCommands {
    #[command(about = "List roles visible under the active school")]
    List,

    #[command(about = "Search roles by name")]
    Search {
        #[arg(help = "Search query")]
        query: String,
    },

    #[command(about = "Create a role in the active school")]
    Create {
        #[arg(help = "Role name, e.g. homeroom-teacher")]
        name: String,

        #[arg(long, help = "Human-readable name (defaults to the role name)")]
        display_name: Option<String>,

        #[arg(long, help = "Merge permissions from this existing role id")]
        copy_from: Option<i64>,
    },

    #[command(about = "Delete a role (rejected while users are assigned)")]
    Delete {
        #[arg(help = "Role id")]
        id: i64,
    },
}

pub async fn handle(cmd: RoleCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    let config = load_config()?;
    let client = ApiClient::from_config(&config);

    match cmd {
        RoleCommands::List => {
            let data = client.get("/api/roles").await?;

            match output_format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&data)?),
                OutputFormat::Text => {
                    let roles = data.as_array().cloned().unwrap_or_default();
                    if roles.is_empty() {
                        println!("No roles");
                        return Ok(());
                    }
                    println!("{:<6} {:<25} {:<8} {:<6} {}", "ID", "NAME", "SCOPE", "USERS", "PERMISSIONS");
                    println!("{}", "-".repeat(70));
                    for role in roles {
                        let scope = match role.get("school_id").and_then(|v| v.as_i64()) {
                            Some(_) => "school",
                            None => "global",
                        };
                        let perms = role
                            .get("permissions")
                            .and_then(|v| v.as_array())
                            .map(|p| p.len())
                            .unwrap_or(0);
                        println!(
                            "{:<6} {:<25} {:<8} {:<6} {}",
                            role.get("id").and_then(|v| v.as_i64()).unwrap_or(0),
                            role.get("name").and_then(|v| v.as_str()).unwrap_or(""),
                            scope,
                            role.get("users_count").and_then(|v| v.as_i64()).unwrap_or(0),
                            perms,
                        );
                    }
                }
            }
            Ok(())
        }
        RoleCommands::Search { query } => {
            let data = client
                .get(&format!("/api/roles/search?q={}", urlencode(&query)))
                .await?;
            println!("{}", serde_json::to_string_pretty(&data)?);
            Ok(())
        }
        RoleCommands::Create { name, display_name, copy_from } => {
            let display_name = display_name.unwrap_or_else(|| name.clone());
            let data = client
                .post(
                    "/api/roles",
                    json!({
                        "name": name,
                        "display_name": display_name,
                        "copy_from": copy_from,
                    }),
                )
                .await?;

            match output_format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&data)?),
                OutputFormat::Text => println!(
                    "Created role '{}' (id {})",
                    name,
                    data.get("id").and_then(|v| v.as_i64()).unwrap_or(0)
                ),
            }
            Ok(())
        }
        RoleCommands::Delete { id } => {
            client.delete(&format!("/api/roles/{}", id)).await?;

            match output_format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&json!({"deleted": id}))?),
                OutputFormat::Text => println!("Deleted role {}", id),
            }
            Ok(())
        }
    }
}

/// Percent-encode a query value
fn urlencode(value: &str) -> String {
    url::form_urlencoded::byte_serialize(value.as_bytes()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn urlencode_escapes_reserved_chars() {
        assert_eq!(urlencode("plain"), "plain");
        assert_eq!(urlencode("head teacher"), "head+teacher");
        assert_eq!(urlencode("a&b=c"), "a%26b%3Dc");
    }
}
