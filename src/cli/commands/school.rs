use clap::Subcommand;
use serde_json::json;

use crate::cli::client::ApiClient;
use crate::cli::config::load_config;
use crate::cli::OutputFormat;

#[derive(Subcommand)]
pub enum SchoolCommands {
    #[command(about = "List all schools")]
    List,

    #[command(about = "Create a new school")]
    Create {
        #[arg(help = "School name")]
        name: String,

        #[arg(help = "URL slug, e.g. north-high")]
        slug: String,
    },

    #[command(about = "Show one school")]
    Show {
        #[arg(help = "School id")]
        id: i64,
    },

    #[command(about = "Soft-delete a school")]
    Delete {
        #[arg(help = "School id")]
        id: i64,
    },
}

pub async fn handle(cmd: SchoolCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    let config = load_config()?;
    let client = ApiClient::from_config(&config);

    match cmd {
        SchoolCommands::List => {
            let data = client.get("/api/schools").await?;

            match output_format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&data)?),
                OutputFormat::Text => {
                    let schools = data.as_array().cloned().unwrap_or_default();
                    if schools.is_empty() {
                        println!("No schools");
                        return Ok(());
                    }
                    println!("{:<6} {:<25} {}", "ID", "NAME", "SLUG");
                    println!("{}", "-".repeat(50));
                    for school in schools {
                        println!(
                            "{:<6} {:<25} {}",
                            school.get("id").and_then(|v| v.as_i64()).unwrap_or(0),
                            school.get("name").and_then(|v| v.as_str()).unwrap_or(""),
                            school.get("slug").and_then(|v| v.as_str()).unwrap_or(""),
                        );
                    }
                }
            }
            Ok(())
        }
        SchoolCommands::Create { name, slug } => {
            let data = client
                .post("/api/schools", json!({"name": name, "slug": slug}))
                .await?;

            match output_format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&data)?),
                OutputFormat::Text => println!(
                    "Created school '{}' (id {})",
                    name,
                    data.get("id").and_then(|v| v.as_i64()).unwrap_or(0)
                ),
            }
            Ok(())
        }
        SchoolCommands::Show { id } => {
            let data = client.get(&format!("/api/schools/{}", id)).await?;
            println!("{}", serde_json::to_string_pretty(&data)?);
            Ok(())
        }
        SchoolCommands::Delete { id } => {
            client.delete(&format!("/api/schools/{}", id)).await?;

            match output_format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&json!({"deleted": id}))?),
                OutputFormat::Text => println!("Deleted school {}", id),
            }
            Ok(())
        }
    }
}
