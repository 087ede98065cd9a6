use std::fs;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Persisted CLI state: which server to talk to and the current session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CliConfig {
    pub server_url: String,
    pub token: Option<String>,
    pub email: Option<String>,
    pub school_id: Option<i64>,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            server_url: "http://localhost:3000".to_string(),
            token: None,
            email: None,
            school_id: None,
        }
    }
}

pub fn get_config_dir() -> anyhow::Result<PathBuf> {
    let config_dir = if let Ok(custom_dir) = std::env::var("CAMPUS_CLI_CONFIG_DIR") {
        PathBuf::from(custom_dir)
    } else {
        let home = std::env::var("HOME")
            .map_err(|_| anyhow::anyhow!("HOME environment variable not set"))?;
        PathBuf::from(home).join(".config").join("campus").join("cli")
    };

    Ok(config_dir)
}

fn config_path() -> anyhow::Result<PathBuf> {
    Ok(get_config_dir()?.join("config.json"))
}

pub fn load_config() -> anyhow::Result<CliConfig> {
    let path = config_path()?;
    if !path.exists() {
        return Ok(CliConfig::default());
    }

    let contents = fs::read_to_string(&path)?;
    let config = serde_json::from_str(&contents)
        .map_err(|e| anyhow::anyhow!("Corrupt CLI config at {}: {}", path.display(), e))?;
    Ok(config)
}

pub fn save_config(config: &CliConfig) -> anyhow::Result<()> {
    let dir = get_config_dir()?;
    fs::create_dir_all(&dir)?;

    let path = config_path()?;
    fs::write(&path, serde_json::to_string_pretty(config)?)?;
    Ok(())
}
