mod common;

use anyhow::Result;
use serde_json::Value;

#[tokio::test]
async fn root_describes_the_api() -> Result<()> {
    let server = common::ensure_server().await?;
    let client = reqwest::Client::new();

    let resp = client.get(format!("{}/", server.base_url)).send().await?;
    assert!(resp.status().is_success());

    let body: Value = resp.json().await?;
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["name"], "Campus API");
    assert!(body["data"]["endpoints"]["roles"].is_string());

    Ok(())
}

#[tokio::test]
async fn health_reports_database_state() -> Result<()> {
    let server = common::ensure_server().await?;
    let client = reqwest::Client::new();

    let resp = client.get(format!("{}/health", server.base_url)).send().await?;
    // 200 with a database, 503 without; both are well-formed
    assert!(resp.status() == 200 || resp.status() == 503);

    let body: Value = resp.json().await?;
    assert!(body["data"]["status"].is_string());

    Ok(())
}
