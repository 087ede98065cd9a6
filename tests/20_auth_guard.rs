mod common;

use anyhow::Result;
use serde_json::Value;

// The JWT middleware rejects these before any database access, so they
// hold with or without a configured database.

#[tokio::test]
async fn protected_routes_require_a_token() -> Result<()> {
    let server = common::ensure_server().await?;
    let client = reqwest::Client::new();

    for path in [
        "/api/auth/whoami",
        "/api/roles",
        "/api/permissions",
        "/api/settings/general",
        "/api/schools",
    ] {
        let resp = client
            .get(format!("{}{}", server.base_url, path))
            .send()
            .await?;
        assert_eq!(resp.status(), 401, "expected 401 for {}", path);

        let body: Value = resp.json().await?;
        assert_eq!(body["success"], false);
        assert_eq!(body["code"], "UNAUTHORIZED");
    }

    Ok(())
}

#[tokio::test]
async fn malformed_bearer_tokens_are_rejected() -> Result<()> {
    let server = common::ensure_server().await?;
    let client = reqwest::Client::new();

    // Wrong scheme
    let resp = client
        .get(format!("{}/api/roles", server.base_url))
        .header("authorization", "Basic dXNlcjpwYXNz")
        .send()
        .await?;
    assert_eq!(resp.status(), 401);

    // Garbage JWT
    let resp = client
        .get(format!("{}/api/roles", server.base_url))
        .header("authorization", "Bearer not.a.jwt")
        .send()
        .await?;
    assert_eq!(resp.status(), 401);

    Ok(())
}

#[tokio::test]
async fn login_validates_input_shape() -> Result<()> {
    let server = common::ensure_server().await?;
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("{}/auth/login", server.base_url))
        .json(&serde_json::json!({"email": "", "password": "x"}))
        .send()
        .await?;
    assert_eq!(resp.status(), 422);

    let body: Value = resp.json().await?;
    assert_eq!(body["code"], "UNPROCESSABLE_ENTITY");
    assert!(body["field_errors"]["email"].is_string());

    Ok(())
}
