mod common;

use anyhow::Result;
use serde_json::Value;
use uuid::Uuid;

use campus_api::auth::{generate_jwt, Claims};

// Mints tokens with the same secret the spawned server reads (JWT_SECRET
// from the inherited environment, or the development fallback).

fn token_for(school_id: Option<i64>) -> Result<String> {
    let claims = Claims::new(Uuid::new_v4(), "tester@example.com".into(), school_id);
    Ok(generate_jwt(claims)?)
}

#[tokio::test]
async fn school_scoped_routes_reject_tenantless_tokens() -> Result<()> {
    let server = common::ensure_server().await?;
    let client = reqwest::Client::new();
    let token = token_for(None)?;

    for path in ["/api/roles", "/api/permissions", "/api/settings/general"] {
        let resp = client
            .get(format!("{}{}", server.base_url, path))
            .bearer_auth(&token)
            .send()
            .await?;
        assert_eq!(resp.status(), 403, "expected 403 for {}", path);

        let body: Value = resp.json().await?;
        assert_eq!(body["code"], "FORBIDDEN");
        assert_eq!(body["message"], "No active school selected");
    }

    Ok(())
}

#[tokio::test]
async fn dead_or_unknown_active_school_is_rejected() -> Result<()> {
    let server = common::ensure_server().await?;
    if !server.database_available().await {
        eprintln!("skipping: no database configured");
        return Ok(());
    }

    let client = reqwest::Client::new();
    let token = token_for(Some(i64::MAX))?;

    let resp = client
        .get(format!("{}/api/roles", server.base_url))
        .bearer_auth(&token)
        .send()
        .await?;
    assert_eq!(resp.status(), 403);

    let body: Value = resp.json().await?;
    assert_eq!(body["message"], "Active school is not available");

    Ok(())
}

#[tokio::test]
async fn whoami_rejects_tokens_for_unknown_users() -> Result<()> {
    let server = common::ensure_server().await?;
    if !server.database_available().await {
        eprintln!("skipping: no database configured");
        return Ok(());
    }

    let client = reqwest::Client::new();
    let token = token_for(None)?;

    let resp = client
        .get(format!("{}/api/auth/whoami", server.base_url))
        .bearer_auth(&token)
        .send()
        .await?;
    assert_eq!(resp.status(), 401);

    Ok(())
}

#[tokio::test]
async fn login_with_unknown_email_is_unauthorized() -> Result<()> {
    let server = common::ensure_server().await?;
    if !server.database_available().await {
        eprintln!("skipping: no database configured");
        return Ok(());
    }

    let client = reqwest::Client::new();
    let resp = client
        .post(format!("{}/auth/login", server.base_url))
        .json(&serde_json::json!({
            "email": "nobody@example.com",
            "password": "wrong",
        }))
        .send()
        .await?;
    assert_eq!(resp.status(), 401);

    let body: Value = resp.json().await?;
    assert_eq!(body["message"], "Invalid email or password");

    Ok(())
}
