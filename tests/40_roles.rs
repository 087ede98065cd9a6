mod common;

use anyhow::{Context, Result};
use serde_json::{json, Value};
use uuid::Uuid;

use campus_api::auth::password;
use campus_api::database::DatabaseManager;

// End-to-end role semantics against a live database. Each scenario seeds
// its own schools and users (tagged with a uuid) so tests can run
// concurrently against the shared server.

struct Scenario {
    client: reqwest::Client,
    base_url: String,
    tag: String,
    school_a: i64,
    school_b: i64,
    user_id: Uuid,
    token_a: String,
    token_b: String,
}

impl Scenario {
    /// Two schools, one admin user who is a member of both and holds the
    /// seeded global admin role, with a scoped token for each school.
    async fn seed(server: &common::TestServer) -> Result<Self> {
        let pool = DatabaseManager::pool().await?;
        let client = reqwest::Client::new();
        let tag = Uuid::new_v4().simple().to_string()[..10].to_string();

        let school_a = create_school(&pool, &format!("North {}", tag), &format!("north-{}", tag)).await?;
        let school_b = create_school(&pool, &format!("South {}", tag), &format!("south-{}", tag)).await?;

        let email = format!("admin-{}@example.com", tag);
        let user_id = create_user(&pool, "Admin", &email, "sesame").await?;
        add_membership(&pool, school_a, user_id).await?;
        add_membership(&pool, school_b, user_id).await?;
        grant_global_admin(&pool, user_id).await?;

        let login: Value = client
            .post(format!("{}/auth/login", server.base_url))
            .json(&json!({"email": email, "password": "sesame"}))
            .send()
            .await?
            .json()
            .await?;
        let base_token = login["data"]["token"]
            .as_str()
            .context("login response missing token")?
            .to_string();

        let token_a = switch_school(&client, &server.base_url, &base_token, school_a).await?;
        let token_b = switch_school(&client, &server.base_url, &base_token, school_b).await?;

        Ok(Self {
            client,
            base_url: server.base_url.clone(),
            tag,
            school_a,
            school_b,
            user_id,
            token_a,
            token_b,
        })
    }

    async fn create_role(&self, token: &str, name: &str) -> Result<i64> {
        let resp = self
            .client
            .post(format!("{}/api/roles", self.base_url))
            .bearer_auth(token)
            .json(&json!({"name": name, "display_name": name}))
            .send()
            .await?;
        anyhow::ensure!(resp.status() == 201, "create role failed: {}", resp.status());

        let body: Value = resp.json().await?;
        body["data"]["id"].as_i64().context("role id missing")
    }

    /// Resolve seeded permission ids by name
    async fn permission_ids(&self, names: &[&str]) -> Result<Vec<i64>> {
        let body: Value = self
            .client
            .get(format!("{}/api/permissions", self.base_url))
            .bearer_auth(&self.token_a)
            .send()
            .await?
            .json()
            .await?;

        let catalog = body["data"].as_array().context("permission list missing")?;
        names
            .iter()
            .map(|name| {
                catalog
                    .iter()
                    .find(|p| p["name"] == *name)
                    .and_then(|p| p["id"].as_i64())
                    .with_context(|| format!("permission '{}' not seeded", name))
            })
            .collect()
    }

    async fn role_permissions(&self, token: &str, role_id: i64) -> Result<Vec<String>> {
        let body: Value = self
            .client
            .get(format!("{}/api/roles/{}", self.base_url, role_id))
            .bearer_auth(token)
            .send()
            .await?
            .json()
            .await?;

        Ok(body["data"]["permissions"]
            .as_array()
            .cloned()
            .unwrap_or_default()
            .iter()
            .filter_map(|p| p["name"].as_str().map(str::to_string))
            .collect())
    }
}

async fn create_school(pool: &sqlx::PgPool, name: &str, slug: &str) -> Result<i64> {
    let id = sqlx::query_scalar("INSERT INTO schools (name, slug) VALUES ($1, $2) RETURNING id")
        .bind(name)
        .bind(slug)
        .fetch_one(pool)
        .await?;
    Ok(id)
}

async fn create_user(pool: &sqlx::PgPool, name: &str, email: &str, pass: &str) -> Result<Uuid> {
    let salt = password::new_salt();
    let hash = password::hash_password(pass, &salt);
    let id = sqlx::query_scalar(
        "INSERT INTO users (name, email, password_hash, password_salt) VALUES ($1, $2, $3, $4) RETURNING id",
    )
    .bind(name)
    .bind(email)
    .bind(hash)
    .bind(salt)
    .fetch_one(pool)
    .await?;
    Ok(id)
}

async fn add_membership(pool: &sqlx::PgPool, school_id: i64, user_id: Uuid) -> Result<()> {
    sqlx::query("INSERT INTO school_user (school_id, user_id) VALUES ($1, $2)")
        .bind(school_id)
        .bind(user_id)
        .execute(pool)
        .await?;
    Ok(())
}

async fn grant_global_admin(pool: &sqlx::PgPool, user_id: Uuid) -> Result<()> {
    let admin_role: i64 =
        sqlx::query_scalar("SELECT id FROM roles WHERE name = 'admin' AND school_id IS NULL")
            .fetch_one(pool)
            .await?;
    sqlx::query("INSERT INTO role_user (role_id, user_id, school_id) VALUES ($1, $2, NULL)")
        .bind(admin_role)
        .bind(user_id)
        .execute(pool)
        .await?;
    Ok(())
}

async fn switch_school(
    client: &reqwest::Client,
    base_url: &str,
    token: &str,
    school_id: i64,
) -> Result<String> {
    let body: Value = client
        .post(format!("{}/api/auth/school/{}", base_url, school_id))
        .bearer_auth(token)
        .json(&json!({}))
        .send()
        .await?
        .json()
        .await?;
    body["data"]["token"]
        .as_str()
        .map(str::to_string)
        .context("switch response missing token")
}

#[test]
fn sync_with_empty_list_detaches_everything() -> Result<()> {
    common::runtime().block_on(async {
        let server = common::ensure_server().await?;
        if !server.database_available().await {
            eprintln!("skipping: no database configured");
            return Ok(());
        }

        let s = Scenario::seed(server).await?;
        let role_id = s.create_role(&s.token_a, &format!("registrar-{}", s.tag)).await?;
        let ids = s.permission_ids(&["roles.view", "settings.view"]).await?;

        let resp = s
            .client
            .put(format!("{}/api/roles/{}/permissions", s.base_url, role_id))
            .bearer_auth(&s.token_a)
            .json(&json!({"permission_ids": ids}))
            .send()
            .await?;
        assert_eq!(resp.status(), 200);
        assert_eq!(s.role_permissions(&s.token_a, role_id).await?.len(), 2);

        let resp = s
            .client
            .put(format!("{}/api/roles/{}/permissions", s.base_url, role_id))
            .bearer_auth(&s.token_a)
            .json(&json!({"permission_ids": []}))
            .send()
            .await?;
        assert_eq!(resp.status(), 200);
        assert!(s.role_permissions(&s.token_a, role_id).await?.is_empty());

        Ok(())
    })
}

#[test]
fn merge_is_additive_never_detaches() -> Result<()> {
    common::runtime().block_on(async {
        let server = common::ensure_server().await?;
        if !server.database_available().await {
            eprintln!("skipping: no database configured");
            return Ok(());
        }

        let s = Scenario::seed(server).await?;
        let role_id = s.create_role(&s.token_a, &format!("bursar-{}", s.tag)).await?;
        let view = s.permission_ids(&["roles.view"]).await?;
        let manage = s.permission_ids(&["settings.manage"]).await?;

        let resp = s
            .client
            .put(format!("{}/api/roles/{}/permissions", s.base_url, role_id))
            .bearer_auth(&s.token_a)
            .json(&json!({"permission_ids": view}))
            .send()
            .await?;
        assert_eq!(resp.status(), 200);

        let resp = s
            .client
            .post(format!("{}/api/roles/{}/permissions", s.base_url, role_id))
            .bearer_auth(&s.token_a)
            .json(&json!({"permission_ids": manage}))
            .send()
            .await?;
        assert_eq!(resp.status(), 200);

        let names = s.role_permissions(&s.token_a, role_id).await?;
        assert!(names.contains(&"roles.view".to_string()));
        assert!(names.contains(&"settings.manage".to_string()));

        Ok(())
    })
}

#[test]
fn role_names_unique_per_school_not_globally() -> Result<()> {
    common::runtime().block_on(async {
        let server = common::ensure_server().await?;
        if !server.database_available().await {
            eprintln!("skipping: no database configured");
            return Ok(());
        }

        let s = Scenario::seed(server).await?;
        let name = format!("librarian-{}", s.tag);

        s.create_role(&s.token_a, &name).await?;

        // Same name, same school: field-level validation failure
        let resp = s
            .client
            .post(format!("{}/api/roles", s.base_url))
            .bearer_auth(&s.token_a)
            .json(&json!({"name": name, "display_name": name}))
            .send()
            .await?;
        assert_eq!(resp.status(), 422);
        let body: Value = resp.json().await?;
        assert!(body["field_errors"]["name"].is_string());

        // Same name under the other school is fine
        s.create_role(&s.token_b, &name).await?;

        Ok(())
    })
}

#[test]
fn deleting_an_assigned_role_conflicts_and_keeps_assignments() -> Result<()> {
    common::runtime().block_on(async {
        let server = common::ensure_server().await?;
        if !server.database_available().await {
            eprintln!("skipping: no database configured");
            return Ok(());
        }

        let s = Scenario::seed(server).await?;
        let pool = DatabaseManager::pool().await?;
        let role_id = s.create_role(&s.token_a, &format!("coach-{}", s.tag)).await?;

        let resp = s
            .client
            .post(format!("{}/api/roles/{}/users/{}", s.base_url, role_id, s.user_id))
            .bearer_auth(&s.token_a)
            .send()
            .await?;
        assert_eq!(resp.status(), 201);

        let resp = s
            .client
            .delete(format!("{}/api/roles/{}", s.base_url, role_id))
            .bearer_auth(&s.token_a)
            .send()
            .await?;
        assert_eq!(resp.status(), 409);

        // Role row and assignment both survive
        let assignments: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM role_user WHERE role_id = $1")
                .bind(role_id)
                .fetch_one(&pool)
                .await?;
        assert_eq!(assignments, 1);

        let resp = s
            .client
            .get(format!("{}/api/roles/{}", s.base_url, role_id))
            .bearer_auth(&s.token_a)
            .send()
            .await?;
        assert_eq!(resp.status(), 200);

        Ok(())
    })
}

#[test]
fn cross_tenant_role_access_is_rejected_even_with_a_known_id() -> Result<()> {
    common::runtime().block_on(async {
        let server = common::ensure_server().await?;
        if !server.database_available().await {
            eprintln!("skipping: no database configured");
            return Ok(());
        }

        let s = Scenario::seed(server).await?;
        let role_id = s.create_role(&s.token_a, &format!("nurse-{}", s.tag)).await?;
        let ids = s.permission_ids(&["roles.view"]).await?;

        // Pivot mutation from the other tenant: scope failure, not not-found
        let resp = s
            .client
            .put(format!("{}/api/roles/{}/permissions", s.base_url, role_id))
            .bearer_auth(&s.token_b)
            .json(&json!({"permission_ids": ids}))
            .send()
            .await?;
        assert_eq!(resp.status(), 403);

        let resp = s
            .client
            .get(format!("{}/api/roles/{}", s.base_url, role_id))
            .bearer_auth(&s.token_b)
            .send()
            .await?;
        assert_eq!(resp.status(), 403);

        // Untouched under its own school
        assert!(s.role_permissions(&s.token_a, role_id).await?.is_empty());

        Ok(())
    })
}

#[test]
fn global_roles_assignable_under_each_tenant_separately() -> Result<()> {
    common::runtime().block_on(async {
        let server = common::ensure_server().await?;
        if !server.database_available().await {
            eprintln!("skipping: no database configured");
            return Ok(());
        }

        let s = Scenario::seed(server).await?;
        let pool = DatabaseManager::pool().await?;

        let admin_role: i64 =
            sqlx::query_scalar("SELECT id FROM roles WHERE name = 'admin' AND school_id IS NULL")
                .fetch_one(&pool)
                .await?;

        let other = create_user(&pool, "Clerk", &format!("clerk-{}@example.com", s.tag), "sesame").await?;
        add_membership(&pool, s.school_a, other).await?;
        add_membership(&pool, s.school_b, other).await?;

        // Assign the same global role under both tenants: two distinct
        // assignments, not a silent no-op on the second
        for token in [&s.token_a, &s.token_b] {
            let resp = s
                .client
                .post(format!("{}/api/roles/{}/users/{}", s.base_url, admin_role, other))
                .bearer_auth(token)
                .send()
                .await?;
            assert_eq!(resp.status(), 201);
        }

        let scopes: Vec<Option<i64>> =
            sqlx::query_scalar("SELECT school_id FROM role_user WHERE role_id = $1 AND user_id = $2")
                .bind(admin_role)
                .bind(other)
                .fetch_all(&pool)
                .await?;
        assert_eq!(scopes.len(), 2);
        assert!(scopes.contains(&Some(s.school_a)));
        assert!(scopes.contains(&Some(s.school_b)));

        // Removing under B only detaches B's assignment
        let resp = s
            .client
            .delete(format!("{}/api/roles/{}/users/{}", s.base_url, admin_role, other))
            .bearer_auth(&s.token_b)
            .send()
            .await?;
        assert_eq!(resp.status(), 204);

        let remaining: Vec<Option<i64>> =
            sqlx::query_scalar("SELECT school_id FROM role_user WHERE role_id = $1 AND user_id = $2")
                .bind(admin_role)
                .bind(other)
                .fetch_all(&pool)
                .await?;
        assert_eq!(remaining, vec![Some(s.school_a)]);

        Ok(())
    })
}
