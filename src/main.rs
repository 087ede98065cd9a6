use axum::{middleware, routing::get, Router};
use serde_json::{json, Value};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use campus_api::database::DatabaseManager;
use campus_api::handlers;
use campus_api::middleware::{jwt_auth_middleware, require_school_middleware};

#[tokio::main]
async fn main() {
    // Load .env if present so cargo run picks up DATABASE_URL, JWT_SECRET, etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt::init();

    let config = campus_api::config::config();
    tracing::info!("Starting Campus API in {:?} mode", config.environment);

    let app = app();

    // Allow tests or deployments to override port via env
    let port = std::env::var("CAMPUS_API_PORT")
        .ok()
        .or_else(|| std::env::var("PORT").ok())
        .and_then(|s| s.parse::<u16>().ok())
        .unwrap_or(3000);

    let bind_addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .unwrap_or_else(|e| panic!("failed to bind {}: {}", bind_addr, e));

    tracing::info!("Campus API server listening on http://{}", bind_addr);

    axum::serve(listener, app).await.expect("server");
}

fn app() -> Router {
    Router::new()
        // Public
        .route("/", get(root))
        .route("/health", get(health))
        .merge(public_routes())
        // Authenticated, tenant-optional
        .merge(auth_routes())
        .merge(school_admin_routes())
        // Authenticated, active school required
        .merge(tenant_routes())
        // Global middleware
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

fn public_routes() -> Router {
    use axum::routing::post;
    use handlers::public::auth;

    Router::new().route("/auth/login", post(auth::login))
}

fn auth_routes() -> Router {
    use axum::routing::post;
    use handlers::protected::auth;

    Router::new()
        .route("/api/auth/whoami", get(auth::whoami))
        .route("/api/auth/school/:id", post(auth::switch_school))
        .layer(middleware::from_fn(jwt_auth_middleware))
}

fn school_admin_routes() -> Router {
    use handlers::protected::schools;

    Router::new()
        .route("/api/schools", get(schools::index).post(schools::store))
        .route(
            "/api/schools/:id",
            get(schools::show)
                .patch(schools::update)
                .delete(schools::destroy),
        )
        .layer(middleware::from_fn(jwt_auth_middleware))
}

fn tenant_routes() -> Router {
    use handlers::protected::{permissions, roles, settings};

    Router::new()
        // Role CRUD
        .route(
            "/api/roles",
            get(roles::index).post(roles::store).delete(roles::destroy_bulk),
        )
        .route("/api/roles/search", get(roles::search))
        .route(
            "/api/roles/:id",
            get(roles::show).patch(roles::update).delete(roles::destroy),
        )
        // Pivot mutations: sync (replace), merge (add-only), remove (detach-only)
        .route(
            "/api/roles/:id/permissions",
            axum::routing::put(roles::sync_permissions)
                .post(roles::merge_permissions)
                .delete(roles::remove_permissions),
        )
        // Assignments
        .route(
            "/api/roles/:id/users/:user_id",
            axum::routing::post(roles::assign_user).delete(roles::remove_user),
        )
        // Permission catalog
        .route("/api/permissions", get(permissions::index))
        .route("/api/permissions/grouped", get(permissions::grouped))
        // Tenant-scoped settings groups
        .route(
            "/api/settings/:group",
            get(settings::show).post(settings::store),
        )
        // jwt layer is outermost and runs first, so AuthUser is set here
        .layer(middleware::from_fn(require_school_middleware))
        .layer(middleware::from_fn(jwt_auth_middleware))
}

async fn root() -> axum::response::Json<Value> {
    let version = env!("CARGO_PKG_VERSION");

    axum::response::Json(json!({
        "success": true,
        "data": {
            "name": "Campus API",
            "version": version,
            "description": "Multi-tenant school management API",
            "endpoints": {
                "home": "/ (public)",
                "login": "/auth/login (public - token acquisition)",
                "auth": "/api/auth/* (protected - session and tenant selection)",
                "schools": "/api/schools[/:id] (protected - operator school CRUD)",
                "roles": "/api/roles[/:id] (protected - requires active school)",
                "permissions": "/api/permissions[/grouped] (protected - requires active school)",
                "settings": "/api/settings/:group (protected - requires active school)",
            }
        }
    }))
}

async fn health() -> impl axum::response::IntoResponse {
    let now = chrono::Utc::now();

    match DatabaseManager::health_check().await {
        Ok(_) => (
            axum::http::StatusCode::OK,
            axum::response::Json(json!({
                "success": true,
                "data": {
                    "status": "ok",
                    "timestamp": now,
                    "database": "ok"
                }
            })),
        ),
        Err(e) => (
            axum::http::StatusCode::SERVICE_UNAVAILABLE,
            axum::response::Json(json!({
                "success": false,
                "error": "database unavailable",
                "data": {
                    "status": "degraded",
                    "timestamp": now,
                    "database_error": e.to_string()
                }
            })),
        ),
    }
}
