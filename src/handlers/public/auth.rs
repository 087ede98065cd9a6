use axum::response::Json;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::auth::{generate_jwt, password, Claims};
use crate::database::DatabaseManager;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult};
use crate::services::UserService;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// POST /auth/login - authenticate and receive a JWT
///
/// When the user belongs to exactly one school it becomes the active
/// school immediately; otherwise the token starts tenant-less and the
/// client selects one via POST /api/auth/school/:id.
pub async fn login(Json(req): Json<LoginRequest>) -> ApiResult<Value> {
    if req.email.trim().is_empty() {
        return Err(ApiError::field_error("email", "Email is required"));
    }
    if req.password.is_empty() {
        return Err(ApiError::field_error("password", "Password is required"));
    }

    let pool = DatabaseManager::pool().await?;
    let users = UserService::new(pool);

    let user = users
        .find_by_email(req.email.trim())
        .await
        .map_err(|e| {
            tracing::error!("Login lookup failed: {}", e);
            ApiError::internal_server_error("An error occurred while processing your request")
        })?
        .ok_or_else(|| ApiError::unauthorized("Invalid email or password"))?;

    if !password::verify_password(&req.password, &user.password_salt, &user.password_hash) {
        tracing::warn!("Failed login attempt for {}", user.email);
        return Err(ApiError::unauthorized("Invalid email or password"));
    }

    let schools = users.schools_of(user.id).await.map_err(|e| {
        tracing::error!("Membership lookup failed: {}", e);
        ApiError::internal_server_error("An error occurred while processing your request")
    })?;

    let school_id = match schools.as_slice() {
        [only] => Some(only.id),
        _ => None,
    };

    let claims = Claims::new(user.id, user.email.clone(), school_id);
    let expires_at = claims.exp;
    let token = generate_jwt(claims)?;

    tracing::info!("User {} logged in (school: {:?})", user.email, school_id);

    Ok(ApiResponse::success(json!({
        "token": token,
        "expires_at": expires_at,
        "user": {
            "id": user.id,
            "name": user.name,
            "email": user.email,
        },
        "school_id": school_id,
        "schools": schools.iter().map(|s| json!({
            "id": s.id,
            "name": s.name,
            "slug": s.slug,
        })).collect::<Vec<_>>(),
    })))
}
