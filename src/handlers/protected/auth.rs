use axum::extract::{Extension, Path};
use serde_json::{json, Value};

use crate::auth::gate::user_has_permission;
use crate::auth::{generate_jwt, Claims};
use crate::database::DatabaseManager;
use crate::error::ApiError;
use crate::middleware::school::resolve_school;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::services::user_service::{UserError, UserService};

/// GET /api/auth/whoami - current user, memberships, active school
pub async fn whoami(Extension(auth): Extension<AuthUser>) -> ApiResult<Value> {
    let pool = DatabaseManager::pool().await?;
    let users = UserService::new(pool);

    let user = users.get(auth.user_id).await.map_err(|e| match e {
        UserError::NotFound => ApiError::unauthorized("User no longer exists"),
        UserError::Database(err) => {
            tracing::error!("whoami lookup failed: {}", err);
            ApiError::internal_server_error("An error occurred while processing your request")
        }
    })?;

    let schools = users.schools_of(user.id).await.map_err(|e| {
        tracing::error!("Membership lookup failed: {}", e);
        ApiError::internal_server_error("An error occurred while processing your request")
    })?;

    Ok(ApiResponse::success(json!({
        "user": user,
        "school_id": auth.school_id,
        "schools": schools,
    })))
}

/// POST /api/auth/school/:id - switch the active school
///
/// The target must be a live school the user belongs to (or the user
/// holds a global schools.manage grant). Returns a reissued token.
pub async fn switch_school(
    Extension(auth): Extension<AuthUser>,
    Path(school_id): Path<i64>,
) -> ApiResult<Value> {
    let pool = DatabaseManager::pool().await?;

    let school = resolve_school(&pool, school_id)
        .await?
        .ok_or_else(|| ApiError::not_found("School not found"))?;

    let users = UserService::new(pool.clone());
    let member = users.is_member_of(auth.user_id, school.id).await.map_err(|e| {
        tracing::error!("Membership check failed: {}", e);
        ApiError::internal_server_error("An error occurred while processing your request")
    })?;

    if !member {
        // Operators with a global schools.manage grant may enter any tenant
        let manager = user_has_permission(&pool, auth.user_id, None, "schools.manage")
            .await
            .map_err(|e| {
                tracing::error!("Permission check failed: {}", e);
                ApiError::internal_server_error("An error occurred while processing your request")
            })?;

        if !manager {
            tracing::warn!(
                "User {} denied switching to school {} (not a member)",
                auth.user_id,
                school.id
            );
            return Err(ApiError::forbidden("You are not a member of this school"));
        }
    }

    let claims = Claims::new(auth.user_id, auth.email.clone(), Some(school.id));
    let expires_at = claims.exp;
    let token = generate_jwt(claims)?;

    tracing::info!("User {} switched to school {}", auth.user_id, school.id);

    Ok(ApiResponse::success(json!({
        "token": token,
        "expires_at": expires_at,
        "school": school,
    })))
}
