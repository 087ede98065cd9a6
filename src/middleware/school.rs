use axum::{extract::Request, middleware::Next, response::Response};
use sqlx::PgPool;

use crate::database::models::School;
use crate::database::DatabaseManager;
use crate::error::ApiError;

use super::auth::AuthUser;

/// The resolved active school (tenant) for this request, injected by
/// `require_school_middleware`. Handlers behind that middleware can rely
/// on the school existing and being live.
#[derive(Clone, Debug)]
pub struct ActiveSchool(pub School);

/// Resolve the active school carried in the JWT claims against the schools
/// table. Requests with no active school, or one that has been deleted,
/// are rejected with 403 rather than falling through tenant-less.
pub async fn require_school_middleware(
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let auth_user = request
        .extensions()
        .get::<AuthUser>()
        .ok_or_else(|| ApiError::unauthorized("Authentication required before school resolution"))?
        .clone();

    let school_id = auth_user.school_id.ok_or_else(|| {
        tracing::warn!("Request to school-scoped route with no active school (user {})", auth_user.user_id);
        ApiError::forbidden("No active school selected")
    })?;

    let pool = DatabaseManager::pool().await?;
    let school = resolve_school(&pool, school_id).await?.ok_or_else(|| {
        tracing::warn!("Active school {} not found or deleted (user {})", school_id, auth_user.user_id);
        ApiError::forbidden("Active school is not available")
    })?;

    tracing::debug!("Active school resolved: {} ({})", school.name, school.id);

    request.extensions_mut().insert(ActiveSchool(school));

    Ok(next.run(request).await)
}

/// Look up a live (non-deleted) school by id
pub async fn resolve_school(pool: &PgPool, school_id: i64) -> Result<Option<School>, ApiError> {
    let school = sqlx::query_as::<_, School>(
        "SELECT * FROM schools WHERE id = $1 AND deleted_at IS NULL",
    )
    .bind(school_id)
    .fetch_optional(pool)
    .await?;

    Ok(school)
}
