use axum::extract::{Extension, Path};

use crate::auth::gate::require_permission;
use crate::database::models::School;
use crate::database::DatabaseManager;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::services::school_service::{CreateSchool, SchoolService, UpdateSchool};

/// GET /api/schools - all live schools (operator view)
pub async fn index(Extension(auth): Extension<AuthUser>) -> ApiResult<Vec<School>> {
    let pool = DatabaseManager::pool().await?;
    require_permission(&pool, auth.user_id, auth.school_id, "schools.view").await?;

    let schools = SchoolService::new(pool).list().await?;
    Ok(ApiResponse::success(schools))
}

/// POST /api/schools - create a tenant
pub async fn store(
    Extension(auth): Extension<AuthUser>,
    axum::Json(req): axum::Json<CreateSchool>,
) -> ApiResult<School> {
    let pool = DatabaseManager::pool().await?;
    require_permission(&pool, auth.user_id, auth.school_id, "schools.manage").await?;

    if req.name.trim().is_empty() {
        return Err(crate::error::ApiError::field_error("name", "Name is required"));
    }

    let school = SchoolService::new(pool).create(req).await?;
    Ok(ApiResponse::created(school))
}

/// GET /api/schools/:id
pub async fn show(
    Extension(auth): Extension<AuthUser>,
    Path(school_id): Path<i64>,
) -> ApiResult<School> {
    let pool = DatabaseManager::pool().await?;
    require_permission(&pool, auth.user_id, auth.school_id, "schools.view").await?;

    let school = SchoolService::new(pool).get(school_id).await?;
    Ok(ApiResponse::success(school))
}

/// PATCH /api/schools/:id - update name and/or settings blob
pub async fn update(
    Extension(auth): Extension<AuthUser>,
    Path(school_id): Path<i64>,
    axum::Json(req): axum::Json<UpdateSchool>,
) -> ApiResult<School> {
    let pool = DatabaseManager::pool().await?;
    require_permission(&pool, auth.user_id, auth.school_id, "schools.manage").await?;

    let school = SchoolService::new(pool).update(school_id, req).await?;
    Ok(ApiResponse::success(school))
}

/// DELETE /api/schools/:id - soft delete, never cascades
pub async fn destroy(
    Extension(auth): Extension<AuthUser>,
    Path(school_id): Path<i64>,
) -> ApiResult<()> {
    let pool = DatabaseManager::pool().await?;
    require_permission(&pool, auth.user_id, auth.school_id, "schools.manage").await?;

    SchoolService::new(pool).delete(school_id).await?;
    Ok(ApiResponse::<()>::no_content())
}
