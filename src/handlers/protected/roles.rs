use axum::extract::{Extension, Path, Query};
use serde::Deserialize;
use serde_json::Value;
use uuid::Uuid;

use crate::auth::gate::require_permission;
use crate::config;
use crate::database::models::{Permission, Role};
use crate::database::DatabaseManager;
use crate::error::ApiError;
use crate::middleware::{ActiveSchool, ApiResponse, ApiResult, AuthUser};
use crate::services::role_service::{BulkDeleteOutcome, CreateRole, RoleService, RoleSummary, UpdateRole};

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub q: String,
    pub limit: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct BulkDeleteRequest {
    /// Raw ids as submitted; non-numeric entries are skipped, not errors
    pub ids: Vec<Value>,
}

#[derive(Debug, Deserialize)]
pub struct PermissionIds {
    pub permission_ids: Vec<i64>,
}

/// GET /api/roles - roles visible under the active school
pub async fn index(
    Extension(auth): Extension<AuthUser>,
    Extension(school): Extension<ActiveSchool>,
) -> ApiResult<Vec<RoleSummary>> {
    let pool = DatabaseManager::pool().await?;
    require_permission(&pool, auth.user_id, Some(school.0.id), "roles.view").await?;

    let roles = RoleService::new(pool).list(Some(school.0.id)).await?;
    Ok(ApiResponse::success(roles))
}

/// GET /api/roles/search?q= - substring search within the visible scope
pub async fn search(
    Extension(auth): Extension<AuthUser>,
    Extension(school): Extension<ActiveSchool>,
    Query(query): Query<SearchQuery>,
) -> ApiResult<Vec<Role>> {
    let pool = DatabaseManager::pool().await?;
    require_permission(&pool, auth.user_id, Some(school.0.id), "roles.view").await?;

    let cfg = &config::config().api;
    let limit = query
        .limit
        .unwrap_or(cfg.default_page_size)
        .clamp(1, cfg.max_page_size);

    let roles = RoleService::new(pool)
        .search(Some(school.0.id), query.q.trim(), limit)
        .await?;
    Ok(ApiResponse::success(roles))
}

/// POST /api/roles - create a role under the active school
pub async fn store(
    Extension(auth): Extension<AuthUser>,
    Extension(school): Extension<ActiveSchool>,
    axum::Json(req): axum::Json<CreateRole>,
) -> ApiResult<RoleSummary> {
    let pool = DatabaseManager::pool().await?;
    require_permission(&pool, auth.user_id, Some(school.0.id), "roles.create").await?;

    validate_role_name(&req.name)?;
    if req.display_name.trim().is_empty() {
        return Err(ApiError::field_error("display_name", "Display name is required"));
    }

    let role = RoleService::new(pool).create(Some(school.0.id), req).await?;
    Ok(ApiResponse::created(role))
}

/// GET /api/roles/:id
pub async fn show(
    Extension(auth): Extension<AuthUser>,
    Extension(school): Extension<ActiveSchool>,
    Path(role_id): Path<i64>,
) -> ApiResult<RoleSummary> {
    let pool = DatabaseManager::pool().await?;
    require_permission(&pool, auth.user_id, Some(school.0.id), "roles.view").await?;

    let role = RoleService::new(pool).get(role_id, Some(school.0.id)).await?;
    Ok(ApiResponse::success(role))
}

/// PATCH /api/roles/:id - update role metadata
pub async fn update(
    Extension(auth): Extension<AuthUser>,
    Extension(school): Extension<ActiveSchool>,
    Path(role_id): Path<i64>,
    axum::Json(req): axum::Json<UpdateRole>,
) -> ApiResult<Role> {
    let pool = DatabaseManager::pool().await?;
    require_permission(&pool, auth.user_id, Some(school.0.id), "roles.update").await?;

    if let Some(name) = &req.name {
        validate_role_name(name)?;
    }

    let role = RoleService::new(pool).update(role_id, Some(school.0.id), req).await?;
    Ok(ApiResponse::success(role))
}

/// DELETE /api/roles/:id - rejected while users are assigned
pub async fn destroy(
    Extension(auth): Extension<AuthUser>,
    Extension(school): Extension<ActiveSchool>,
    Path(role_id): Path<i64>,
) -> ApiResult<()> {
    let pool = DatabaseManager::pool().await?;
    require_permission(&pool, auth.user_id, Some(school.0.id), "roles.delete").await?;

    RoleService::new(pool).delete(role_id, Some(school.0.id)).await?;
    Ok(ApiResponse::<()>::no_content())
}

/// DELETE /api/roles - bulk delete, skipping malformed ids
pub async fn destroy_bulk(
    Extension(auth): Extension<AuthUser>,
    Extension(school): Extension<ActiveSchool>,
    axum::Json(req): axum::Json<BulkDeleteRequest>,
) -> ApiResult<BulkDeleteOutcome> {
    let pool = DatabaseManager::pool().await?;
    require_permission(&pool, auth.user_id, Some(school.0.id), "roles.delete").await?;

    // Stringify whatever came in; parse_bulk_ids drops the garbage
    let raw_ids: Vec<String> = req
        .ids
        .iter()
        .map(|v| match v {
            Value::String(s) => s.clone(),
            Value::Number(n) => n.to_string(),
            other => other.to_string(),
        })
        .collect();

    let outcome = RoleService::new(pool)
        .bulk_delete(&raw_ids, Some(school.0.id))
        .await?;
    Ok(ApiResponse::success(outcome))
}

/// PUT /api/roles/:id/permissions - full replace; [] detaches everything
pub async fn sync_permissions(
    Extension(auth): Extension<AuthUser>,
    Extension(school): Extension<ActiveSchool>,
    Path(role_id): Path<i64>,
    axum::Json(req): axum::Json<PermissionIds>,
) -> ApiResult<Vec<Permission>> {
    let pool = DatabaseManager::pool().await?;
    require_permission(&pool, auth.user_id, Some(school.0.id), "roles.update").await?;

    let permissions = RoleService::new(pool)
        .sync_permissions(role_id, Some(school.0.id), &req.permission_ids)
        .await?;
    Ok(ApiResponse::success(permissions))
}

/// POST /api/roles/:id/permissions - additive merge, never detaches
pub async fn merge_permissions(
    Extension(auth): Extension<AuthUser>,
    Extension(school): Extension<ActiveSchool>,
    Path(role_id): Path<i64>,
    axum::Json(req): axum::Json<PermissionIds>,
) -> ApiResult<Vec<Permission>> {
    let pool = DatabaseManager::pool().await?;
    require_permission(&pool, auth.user_id, Some(school.0.id), "roles.update").await?;

    let permissions = RoleService::new(pool)
        .merge_permissions(role_id, Some(school.0.id), &req.permission_ids)
        .await?;
    Ok(ApiResponse::success(permissions))
}

/// DELETE /api/roles/:id/permissions - detach only the listed permissions
pub async fn remove_permissions(
    Extension(auth): Extension<AuthUser>,
    Extension(school): Extension<ActiveSchool>,
    Path(role_id): Path<i64>,
    axum::Json(req): axum::Json<PermissionIds>,
) -> ApiResult<Vec<Permission>> {
    let pool = DatabaseManager::pool().await?;
    require_permission(&pool, auth.user_id, Some(school.0.id), "roles.update").await?;

    let permissions = RoleService::new(pool)
        .remove_permissions(role_id, Some(school.0.id), &req.permission_ids)
        .await?;
    Ok(ApiResponse::success(permissions))
}

/// POST /api/roles/:id/users/:user_id - assign the role under this scope
pub async fn assign_user(
    Extension(auth): Extension<AuthUser>,
    Extension(school): Extension<ActiveSchool>,
    Path((role_id, user_id)): Path<(i64, Uuid)>,
) -> ApiResult<()> {
    let pool = DatabaseManager::pool().await?;
    require_permission(&pool, auth.user_id, Some(school.0.id), "roles.assign").await?;

    RoleService::new(pool)
        .assign_to_user(role_id, user_id, Some(school.0.id))
        .await?;
    Ok(ApiResponse::with_status((), axum::http::StatusCode::CREATED))
}

/// DELETE /api/roles/:id/users/:user_id - remove an assignment
pub async fn remove_user(
    Extension(auth): Extension<AuthUser>,
    Extension(school): Extension<ActiveSchool>,
    Path((role_id, user_id)): Path<(i64, Uuid)>,
) -> ApiResult<()> {
    let pool = DatabaseManager::pool().await?;
    require_permission(&pool, auth.user_id, Some(school.0.id), "roles.assign").await?;

    RoleService::new(pool)
        .remove_from_user(role_id, user_id, Some(school.0.id))
        .await?;
    Ok(ApiResponse::<()>::no_content())
}

fn validate_role_name(name: &str) -> Result<(), ApiError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(ApiError::field_error("name", "Name is required"));
    }
    if name.len() > 80 {
        return Err(ApiError::field_error("name", "Name must be at most 80 characters"));
    }
    Ok(())
}
