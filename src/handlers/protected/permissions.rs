use std::collections::BTreeMap;

use axum::extract::Extension;

use crate::auth::gate::require_permission;
use crate::database::models::Permission;
use crate::database::DatabaseManager;
use crate::middleware::{ActiveSchool, ApiResponse, ApiResult, AuthUser};
use crate::services::permission_service::{ModuleAction, PermissionService};

/// GET /api/permissions - flat list of all permissions
pub async fn index(
    Extension(auth): Extension<AuthUser>,
    Extension(school): Extension<ActiveSchool>,
) -> ApiResult<Vec<Permission>> {
    let pool = DatabaseManager::pool().await?;
    require_permission(&pool, auth.user_id, Some(school.0.id), "permissions.view").await?;

    let permissions = PermissionService::new(pool).list().await.map_err(|e| {
        tracing::error!("Permission listing failed: {}", e);
        crate::error::ApiError::internal_server_error(
            "An error occurred while processing your request",
        )
    })?;
    Ok(ApiResponse::success(permissions))
}

/// GET /api/permissions/grouped - bucketed by module, malformed names skipped
pub async fn grouped(
    Extension(auth): Extension<AuthUser>,
    Extension(school): Extension<ActiveSchool>,
) -> ApiResult<BTreeMap<String, Vec<ModuleAction>>> {
    let pool = DatabaseManager::pool().await?;
    require_permission(&pool, auth.user_id, Some(school.0.id), "permissions.view").await?;

    let grouped = PermissionService::new(pool).grouped().await.map_err(|e| {
        tracing::error!("Permission grouping failed: {}", e);
        crate::error::ApiError::internal_server_error(
            "An error occurred while processing your request",
        )
    })?;
    Ok(ApiResponse::success(grouped))
}
