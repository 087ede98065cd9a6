use axum::extract::{Extension, Path};
use serde_json::Value;

use crate::auth::gate::require_permission;
use crate::database::models::Setting;
use crate::database::DatabaseManager;
use crate::middleware::{ActiveSchool, ApiResponse, ApiResult, AuthUser};
use crate::services::SettingsService;

/// GET /api/settings/:group - global defaults merged with this school's
/// overrides
pub async fn show(
    Extension(auth): Extension<AuthUser>,
    Extension(school): Extension<ActiveSchool>,
    Path(group): Path<String>,
) -> ApiResult<Value> {
    let pool = DatabaseManager::pool().await?;
    require_permission(&pool, auth.user_id, Some(school.0.id), "settings.view").await?;

    let merged = SettingsService::new(pool)
        .merged(&group, Some(school.0.id))
        .await?;
    Ok(ApiResponse::success(merged))
}

/// POST /api/settings/:group - store this school's override blob
pub async fn store(
    Extension(auth): Extension<AuthUser>,
    Extension(school): Extension<ActiveSchool>,
    Path(group): Path<String>,
    axum::Json(data): axum::Json<Value>,
) -> ApiResult<Setting> {
    let pool = DatabaseManager::pool().await?;
    require_permission(&pool, auth.user_id, Some(school.0.id), "settings.manage").await?;

    let setting = SettingsService::new(pool)
        .put(&group, Some(school.0.id), data)
        .await?;
    Ok(ApiResponse::success(setting))
}
