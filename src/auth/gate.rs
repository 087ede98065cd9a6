use sqlx::PgPool;
use uuid::Uuid;

use crate::error::ApiError;

/// Check whether a user holds a named permission under the active school.
///
/// A permission is granted when:
/// - the user was granted it directly (permission_user), or
/// - any role assigned to the user carries it (role_user -> role_permission),
///
/// where the granting role and the assignment itself are either global
/// (school_id NULL) or scoped to the active school. With no active school,
/// only fully global grants count.
pub async fn user_has_permission(
    pool: &PgPool,
    user_id: Uuid,
    active_school: Option<i64>,
    permission: &str,
) -> Result<bool, sqlx::Error> {
    let granted: bool = sqlx::query_scalar(
        r#"
        SELECT EXISTS (
            SELECT 1
            FROM role_user ru
            JOIN roles r ON r.id = ru.role_id
            JOIN role_permission rp ON rp.role_id = r.id
            JOIN permissions p ON p.id = rp.permission_id
            WHERE ru.user_id = $1
              AND p.name = $2
              AND (r.school_id IS NULL OR r.school_id = $3)
              AND (ru.school_id IS NULL OR ru.school_id = $3)

            UNION ALL

            SELECT 1
            FROM permission_user pu
            JOIN permissions p ON p.id = pu.permission_id
            WHERE pu.user_id = $1
              AND p.name = $2
              AND (pu.school_id IS NULL OR pu.school_id = $3)
        )
        "#,
    )
    .bind(user_id)
    .bind(permission)
    .bind(active_school)
    .fetch_one(pool)
    .await?;

    Ok(granted)
}

/// Gate an operation on a permission, 403 on failure.
pub async fn require_permission(
    pool: &PgPool,
    user_id: Uuid,
    active_school: Option<i64>,
    permission: &str,
) -> Result<(), ApiError> {
    let granted = user_has_permission(pool, user_id, active_school, permission)
        .await
        .map_err(|e| {
            tracing::error!("Permission check failed for '{}': {}", permission, e);
            ApiError::internal_server_error("An error occurred while processing your request")
        })?;

    if !granted {
        tracing::warn!(
            "Authorization denied: user {} lacks '{}' (school: {:?})",
            user_id,
            permission,
            active_school
        );
        return Err(ApiError::forbidden(format!(
            "You do not have the '{}' permission",
            permission
        )));
    }

    Ok(())
}
