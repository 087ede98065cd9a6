use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::database::models::{Permission, Role};

#[derive(Debug, thiserror::Error)]
pub enum RoleError {
    #[error("Role not found")]
    NotFound,
    #[error("Role belongs to a different school")]
    SchoolScope,
    #[error("Role name already taken: {0}")]
    DuplicateName(String),
    #[error("Role is assigned to {users} user(s)")]
    InUse { users: i64 },
    #[error("Unknown permission ids: {0:?}")]
    UnknownPermissions(Vec<i64>),
    #[error("Template role not found: {0}")]
    TemplateNotFound(i64),
    #[error("User is not a member of the role's school")]
    UserNotMember,
    #[error("Role assignment not found")]
    AssignmentNotFound,
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

#[derive(Debug, Deserialize)]
pub struct CreateRole {
    pub name: String,
    pub display_name: String,
    pub description: Option<String>,
    /// Merge the permissions of this existing role into the new one
    pub copy_from: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateRole {
    pub name: Option<String>,
    pub display_name: Option<String>,
    /// Absent = keep, explicit null = clear, string = replace
    #[serde(default, deserialize_with = "double_option")]
    pub description: Option<Option<String>>,
}

fn double_option<'de, D>(deserializer: D) -> Result<Option<Option<String>>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer).map(Some)
}

/// A role with its permissions and current assignment count, as served
/// by the roles index
#[derive(Debug, Serialize)]
pub struct RoleSummary {
    #[serde(flatten)]
    pub role: Role,
    pub users_count: i64,
    pub permissions: Vec<Permission>,
}

#[derive(Debug, Serialize)]
pub struct BulkDeleteOutcome {
    pub deleted: Vec<i64>,
    pub skipped: Vec<i64>,
}

/// Role/permission aggregate operations, all scoped by the active school.
///
/// Every entry point that touches a single role goes through
/// `load_scoped`, which turns a cross-tenant id into a scope failure
/// rather than leaking the row.
pub struct RoleService {
    pool: PgPool,
}

impl RoleService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Load a role and enforce tenant visibility: global roles pass for
    /// everyone, school roles only under their own school (even when the
    /// id was guessed).
    async fn load_scoped(&self, role_id: i64, active_school: Option<i64>) -> Result<Role, RoleError> {
        let role = sqlx::query_as::<_, Role>("SELECT * FROM roles WHERE id = $1")
            .bind(role_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(RoleError::NotFound)?;

        if !role.visible_under(active_school) {
            return Err(RoleError::SchoolScope);
        }

        Ok(role)
    }

    /// All roles visible under the active school (global + own), with
    /// permissions and assignment counts
    pub async fn list(&self, active_school: Option<i64>) -> Result<Vec<RoleSummary>, RoleError> {
        let rows = sqlx::query(
            r#"
            SELECT r.*, COALESCE(u.cnt, 0) AS users_count
            FROM roles r
            LEFT JOIN (
                SELECT role_id, COUNT(*) AS cnt FROM role_user GROUP BY role_id
            ) u ON u.role_id = r.id
            WHERE r.school_id IS NULL OR r.school_id = $1
            ORDER BY r.school_id NULLS FIRST, r.name
            "#,
        )
        .bind(active_school)
        .fetch_all(&self.pool)
        .await?;

        let mut roles = Vec::with_capacity(rows.len());
        let mut ids = Vec::with_capacity(rows.len());
        for row in rows {
            let role = Role {
                id: row.try_get("id")?,
                name: row.try_get("name")?,
                display_name: row.try_get("display_name")?,
                description: row.try_get("description")?,
                school_id: row.try_get("school_id")?,
                created_at: row.try_get("created_at")?,
                updated_at: row.try_get("updated_at")?,
            };
            let users_count: i64 = row.try_get("users_count")?;
            ids.push(role.id);
            roles.push((role, users_count));
        }

        let mut permissions_by_role = self.permissions_for_roles(&ids).await?;

        Ok(roles
            .into_iter()
            .map(|(role, users_count)| {
                let permissions = permissions_by_role.remove(&role.id).unwrap_or_default();
                RoleSummary { role, users_count, permissions }
            })
            .collect())
    }

    /// Substring search over name/display_name within the visible scope
    pub async fn search(
        &self,
        active_school: Option<i64>,
        query: &str,
        limit: i64,
    ) -> Result<Vec<Role>, RoleError> {
        let pattern = format!("%{}%", query.replace('%', "\\%").replace('_', "\\_"));

        let roles = sqlx::query_as::<_, Role>(
            r#"
            SELECT * FROM roles
            WHERE (school_id IS NULL OR school_id = $1)
              AND (name ILIKE $2 OR display_name ILIKE $2)
            ORDER BY name
            LIMIT $3
            "#,
        )
        .bind(active_school)
        .bind(pattern)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(roles)
    }

    pub async fn get(&self, role_id: i64, active_school: Option<i64>) -> Result<RoleSummary, RoleError> {
        let role = self.load_scoped(role_id, active_school).await?;
        let users_count = self.users_count(role_id).await?;
        let permissions = self.permissions_of(role_id).await?;
        Ok(RoleSummary { role, users_count, permissions })
    }

    /// Create a role under the active school (or globally when none).
    /// Name must be unique within the tenant; the same name under another
    /// school is fine. `copy_from` merges the template's permissions in.
    pub async fn create(
        &self,
        active_school: Option<i64>,
        req: CreateRole,
    ) -> Result<RoleSummary, RoleError> {
        if self.name_taken(&req.name, active_school, None).await? {
            return Err(RoleError::DuplicateName(req.name));
        }

        // Resolve the template before inserting so a bad copy_from leaves
        // nothing behind. The template must itself be visible in scope.
        let template = match req.copy_from {
            Some(template_id) => Some(
                self.load_scoped(template_id, active_school)
                    .await
                    .map_err(|e| match e {
                        RoleError::NotFound | RoleError::SchoolScope => {
                            RoleError::TemplateNotFound(template_id)
                        }
                        other => other,
                    })?,
            ),
            None => None,
        };

        let mut tx = self.pool.begin().await?;

        let role = sqlx::query_as::<_, Role>(
            r#"
            INSERT INTO roles (name, display_name, description, school_id)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(&req.name)
        .bind(&req.display_name)
        .bind(&req.description)
        .bind(active_school)
        .fetch_one(&mut *tx)
        .await?;

        if let Some(template) = template {
            sqlx::query(
                r#"
                INSERT INTO role_permission (role_id, permission_id)
                SELECT $1, permission_id FROM role_permission WHERE role_id = $2
                ON CONFLICT DO NOTHING
                "#,
            )
            .bind(role.id)
            .bind(template.id)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        tracing::info!("Created role '{}' (id {}, school {:?})", role.name, role.id, role.school_id);

        let permissions = self.permissions_of(role.id).await?;
        Ok(RoleSummary { role, users_count: 0, permissions })
    }

    /// Update role metadata; renames re-check per-tenant uniqueness
    pub async fn update(
        &self,
        role_id: i64,
        active_school: Option<i64>,
        req: UpdateRole,
    ) -> Result<Role, RoleError> {
        let role = self.load_scoped(role_id, active_school).await?;

        let name = req.name.unwrap_or_else(|| role.name.clone());
        let display_name = req.display_name.unwrap_or_else(|| role.display_name.clone());
        let description = match req.description {
            Some(value) => value,
            None => role.description.clone(),
        };

        if name != role.name && self.name_taken(&name, role.school_id, Some(role.id)).await? {
            return Err(RoleError::DuplicateName(name));
        }

        let updated = sqlx::query_as::<_, Role>(
            r#"
            UPDATE roles
            SET name = $2, display_name = $3, description = $4, updated_at = now()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(role.id)
        .bind(&name)
        .bind(&display_name)
        .bind(&description)
        .fetch_one(&self.pool)
        .await?;

        Ok(updated)
    }

    /// Delete a role. Rejected while any user is assigned: the role row
    /// and its assignments stay untouched, never silently cascaded.
    pub async fn delete(&self, role_id: i64, active_school: Option<i64>) -> Result<(), RoleError> {
        let role = self.load_scoped(role_id, active_school).await?;

        let users = self.users_count(role.id).await?;
        if users > 0 {
            return Err(RoleError::InUse { users });
        }

        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM role_permission WHERE role_id = $1")
            .bind(role.id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM roles WHERE id = $1")
            .bind(role.id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        tracing::info!("Deleted role '{}' (id {})", role.name, role.id);
        Ok(())
    }

    /// Bulk delete by raw id strings. Malformed ids are skipped silently;
    /// missing, out-of-scope and in-use roles are skipped and reported.
    pub async fn bulk_delete(
        &self,
        raw_ids: &[String],
        active_school: Option<i64>,
    ) -> Result<BulkDeleteOutcome, RoleError> {
        let mut outcome = BulkDeleteOutcome { deleted: Vec::new(), skipped: Vec::new() };

        for id in parse_bulk_ids(raw_ids) {
            match self.delete(id, active_school).await {
                Ok(()) => outcome.deleted.push(id),
                Err(RoleError::NotFound)
                | Err(RoleError::SchoolScope)
                | Err(RoleError::InUse { .. }) => outcome.skipped.push(id),
                Err(other) => return Err(other),
            }
        }

        Ok(outcome)
    }

    /// Full replace of the role's permissions; an empty list detaches all
    pub async fn sync_permissions(
        &self,
        role_id: i64,
        active_school: Option<i64>,
        permission_ids: &[i64],
    ) -> Result<Vec<Permission>, RoleError> {
        let role = self.load_scoped(role_id, active_school).await?;
        self.assert_permissions_exist(permission_ids).await?;

        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM role_permission WHERE role_id = $1")
            .bind(role.id)
            .execute(&mut *tx)
            .await?;
        if !permission_ids.is_empty() {
            sqlx::query(
                r#"
                INSERT INTO role_permission (role_id, permission_id)
                SELECT $1, unnest($2::bigint[])
                ON CONFLICT DO NOTHING
                "#,
            )
            .bind(role.id)
            .bind(permission_ids)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;

        self.permissions_of(role.id).await
    }

    /// Additive attach: existing permissions are never detached
    pub async fn merge_permissions(
        &self,
        role_id: i64,
        active_school: Option<i64>,
        permission_ids: &[i64],
    ) -> Result<Vec<Permission>, RoleError> {
        let role = self.load_scoped(role_id, active_school).await?;
        self.assert_permissions_exist(permission_ids).await?;

        if !permission_ids.is_empty() {
            sqlx::query(
                r#"
                INSERT INTO role_permission (role_id, permission_id)
                SELECT $1, unnest($2::bigint[])
                ON CONFLICT DO NOTHING
                "#,
            )
            .bind(role.id)
            .bind(permission_ids)
            .execute(&self.pool)
            .await?;
        }

        self.permissions_of(role.id).await
    }

    /// Explicit detach of the listed permissions only
    pub async fn remove_permissions(
        &self,
        role_id: i64,
        active_school: Option<i64>,
        permission_ids: &[i64],
    ) -> Result<Vec<Permission>, RoleError> {
        let role = self.load_scoped(role_id, active_school).await?;

        if !permission_ids.is_empty() {
            sqlx::query("DELETE FROM role_permission WHERE role_id = $1 AND permission_id = ANY($2)")
                .bind(role.id)
                .bind(permission_ids)
                .execute(&self.pool)
                .await?;
        }

        self.permissions_of(role.id).await
    }

    /// Assign a role to a user under the active scope. School-scoped
    /// roles require the user to be a member of that school.
    pub async fn assign_to_user(
        &self,
        role_id: i64,
        user_id: Uuid,
        active_school: Option<i64>,
    ) -> Result<(), RoleError> {
        let role = self.load_scoped(role_id, active_school).await?;

        if let Some(school_id) = role.school_id {
            let member: bool = sqlx::query_scalar(
                "SELECT EXISTS(SELECT 1 FROM school_user WHERE school_id = $1 AND user_id = $2)",
            )
            .bind(school_id)
            .bind(user_id)
            .fetch_one(&self.pool)
            .await?;

            if !member {
                return Err(RoleError::UserNotMember);
            }
        }

        // Scope is part of the assignment identity: re-assigning under the
        // same scope is a no-op, the same role under another scope is a
        // new row.
        sqlx::query(
            r#"
            INSERT INTO role_user (role_id, user_id, school_id)
            VALUES ($1, $2, $3)
            ON CONFLICT (role_id, user_id, COALESCE(school_id, 0)) DO NOTHING
            "#,
        )
        .bind(role.id)
        .bind(user_id)
        .bind(active_school)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Remove a role assignment made under the active scope
    pub async fn remove_from_user(
        &self,
        role_id: i64,
        user_id: Uuid,
        active_school: Option<i64>,
    ) -> Result<(), RoleError> {
        let role = self.load_scoped(role_id, active_school).await?;

        let result = sqlx::query(
            r#"
            DELETE FROM role_user
            WHERE role_id = $1 AND user_id = $2 AND school_id IS NOT DISTINCT FROM $3
            "#,
        )
        .bind(role.id)
        .bind(user_id)
        .bind(active_school)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RoleError::AssignmentNotFound);
        }

        Ok(())
    }

    pub async fn users_count(&self, role_id: i64) -> Result<i64, RoleError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM role_user WHERE role_id = $1")
            .bind(role_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    pub async fn permissions_of(&self, role_id: i64) -> Result<Vec<Permission>, RoleError> {
        let permissions = sqlx::query_as::<_, Permission>(
            r#"
            SELECT p.* FROM permissions p
            JOIN role_permission rp ON rp.permission_id = p.id
            WHERE rp.role_id = $1
            ORDER BY p.name
            "#,
        )
        .bind(role_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(permissions)
    }

    async fn permissions_for_roles(
        &self,
        role_ids: &[i64],
    ) -> Result<HashMap<i64, Vec<Permission>>, RoleError> {
        if role_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let rows = sqlx::query(
            r#"
            SELECT rp.role_id, p.id, p.name, p.display_name, p.created_at
            FROM role_permission rp
            JOIN permissions p ON p.id = rp.permission_id
            WHERE rp.role_id = ANY($1)
            ORDER BY p.name
            "#,
        )
        .bind(role_ids)
        .fetch_all(&self.pool)
        .await?;

        let mut by_role: HashMap<i64, Vec<Permission>> = HashMap::new();
        for row in rows {
            let role_id: i64 = row.try_get("role_id")?;
            let permission = Permission {
                id: row.try_get("id")?,
                name: row.try_get("name")?,
                display_name: row.try_get("display_name")?,
                created_at: row.try_get("created_at")?,
            };
            by_role.entry(role_id).or_default().push(permission);
        }

        Ok(by_role)
    }

    /// Name uniqueness is per tenant: NULL school_id counts as its own
    /// (global) tenant, so `IS NOT DISTINCT FROM` rather than `=`
    async fn name_taken(
        &self,
        name: &str,
        school_id: Option<i64>,
        excluding: Option<i64>,
    ) -> Result<bool, RoleError> {
        let taken: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM roles
                WHERE name = $1
                  AND school_id IS NOT DISTINCT FROM $2
                  AND ($3::bigint IS NULL OR id <> $3)
            )
            "#,
        )
        .bind(name)
        .bind(school_id)
        .bind(excluding)
        .fetch_one(&self.pool)
        .await?;
        Ok(taken)
    }

    async fn assert_permissions_exist(&self, permission_ids: &[i64]) -> Result<(), RoleError> {
        if permission_ids.is_empty() {
            return Ok(());
        }

        let found: Vec<i64> = sqlx::query_scalar("SELECT id FROM permissions WHERE id = ANY($1)")
            .bind(permission_ids)
            .fetch_all(&self.pool)
            .await?;

        let missing: Vec<i64> = permission_ids
            .iter()
            .copied()
            .filter(|id| !found.contains(id))
            .collect();

        if !missing.is_empty() {
            return Err(RoleError::UnknownPermissions(missing));
        }

        Ok(())
    }
}

/// Parse raw bulk-delete ids, silently dropping malformed/non-numeric
/// entries and duplicates while preserving order
pub fn parse_bulk_ids(raw: &[String]) -> Vec<i64> {
    let mut ids = Vec::new();
    for entry in raw {
        if let Ok(id) = entry.trim().parse::<i64>() {
            if !ids.contains(&id) {
                ids.push(id);
            }
        }
    }
    ids
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn role(school_id: Option<i64>) -> Role {
        Role {
            id: 1,
            name: "teacher".to_string(),
            display_name: "Teacher".to_string(),
            description: None,
            school_id,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn global_roles_visible_under_any_tenant() {
        let r = role(None);
        assert!(r.visible_under(None));
        assert!(r.visible_under(Some(7)));
    }

    #[test]
    fn school_roles_visible_only_under_their_school() {
        let r = role(Some(3));
        assert!(r.visible_under(Some(3)));
        assert!(!r.visible_under(Some(4)));
        assert!(!r.visible_under(None));
    }

    #[test]
    fn bulk_ids_skip_garbage() {
        let raw: Vec<String> = ["4", "abc", " 7 ", "", "4", "9.5", "-2"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(parse_bulk_ids(&raw), vec![4, 7, -2]);
    }

    #[test]
    fn bulk_ids_empty_input() {
        assert!(parse_bulk_ids(&[]).is_empty());
    }

    #[test]
    fn update_distinguishes_absent_null_and_set_description() {
        let absent: UpdateRole = serde_json::from_str(r#"{"name": "x"}"#).unwrap();
        assert_eq!(absent.description, None);

        let cleared: UpdateRole = serde_json::from_str(r#"{"description": null}"#).unwrap();
        assert_eq!(cleared.description, Some(None));

        let set: UpdateRole = serde_json::from_str(r#"{"description": "head of year"}"#).unwrap();
        assert_eq!(set.description, Some(Some("head of year".to_string())));
    }
}
