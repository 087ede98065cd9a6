use std::collections::BTreeMap;

use serde::Serialize;
use sqlx::PgPool;

use crate::database::models::Permission;

#[derive(Debug, thiserror::Error)]
pub enum PermissionError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// One permission within a module group: the `action` half plus enough
/// identity to build an assignment UI from
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ModuleAction {
    pub id: i64,
    pub action: String,
    pub name: String,
    pub display_name: String,
}

pub struct PermissionService {
    pool: PgPool,
}

impl PermissionService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn list(&self) -> Result<Vec<Permission>, PermissionError> {
        let permissions = sqlx::query_as::<_, Permission>("SELECT * FROM permissions ORDER BY name")
            .fetch_all(&self.pool)
            .await?;
        Ok(permissions)
    }

    /// Permissions bucketed by the `module` half of `module.action`
    pub async fn grouped(&self) -> Result<BTreeMap<String, Vec<ModuleAction>>, PermissionError> {
        let permissions = self.list().await?;
        Ok(group_by_module(&permissions))
    }
}

/// Group permissions by module. Names that do not follow the
/// `module.action` convention are skipped, not errors.
pub fn group_by_module(permissions: &[Permission]) -> BTreeMap<String, Vec<ModuleAction>> {
    let mut grouped: BTreeMap<String, Vec<ModuleAction>> = BTreeMap::new();

    for permission in permissions {
        let Some((module, action)) = Permission::module_action(&permission.name) else {
            tracing::debug!("Skipping malformed permission name '{}'", permission.name);
            continue;
        };

        grouped.entry(module.to_string()).or_default().push(ModuleAction {
            id: permission.id,
            action: action.to_string(),
            name: permission.name.clone(),
            display_name: permission.display_name.clone(),
        });
    }

    grouped
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn permission(id: i64, name: &str) -> Permission {
        Permission {
            id,
            name: name.to_string(),
            display_name: name.to_string(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn groups_by_module() {
        let perms = vec![
            permission(1, "roles.view"),
            permission(2, "roles.update"),
            permission(3, "settings.manage"),
        ];
        let grouped = group_by_module(&perms);

        assert_eq!(grouped.len(), 2);
        assert_eq!(grouped["roles"].len(), 2);
        assert_eq!(grouped["roles"][0].action, "view");
        assert_eq!(grouped["settings"][0].name, "settings.manage");
    }

    #[test]
    fn malformed_names_are_skipped_not_errors() {
        let perms = vec![
            permission(1, "roles.view"),
            permission(2, "nodot"),
            permission(3, ".leading"),
            permission(4, "trailing."),
        ];
        let grouped = group_by_module(&perms);

        assert_eq!(grouped.len(), 1);
        assert_eq!(grouped["roles"].len(), 1);
    }
}
