use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A named permission, `module.action` by convention. Permissions are
/// global; only their attachment to roles/users is tenant-scoped.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Permission {
    pub id: i64,
    pub name: String,
    pub display_name: String,
    pub created_at: DateTime<Utc>,
}

impl Permission {
    /// Split `module.action` into its halves. Returns None for names that
    /// do not follow the convention, which callers skip rather than error on.
    pub fn module_action(name: &str) -> Option<(&str, &str)> {
        let (module, action) = name.split_once('.')?;
        if module.is_empty() || action.is_empty() {
            return None;
        }
        Some((module, action))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_well_formed_names() {
        assert_eq!(Permission::module_action("roles.update"), Some(("roles", "update")));
        assert_eq!(
            Permission::module_action("settings.manage.all"),
            Some(("settings", "manage.all"))
        );
    }

    #[test]
    fn rejects_malformed_names() {
        assert_eq!(Permission::module_action("roles"), None);
        assert_eq!(Permission::module_action(".update"), None);
        assert_eq!(Permission::module_action("roles."), None);
        assert_eq!(Permission::module_action(""), None);
    }
}
