use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A role, optionally scoped to one school.
///
/// `school_id = NULL` marks a global role: visible and assignable under
/// every tenant. Role names are unique per school, with the global scope
/// counting as its own tenant.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Role {
    pub id: i64,
    pub name: String,
    pub display_name: String,
    pub description: Option<String>,
    pub school_id: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Role {
    /// True when the role is visible under the given active school:
    /// global roles always, school roles only under their own school.
    pub fn visible_under(&self, active_school: Option<i64>) -> bool {
        match self.school_id {
            None => true,
            Some(sid) => active_school == Some(sid),
        }
    }
}
