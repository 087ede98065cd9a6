use serde_json::{Map, Value};
use sqlx::PgPool;

use crate::database::models::Setting;

#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("Invalid settings group name: {0}")]
    InvalidGroupName(String),
    #[error("Settings payload must be a JSON object")]
    NotAnObject,
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Named settings groups stored as jsonb blobs: one global row
/// (school_id NULL) holding defaults, one optional override row per
/// school, merged on read.
pub struct SettingsService {
    pool: PgPool,
}

impl SettingsService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Read a settings group as seen by the given tenant: global defaults
    /// with the school's overrides merged on top. Missing rows read as
    /// empty objects.
    pub async fn merged(&self, group: &str, school_id: Option<i64>) -> Result<Value, SettingsError> {
        validate_group_name(group)?;

        let global = self.fetch(group, None).await?;
        let base = global.map(|s| s.data).unwrap_or_else(|| Value::Object(Map::new()));

        let Some(school_id) = school_id else {
            return Ok(base);
        };

        let overrides = self.fetch(group, Some(school_id)).await?;
        match overrides {
            Some(setting) => Ok(merge_values(base, setting.data)),
            None => Ok(base),
        }
    }

    /// Upsert the blob for one scope (global when school_id is None)
    pub async fn put(
        &self,
        group: &str,
        school_id: Option<i64>,
        data: Value,
    ) -> Result<Setting, SettingsError> {
        validate_group_name(group)?;

        if !data.is_object() {
            return Err(SettingsError::NotAnObject);
        }

        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query_as::<_, Setting>(
            r#"
            UPDATE settings
            SET data = $3, updated_at = now()
            WHERE name = $1 AND school_id IS NOT DISTINCT FROM $2
            RETURNING *
            "#,
        )
        .bind(group)
        .bind(school_id)
        .bind(&data)
        .fetch_optional(&mut *tx)
        .await?;

        let setting = match updated {
            Some(setting) => setting,
            None => {
                sqlx::query_as::<_, Setting>(
                    r#"
                    INSERT INTO settings (name, school_id, data)
                    VALUES ($1, $2, $3)
                    RETURNING *
                    "#,
                )
                .bind(group)
                .bind(school_id)
                .bind(&data)
                .fetch_one(&mut *tx)
                .await?
            }
        };

        tx.commit().await?;

        tracing::info!("Stored settings group '{}' (school {:?})", group, school_id);
        Ok(setting)
    }

    async fn fetch(&self, group: &str, school_id: Option<i64>) -> Result<Option<Setting>, SettingsError> {
        let setting = sqlx::query_as::<_, Setting>(
            "SELECT * FROM settings WHERE name = $1 AND school_id IS NOT DISTINCT FROM $2",
        )
        .bind(group)
        .bind(school_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(setting)
    }
}

/// Group names are short identifiers: lowercase alphanumerics,
/// underscores and hyphens
pub fn validate_group_name(group: &str) -> Result<(), SettingsError> {
    let valid = !group.is_empty()
        && group.len() <= 60
        && group
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' || c == '-');

    if !valid {
        return Err(SettingsError::InvalidGroupName(group.to_string()));
    }
    Ok(())
}

/// Merge tenant overrides onto global defaults. Override keys win;
/// nested objects merge key-wise; everything else replaces wholesale.
pub fn merge_values(base: Value, overrides: Value) -> Value {
    match (base, overrides) {
        (Value::Object(mut base_map), Value::Object(override_map)) => {
            for (key, override_value) in override_map {
                let merged = match base_map.remove(&key) {
                    Some(base_value) => merge_values(base_value, override_value),
                    None => override_value,
                };
                base_map.insert(key, merged);
            }
            Value::Object(base_map)
        }
        (_, overrides) => overrides,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn override_keys_win() {
        let merged = merge_values(
            json!({"grading": "letter", "locale": "en"}),
            json!({"grading": "percent"}),
        );
        assert_eq!(merged, json!({"grading": "percent", "locale": "en"}));
    }

    #[test]
    fn nested_objects_merge_keywise() {
        let merged = merge_values(
            json!({"terms": {"count": 3, "names": ["fall", "spring", "summer"]}}),
            json!({"terms": {"count": 2}}),
        );
        assert_eq!(
            merged,
            json!({"terms": {"count": 2, "names": ["fall", "spring", "summer"]}})
        );
    }

    #[test]
    fn non_object_overrides_replace() {
        let merged = merge_values(json!({"a": {"b": 1}}), json!({"a": [1, 2]}));
        assert_eq!(merged, json!({"a": [1, 2]}));
    }

    #[test]
    fn group_name_validation() {
        assert!(validate_group_name("attendance").is_ok());
        assert!(validate_group_name("sms_providers").is_ok());
        assert!(validate_group_name("").is_err());
        assert!(validate_group_name("General Settings").is_err());
    }
}
