use serde::Deserialize;
use serde_json::Value;
use sqlx::PgPool;

use crate::database::models::School;

#[derive(Debug, thiserror::Error)]
pub enum SchoolError {
    #[error("School not found")]
    NotFound,
    #[error("Slug already taken: {0}")]
    DuplicateSlug(String),
    #[error("Invalid slug: {0}")]
    InvalidSlug(String),
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

#[derive(Debug, Deserialize)]
pub struct CreateSchool {
    pub name: String,
    pub slug: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateSchool {
    pub name: Option<String>,
    pub settings: Option<Value>,
}

pub struct SchoolService {
    pool: PgPool,
}

impl SchoolService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn list(&self) -> Result<Vec<School>, SchoolError> {
        let schools = sqlx::query_as::<_, School>(
            "SELECT * FROM schools WHERE deleted_at IS NULL ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(schools)
    }

    pub async fn get(&self, school_id: i64) -> Result<School, SchoolError> {
        sqlx::query_as::<_, School>("SELECT * FROM schools WHERE id = $1 AND deleted_at IS NULL")
            .bind(school_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(SchoolError::NotFound)
    }

    pub async fn create(&self, req: CreateSchool) -> Result<School, SchoolError> {
        validate_slug(&req.slug)?;

        if self.slug_taken(&req.slug).await? {
            return Err(SchoolError::DuplicateSlug(req.slug));
        }

        let school = sqlx::query_as::<_, School>(
            r#"
            INSERT INTO schools (name, slug, settings)
            VALUES ($1, $2, '{}'::jsonb)
            RETURNING *
            "#,
        )
        .bind(&req.name)
        .bind(&req.slug)
        .fetch_one(&self.pool)
        .await?;

        tracing::info!("Created school '{}' (id {})", school.slug, school.id);
        Ok(school)
    }

    pub async fn update(&self, school_id: i64, req: UpdateSchool) -> Result<School, SchoolError> {
        let school = self.get(school_id).await?;

        let name = req.name.unwrap_or(school.name);
        let settings = req.settings.unwrap_or(school.settings);

        let updated = sqlx::query_as::<_, School>(
            r#"
            UPDATE schools
            SET name = $2, settings = $3, updated_at = now()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(school.id)
        .bind(&name)
        .bind(&settings)
        .fetch_one(&self.pool)
        .await?;

        Ok(updated)
    }

    /// Soft delete. Scoped rows (roles, settings, profiles) stay in place;
    /// the tenant just stops resolving.
    pub async fn delete(&self, school_id: i64) -> Result<(), SchoolError> {
        let result = sqlx::query(
            "UPDATE schools SET deleted_at = now() WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(school_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(SchoolError::NotFound);
        }

        tracing::info!("Soft-deleted school {}", school_id);
        Ok(())
    }

    async fn slug_taken(&self, slug: &str) -> Result<bool, SchoolError> {
        let taken: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM schools WHERE slug = $1)")
            .bind(slug)
            .fetch_one(&self.pool)
            .await?;
        Ok(taken)
    }
}

/// Slugs are URL path segments: lowercase alphanumerics and hyphens,
/// 2-60 chars, no leading/trailing hyphen
pub fn validate_slug(slug: &str) -> Result<(), SchoolError> {
    if slug.len() < 2 || slug.len() > 60 {
        return Err(SchoolError::InvalidSlug(
            "Slug must be between 2 and 60 characters".to_string(),
        ));
    }

    if slug.starts_with('-') || slug.ends_with('-') {
        return Err(SchoolError::InvalidSlug(
            "Slug cannot start or end with a hyphen".to_string(),
        ));
    }

    if !slug.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-') {
        return Err(SchoolError::InvalidSlug(
            "Slug can only contain lowercase letters, numbers, and hyphens".to_string(),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_valid_slugs() {
        assert!(validate_slug("north-high").is_ok());
        assert!(validate_slug("ps2").is_ok());
    }

    #[test]
    fn rejects_invalid_slugs() {
        assert!(validate_slug("a").is_err());
        assert!(validate_slug("-north").is_err());
        assert!(validate_slug("north-").is_err());
        assert!(validate_slug("North High").is_err());
        assert!(validate_slug("north_high").is_err());
    }
}
