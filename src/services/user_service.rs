use sqlx::PgPool;
use uuid::Uuid;

use crate::database::models::{School, User};

#[derive(Debug, thiserror::Error)]
pub enum UserError {
    #[error("User not found")]
    NotFound,
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

pub struct UserService {
    pool: PgPool,
}

impl UserService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn find_by_email(&self, email: &str) -> Result<Option<User>, UserError> {
        let user = sqlx::query_as::<_, User>(
            "SELECT * FROM users WHERE email = $1 AND deleted_at IS NULL",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    pub async fn get(&self, user_id: Uuid) -> Result<User, UserError> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1 AND deleted_at IS NULL")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(UserError::NotFound)
    }

    pub async fn is_member_of(&self, user_id: Uuid, school_id: i64) -> Result<bool, UserError> {
        let member: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM school_user WHERE user_id = $1 AND school_id = $2)",
        )
        .bind(user_id)
        .bind(school_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(member)
    }

    /// Live schools the user belongs to
    pub async fn schools_of(&self, user_id: Uuid) -> Result<Vec<School>, UserError> {
        let schools = sqlx::query_as::<_, School>(
            r#"
            SELECT s.* FROM schools s
            JOIN school_user su ON su.school_id = s.id
            WHERE su.user_id = $1 AND s.deleted_at IS NULL
            ORDER BY s.name
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(schools)
    }
}
