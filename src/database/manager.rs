use sqlx::{postgres::PgPoolOptions, PgPool};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::OnceCell;
use tracing::info;

use crate::config;

/// Errors from DatabaseManager
#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("Missing configuration: {0}")]
    ConfigMissing(&'static str),

    #[error("Invalid database URL")]
    InvalidDatabaseUrl,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Query error: {0}")]
    QueryError(String),

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

static POOL: OnceCell<PgPool> = OnceCell::const_new();

/// Connection pool manager for the shared campus database.
///
/// All tenants live in one database, scoped by school_id columns, so a
/// single lazily-created pool is shared across the process.
pub struct DatabaseManager;

impl DatabaseManager {
    /// Get the shared database pool, creating it on first use
    pub async fn pool() -> Result<PgPool, DatabaseError> {
        let pool = POOL
            .get_or_try_init(|| async {
                let connection_string = Self::build_connection_string()?;
                let cfg = &config::config().database;

                let pool = PgPoolOptions::new()
                    .max_connections(cfg.max_connections)
                    .acquire_timeout(Duration::from_secs(cfg.connection_timeout))
                    .connect(&connection_string)
                    .await?;

                info!("Created database pool ({} max connections)", cfg.max_connections);
                Ok::<_, DatabaseError>(pool)
            })
            .await?;

        Ok(pool.clone())
    }

    /// Build the connection string from DATABASE_URL, optionally swapping
    /// the database name from CAMPUS_DB_NAME (useful for test databases)
    fn build_connection_string() -> Result<String, DatabaseError> {
        let base = std::env::var("DATABASE_URL")
            .map_err(|_| DatabaseError::ConfigMissing("DATABASE_URL"))?;

        let mut url = url::Url::parse(&base).map_err(|_| DatabaseError::InvalidDatabaseUrl)?;

        if let Ok(db_name) = std::env::var("CAMPUS_DB_NAME") {
            if !Self::is_valid_db_name(&db_name) {
                return Err(DatabaseError::InvalidDatabaseUrl);
            }
            url.set_path(&format!("/{}", db_name));
        }

        Ok(url.to_string())
    }

    /// Pings the pool to ensure connectivity
    pub async fn health_check() -> Result<(), DatabaseError> {
        let pool = Self::pool().await?;
        sqlx::query("SELECT 1").execute(&pool).await?;
        Ok(())
    }

    /// Close the pool (e.g., on shutdown)
    pub async fn close() {
        if let Some(pool) = POOL.get() {
            pool.close().await;
            info!("Closed database pool");
        }
    }

    /// Validate database names to prevent injection via CAMPUS_DB_NAME
    fn is_valid_db_name(name: &str) -> bool {
        !name.is_empty()
            && name.chars().next().is_some_and(|c| c.is_ascii_alphabetic())
            && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validates_db_names() {
        assert!(DatabaseManager::is_valid_db_name("campus"));
        assert!(DatabaseManager::is_valid_db_name("campus_test_42"));
        assert!(!DatabaseManager::is_valid_db_name(""));
        assert!(!DatabaseManager::is_valid_db_name("42campus"));
        assert!(!DatabaseManager::is_valid_db_name("campus-test"));
        assert!(!DatabaseManager::is_valid_db_name("campus; DROP DATABASE"));
    }
}
