//! Database service for tenant-reset.
//!
//! Only two columns of the seed user table are touched: `id` and `password`.
//! Rows are never inserted here.

use crate::models::{DeleteOutcome, UserId};
use async_trait::async_trait;
use service_core::error::AppError;
use service_core::utils::password::PasswordHashString;
use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions};
use std::time::Duration;
use tracing::{info, instrument};

/// Table holding the environment's seed users.
pub const USER_TABLE: &str = "landing_seeduser";

/// User persistence operations the reset needs.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// All user ids, ascending.
    async fn list_user_ids(&self) -> Result<Vec<UserId>, AppError>;

    /// Delete one user. A foreign-key violation is reported as
    /// [`DeleteOutcome::Referenced`]; any other failure is an error.
    async fn delete_user(&self, id: UserId) -> Result<DeleteOutcome, AppError>;

    /// Overwrite password hashes in one statement. Returns rows updated.
    async fn set_password_hashes(
        &self,
        updates: &[(UserId, PasswordHashString)],
    ) -> Result<u64, AppError>;
}

/// Database connection pool wrapper.
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Create a new database connection pool.
    #[instrument(skip(options), fields(service = "tenant-reset"))]
    pub async fn new(options: PgConnectOptions, max_connections: u32) -> Result<Self, AppError> {
        info!(
            host = %options.get_host(),
            port = options.get_port(),
            database = ?options.get_database(),
            max_connections = max_connections,
            "Connecting to PostgreSQL"
        );

        let pool = PgPoolOptions::new()
            .max_connections(max_connections.max(1))
            .acquire_timeout(Duration::from_secs(30))
            .connect_with(options)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to connect: {}", e)))?;

        info!("PostgreSQL connection pool established");

        Ok(Self { pool })
    }

    /// Confirm the user table is reachable before anything destructive runs.
    #[instrument(skip(self))]
    pub async fn health_check(&self) -> Result<(), AppError> {
        let query = format!("SELECT 1 FROM {} LIMIT 1", USER_TABLE);
        sqlx::query(&query)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Health check failed: {}", e)))?;
        Ok(())
    }

    /// Close every pooled connection. Further queries fail.
    pub async fn close(&self) {
        self.pool.close().await;
        info!("PostgreSQL connection pool closed");
    }
}

#[async_trait]
impl UserStore for Database {
    #[instrument(skip(self))]
    async fn list_user_ids(&self) -> Result<Vec<UserId>, AppError> {
        let query = format!("SELECT id::bigint FROM {} ORDER BY id", USER_TABLE);

        sqlx::query_scalar::<_, i64>(&query)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to list users: {}", e)))
    }

    #[instrument(skip(self))]
    async fn delete_user(&self, id: UserId) -> Result<DeleteOutcome, AppError> {
        let query = format!("DELETE FROM {} WHERE id = $1", USER_TABLE);

        match sqlx::query(&query).bind(id).execute(&self.pool).await {
            Ok(result) if result.rows_affected() == 0 => Ok(DeleteOutcome::Missing),
            Ok(_) => Ok(DeleteOutcome::Deleted),
            Err(sqlx::Error::Database(db_err)) if db_err.is_foreign_key_violation() => {
                tracing::debug!(
                    user_id = id,
                    constraint = ?db_err.constraint(),
                    "User still referenced, leaving in place"
                );
                Ok(DeleteOutcome::Referenced)
            }
            Err(e) => Err(AppError::DatabaseError(anyhow::anyhow!(
                "Failed to delete user {}: {}",
                id,
                e
            ))),
        }
    }

    #[instrument(skip(self, updates), fields(count = updates.len()))]
    async fn set_password_hashes(
        &self,
        updates: &[(UserId, PasswordHashString)],
    ) -> Result<u64, AppError> {
        if updates.is_empty() {
            return Ok(0);
        }

        let ids: Vec<i64> = updates.iter().map(|(id, _)| *id).collect();
        let hashes: Vec<String> = updates
            .iter()
            .map(|(_, hash)| hash.as_str().to_string())
            .collect();

        let query = format!(
            r#"
            UPDATE {table} AS u
            SET password = v.password
            FROM UNNEST($1::bigint[], $2::text[]) AS v(id, password)
            WHERE u.id = v.id
            "#,
            table = USER_TABLE
        );

        let result = sqlx::query(&query)
            .bind(ids)
            .bind(hashes)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                AppError::DatabaseError(anyhow::anyhow!("Failed to reset passwords: {}", e))
            })?;

        info!(rows = result.rows_affected(), "Password hashes updated");
        Ok(result.rows_affected())
    }
}
