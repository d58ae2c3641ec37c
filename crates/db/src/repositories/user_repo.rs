//! Repository for the `users` table.

use sqlx::PgPool;
use savings_core::types::DbId;

use crate::models::user::{CreateUser, User};

/// Column list shared across queries, qualified for the `roles` join.
const COLUMNS: &str = "u.id, u.username, u.password_hash, u.role_id, r.name AS role, \
                       u.is_active, u.created_at, u.updated_at";

/// Provides lookups and creation for users.
pub struct UserRepo;

impl UserRepo {
    /// Insert a new user, resolving the role by name. Returns the created row.
    pub async fn create(pool: &PgPool, input: &CreateUser) -> Result<User, sqlx::Error> {
        let id: DbId = sqlx::query_scalar(
            "INSERT INTO users (username, password_hash, role_id)
             VALUES ($1, $2, (SELECT id FROM roles WHERE name = $3))
             RETURNING id",
        )
        .bind(&input.username)
        .bind(&input.password_hash)
        .bind(&input.role)
        .fetch_one(pool)
        .await?;
        Self::find_by_id(pool, id)
            .await?
            .ok_or(sqlx::Error::RowNotFound)
    }

    /// Find a user by internal ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<User>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM users u JOIN roles r ON r.id = u.role_id WHERE u.id = $1"
        );
        sqlx::query_as::<_, User>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Find a user by username (case-sensitive).
    pub async fn find_by_username(
        pool: &PgPool,
        username: &str,
    ) -> Result<Option<User>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM users u JOIN roles r ON r.id = u.role_id WHERE u.username = $1"
        );
        sqlx::query_as::<_, User>(&query)
            .bind(username)
            .fetch_optional(pool)
            .await
    }

    /// Number of users; the server seeds an admin when this is zero.
    pub async fn count(pool: &PgPool) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*)::BIGINT FROM users")
            .fetch_one(pool)
            .await
    }
}
