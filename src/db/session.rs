//! Session token repository.
//!
//! Expiry is stored as absolute unix seconds; rows whose `expires_at` is not
//! in the future are treated as absent by every read.

use sqlx::SqlitePool;

use crate::{Id, Result, VaultError};

/// Repository for session token rows.
pub struct SessionRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> SessionRepository<'a> {
    /// Create a new repository instance.
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Store a token, replacing any previous row with the same token.
    pub async fn create(&self, token: &str, user_id: &Id, expires_at: i64) -> Result<()> {
        sqlx::query(
            "INSERT OR REPLACE INTO sessions (token, user_id, expires_at) VALUES (?, ?, ?)",
        )
        .bind(token)
        .bind(user_id.as_str())
        .bind(expires_at)
        .execute(self.pool)
        .await
        .map_err(|e| VaultError::Database(e.to_string()))?;

        Ok(())
    }

    /// Get the owner of a token that is still valid at `now`.
    pub async fn get_valid(&self, token: &str, now: i64) -> Result<Option<Id>> {
        let user_id: Option<String> =
            sqlx::query_scalar("SELECT user_id FROM sessions WHERE token = ? AND expires_at > ?")
                .bind(token)
                .bind(now)
                .fetch_optional(self.pool)
                .await
                .map_err(|e| VaultError::Database(e.to_string()))?;

        Ok(user_id.map(Id::from))
    }

    /// Delete a token. Returns whether a live row was removed.
    pub async fn delete(&self, token: &str, now: i64) -> Result<bool> {
        let live = sqlx::query("DELETE FROM sessions WHERE token = ? AND expires_at > ?")
            .bind(token)
            .bind(now)
            .execute(self.pool)
            .await
            .map_err(|e| VaultError::Database(e.to_string()))?;

        if live.rows_affected() == 0 {
            // drop a stale row with the same token, if any
            sqlx::query("DELETE FROM sessions WHERE token = ?")
                .bind(token)
                .execute(self.pool)
                .await
                .map_err(|e| VaultError::Database(e.to_string()))?;
        }

        Ok(live.rows_affected() > 0)
    }

    /// Delete every expired row. Returns the number removed.
    pub async fn purge_expired(&self, now: i64) -> Result<u64> {
        let result = sqlx::query("DELETE FROM sessions WHERE expires_at <= ?")
            .bind(now)
            .execute(self.pool)
            .await
            .map_err(|e| VaultError::Database(e.to_string()))?;

        Ok(result.rows_affected())
    }
}
