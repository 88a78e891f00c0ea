//! User repository for filevault.
//!
//! Users are created once at registration and never updated or deleted.

use sqlx::SqlitePool;

use super::user::{NewUser, User};
use crate::{Id, Result, ValidationError, VaultError};

/// Repository for user records.
pub struct UserRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> UserRepository<'a> {
    /// Create a new UserRepository with the given database pool reference.
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Create a new user in the database.
    ///
    /// Fails with `AlreadyExists` if the email is taken.
    pub async fn create(&self, new_user: &NewUser) -> Result<User> {
        let id = Id::generate();

        sqlx::query("INSERT INTO users (id, email, password) VALUES (?, ?, ?)")
            .bind(id.as_str())
            .bind(&new_user.email)
            .bind(&new_user.password)
            .execute(self.pool)
            .await
            .map_err(|e| {
                if e.to_string().contains("UNIQUE") {
                    VaultError::Validation(ValidationError::AlreadyExists)
                } else {
                    VaultError::Database(e.to_string())
                }
            })?;

        self.get_by_id(&id)
            .await?
            .ok_or_else(|| VaultError::NotFound("user".to_string()))
    }

    /// Get a user by ID.
    pub async fn get_by_id(&self, id: &Id) -> Result<Option<User>> {
        let result = sqlx::query_as::<_, User>(
            "SELECT id, email, password, created_at FROM users WHERE id = ?",
        )
        .bind(id.as_str())
        .fetch_optional(self.pool)
        .await
        .map_err(|e| VaultError::Database(e.to_string()))?;

        Ok(result)
    }

    /// Get a user by email.
    pub async fn get_by_email(&self, email: &str) -> Result<Option<User>> {
        let result = sqlx::query_as::<_, User>(
            "SELECT id, email, password, created_at FROM users WHERE email = ?",
        )
        .bind(email)
        .fetch_optional(self.pool)
        .await
        .map_err(|e| VaultError::Database(e.to_string()))?;

        Ok(result)
    }

    /// Check whether an email is already registered.
    pub async fn email_exists(&self, email: &str) -> Result<bool> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE email = ?)")
            .bind(email)
            .fetch_one(self.pool)
            .await
            .map_err(|e| VaultError::Database(e.to_string()))?;

        Ok(exists)
    }

    /// Count all users.
    pub async fn count(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(self.pool)
            .await
            .map_err(|e| VaultError::Database(e.to_string()))?;

        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Database;

    #[tokio::test]
    async fn test_create_user() {
        let db = Database::open_in_memory().await.unwrap();
        let repo = UserRepository::new(db.pool());

        let user = repo
            .create(&NewUser::new("bob@dylan.com", "hash"))
            .await
            .unwrap();

        assert_eq!(user.email, "bob@dylan.com");
        assert_eq!(user.password, "hash");
        assert!(!user.id.as_str().is_empty());
    }

    #[tokio::test]
    async fn test_create_duplicate_email() {
        let db = Database::open_in_memory().await.unwrap();
        let repo = UserRepository::new(db.pool());

        repo.create(&NewUser::new("dup@example.com", "a"))
            .await
            .unwrap();
        let result = repo.create(&NewUser::new("dup@example.com", "b")).await;

        assert!(matches!(
            result,
            Err(VaultError::Validation(ValidationError::AlreadyExists))
        ));
    }

    #[tokio::test]
    async fn test_get_by_id_and_email() {
        let db = Database::open_in_memory().await.unwrap();
        let repo = UserRepository::new(db.pool());

        let created = repo
            .create(&NewUser::new("find@example.com", "hash"))
            .await
            .unwrap();

        let by_id = repo.get_by_id(&created.id).await.unwrap().unwrap();
        assert_eq!(by_id.email, "find@example.com");

        let by_email = repo.get_by_email("find@example.com").await.unwrap().unwrap();
        assert_eq!(by_email.id, created.id);

        assert!(repo.get_by_id(&Id::from("missing")).await.unwrap().is_none());
        assert!(repo.get_by_email("nobody@example.com").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_email_exists_and_count() {
        let db = Database::open_in_memory().await.unwrap();
        let repo = UserRepository::new(db.pool());

        assert_eq!(repo.count().await.unwrap(), 0);
        assert!(!repo.email_exists("a@example.com").await.unwrap());

        repo.create(&NewUser::new("a@example.com", "h")).await.unwrap();
        repo.create(&NewUser::new("b@example.com", "h")).await.unwrap();

        assert!(repo.email_exists("a@example.com").await.unwrap());
        assert_eq!(repo.count().await.unwrap(), 2);
    }
}
