//! User registration.

use tracing::info;

use super::password::{hash_password, PasswordError};
use crate::db::{Database, NewUser, User, UserRepository};
use crate::{Result, ValidationError, VaultError};

/// Registration request data.
#[derive(Debug, Clone, Default)]
pub struct RegistrationRequest {
    /// Login email.
    pub email: Option<String>,
    /// Plaintext password.
    pub password: Option<String>,
}

impl RegistrationRequest {
    /// Create a registration request.
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: Some(email.into()),
            password: Some(password.into()),
        }
    }
}

/// Register a new user.
///
/// 1. Requires a non-empty email and password
/// 2. Rejects an email that is already registered
/// 3. Stores the Argon2 hash of the password
pub async fn register(db: &Database, request: &RegistrationRequest) -> Result<User> {
    let email = request
        .email
        .as_deref()
        .filter(|email| !email.is_empty())
        .ok_or(ValidationError::MissingEmail)?;
    let password = request
        .password
        .as_deref()
        .filter(|password| !password.is_empty())
        .ok_or(ValidationError::MissingPassword)?;

    let repo = UserRepository::new(db.pool());
    if repo.email_exists(email).await? {
        return Err(ValidationError::AlreadyExists.into());
    }

    let password_hash = hash_password(password).map_err(|e| match e {
        PasswordError::Empty => VaultError::Validation(ValidationError::MissingPassword),
        PasswordError::TooLong => VaultError::Validation(ValidationError::PasswordTooLong),
        other => VaultError::Password(other),
    })?;

    let user = repo.create(&NewUser::new(email, password_hash)).await?;

    info!(user_id = %user.id, email = %user.email, "New user registered");
    Ok(user)
}
