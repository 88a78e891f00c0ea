//! Token sessions.
//!
//! A session maps an opaque token to a user id for a fixed lifetime. The
//! mapping lives in a [`SessionStore`], which is either the SQLite table or
//! an in-process map. [`SessionManager`] issues, resolves and revokes tokens
//! on top of whichever store is configured.

use std::collections::HashMap;
use std::sync::{Arc, OnceLock};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::password::{hash_password, verify_password};
use crate::config::SessionsConfig;
use crate::db::{Database, SessionRepository, UserRepository};
use crate::{Id, Result, VaultError};

/// Default session lifetime (24 hours).
pub const DEFAULT_SESSION_TTL_SECS: u64 = 24 * 60 * 60;

/// Expiring token -> user id store.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Store a mapping that expires after `ttl`.
    async fn set(&self, token: &str, user_id: &Id, ttl: Duration) -> Result<()>;

    /// Look up a live mapping.
    async fn get(&self, token: &str) -> Result<Option<Id>>;

    /// Remove a mapping. Returns whether a live one existed.
    async fn delete(&self, token: &str) -> Result<bool>;

    /// Drop expired mappings. Returns how many were removed.
    async fn purge_expired(&self) -> Result<u64>;

    /// Liveness probe.
    async fn ping(&self) -> bool;
}

/// Session store backed by the `sessions` table.
#[derive(Clone)]
pub struct SqliteSessionStore {
    db: Database,
}

impl SqliteSessionStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

#[async_trait]
impl SessionStore for SqliteSessionStore {
    async fn set(&self, token: &str, user_id: &Id, ttl: Duration) -> Result<()> {
        let ttl_secs = i64::try_from(ttl.as_secs()).unwrap_or(i64::MAX);
        let expires_at = Utc::now().timestamp().saturating_add(ttl_secs);
        SessionRepository::new(self.db.pool())
            .create(token, user_id, expires_at)
            .await
    }

    async fn get(&self, token: &str) -> Result<Option<Id>> {
        SessionRepository::new(self.db.pool())
            .get_valid(token, Utc::now().timestamp())
            .await
    }

    async fn delete(&self, token: &str) -> Result<bool> {
        SessionRepository::new(self.db.pool())
            .delete(token, Utc::now().timestamp())
            .await
    }

    async fn purge_expired(&self) -> Result<u64> {
        SessionRepository::new(self.db.pool())
            .purge_expired(Utc::now().timestamp())
            .await
    }

    async fn ping(&self) -> bool {
        self.db.ping().await
    }
}

/// In-process session store with per-entry expiry.
///
/// Sessions do not survive a restart.
#[derive(Default)]
pub struct MemorySessionStore {
    entries: RwLock<HashMap<String, (Id, Instant)>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries held, expired or not.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn set(&self, token: &str, user_id: &Id, ttl: Duration) -> Result<()> {
        let now = Instant::now();
        let expires_at = now
            .checked_add(ttl)
            .unwrap_or(now + Duration::from_secs(DEFAULT_SESSION_TTL_SECS));
        self.entries
            .write()
            .await
            .insert(token.to_string(), (user_id.clone(), expires_at));
        Ok(())
    }

    async fn get(&self, token: &str) -> Result<Option<Id>> {
        let now = Instant::now();
        let mut entries = self.entries.write().await;
        match entries.get(token) {
            Some((user_id, expires_at)) if *expires_at > now => Ok(Some(user_id.clone())),
            Some(_) => {
                entries.remove(token);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn delete(&self, token: &str) -> Result<bool> {
        let removed = self.entries.write().await.remove(token);
        Ok(removed.is_some_and(|(_, expires_at)| expires_at > Instant::now()))
    }

    async fn purge_expired(&self) -> Result<u64> {
        let now = Instant::now();
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, (_, expires_at)| *expires_at > now);
        Ok((before - entries.len()) as u64)
    }

    async fn ping(&self) -> bool {
        true
    }
}

/// Build the session store selected by configuration.
pub fn session_store_from_config(
    config: &SessionsConfig,
    db: &Database,
) -> Result<Arc<dyn SessionStore>> {
    match config.backend.as_str() {
        "sqlite" => Ok(Arc::new(SqliteSessionStore::new(db.clone()))),
        "memory" => Ok(Arc::new(MemorySessionStore::new())),
        other => Err(VaultError::Config(format!(
            "unknown session backend: {other}"
        ))),
    }
}

/// Issues, resolves and revokes session tokens.
#[derive(Clone)]
pub struct SessionManager {
    db: Database,
    store: Arc<dyn SessionStore>,
    ttl: Duration,
}

/// Hash checked against when the email is unknown.
fn dummy_hash() -> Option<&'static str> {
    static DUMMY_HASH: OnceLock<Option<String>> = OnceLock::new();
    DUMMY_HASH
        .get_or_init(|| hash_password("filevault-unknown-user").ok())
        .as_deref()
}

impl SessionManager {
    pub fn new(db: Database, store: Arc<dyn SessionStore>, ttl: Duration) -> Self {
        dummy_hash();
        Self { db, store, ttl }
    }

    /// Session lifetime applied to new tokens.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Verify credentials and open a session.
    ///
    /// Unknown users and wrong passwords both fail with `Unauthorized`.
    pub async fn authenticate(&self, email: &str, password: &str) -> Result<String> {
        if email.is_empty() || password.is_empty() {
            return Err(VaultError::Unauthorized);
        }

        let user = match UserRepository::new(self.db.pool())
            .get_by_email(email)
            .await?
        {
            Some(user) => user,
            None => {
                // same Argon2 cost as a wrong password
                if let Some(hash) = dummy_hash() {
                    let _ = verify_password(password, hash);
                }
                warn!(email = %email, "Login failed: user not found");
                return Err(VaultError::Unauthorized);
            }
        };

        if let Err(e) = verify_password(password, &user.password) {
            warn!(email = %email, error = %e, "Login failed");
            return Err(VaultError::Unauthorized);
        }

        let token = Uuid::new_v4().to_string();
        self.store.set(&token, &user.id, self.ttl).await?;

        info!(user_id = %user.id, "Session opened");
        Ok(token)
    }

    /// Resolve a token to its user id. Does not extend the session.
    pub async fn resolve(&self, token: &str) -> Result<Option<Id>> {
        if token.is_empty() {
            return Ok(None);
        }
        self.store.get(token).await
    }

    /// Revoke a token. Returns whether a live session existed.
    pub async fn revoke(&self, token: &str) -> Result<bool> {
        let existed = self.store.delete(token).await?;
        if existed {
            debug!("Session revoked");
        }
        Ok(existed)
    }

    /// Drop expired sessions from the store.
    pub async fn purge_expired(&self) -> Result<u64> {
        self.store.purge_expired().await
    }

    /// Liveness probe of the session store.
    pub async fn ping(&self) -> bool {
        self.store.ping().await
    }
}
