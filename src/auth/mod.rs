//! Authentication module for filevault.
//!
//! This module provides password hashing, user registration and
//! token sessions.

mod password;
mod registration;
mod session;

pub use password::{hash_password, validate_password, verify_password, PasswordError};
pub use registration::{register, RegistrationRequest};
pub use session::{
    session_store_from_config, MemorySessionStore, SessionManager, SessionStore,
    SqliteSessionStore, DEFAULT_SESSION_TTL_SECS,
};
