//! filevault - file storage API
//!
//! Users register, open token sessions and store folders, files and images
//! in a per-user hierarchy. Image uploads are thumbnailed in the background.

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod file;
pub mod id;
pub mod logging;
pub mod web;
pub mod worker;

pub use auth::{
    hash_password, register, validate_password, verify_password, PasswordError,
    RegistrationRequest, SessionManager, SessionStore,
};
pub use config::Config;
pub use db::{Database, NewUser, User, UserRepository};
pub use error::{Result, ValidationError, VaultError};
pub use file::{FileRecord, FileService, FileType, ParentRef};
pub use id::Id;
pub use worker::{JobError, Workers};
