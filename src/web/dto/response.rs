//! Response DTOs for Web API.

use serde::Serialize;

use crate::db::User;
use crate::file::{FileRecord, FileType, ParentRef};
use crate::Id;

/// Public view of a user.
#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: Id,
    pub email: String,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
        }
    }
}

/// Session token issued by `/connect`.
#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub token: String,
}

/// Public view of a file record. The blob path is never exposed.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileResponse {
    pub id: Id,
    pub user_id: Id,
    pub name: String,
    #[serde(rename = "type")]
    pub file_type: FileType,
    pub is_public: bool,
    pub parent_id: ParentRef,
}

impl From<FileRecord> for FileResponse {
    fn from(record: FileRecord) -> Self {
        Self {
            id: record.id,
            user_id: record.user_id,
            name: record.name,
            file_type: record.file_type,
            is_public: record.is_public,
            parent_id: record.parent_id,
        }
    }
}

/// Store liveness.
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub db: bool,
    pub sessions: bool,
}

/// Document counts.
#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub users: i64,
    pub files: i64,
}
