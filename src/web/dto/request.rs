//! Request DTOs for Web API.

use serde::Deserialize;

use crate::auth::RegistrationRequest;
use crate::file::{ParentRef, UploadRequest};

/// User registration request.
///
/// Fields are optional so that missing values produce the contract's
/// validation messages instead of a deserialization error.
#[derive(Debug, Default, Deserialize)]
pub struct CreateUserRequest {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

impl From<CreateUserRequest> for RegistrationRequest {
    fn from(req: CreateUserRequest) -> Self {
        RegistrationRequest {
            email: req.email,
            password: req.password,
        }
    }
}

/// File upload request.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadFileRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, rename = "type")]
    pub file_type: Option<String>,
    /// Root when missing, `null`, `0` or `"0"`.
    #[serde(default)]
    pub parent_id: ParentRef,
    #[serde(default)]
    pub is_public: bool,
    /// Base64 content.
    #[serde(default)]
    pub data: Option<String>,
}

impl From<UploadFileRequest> for UploadRequest {
    fn from(req: UploadFileRequest) -> Self {
        UploadRequest {
            name: req.name,
            file_type: req.file_type,
            parent_id: req.parent_id,
            is_public: req.is_public,
            data: req.data,
        }
    }
}

/// Query parameters for listing files.
///
/// Kept as raw strings so malformed values fall back to defaults.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListFilesQuery {
    pub parent_id: Option<String>,
    pub page: Option<String>,
}

impl ListFilesQuery {
    pub fn parent(&self) -> ParentRef {
        self.parent_id
            .as_deref()
            .map(ParentRef::parse)
            .unwrap_or_default()
    }
}

/// Query parameters for reading file content.
#[derive(Debug, Default, Deserialize)]
pub struct FileDataQuery {
    /// Thumbnail width.
    pub size: Option<String>,
}
