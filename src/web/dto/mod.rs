//! Request and response contracts of the Web API.

pub mod request;
pub mod response;

pub use request::{CreateUserRequest, FileDataQuery, ListFilesQuery, UploadFileRequest};
pub use response::{FileResponse, StatsResponse, StatusResponse, TokenResponse, UserResponse};
