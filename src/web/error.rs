//! API error handling.
//!
//! Every failure is rendered as `{"error": "<message>"}` with a status code
//! chosen from the error kind.

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::VaultError;

/// API error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// Bad request (400).
    BadRequest,
    /// Unauthorized (401).
    Unauthorized,
    /// Not found (404).
    NotFound,
    /// Payload too large (413).
    PayloadTooLarge,
    /// Internal server error (500).
    InternalError,
}

impl ErrorCode {
    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ErrorCode::BadRequest => StatusCode::BAD_REQUEST,
            ErrorCode::Unauthorized => StatusCode::UNAUTHORIZED,
            ErrorCode::NotFound => StatusCode::NOT_FOUND,
            ErrorCode::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            ErrorCode::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// API error response body.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

/// API error type.
#[derive(Debug)]
pub struct ApiError {
    code: ErrorCode,
    message: String,
}

impl ApiError {
    /// Create a new API error.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// Create a bad request error.
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::BadRequest, message)
    }

    /// Create the unauthorized error.
    pub fn unauthorized() -> Self {
        Self::new(ErrorCode::Unauthorized, "Unauthorized")
    }

    /// Create the not found error.
    pub fn not_found() -> Self {
        Self::new(ErrorCode::NotFound, "Not found")
    }

    /// Create the internal server error.
    pub fn internal() -> Self {
        Self::new(ErrorCode::InternalError, "Internal server error")
    }

    pub fn code(&self) -> ErrorCode {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.code.status_code();
        (
            status,
            Json(ErrorBody {
                error: self.message,
            }),
        )
            .into_response()
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}: {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}

impl From<VaultError> for ApiError {
    fn from(err: VaultError) -> Self {
        if err.is_internal() {
            tracing::error!("Internal error: {}", err);
            return ApiError::internal();
        }

        match err {
            VaultError::Unauthorized => ApiError::unauthorized(),
            VaultError::Validation(v) => ApiError::bad_request(v.to_string()),
            _ => ApiError::not_found(),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        match rejection.status() {
            StatusCode::PAYLOAD_TOO_LARGE => {
                ApiError::new(ErrorCode::PayloadTooLarge, "File too large")
            }
            _ => ApiError::bad_request(rejection.body_text()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ValidationError;
    use http_body_util::BodyExt;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_into_response_body() {
        let response = ApiError::not_found().into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            body_json(response).await,
            serde_json::json!({ "error": "Not found" })
        );
    }

    #[test]
    fn test_from_vault_error() {
        let err: ApiError = VaultError::Unauthorized.into();
        assert_eq!(err.code(), ErrorCode::Unauthorized);
        assert_eq!(err.message(), "Unauthorized");

        let err: ApiError = VaultError::NotFound("file".into()).into();
        assert_eq!(err.code(), ErrorCode::NotFound);
        assert_eq!(err.message(), "Not found");

        let err: ApiError = VaultError::Validation(ValidationError::ParentNotFolder).into();
        assert_eq!(err.code(), ErrorCode::BadRequest);
        assert_eq!(err.message(), "Parent is not a folder");
    }

    #[test]
    fn test_internal_errors_are_opaque() {
        let err: ApiError = VaultError::Database("disk I/O error".into()).into();
        assert_eq!(err.code(), ErrorCode::InternalError);
        assert_eq!(err.message(), "Internal server error");
        assert_eq!(err.code().status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_status_follows_is_internal() {
        let errors = vec![
            VaultError::Database("locked".into()),
            VaultError::Io(std::io::Error::other("disk full")),
            VaultError::Unauthorized,
            VaultError::Validation(ValidationError::MissingName),
            VaultError::NotFound("file".into()),
            VaultError::Job(crate::worker::JobError::FileNotFound),
            VaultError::Image("bad header".into()),
            VaultError::Config("bad".into()),
        ];

        for err in errors {
            let internal = err.is_internal();
            let api: ApiError = err.into();
            assert_eq!(api.code() == ErrorCode::InternalError, internal);
        }
    }

    #[test]
    fn test_display() {
        assert_eq!(ApiError::unauthorized().to_string(), "Unauthorized: Unauthorized");
    }
}
