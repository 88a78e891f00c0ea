//! Request authentication extractors.
//!
//! Sessions are carried in the `X-Token` header. Login uses HTTP Basic
//! credentials.

use std::sync::Arc;

use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::HeaderName;
use axum_extra::headers::authorization::Basic;
use axum_extra::headers::Authorization;
use axum_extra::TypedHeader;

use crate::web::error::ApiError;
use crate::web::handlers::AppState;
use crate::Id;

/// Session token header.
pub static X_TOKEN: HeaderName = HeaderName::from_static("x-token");

/// Read the raw session token, if present and valid UTF-8.
pub fn token_from_parts(parts: &Parts) -> Option<String> {
    parts
        .headers
        .get(&X_TOKEN)
        .and_then(|value| value.to_str().ok())
        .map(|token| token.trim().to_string())
        .filter(|token| !token.is_empty())
}

/// Authenticated user, resolved from the `X-Token` header.
///
/// Rejects with 401 when the header is missing or the session is unknown
/// or expired.
#[derive(Debug, Clone)]
pub struct TokenUser {
    pub user_id: Id,
    pub token: String,
}

#[async_trait]
impl FromRequestParts<Arc<AppState>> for TokenUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let token = token_from_parts(parts).ok_or_else(ApiError::unauthorized)?;
        let user_id = state
            .sessions
            .resolve(&token)
            .await?
            .ok_or_else(ApiError::unauthorized)?;

        Ok(TokenUser { user_id, token })
    }
}

/// Optional authentication.
///
/// A missing header or unknown token yields `None` instead of a rejection.
#[derive(Debug, Clone)]
pub struct OptionalTokenUser(pub Option<Id>);

#[async_trait]
impl FromRequestParts<Arc<AppState>> for OptionalTokenUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let Some(token) = token_from_parts(parts) else {
            return Ok(OptionalTokenUser(None));
        };
        let user_id = state.sessions.resolve(&token).await?;
        Ok(OptionalTokenUser(user_id))
    }
}

/// Credentials from an `Authorization: Basic` header.
#[derive(Debug, Clone)]
pub struct BasicCredentials {
    pub email: String,
    pub password: String,
}

#[async_trait]
impl<S> FromRequestParts<S> for BasicCredentials
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let TypedHeader(Authorization(basic)) =
            TypedHeader::<Authorization<Basic>>::from_request_parts(parts, state)
                .await
                .map_err(|e| {
                    tracing::debug!("Basic credentials rejected: {}", e);
                    ApiError::unauthorized()
                })?;

        Ok(BasicCredentials {
            email: basic.username().to_string(),
            password: basic.password().to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    fn parts_with(header: Option<(&str, &str)>) -> Parts {
        let mut builder = Request::builder().uri("/");
        if let Some((name, value)) = header {
            builder = builder.header(name, value);
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[test]
    fn test_token_from_parts() {
        assert_eq!(
            token_from_parts(&parts_with(Some(("X-Token", "abc")))),
            Some("abc".to_string())
        );
        assert_eq!(token_from_parts(&parts_with(Some(("x-token", "  ")))), None);
        assert_eq!(token_from_parts(&parts_with(None)), None);
    }

    #[tokio::test]
    async fn test_basic_credentials() {
        // "bob@dylan.com:toto1234!"
        let mut parts = parts_with(Some((
            "Authorization",
            "Basic Ym9iQGR5bGFuLmNvbTp0b3RvMTIzNCE=",
        )));
        let creds = BasicCredentials::from_request_parts(&mut parts, &())
            .await
            .unwrap();
        assert_eq!(creds.email, "bob@dylan.com");
        assert_eq!(creds.password, "toto1234!");
    }

    #[tokio::test]
    async fn test_basic_credentials_rejected() {
        for header in [None, Some(("Authorization", "Bearer abc"))] {
            let mut parts = parts_with(header);
            let err = BasicCredentials::from_request_parts(&mut parts, &())
                .await
                .unwrap_err();
            assert_eq!(err.message(), "Unauthorized");
        }
    }
}
