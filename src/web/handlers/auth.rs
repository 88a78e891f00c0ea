//! Session handlers.

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};

use crate::web::dto::TokenResponse;
use crate::web::error::ApiError;
use crate::web::handlers::AppState;
use crate::web::middleware::{BasicCredentials, TokenUser, X_TOKEN};

/// GET /connect - Exchange Basic credentials for a session token.
///
/// The token is returned in the body and in the `X-Token` header.
pub async fn connect(
    State(state): State<Arc<AppState>>,
    credentials: BasicCredentials,
) -> Result<impl IntoResponse, ApiError> {
    let token = state
        .sessions
        .authenticate(&credentials.email, &credentials.password)
        .await?;

    Ok((
        [(X_TOKEN.clone(), token.clone())],
        Json(TokenResponse { token }),
    ))
}

/// GET /disconnect - Revoke the current session.
pub async fn disconnect(
    State(state): State<Arc<AppState>>,
    user: TokenUser,
) -> Result<StatusCode, ApiError> {
    // the session may expire between extraction and revocation
    if !state.sessions.revoke(&user.token).await? {
        return Err(ApiError::unauthorized());
    }

    tracing::info!(user_id = %user.user_id, "Session closed");
    Ok(StatusCode::NO_CONTENT)
}
