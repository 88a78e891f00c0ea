//! Router configuration for Web API.

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use super::handlers::{app, auth, file, user, AppState};
use super::middleware::create_cors_layer;

/// Slack for the JSON envelope around the base64 payload.
const BODY_LIMIT_SLACK: usize = 64 * 1024;

/// Request body limit for a given maximum decoded upload size.
///
/// Base64 inflates content by 4/3.
pub fn body_limit_for(max_upload_bytes: usize) -> usize {
    max_upload_bytes
        .saturating_mul(4)
        .div_ceil(3)
        .saturating_add(BODY_LIMIT_SLACK)
}

/// Create the main API router.
pub fn create_router(
    app_state: Arc<AppState>,
    cors_origins: &[String],
    max_upload_bytes: usize,
) -> Router {
    let app_routes = Router::new()
        .route("/status", get(app::get_status))
        .route("/stats", get(app::get_stats));

    let auth_routes = Router::new()
        .route("/connect", get(auth::connect))
        .route("/disconnect", get(auth::disconnect));

    let user_routes = Router::new()
        .route("/users", post(user::create_user))
        .route("/users/me", get(user::me));

    let file_routes = Router::new()
        .route("/files", post(file::upload_file).get(file::list_files))
        .route("/files/:id", get(file::get_file))
        .route("/files/:id/publish", put(file::publish_file))
        .route("/files/:id/unpublish", put(file::unpublish_file))
        .route("/files/:id/data", get(file::get_file_data));

    Router::new()
        .merge(app_routes)
        .merge(auth_routes)
        .merge(user_routes)
        .merge(file_routes)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(create_cors_layer(cors_origins))
                .layer(DefaultBodyLimit::max(body_limit_for(max_upload_bytes))),
        )
        .with_state(app_state)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_body_limit_accounts_for_base64() {
        assert_eq!(body_limit_for(3), 4 + BODY_LIMIT_SLACK);
        assert_eq!(body_limit_for(0), BODY_LIMIT_SLACK);
        assert!(body_limit_for(10 * 1024 * 1024) > 10 * 1024 * 1024 * 4 / 3);
    }

    #[test]
    fn test_body_limit_does_not_overflow() {
        assert!(body_limit_for(usize::MAX) > BODY_LIMIT_SLACK);
    }
}
