//! User handlers for Web API.

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    Json,
};

use crate::auth::register;
use crate::db::UserRepository;
use crate::web::dto::{CreateUserRequest, UserResponse};
use crate::web::error::ApiError;
use crate::web::handlers::AppState;
use crate::web::middleware::TokenUser;
use crate::worker::WelcomeJob;

/// POST /users - Register a new user.
pub async fn create_user(
    State(state): State<Arc<AppState>>,
    body: Result<Json<CreateUserRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<UserResponse>), ApiError> {
    let Json(req) = body?;
    let user = register(&state.db, &req.into()).await?;

    state.welcome_queue.enqueue(WelcomeJob::new(user.id.clone()));

    Ok((StatusCode::CREATED, Json(UserResponse::from(user))))
}

/// GET /users/me - Current user.
pub async fn me(
    State(state): State<Arc<AppState>>,
    user: TokenUser,
) -> Result<Json<UserResponse>, ApiError> {
    let user = UserRepository::new(state.db.pool())
        .get_by_id(&user.user_id)
        .await?
        .ok_or_else(ApiError::unauthorized)?;

    Ok(Json(UserResponse::from(user)))
}
