//! Service status handlers.

use std::sync::Arc;

use axum::{extract::State, Json};

use crate::db::UserRepository;
use crate::file::FileRepository;
use crate::web::dto::{StatsResponse, StatusResponse};
use crate::web::error::ApiError;
use crate::web::handlers::AppState;

/// GET /status - Liveness of the database and the session store.
pub async fn get_status(State(state): State<Arc<AppState>>) -> Json<StatusResponse> {
    Json(StatusResponse {
        db: state.db.ping().await,
        sessions: state.sessions.ping().await,
    })
}

/// GET /stats - Number of users and files.
pub async fn get_stats(
    State(state): State<Arc<AppState>>,
) -> Result<Json<StatsResponse>, ApiError> {
    let users = UserRepository::new(state.db.pool()).count().await?;
    let files = FileRepository::new(state.db.pool()).count().await?;

    Ok(Json(StatsResponse { users, files }))
}
