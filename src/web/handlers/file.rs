//! File handlers for Web API.

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};

use crate::file::parse_page;
use crate::web::dto::{FileDataQuery, FileResponse, ListFilesQuery, UploadFileRequest};
use crate::web::error::ApiError;
use crate::web::handlers::AppState;
use crate::web::middleware::{OptionalTokenUser, TokenUser};
use crate::Id;

/// POST /files - Create a folder, file or image.
pub async fn upload_file(
    State(state): State<Arc<AppState>>,
    user: TokenUser,
    body: Result<Json<UploadFileRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<FileResponse>), ApiError> {
    let Json(req) = body?;
    let record = state.files.upload(&user.user_id, req.into()).await?;

    Ok((StatusCode::CREATED, Json(FileResponse::from(record))))
}

/// GET /files/:id - One of the caller's files.
pub async fn get_file(
    State(state): State<Arc<AppState>>,
    user: TokenUser,
    Path(id): Path<String>,
) -> Result<Json<FileResponse>, ApiError> {
    let record = state.files.get(&user.user_id, &Id::from(id)).await?;
    Ok(Json(FileResponse::from(record)))
}

/// GET /files - One page of the caller's files under a parent.
pub async fn list_files(
    State(state): State<Arc<AppState>>,
    user: TokenUser,
    Query(query): Query<ListFilesQuery>,
) -> Result<Json<Vec<FileResponse>>, ApiError> {
    let page = parse_page(query.page.as_deref());
    let records = state
        .files
        .list(&user.user_id, &query.parent(), page)
        .await?;

    Ok(Json(records.into_iter().map(FileResponse::from).collect()))
}

/// PUT /files/:id/publish
pub async fn publish_file(
    State(state): State<Arc<AppState>>,
    user: TokenUser,
    Path(id): Path<String>,
) -> Result<Json<FileResponse>, ApiError> {
    let record = state
        .files
        .set_visibility(&user.user_id, &Id::from(id), true)
        .await?;
    Ok(Json(FileResponse::from(record)))
}

/// PUT /files/:id/unpublish
pub async fn unpublish_file(
    State(state): State<Arc<AppState>>,
    user: TokenUser,
    Path(id): Path<String>,
) -> Result<Json<FileResponse>, ApiError> {
    let record = state
        .files
        .set_visibility(&user.user_id, &Id::from(id), false)
        .await?;
    Ok(Json(FileResponse::from(record)))
}

/// GET /files/:id/data - Raw content, optionally a thumbnail.
///
/// Authentication is optional: public files are served to anyone.
pub async fn get_file_data(
    State(state): State<Arc<AppState>>,
    OptionalTokenUser(user_id): OptionalTokenUser,
    Path(id): Path<String>,
    Query(query): Query<FileDataQuery>,
) -> Result<Response, ApiError> {
    let content = state
        .files
        .read_content(user_id.as_ref(), &Id::from(id), query.size.as_deref())
        .await?;

    Ok(([(header::CONTENT_TYPE, content.mime_type)], content.data).into_response())
}
