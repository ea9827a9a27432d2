use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::notify;
use super::store::{Comment, ContentError};
use super::workspaces::MessageResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CommentRequest {
    #[serde(default)]
    pub content: String,
    pub author: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CommentResponse {
    pub message: String,
    pub comment: Comment,
}

fn require_content(req: &CommentRequest) -> Result<(), (StatusCode, String)> {
    if req.content.trim().is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            "Comment content is required.".to_string(),
        ));
    }
    Ok(())
}

fn not_found() -> (StatusCode, String) {
    (StatusCode::NOT_FOUND, "Comment not found.".to_string())
}

/// GET /articles/{id}/comments - Comments for an article, oldest first.
pub async fn list_comments(
    State(state): State<AppState>,
    Path(article_id): Path<Uuid>,
) -> Json<Vec<Comment>> {
    Json(state.store.list_comments(&article_id))
}

/// POST /articles/{id}/comments
pub async fn add_comment(
    State(state): State<AppState>,
    Path(article_id): Path<Uuid>,
    Json(req): Json<CommentRequest>,
) -> Result<(StatusCode, Json<CommentResponse>), (StatusCode, String)> {
    require_content(&req)?;

    let (article, comment) = state
        .store
        .add_comment(&article_id, &req.content, req.author.as_deref())
        .map_err(|e: ContentError| (StatusCode::NOT_FOUND, e.to_string()))?;
    notify::comment_added(&state.publisher, &article, &comment);

    Ok((
        StatusCode::CREATED,
        Json(CommentResponse {
            message: "Comment added successfully.".to_string(),
            comment,
        }),
    ))
}

/// PUT /comments/{id}
pub async fn update_comment(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<CommentRequest>,
) -> Result<Json<CommentResponse>, (StatusCode, String)> {
    require_content(&req)?;

    let comment = state
        .store
        .update_comment(&id, &req.content, req.author.as_deref())
        .ok_or_else(not_found)?;
    notify::comment_updated(&state.publisher, &comment);

    Ok(Json(CommentResponse {
        message: "Comment updated successfully.".to_string(),
        comment,
    }))
}

/// DELETE /comments/{id}
pub async fn delete_comment(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<MessageResponse>, (StatusCode, String)> {
    if !state.store.delete_comment(&id) {
        return Err(not_found());
    }
    notify::comment_deleted(&state.publisher, &id);

    Ok(Json(MessageResponse {
        message: "Comment deleted successfully.".to_string(),
    }))
}
