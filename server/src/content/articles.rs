use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

use super::notify;
use super::store::{Article, ArticleSummary, Attachment, ContentError};
use super::workspaces::MessageResponse;
use crate::state::AppState;

// --- Request types ---

#[derive(Debug, Deserialize)]
pub struct ListArticlesQuery {
    pub workspace_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct CreateArticleRequest {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: String,
    pub workspace_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateArticleRequest {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: String,
    /// Absent keeps the current workspace; `null` detaches the article.
    #[serde(default, deserialize_with = "present")]
    pub workspace_id: Option<Option<Uuid>>,
}

/// Distinguish an explicit `null` from a missing field.
fn present<'de, D>(deserializer: D) -> Result<Option<Option<Uuid>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<Uuid>::deserialize(deserializer).map(Some)
}

#[derive(Debug, Deserialize)]
pub struct AddAttachmentRequest {
    #[serde(default)]
    pub original_name: String,
    #[serde(default = "default_mime_type")]
    pub mime_type: String,
    #[serde(default)]
    pub size: u64,
}

fn default_mime_type() -> String {
    "application/octet-stream".to_string()
}

// --- Response types ---

#[derive(Debug, Serialize, Deserialize)]
pub struct ArticleSavedResponse {
    pub id: Uuid,
    pub title: String,
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AttachmentResponse {
    pub message: String,
    pub attachment: Attachment,
}

fn require_title_and_content(title: &str, content: &str) -> Result<(), (StatusCode, String)> {
    if title.trim().is_empty() {
        return Err((StatusCode::BAD_REQUEST, "Title is required.".to_string()));
    }
    if content.trim().is_empty() {
        return Err((StatusCode::BAD_REQUEST, "Content is required.".to_string()));
    }
    Ok(())
}

fn require_workspace(
    state: &AppState,
    workspace_id: Option<Uuid>,
) -> Result<(), (StatusCode, String)> {
    match workspace_id {
        Some(id) if state.store.get_workspace(&id).is_none() => Err((
            StatusCode::BAD_REQUEST,
            "Workspace does not exist.".to_string(),
        )),
        _ => Ok(()),
    }
}

fn not_found() -> (StatusCode, String) {
    (StatusCode::NOT_FOUND, "Article not found.".to_string())
}

fn content_error(e: ContentError) -> (StatusCode, String) {
    (StatusCode::NOT_FOUND, e.to_string())
}

// --- Handlers ---

/// GET /articles?workspace_id= - Article summaries, optionally for one workspace.
pub async fn list_articles(
    State(state): State<AppState>,
    Query(query): Query<ListArticlesQuery>,
) -> Json<Vec<ArticleSummary>> {
    Json(state.store.list_articles(query.workspace_id.as_ref()))
}

/// GET /articles/{id}
pub async fn get_article(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Article>, (StatusCode, String)> {
    state.store.get_article(&id).map(Json).ok_or_else(not_found)
}

/// POST /articles - Create an article and announce it.
pub async fn create_article(
    State(state): State<AppState>,
    Json(req): Json<CreateArticleRequest>,
) -> Result<(StatusCode, Json<ArticleSavedResponse>), (StatusCode, String)> {
    require_title_and_content(&req.title, &req.content)?;
    require_workspace(&state, req.workspace_id)?;

    let article = state
        .store
        .create_article(&req.title, &req.content, req.workspace_id);
    notify::article_created(&state.publisher, &article);

    Ok((
        StatusCode::CREATED,
        Json(ArticleSavedResponse {
            id: article.id,
            title: article.title,
            message: "Article created successfully.".to_string(),
        }),
    ))
}

/// PUT /articles/{id} - Replace title and content.
pub async fn update_article(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateArticleRequest>,
) -> Result<Json<ArticleSavedResponse>, (StatusCode, String)> {
    require_title_and_content(&req.title, &req.content)?;
    // Explicit null detaches; only a concrete id must exist
    require_workspace(&state, req.workspace_id.flatten())?;

    let article = state
        .store
        .update_article(&id, &req.title, &req.content, req.workspace_id)
        .ok_or_else(not_found)?;
    notify::article_updated(&state.publisher, &article);

    Ok(Json(ArticleSavedResponse {
        id: article.id,
        title: article.title,
        message: "Article updated successfully.".to_string(),
    }))
}

/// DELETE /articles/{id} - Delete an article and its comments.
pub async fn delete_article(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<MessageResponse>, (StatusCode, String)> {
    if !state.store.delete_article(&id) {
        return Err(not_found());
    }
    notify::article_deleted(&state.publisher, &id);

    Ok(Json(MessageResponse {
        message: "Article deleted successfully.".to_string(),
    }))
}

/// POST /articles/{id}/attachments - Record attachment metadata.
pub async fn add_attachment(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<AddAttachmentRequest>,
) -> Result<(StatusCode, Json<AttachmentResponse>), (StatusCode, String)> {
    if req.original_name.trim().is_empty() {
        return Err((StatusCode::BAD_REQUEST, "No file uploaded.".to_string()));
    }

    let (article, attachment) = state
        .store
        .add_attachment(&id, req.original_name.trim(), &req.mime_type, req.size)
        .map_err(content_error)?;
    notify::attachment_added(&state.publisher, &article, &attachment);

    Ok((
        StatusCode::CREATED,
        Json(AttachmentResponse {
            message: "File uploaded successfully.".to_string(),
            attachment,
        }),
    ))
}

/// DELETE /articles/{id}/attachments/{filename}
pub async fn remove_attachment(
    State(state): State<AppState>,
    Path((id, filename)): Path<(Uuid, String)>,
) -> Result<Json<MessageResponse>, (StatusCode, String)> {
    let (article, attachment) = state
        .store
        .remove_attachment(&id, &filename)
        .map_err(content_error)?;
    notify::attachment_removed(&state.publisher, &article, &attachment);

    Ok(Json(MessageResponse {
        message: "Attachment deleted successfully.".to_string(),
    }))
}
