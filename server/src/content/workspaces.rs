use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::notify;
use super::store::Workspace;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct WorkspaceRequest {
    #[serde(default)]
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct WorkspaceResponse {
    pub message: String,
    pub workspace: Workspace,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

fn require_name(req: &WorkspaceRequest) -> Result<(), (StatusCode, String)> {
    if req.name.trim().is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            "Workspace name is required.".to_string(),
        ));
    }
    Ok(())
}

fn not_found() -> (StatusCode, String) {
    (StatusCode::NOT_FOUND, "Workspace not found.".to_string())
}

/// GET /workspaces - All workspaces, oldest first.
pub async fn list_workspaces(State(state): State<AppState>) -> Json<Vec<Workspace>> {
    Json(state.store.list_workspaces())
}

/// GET /workspaces/{id}
pub async fn get_workspace(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Workspace>, (StatusCode, String)> {
    state.store.get_workspace(&id).map(Json).ok_or_else(not_found)
}

/// POST /workspaces - Create a workspace and announce it.
pub async fn create_workspace(
    State(state): State<AppState>,
    Json(req): Json<WorkspaceRequest>,
) -> Result<(StatusCode, Json<WorkspaceResponse>), (StatusCode, String)> {
    require_name(&req)?;

    let workspace = state.store.create_workspace(&req.name, req.description);
    notify::workspace_created(&state.publisher, &workspace);

    Ok((
        StatusCode::CREATED,
        Json(WorkspaceResponse {
            message: "Workspace created successfully.".to_string(),
            workspace,
        }),
    ))
}

/// PUT /workspaces/{id}
pub async fn update_workspace(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<WorkspaceRequest>,
) -> Result<Json<WorkspaceResponse>, (StatusCode, String)> {
    require_name(&req)?;

    let workspace = state
        .store
        .update_workspace(&id, &req.name, req.description)
        .ok_or_else(not_found)?;
    notify::workspace_updated(&state.publisher, &workspace);

    Ok(Json(WorkspaceResponse {
        message: "Workspace updated successfully.".to_string(),
        workspace,
    }))
}

/// DELETE /workspaces/{id}
pub async fn delete_workspace(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<MessageResponse>, (StatusCode, String)> {
    if !state.store.delete_workspace(&id) {
        return Err(not_found());
    }
    notify::workspace_deleted(&state.publisher, &id);

    Ok(Json(MessageResponse {
        message: "Workspace deleted successfully.".to_string(),
    }))
}
