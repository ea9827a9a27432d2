use axum::Router;

use crate::content::{articles, comments, workspaces};
use crate::state::AppState;
use crate::ws::PublisherError;

/// Build the full axum Router: content API plus the realtime event stream at `/`.
pub fn build_router(state: AppState) -> Result<Router, PublisherError> {
    let workspace_routes = Router::new()
        .route("/workspaces", axum::routing::get(workspaces::list_workspaces))
        .route("/workspaces", axum::routing::post(workspaces::create_workspace))
        .route("/workspaces/{id}", axum::routing::get(workspaces::get_workspace))
        .route("/workspaces/{id}", axum::routing::put(workspaces::update_workspace))
        .route("/workspaces/{id}", axum::routing::delete(workspaces::delete_workspace));

    let article_routes = Router::new()
        .route("/articles", axum::routing::get(articles::list_articles))
        .route("/articles", axum::routing::post(articles::create_article))
        .route("/articles/{id}", axum::routing::get(articles::get_article))
        .route("/articles/{id}", axum::routing::put(articles::update_article))
        .route("/articles/{id}", axum::routing::delete(articles::delete_article))
        .route(
            "/articles/{id}/attachments",
            axum::routing::post(articles::add_attachment),
        )
        .route(
            "/articles/{id}/attachments/{filename}",
            axum::routing::delete(articles::remove_attachment),
        );

    let comment_routes = Router::new()
        .route(
            "/articles/{id}/comments",
            axum::routing::get(comments::list_comments),
        )
        .route(
            "/articles/{id}/comments",
            axum::routing::post(comments::add_comment),
        )
        .route("/comments/{id}", axum::routing::put(comments::update_comment))
        .route("/comments/{id}", axum::routing::delete(comments::delete_comment));

    let health = Router::new().route("/health", axum::routing::get(health_check));

    let router = Router::new()
        .merge(workspace_routes)
        .merge(article_routes)
        .merge(comment_routes)
        .merge(health)
        .with_state(state.clone());

    state.publisher.initialize(router)
}

/// Basic health check endpoint
async fn health_check() -> &'static str {
    "ok"
}
