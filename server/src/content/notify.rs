//! Event helpers for the content write paths.
//! Each builds the identifying payload for one event type and broadcasts it.
//! Payload field names are part of the wire contract with deployed clients.

use inkwell_shared::EventType;
use serde_json::json;

use super::store::{Article, Attachment, Comment, Workspace};
use crate::ws::EventPublisher;

pub fn article_created(publisher: &EventPublisher, article: &Article) {
    publisher.broadcast(
        EventType::ArticleCreated,
        json!({
            "id": article.id,
            "title": article.title,
            "workspace_id": article.workspace_id,
        }),
    );
}

pub fn article_updated(publisher: &EventPublisher, article: &Article) {
    publisher.broadcast(
        EventType::ArticleUpdated,
        json!({
            "id": article.id,
            "title": article.title,
        }),
    );
}

pub fn article_deleted(publisher: &EventPublisher, article_id: &uuid::Uuid) {
    publisher.broadcast(EventType::ArticleDeleted, json!({ "id": article_id }));
}

pub fn attachment_added(publisher: &EventPublisher, article: &Article, attachment: &Attachment) {
    publisher.broadcast(
        EventType::AttachmentAdded,
        json!({
            "articleId": article.id,
            "articleTitle": article.title,
            "filename": attachment.original_name,
        }),
    );
}

pub fn attachment_removed(publisher: &EventPublisher, article: &Article, attachment: &Attachment) {
    publisher.broadcast(
        EventType::AttachmentRemoved,
        json!({
            "articleId": article.id,
            "articleTitle": article.title,
            "filename": attachment.original_name,
        }),
    );
}

pub fn comment_added(publisher: &EventPublisher, article: &Article, comment: &Comment) {
    publisher.broadcast(
        EventType::CommentAdded,
        json!({
            "articleId": article.id,
            "articleTitle": article.title,
            "commentId": comment.id,
            "author": comment.author,
        }),
    );
}

pub fn comment_updated(publisher: &EventPublisher, comment: &Comment) {
    publisher.broadcast(
        EventType::CommentUpdated,
        json!({
            "commentId": comment.id,
            "author": comment.author,
        }),
    );
}

pub fn comment_deleted(publisher: &EventPublisher, comment_id: &uuid::Uuid) {
    publisher.broadcast(EventType::CommentDeleted, json!({ "commentId": comment_id }));
}

pub fn workspace_created(publisher: &EventPublisher, workspace: &Workspace) {
    publisher.broadcast(
        EventType::WorkspaceCreated,
        json!({
            "id": workspace.id,
            "name": workspace.name,
        }),
    );
}

pub fn workspace_updated(publisher: &EventPublisher, workspace: &Workspace) {
    publisher.broadcast(
        EventType::WorkspaceUpdated,
        json!({
            "id": workspace.id,
            "name": workspace.name,
        }),
    );
}

pub fn workspace_deleted(publisher: &EventPublisher, workspace_id: &uuid::Uuid) {
    publisher.broadcast(EventType::WorkspaceDeleted, json!({ "id": workspace_id }));
}
