use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Workspace {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Attachment metadata. File bytes live outside this service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Attachment {
    /// Stored name, unique per article
    pub filename: String,
    pub original_name: String,
    pub mime_type: String,
    pub size: u64,
    pub uploaded_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Article {
    pub id: Uuid,
    pub title: String,
    pub content: String,
    pub workspace_id: Option<Uuid>,
    pub attachments: Vec<Attachment>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Listing shape: never carries the article body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArticleSummary {
    pub id: Uuid,
    pub title: String,
    pub workspace_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comment {
    pub id: Uuid,
    pub article_id: Uuid,
    pub content: String,
    pub author: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Error type for store operations that can miss on more than one entity.
#[derive(Debug, PartialEq, Eq)]
pub enum ContentError {
    ArticleNotFound,
    AttachmentNotFound,
}

impl std::fmt::Display for ContentError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ContentError::ArticleNotFound => write!(f, "Article not found."),
            ContentError::AttachmentNotFound => write!(f, "Attachment not found."),
        }
    }
}

const DEFAULT_AUTHOR: &str = "Anonymous";

/// In-memory content store.
///
/// DashMap-backed so handlers can share it without an outer lock. Clones
/// share the same maps.
#[derive(Debug, Clone, Default)]
pub struct ContentStore {
    workspaces: Arc<DashMap<Uuid, Workspace>>,
    articles: Arc<DashMap<Uuid, Article>>,
    comments: Arc<DashMap<Uuid, Comment>>,
}

impl ContentStore {
    pub fn new() -> Self {
        Self::default()
    }

    // --- Workspaces ---

    /// All workspaces, oldest first.
    pub fn list_workspaces(&self) -> Vec<Workspace> {
        let mut workspaces: Vec<Workspace> = self
            .workspaces
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        workspaces.sort_by_key(|w| w.created_at);
        workspaces
    }

    pub fn get_workspace(&self, id: &Uuid) -> Option<Workspace> {
        self.workspaces.get(id).map(|entry| entry.value().clone())
    }

    pub fn create_workspace(&self, name: &str, description: Option<String>) -> Workspace {
        let now = Utc::now();
        let workspace = Workspace {
            id: Uuid::new_v4(),
            name: name.trim().to_string(),
            description,
            created_at: now,
            updated_at: now,
        };
        self.workspaces.insert(workspace.id, workspace.clone());
        workspace
    }

    pub fn update_workspace(
        &self,
        id: &Uuid,
        name: &str,
        description: Option<String>,
    ) -> Option<Workspace> {
        let mut entry = self.workspaces.get_mut(id)?;
        let workspace = entry.value_mut();
        workspace.name = name.trim().to_string();
        workspace.description = description;
        workspace.updated_at = Utc::now();
        Some(workspace.clone())
    }

    /// Delete a workspace. Its articles survive with no workspace.
    pub fn delete_workspace(&self, id: &Uuid) -> bool {
        if self.workspaces.remove(id).is_none() {
            return false;
        }
        for mut entry in self.articles.iter_mut() {
            if entry.value().workspace_id.as_ref() == Some(id) {
                entry.value_mut().workspace_id = None;
            }
        }
        true
    }

    // --- Articles ---

    /// Article summaries, oldest first, optionally filtered by workspace.
    pub fn list_articles(&self, workspace_id: Option<&Uuid>) -> Vec<ArticleSummary> {
        let mut articles: Vec<(DateTime<Utc>, ArticleSummary)> = self
            .articles
            .iter()
            .filter(|entry| {
                workspace_id.is_none() || entry.value().workspace_id.as_ref() == workspace_id
            })
            .map(|entry| {
                let article = entry.value();
                (
                    article.created_at,
                    ArticleSummary {
                        id: article.id,
                        title: article.title.clone(),
                        workspace_id: article.workspace_id,
                    },
                )
            })
            .collect();
        articles.sort_by_key(|(created_at, _)| *created_at);
        articles.into_iter().map(|(_, summary)| summary).collect()
    }

    pub fn get_article(&self, id: &Uuid) -> Option<Article> {
        self.articles.get(id).map(|entry| entry.value().clone())
    }

    pub fn create_article(
        &self,
        title: &str,
        content: &str,
        workspace_id: Option<Uuid>,
    ) -> Article {
        let now = Utc::now();
        let article = Article {
            id: Uuid::new_v4(),
            title: title.trim().to_string(),
            content: content.trim().to_string(),
            workspace_id,
            attachments: Vec::new(),
            created_at: now,
            updated_at: now,
        };
        self.articles.insert(article.id, article.clone());
        article
    }

    /// Replace title and content. `workspace_id` of `None` keeps the current workspace.
    pub fn update_article(
        &self,
        id: &Uuid,
        title: &str,
        content: &str,
        workspace_id: Option<Option<Uuid>>,
    ) -> Option<Article> {
        let mut entry = self.articles.get_mut(id)?;
        let article = entry.value_mut();
        article.title = title.trim().to_string();
        article.content = content.trim().to_string();
        if let Some(workspace_id) = workspace_id {
            article.workspace_id = workspace_id;
        }
        article.updated_at = Utc::now();
        Some(article.clone())
    }

    /// Delete an article and its comments.
    pub fn delete_article(&self, id: &Uuid) -> bool {
        if self.articles.remove(id).is_none() {
            return false;
        }
        self.comments.retain(|_, comment| comment.article_id != *id);
        true
    }

    /// Record attachment metadata on an article.
    /// Returns the updated article and the new attachment.
    pub fn add_attachment(
        &self,
        article_id: &Uuid,
        original_name: &str,
        mime_type: &str,
        size: u64,
    ) -> Result<(Article, Attachment), ContentError> {
        let mut entry = self
            .articles
            .get_mut(article_id)
            .ok_or(ContentError::ArticleNotFound)?;
        let attachment = Attachment {
            filename: format!("{}-{}", Uuid::new_v4(), original_name),
            original_name: original_name.to_string(),
            mime_type: mime_type.to_string(),
            size,
            uploaded_at: Utc::now(),
        };
        let article = entry.value_mut();
        article.attachments.push(attachment.clone());
        Ok((article.clone(), attachment))
    }

    /// Remove an attachment by its stored filename.
    pub fn remove_attachment(
        &self,
        article_id: &Uuid,
        filename: &str,
    ) -> Result<(Article, Attachment), ContentError> {
        let mut entry = self
            .articles
            .get_mut(article_id)
            .ok_or(ContentError::ArticleNotFound)?;
        let article = entry.value_mut();
        let index = article
            .attachments
            .iter()
            .position(|a| a.filename == filename)
            .ok_or(ContentError::AttachmentNotFound)?;
        let attachment = article.attachments.remove(index);
        Ok((article.clone(), attachment))
    }

    // --- Comments ---

    /// Comments for an article, oldest first.
    pub fn list_comments(&self, article_id: &Uuid) -> Vec<Comment> {
        let mut comments: Vec<Comment> = self
            .comments
            .iter()
            .filter(|entry| entry.value().article_id == *article_id)
            .map(|entry| entry.value().clone())
            .collect();
        comments.sort_by_key(|c| c.created_at);
        comments
    }

    /// Add a comment. Returns the parent article alongside the comment.
    pub fn add_comment(
        &self,
        article_id: &Uuid,
        content: &str,
        author: Option<&str>,
    ) -> Result<(Article, Comment), ContentError> {
        let article = self
            .get_article(article_id)
            .ok_or(ContentError::ArticleNotFound)?;
        let now = Utc::now();
        let comment = Comment {
            id: Uuid::new_v4(),
            article_id: *article_id,
            content: content.trim().to_string(),
            author: author
                .map(str::trim)
                .filter(|a| !a.is_empty())
                .unwrap_or(DEFAULT_AUTHOR)
                .to_string(),
            created_at: now,
            updated_at: now,
        };
        self.comments.insert(comment.id, comment.clone());
        Ok((article, comment))
    }

    /// Replace comment content. `author` of `None` keeps the current author.
    pub fn update_comment(
        &self,
        id: &Uuid,
        content: &str,
        author: Option<&str>,
    ) -> Option<Comment> {
        let mut entry = self.comments.get_mut(id)?;
        let comment = entry.value_mut();
        comment.content = content.trim().to_string();
        if let Some(author) = author.map(str::trim).filter(|a| !a.is_empty()) {
            comment.author = author.to_string();
        }
        comment.updated_at = Utc::now();
        Some(comment.clone())
    }

    pub fn delete_comment(&self, id: &Uuid) -> bool {
        self.comments.remove(id).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delete_workspace_detaches_articles() {
        let store = ContentStore::new();
        let workspace = store.create_workspace("Newsroom", None);
        let article = store.create_article("Title", "Body", Some(workspace.id));

        assert_eq!(store.list_articles(Some(&workspace.id)).len(), 1);
        assert!(store.delete_workspace(&workspace.id));
        assert!(!store.delete_workspace(&workspace.id));

        let article = store.get_article(&article.id).unwrap();
        assert_eq!(article.workspace_id, None);
        assert!(store.list_articles(Some(&workspace.id)).is_empty());
    }

    #[test]
    fn test_update_article_keeps_workspace_unless_given() {
        let store = ContentStore::new();
        let workspace = store.create_workspace("Desk", Some("Daily".to_string()));
        let article = store.create_article(" Draft ", " Body ", Some(workspace.id));
        assert_eq!(article.title, "Draft");

        let updated = store
            .update_article(&article.id, "Final", "Body v2", None)
            .unwrap();
        assert_eq!(updated.title, "Final");
        assert_eq!(updated.workspace_id, Some(workspace.id));

        let moved = store
            .update_article(&article.id, "Final", "Body v2", Some(None))
            .unwrap();
        assert_eq!(moved.workspace_id, None);

        assert!(store.update_article(&Uuid::new_v4(), "x", "y", None).is_none());
    }

    #[test]
    fn test_delete_article_cascades_comments() {
        let store = ContentStore::new();
        let article = store.create_article("Title", "Body", None);
        let (_, comment) = store.add_comment(&article.id, "Nice", None).unwrap();
        assert_eq!(comment.author, "Anonymous");

        assert!(store.delete_article(&article.id));
        assert!(store.list_comments(&article.id).is_empty());
        assert!(!store.delete_comment(&comment.id));
    }

    #[test]
    fn test_attachments_add_and_remove() {
        let store = ContentStore::new();
        let article = store.create_article("Title", "Body", None);

        let (updated, attachment) = store
            .add_attachment(&article.id, "photo.png", "image/png", 2048)
            .unwrap();
        assert_eq!(updated.attachments.len(), 1);
        assert!(attachment.filename.ends_with("-photo.png"));

        assert_eq!(
            store.remove_attachment(&article.id, "missing.png").err(),
            Some(ContentError::AttachmentNotFound)
        );
        let (updated, removed) = store
            .remove_attachment(&article.id, &attachment.filename)
            .unwrap();
        assert!(updated.attachments.is_empty());
        assert_eq!(removed.original_name, "photo.png");

        assert_eq!(
            store
                .add_attachment(&Uuid::new_v4(), "a.txt", "text/plain", 1)
                .err(),
            Some(ContentError::ArticleNotFound)
        );
    }

    #[test]
    fn test_update_comment_keeps_author_when_absent() {
        let store = ContentStore::new();
        let article = store.create_article("Title", "Body", None);
        let (_, comment) = store.add_comment(&article.id, "First", Some("Ada")).unwrap();

        let updated = store.update_comment(&comment.id, "Edited", None).unwrap();
        assert_eq!(updated.content, "Edited");
        assert_eq!(updated.author, "Ada");

        let renamed = store
            .update_comment(&comment.id, "Edited", Some("Grace"))
            .unwrap();
        assert_eq!(renamed.author, "Grace");
    }
}
