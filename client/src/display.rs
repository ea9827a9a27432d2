//! Human-readable rendering of notifications.

use inkwell_shared::{Envelope, EventType};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationIcon {
    Created,
    Edited,
    Deleted,
    Attachment,
    Comment,
    Workspace,
}

impl NotificationIcon {
    /// Single-glyph marker for terminal output.
    pub fn glyph(&self) -> &'static str {
        match self {
            Self::Created => "+",
            Self::Edited => "~",
            Self::Deleted => "-",
            Self::Attachment => "@",
            Self::Comment => "#",
            Self::Workspace => "*",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationContent {
    pub icon: NotificationIcon,
    pub title: &'static str,
    pub message: String,
}

impl fmt::Display for NotificationContent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.icon.glyph(), self.title, self.message)
    }
}

pub fn describe(envelope: &Envelope) -> NotificationContent {
    let field = |name| envelope.data_str(name);
    let quoted = |name| field(name).map(|v| format!("\"{}\"", v));

    let (icon, title, message) = match envelope.event_type {
        EventType::ArticleCreated => (
            NotificationIcon::Created,
            "Article Created",
            match quoted("title") {
                Some(t) => format!("{} has been created.", t),
                None => "An article has been created.".to_string(),
            },
        ),
        EventType::ArticleUpdated => (
            NotificationIcon::Edited,
            "Article Updated",
            match quoted("title") {
                Some(t) => format!("{} has been updated.", t),
                None => "An article has been updated.".to_string(),
            },
        ),
        EventType::ArticleDeleted => (
            NotificationIcon::Deleted,
            "Article Deleted",
            "An article has been deleted.".to_string(),
        ),
        EventType::AttachmentAdded => (
            NotificationIcon::Attachment,
            "Attachment Added",
            match (quoted("filename"), quoted("articleTitle")) {
                (Some(file), Some(article)) => format!("File {} was added to {}.", file, article),
                (Some(file), None) => format!("File {} was added.", file),
                _ => "A file was added.".to_string(),
            },
        ),
        EventType::AttachmentRemoved => (
            NotificationIcon::Attachment,
            "Attachment Removed",
            match (quoted("filename"), quoted("articleTitle")) {
                (Some(file), Some(article)) => {
                    format!("File {} was removed from {}.", file, article)
                }
                (Some(file), None) => format!("File {} was removed.", file),
                _ => "A file was removed.".to_string(),
            },
        ),
        EventType::CommentAdded => (
            NotificationIcon::Comment,
            "Comment Added",
            match (field("author"), quoted("articleTitle")) {
                (Some(author), Some(article)) => format!("{} commented on {}.", author, article),
                (None, Some(article)) => format!("New comment on {}.", article),
                _ => "A comment has been added.".to_string(),
            },
        ),
        EventType::CommentUpdated => (
            NotificationIcon::Comment,
            "Comment Updated",
            match field("author") {
                Some(author) => format!("{} edited a comment.", author),
                None => "A comment has been updated.".to_string(),
            },
        ),
        EventType::CommentDeleted => (
            NotificationIcon::Deleted,
            "Comment Deleted",
            "A comment has been deleted.".to_string(),
        ),
        EventType::WorkspaceCreated => (
            NotificationIcon::Workspace,
            "Workspace Created",
            match quoted("name") {
                Some(n) => format!("Workspace {} has been created.", n),
                None => "A workspace has been created.".to_string(),
            },
        ),
        EventType::WorkspaceUpdated => (
            NotificationIcon::Workspace,
            "Workspace Updated",
            match quoted("name") {
                Some(n) => format!("Workspace {} has been updated.", n),
                None => "A workspace has been updated.".to_string(),
            },
        ),
        EventType::WorkspaceDeleted => (
            NotificationIcon::Deleted,
            "Workspace Deleted",
            "A workspace has been deleted.".to_string(),
        ),
    };

    NotificationContent {
        icon,
        title,
        message,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn envelope(event_type: EventType, data: serde_json::Value) -> Envelope {
        let data = data.as_object().cloned().unwrap_or_default();
        Envelope {
            event_type,
            data,
            timestamp: "2025-12-07T10:00:00.000Z".to_string(),
        }
    }

    #[test]
    fn test_article_updated_wording() {
        let content = describe(&envelope(
            EventType::ArticleUpdated,
            json!({"id": "a1", "title": "Release Notes"}),
        ));
        assert_eq!(content.title, "Article Updated");
        assert_eq!(content.message, "\"Release Notes\" has been updated.");
        assert_eq!(content.icon, NotificationIcon::Edited);
    }

    #[test]
    fn test_attachment_wording() {
        let content = describe(&envelope(
            EventType::AttachmentRemoved,
            json!({"articleId": "a1", "articleTitle": "Guide", "filename": "chart.png"}),
        ));
        assert_eq!(content.title, "Attachment Removed");
        assert_eq!(content.message, "File \"chart.png\" was removed from \"Guide\".");
    }

    #[test]
    fn test_missing_fields_fall_back() {
        let content = describe(&envelope(EventType::ArticleCreated, json!({})));
        assert_eq!(content.message, "An article has been created.");

        let content = describe(&envelope(EventType::AttachmentAdded, json!({"filename": 7})));
        assert_eq!(content.message, "A file was added.");
    }

    #[test]
    fn test_every_type_has_a_title() {
        for event_type in EventType::ALL {
            let content = describe(&envelope(event_type, json!({})));
            assert!(!content.title.is_empty());
            assert!(!content.message.is_empty());
        }
    }

    #[test]
    fn test_display_line() {
        let content = describe(&envelope(
            EventType::CommentAdded,
            json!({"articleTitle": "Guide", "author": "Mia", "commentId": "c1"}),
        ));
        assert_eq!(content.to_string(), "[#] Comment Added: Mia commented on \"Guide\".");
    }
}
