use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Identifying fields attached to an event (ids, titles, names).
pub type EventData = serde_json::Map<String, serde_json::Value>;

/// Change event tags. The serialized form is the on-the-wire `type` string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    ArticleCreated,
    ArticleUpdated,
    ArticleDeleted,
    AttachmentAdded,
    AttachmentRemoved,
    CommentAdded,
    CommentUpdated,
    CommentDeleted,
    WorkspaceCreated,
    WorkspaceUpdated,
    WorkspaceDeleted,
}

/// The kind of entity an event refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Resource {
    Article,
    Attachment,
    Comment,
    Workspace,
}

impl EventType {
    pub const ALL: [EventType; 11] = [
        Self::ArticleCreated,
        Self::ArticleUpdated,
        Self::ArticleDeleted,
        Self::AttachmentAdded,
        Self::AttachmentRemoved,
        Self::CommentAdded,
        Self::CommentUpdated,
        Self::CommentDeleted,
        Self::WorkspaceCreated,
        Self::WorkspaceUpdated,
        Self::WorkspaceDeleted,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ArticleCreated => "article_created",
            Self::ArticleUpdated => "article_updated",
            Self::ArticleDeleted => "article_deleted",
            Self::AttachmentAdded => "attachment_added",
            Self::AttachmentRemoved => "attachment_removed",
            Self::CommentAdded => "comment_added",
            Self::CommentUpdated => "comment_updated",
            Self::CommentDeleted => "comment_deleted",
            Self::WorkspaceCreated => "workspace_created",
            Self::WorkspaceUpdated => "workspace_updated",
            Self::WorkspaceDeleted => "workspace_deleted",
        }
    }

    pub fn resource(&self) -> Resource {
        match self {
            Self::ArticleCreated | Self::ArticleUpdated | Self::ArticleDeleted => Resource::Article,
            Self::AttachmentAdded | Self::AttachmentRemoved => Resource::Attachment,
            Self::CommentAdded | Self::CommentUpdated | Self::CommentDeleted => Resource::Comment,
            Self::WorkspaceCreated | Self::WorkspaceUpdated | Self::WorkspaceDeleted => {
                Resource::Workspace
            }
        }
    }
}

/// A `type` string that names no known event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownEventType(pub String);

impl fmt::Display for UnknownEventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown event type: {}", self.0)
    }
}

impl std::error::Error for UnknownEventType {}

impl FromStr for EventType {
    type Err = UnknownEventType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| UnknownEventType(s.to_string()))
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One change event as broadcast to every connected session.
///
/// `timestamp` is kept as the exact string the publisher produced so that
/// the dedup key computed by a client matches byte for byte.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(rename = "type")]
    pub event_type: EventType,
    pub data: EventData,
    pub timestamp: String,
}

impl Envelope {
    /// Build an envelope stamped with the current instant (ISO-8601, millisecond precision).
    pub fn now(event_type: EventType, data: EventData) -> Self {
        Self {
            event_type,
            data,
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        }
    }

    /// Duplicate-suppression key: `type-timestamp-data`.
    pub fn dedup_key(&self) -> String {
        let data = serde_json::to_string(&self.data).unwrap_or_default();
        format!("{}-{}-{}", self.event_type, self.timestamp, data)
    }

    /// String field from `data`, if present.
    pub fn data_str(&self, field: &str) -> Option<&str> {
        self.data.get(field).and_then(|v| v.as_str())
    }
}
