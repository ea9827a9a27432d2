pub mod actor;
pub mod handler;
pub mod publisher;

use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use uuid::Uuid;

pub use publisher::{EventPublisher, PublisherError};

/// Type alias for the sender half of a WebSocket connection's channel.
/// The publisher clones this to push frames to a specific client.
pub type ConnectionSender = mpsc::UnboundedSender<axum::extract::ws::Message>;

/// Connection registry: every live WebSocket connection, keyed by a
/// per-connection id. Connections carry no user identity.
pub type ConnectionRegistry = Arc<DashMap<Uuid, ConnectionSender>>;

/// Create a new empty connection registry.
pub fn new_connection_registry() -> ConnectionRegistry {
    Arc::new(DashMap::new())
}

/// Ping/pong keepalive settings for each connection actor.
#[derive(Debug, Clone, Copy)]
pub struct Keepalive {
    /// Interval between server pings.
    pub ping_interval: Duration,
    /// How long to wait for a pong before closing the connection.
    pub pong_timeout: Duration,
}

impl Default for Keepalive {
    fn default() -> Self {
        Self {
            ping_interval: Duration::from_secs(30),
            pong_timeout: Duration::from_secs(10),
        }
    }
}
