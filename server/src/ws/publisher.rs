//! Process-wide event publisher: owns the connection registry and fans
//! change events out to every connected session.

use axum::extract::ws::Message;
use axum::routing::get;
use axum::Router;
use inkwell_shared::{EventType, Envelope};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use uuid::Uuid;

use super::{handler, new_connection_registry, ConnectionRegistry, ConnectionSender, Keepalive};

/// Error type for publisher setup.
#[derive(Debug, PartialEq, Eq)]
pub enum PublisherError {
    AlreadyInitialized,
}

impl std::fmt::Display for PublisherError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PublisherError::AlreadyInitialized => {
                write!(f, "Event publisher is already initialized")
            }
        }
    }
}

impl std::error::Error for PublisherError {}

/// Cheap to clone; all clones share one registry.
#[derive(Clone)]
pub struct EventPublisher {
    registry: ConnectionRegistry,
    initialized: Arc<AtomicBool>,
    keepalive: Keepalive,
}

impl EventPublisher {
    pub fn new(keepalive: Keepalive) -> Self {
        Self {
            registry: new_connection_registry(),
            initialized: Arc::new(AtomicBool::new(false)),
            keepalive,
        }
    }

    /// Mount the WebSocket upgrade endpoint at `/` on the HTTP router.
    /// Allowed once per publisher.
    pub fn initialize(&self, router: Router) -> Result<Router, PublisherError> {
        if self
            .initialized
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(PublisherError::AlreadyInitialized);
        }

        tracing::info!("Realtime event endpoint mounted at /");
        Ok(router.route("/", get(handler::ws_upgrade).with_state(self.clone())))
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::SeqCst)
    }

    pub fn keepalive(&self) -> Keepalive {
        self.keepalive
    }

    /// Number of connections currently in the registry (open or not).
    pub fn connection_count(&self) -> usize {
        self.registry.len()
    }

    /// Broadcast one event to every open connection.
    ///
    /// Fire-and-forget: never fails the caller. Returns how many connections
    /// the frame was handed to.
    pub fn broadcast(&self, event_type: EventType, data: serde_json::Value) -> usize {
        if !self.is_initialized() {
            tracing::warn!(
                event_type = %event_type,
                "Event publisher not initialized, dropping event"
            );
            return 0;
        }

        let data = match data {
            serde_json::Value::Object(map) => map,
            other => {
                tracing::warn!(
                    event_type = %event_type,
                    payload = %other,
                    "Event payload must be a JSON object, dropping event"
                );
                return 0;
            }
        };

        let envelope = Envelope::now(event_type, data);
        let text = match serde_json::to_string(&envelope) {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!(event_type = %event_type, error = %e, "Failed to encode event");
                return 0;
            }
        };
        let msg = Message::Text(text.into());

        // Snapshot so lifecycle callbacks never race the iteration.
        let targets: Vec<(Uuid, ConnectionSender)> = self
            .registry
            .iter()
            .map(|entry| (*entry.key(), entry.value().clone()))
            .collect();

        let mut delivered = 0;
        for (connection_id, sender) in targets {
            // Not open: skip. Removal belongs to the close handler.
            if sender.is_closed() {
                continue;
            }
            match sender.send(msg.clone()) {
                Ok(()) => delivered += 1,
                Err(_) => {
                    tracing::debug!(
                        connection_id = %connection_id,
                        "Skipping connection that closed mid-broadcast"
                    );
                }
            }
        }

        tracing::debug!(
            event_type = %event_type,
            delivered = delivered,
            "Event broadcast"
        );
        delivered
    }

    /// Add a connection to the registry and return its id.
    pub fn register(&self, sender: ConnectionSender) -> Uuid {
        let connection_id = Uuid::new_v4();
        self.registry.insert(connection_id, sender);
        tracing::debug!(
            connection_id = %connection_id,
            connections = self.registry.len(),
            "Connection registered"
        );
        connection_id
    }

    /// Remove a connection from the registry.
    pub fn unregister(&self, connection_id: &Uuid) {
        self.registry.remove(connection_id);
        tracing::debug!(
            connection_id = %connection_id,
            connections = self.registry.len(),
            "Connection unregistered"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tokio::sync::mpsc;

    fn initialized_publisher() -> EventPublisher {
        let publisher = EventPublisher::new(Keepalive::default());
        publisher
            .initialize(Router::new())
            .expect("first initialize succeeds");
        publisher
    }

    fn attach(publisher: &EventPublisher) -> mpsc::UnboundedReceiver<Message> {
        let (tx, rx) = mpsc::unbounded_channel();
        publisher.register(tx);
        rx
    }

    fn drain(rx: &mut mpsc::UnboundedReceiver<Message>) -> Vec<Envelope> {
        let mut frames = Vec::new();
        while let Ok(msg) = rx.try_recv() {
            match msg {
                Message::Text(text) => {
                    frames.push(serde_json::from_str(text.as_str()).expect("valid envelope"))
                }
                other => panic!("Expected text frame, got: {:?}", other),
            }
        }
        frames
    }

    #[test]
    fn test_broadcast_before_initialize_is_noop() {
        let publisher = EventPublisher::new(Keepalive::default());
        let mut rx = attach(&publisher);

        let delivered = publisher.broadcast(EventType::ArticleCreated, json!({"id": "a1"}));

        assert_eq!(delivered, 0);
        assert!(drain(&mut rx).is_empty());
    }

    #[test]
    fn test_initialize_only_once() {
        let publisher = EventPublisher::new(Keepalive::default());
        assert!(!publisher.is_initialized());
        assert!(publisher.initialize(Router::new()).is_ok());
        assert!(publisher.is_initialized());

        let second = publisher.clone().initialize(Router::new());
        assert_eq!(second.err(), Some(PublisherError::AlreadyInitialized));
    }

    #[test]
    fn test_every_connection_gets_one_frame_per_broadcast() {
        let publisher = initialized_publisher();
        let mut receivers: Vec<_> = (0..5).map(|_| attach(&publisher)).collect();

        assert_eq!(
            publisher.broadcast(EventType::ArticleUpdated, json!({"id": "a1", "title": "One"})),
            5
        );
        assert_eq!(
            publisher.broadcast(EventType::ArticleDeleted, json!({"id": "a1"})),
            5
        );

        for rx in receivers.iter_mut() {
            let frames = drain(rx);
            assert_eq!(frames.len(), 2);
            assert_eq!(frames[0].event_type, EventType::ArticleUpdated);
            assert_eq!(frames[0].data_str("title"), Some("One"));
            assert_eq!(frames[1].event_type, EventType::ArticleDeleted);
        }
    }

    #[test]
    fn test_failed_connection_does_not_block_others() {
        let publisher = initialized_publisher();
        let mut first = attach(&publisher);
        let broken = attach(&publisher);
        let mut last = attach(&publisher);
        drop(broken);

        let delivered =
            publisher.broadcast(EventType::CommentDeleted, json!({"commentId": "c1"}));

        assert_eq!(delivered, 2);
        assert_eq!(drain(&mut first).len(), 1);
        assert_eq!(drain(&mut last).len(), 1);
        // Skipped, not removed: only the close handler unregisters.
        assert_eq!(publisher.connection_count(), 3);
    }

    #[test]
    fn test_unregister_stops_delivery() {
        let publisher = initialized_publisher();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let connection_id = publisher.register(tx);
        publisher.unregister(&connection_id);

        assert_eq!(
            publisher.broadcast(EventType::WorkspaceDeleted, json!({"id": "w1"})),
            0
        );
        assert!(drain(&mut rx).is_empty());
        assert_eq!(publisher.connection_count(), 0);
    }

    #[test]
    fn test_non_object_payload_is_dropped() {
        let publisher = initialized_publisher();
        let mut rx = attach(&publisher);

        assert_eq!(publisher.broadcast(EventType::ArticleDeleted, json!("a1")), 0);
        assert!(drain(&mut rx).is_empty());
    }
}
