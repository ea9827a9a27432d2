//! Shared event-stream connection with duplicate suppression and timed expiry.
//!
//! One [`ConnectionManager`] is created at application start and cloned into
//! every consumer. Each consumer holds a [`Subscription`] while it wants
//! events; the first subscription opens the connection and dropping the last
//! one closes it. There is no automatic reconnection: after an unexpected
//! close the manager stays disconnected until the next subscription opens a
//! fresh connection.

use inkwell_shared::Envelope;
use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::{broadcast, oneshot, watch};

use crate::config::{ClientConfig, EndpointError};
use crate::notification::DisplayedNotification;
use crate::transport::Connector;

/// Capacity of the refresh-listener channel.
const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Lifecycle of one connection. "Absent" is the manager holding no handle.
///
/// A connection that ends on its own (server close, transport error, failed
/// open) stays `Closed` until the next subscribe replaces it. Closes the
/// client asks for clear the handle instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connecting,
    Open,
    Closed,
}

struct ConnectionHandle {
    id: u64,
    state: ConnectionState,
    shutdown: oneshot::Sender<()>,
}

impl ConnectionHandle {
    fn close(self) {
        let _ = self.shutdown.send(());
    }
}

#[derive(Default)]
struct State {
    connection: Option<ConnectionHandle>,
    next_connection_id: u64,
    subscribers: usize,
    seen: HashSet<String>,
}

struct Shared {
    endpoint: String,
    display_window: Duration,
    dedup_grace: Duration,
    connector: Arc<dyn Connector>,
    state: Mutex<State>,
    notifications: watch::Sender<Vec<DisplayedNotification>>,
    connected: watch::Sender<bool>,
    events: broadcast::Sender<Envelope>,
}

/// Cheap to clone; all clones share one connection and one notification list.
#[derive(Clone)]
pub struct ConnectionManager {
    shared: Arc<Shared>,
}

impl ConnectionManager {
    pub fn new(
        config: &ClientConfig,
        connector: Arc<dyn Connector>,
    ) -> Result<Self, EndpointError> {
        let endpoint = config.event_endpoint()?;
        let (notifications, _) = watch::channel(Vec::new());
        let (connected, _) = watch::channel(false);
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

        Ok(Self {
            shared: Arc::new(Shared {
                endpoint,
                display_window: config.display_window(),
                dedup_grace: config.dedup_grace(),
                connector,
                state: Mutex::new(State::default()),
                notifications,
                connected,
                events,
            }),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.shared.endpoint
    }

    /// Register a subscriber, opening the shared connection if none is live.
    /// Must be called from within a tokio runtime.
    pub fn subscribe(&self) -> Subscription {
        self.shared.subscribe();
        Subscription {
            manager: self.clone(),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.shared.lock_state().subscribers
    }

    /// `None` when no connection handle is held.
    pub fn connection_state(&self) -> Option<ConnectionState> {
        self.shared.lock_state().connection.as_ref().map(|c| c.state)
    }

    /// True only while the transport is open.
    pub fn is_connected(&self) -> bool {
        *self.shared.connected.borrow()
    }

    pub fn watch_connected(&self) -> watch::Receiver<bool> {
        self.shared.connected.subscribe()
    }

    /// Visible notifications, oldest first.
    pub fn notifications(&self) -> Vec<DisplayedNotification> {
        self.shared.notifications.borrow().clone()
    }

    pub fn watch_notifications(&self) -> watch::Receiver<Vec<DisplayedNotification>> {
        self.shared.notifications.subscribe()
    }

    /// Dismiss one notification now. Its dedup key is still released on the
    /// original schedule.
    pub fn remove_notification(&self, id: &str) {
        self.shared.remove_notification(id);
    }

    /// Every novel envelope, for listeners that refetch data on change.
    pub fn events(&self) -> broadcast::Receiver<Envelope> {
        self.shared.events.subscribe()
    }

    /// Close the connection regardless of how many subscribers remain.
    pub fn shutdown(&self) {
        let handle = self.shared.lock_state().connection.take();
        if let Some(handle) = handle {
            tracing::info!(connection_id = handle.id, "Shutting down event stream");
            handle.close();
            self.shared.connected.send_replace(false);
        }
    }
}

/// A mounted consumer. Dropping it unsubscribes.
pub struct Subscription {
    manager: ConnectionManager,
}

impl Subscription {
    pub fn manager(&self) -> &ConnectionManager {
        &self.manager
    }

    pub fn notifications(&self) -> Vec<DisplayedNotification> {
        self.manager.notifications()
    }

    pub fn remove_notification(&self, id: &str) {
        self.manager.remove_notification(id);
    }

    pub fn is_connected(&self) -> bool {
        self.manager.is_connected()
    }

    pub fn events(&self) -> broadcast::Receiver<Envelope> {
        self.manager.events()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.manager.shared.unsubscribe();
    }
}

impl Shared {
    fn lock_state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn subscribe(self: &Arc<Self>) {
        let mut state = self.lock_state();
        state.subscribers += 1;

        let live = state
            .connection
            .as_ref()
            .is_some_and(|c| c.state != ConnectionState::Closed);
        if live {
            tracing::debug!(subscribers = state.subscribers, "Reusing event stream connection");
            return;
        }

        let id = state.next_connection_id;
        state.next_connection_id += 1;
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        // Stored before the transport opens so concurrent subscribers reuse it.
        let stale = state.connection.replace(ConnectionHandle {
            id,
            state: ConnectionState::Connecting,
            shutdown: shutdown_tx,
        });
        let subscribers = state.subscribers;
        drop(state);

        if let Some(stale) = stale {
            stale.close();
        }

        tracing::info!(
            connection_id = id,
            endpoint = %self.endpoint,
            subscribers = subscribers,
            "Opening event stream connection"
        );
        tokio::spawn(run_connection(Arc::clone(self), id, shutdown_rx));
    }

    fn unsubscribe(&self) {
        let mut state = self.lock_state();
        state.subscribers = state.subscribers.saturating_sub(1);
        if state.subscribers > 0 {
            return;
        }

        let active = state.connection.as_ref().is_some_and(|c| {
            matches!(c.state, ConnectionState::Connecting | ConnectionState::Open)
        });
        if !active {
            return;
        }

        let handle = state.connection.take();
        drop(state);

        if let Some(handle) = handle {
            tracing::info!(
                connection_id = handle.id,
                "Last subscriber gone, closing event stream"
            );
            handle.close();
            self.connected.send_replace(false);
        }
    }

    /// Returns false if the connection was superseded while opening.
    fn mark_open(&self, id: u64) -> bool {
        let mut state = self.lock_state();
        match state.connection.as_mut() {
            Some(handle) if handle.id == id => {
                handle.state = ConnectionState::Open;
                drop(state);
                self.connected.send_replace(true);
                tracing::info!(connection_id = id, "Event stream connected");
                true
            }
            _ => false,
        }
    }

    /// Marks the stored handle closed only if it still refers to this connection.
    fn mark_closed(&self, id: u64) {
        let mut state = self.lock_state();
        let current = state.connection.as_ref().is_some_and(|c| c.id == id);
        if !current {
            tracing::debug!(connection_id = id, "Ignoring close of superseded connection");
            return;
        }
        let was_open = state
            .connection
            .as_ref()
            .is_some_and(|c| c.state == ConnectionState::Open);
        if let Some(handle) = state.connection.as_mut() {
            handle.state = ConnectionState::Closed;
        }
        drop(state);

        // Always notifies, so watchers also learn about a failed first open.
        self.connected.send_replace(false);
        if !was_open {
            tracing::debug!(connection_id = id, "Event stream closed before opening");
            return;
        }
        tracing::warn!(connection_id = id, "Event stream closed");
    }

    /// Handle one inbound text frame.
    fn ingest(self: &Arc<Self>, text: &str) {
        let envelope: Envelope = match serde_json::from_str(text) {
            Ok(envelope) => envelope,
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    "Discarding malformed event: {}",
                    text.chars().take(100).collect::<String>()
                );
                return;
            }
        };

        let key = envelope.dedup_key();
        if !self.lock_state().seen.insert(key.clone()) {
            tracing::debug!(event_type = %envelope.event_type, "Suppressing duplicate event");
            return;
        }

        let notification = DisplayedNotification::new(envelope);
        let id = notification.id.clone();
        let envelope = notification.envelope.clone();
        tracing::debug!(
            event_type = %envelope.event_type,
            notification_id = %id,
            "Displaying notification"
        );

        self.notifications.send_modify(|list| list.push(notification));
        // No receivers is fine: refresh listeners are optional.
        let _ = self.events.send(envelope);

        self.arm_timers(id, key);
    }

    /// Both timers start now; neither is ever cancelled.
    fn arm_timers(self: &Arc<Self>, id: String, key: String) {
        let expire_after = self.display_window;
        let release_after = self.display_window + self.dedup_grace;

        let shared = Arc::downgrade(self);
        tokio::spawn(async move {
            tokio::time::sleep(expire_after).await;
            if let Some(shared) = shared.upgrade() {
                shared.remove_notification(&id);
            }
        });

        let shared = Arc::downgrade(self);
        tokio::spawn(async move {
            tokio::time::sleep(release_after).await;
            if let Some(shared) = shared.upgrade() {
                shared.lock_state().seen.remove(&key);
            }
        });
    }

    fn remove_notification(&self, id: &str) {
        self.notifications.send_if_modified(|list| {
            let before = list.len();
            list.retain(|n| n.id != id);
            list.len() != before
        });
    }
}

/// Drive one connection from open to close.
async fn run_connection(shared: Arc<Shared>, id: u64, mut shutdown: oneshot::Receiver<()>) {
    let connect = shared.connector.connect(&shared.endpoint);
    let mut stream = tokio::select! {
        result = connect => match result {
            Ok(stream) => stream,
            Err(e) => {
                tracing::warn!(connection_id = id, error = %e, "Event stream connection failed");
                shared.mark_closed(id);
                return;
            }
        },
        _ = &mut shutdown => {
            tracing::debug!(connection_id = id, "Connection abandoned while opening");
            shared.mark_closed(id);
            return;
        }
    };

    if !shared.mark_open(id) {
        stream.close().await;
        return;
    }

    loop {
        tokio::select! {
            frame = stream.next_frame() => match frame {
                Some(Ok(text)) => shared.ingest(&text),
                Some(Err(e)) => {
                    tracing::warn!(connection_id = id, error = %e, "Event stream error");
                    break;
                }
                None => break,
            },
            _ = &mut shutdown => {
                stream.close().await;
                break;
            }
        }
    }

    shared.mark_closed(id);
}
