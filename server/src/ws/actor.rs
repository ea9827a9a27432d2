use axum::extract::ws::{CloseFrame, Message, WebSocket};
use futures_util::{SinkExt, StreamExt};
use std::net::SocketAddr;
use tokio::sync::mpsc;
use tokio::time::{interval, timeout, MissedTickBehavior};
use uuid::Uuid;

use crate::ws::{ConnectionSender, EventPublisher, Keepalive};

/// Run the actor-per-connection pattern for an event stream socket.
///
/// Splits the WebSocket into reader and writer halves:
/// - Writer task: owns the sink, forwards frames from an mpsc channel
/// - Reader loop: watches for close/error and answers pings
///
/// The connection is in the publisher's registry for exactly as long as
/// this function runs.
pub async fn run_connection(socket: WebSocket, publisher: EventPublisher, peer: SocketAddr) {
    let (ws_sender, mut ws_receiver) = socket.split();
    let (tx, rx) = mpsc::unbounded_channel::<Message>();

    let connection_id = publisher.register(tx.clone());

    tracing::info!(
        connection_id = %connection_id,
        peer = %peer,
        "WebSocket client connected"
    );

    let writer_handle = tokio::spawn(writer_task(ws_sender, rx));

    let (pong_tx, pong_rx) = mpsc::unbounded_channel::<()>();
    let ping_handle = tokio::spawn(keepalive_task(
        tx.clone(),
        pong_rx,
        publisher.keepalive(),
        connection_id,
    ));

    loop {
        match ws_receiver.next().await {
            Some(Ok(msg)) => match msg {
                Message::Text(text) => {
                    // The stream is server-to-client only
                    tracing::debug!(
                        connection_id = %connection_id,
                        "Ignoring client text frame: {}",
                        text.chars().take(100).collect::<String>()
                    );
                }
                Message::Binary(data) => {
                    tracing::debug!(
                        connection_id = %connection_id,
                        bytes = data.len(),
                        "Ignoring client binary frame"
                    );
                }
                Message::Pong(_) => {
                    let _ = pong_tx.send(());
                }
                Message::Ping(data) => {
                    let _ = tx.send(Message::Pong(data));
                }
                Message::Close(frame) => {
                    tracing::info!(
                        connection_id = %connection_id,
                        reason = ?frame,
                        "Client initiated close"
                    );
                    break;
                }
            },
            Some(Err(e)) => {
                tracing::warn!(
                    connection_id = %connection_id,
                    error = %e,
                    "WebSocket receive error"
                );
                break;
            }
            None => {
                tracing::info!(connection_id = %connection_id, "WebSocket stream ended");
                break;
            }
        }
    }

    writer_handle.abort();
    ping_handle.abort();

    publisher.unregister(&connection_id);

    tracing::info!(
        connection_id = %connection_id,
        peer = %peer,
        "WebSocket client disconnected"
    );
}

/// Ping every `ping_interval`; ask the writer to close if a pong does not
/// arrive within `pong_timeout`.
async fn keepalive_task(
    tx: ConnectionSender,
    mut pong_rx: mpsc::UnboundedReceiver<()>,
    keepalive: Keepalive,
    connection_id: Uuid,
) {
    let mut ticker = interval(keepalive.ping_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ticker.tick().await;

    loop {
        ticker.tick().await;
        if tx.send(Message::Ping(b"inkwell".to_vec().into())).is_err() {
            return;
        }

        // Drop pongs left over from earlier rounds
        while pong_rx.try_recv().is_ok() {}

        if !matches!(timeout(keepalive.pong_timeout, pong_rx.recv()).await, Ok(Some(()))) {
            tracing::warn!(connection_id = %connection_id, "Pong timeout, closing event stream");
            let _ = tx.send(Message::Close(Some(CloseFrame {
                code: axum::extract::ws::close_code::AWAY,
                reason: "Pong timeout".into(),
            })));
            return;
        }
    }
}

/// Writer task: receives frames from the mpsc channel and forwards them to the WebSocket sink.
async fn writer_task(
    mut ws_sender: futures_util::stream::SplitSink<WebSocket, Message>,
    mut rx: mpsc::UnboundedReceiver<Message>,
) {
    while let Some(msg) = rx.recv().await {
        if ws_sender.send(msg).await.is_err() {
            // WebSocket send failed, connection is broken
            break;
        }
    }
}
