use axum::{
    extract::{ws::WebSocketUpgrade, ConnectInfo, State},
    response::Response,
};
use std::net::SocketAddr;

use crate::ws::actor;
use crate::ws::EventPublisher;

/// GET / (WebSocket upgrade)
/// The event stream is unauthenticated and broadcast-only.
pub async fn ws_upgrade(
    State(publisher): State<EventPublisher>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    ws: WebSocketUpgrade,
) -> Response {
    tracing::debug!(peer = %peer, "WebSocket upgrade requested");
    ws.on_upgrade(move |socket| actor::run_connection(socket, publisher, peer))
}
