//! End-to-end tests: a real server, the shared connection manager and the
//! WebSocket transport.

use inkwell_client::config::ClientConfig;
use inkwell_client::display::describe;
use inkwell_client::refresh::WorkspaceDirectory;
use inkwell_client::transport::WsConnector;
use inkwell_client::{ConnectionManager, ConnectionState};
use inkwell_server::ws::{EventPublisher, Keepalive};
use inkwell_shared::EventType;
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;

async fn start_test_server() -> (String, EventPublisher) {
    let publisher = EventPublisher::new(Keepalive::default());
    let state = inkwell_server::state::AppState::new(publisher.clone());
    let app = inkwell_server::routes::build_router(state).expect("Failed to build router");

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
        .unwrap();
    });

    (format!("http://{}", addr), publisher)
}

fn manager_for(base_url: &str) -> ConnectionManager {
    let config = ClientConfig {
        api_url: base_url.to_string(),
        ..ClientConfig::default()
    };
    ConnectionManager::new(&config, Arc::new(WsConnector)).expect("valid endpoint")
}

async fn wait_until(what: &str, cond: impl Fn() -> bool) {
    for _ in 0..200 {
        if cond() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("Timed out waiting for {}", what);
}

#[tokio::test]
async fn test_article_update_shows_one_notification_then_expires() {
    let (base_url, publisher) = start_test_server().await;
    let manager = manager_for(&base_url);
    let subscription = manager.subscribe();
    wait_until("connection", || {
        subscription.is_connected() && publisher.connection_count() == 1
    })
    .await;

    let http = reqwest::Client::new();
    let created: serde_json::Value = http
        .post(format!("{}/articles", base_url))
        .json(&json!({"title": "Draft", "content": "Body"}))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let id = created["id"].as_str().unwrap().to_string();

    let res = http
        .put(format!("{}/articles/{}", base_url, id))
        .json(&json!({"title": "Release Notes", "content": "Body v2"}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);

    let updated = || {
        subscription
            .notifications()
            .into_iter()
            .filter(|n| n.envelope.event_type == EventType::ArticleUpdated)
            .collect::<Vec<_>>()
    };
    wait_until("article_updated notification", || !updated().is_empty()).await;

    let shown = updated();
    assert_eq!(shown.len(), 1);
    let content = describe(&shown[0].envelope);
    assert_eq!(content.title, "Article Updated");
    assert!(content.message.contains("Release Notes"));
    assert_eq!(shown[0].envelope.data_str("id"), Some(id.as_str()));

    tokio::time::sleep(Duration::from_millis(5300)).await;
    assert!(updated().is_empty(), "notification should expire after the display window");
}

#[tokio::test]
async fn test_workspace_directory_refetches_on_event() {
    let (base_url, _publisher) = start_test_server().await;
    let manager = manager_for(&base_url);
    let directory = WorkspaceDirectory::new(reqwest::Client::new(), &base_url);
    assert_eq!(directory.refresh().await.unwrap(), 0);

    let follower = {
        let directory = directory.clone();
        let events = manager.events();
        tokio::spawn(async move { directory.follow(events).await })
    };
    let _subscription = manager.subscribe();
    wait_until("connection", || manager.is_connected()).await;

    let res = reqwest::Client::new()
        .post(format!("{}/workspaces", base_url))
        .json(&json!({"name": "Research"}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 201);

    wait_until("workspace refetch", || directory.workspaces().len() == 1).await;
    assert_eq!(directory.workspaces()[0].name, "Research");
    follower.abort();
}

#[tokio::test]
async fn test_last_subscription_drop_closes_server_connection() {
    let (base_url, publisher) = start_test_server().await;
    let manager = manager_for(&base_url);

    let first = manager.subscribe();
    let second = manager.subscribe();
    wait_until("connection", || manager.is_connected()).await;
    wait_until("registration", || publisher.connection_count() == 1).await;

    drop(first);
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(publisher.connection_count(), 1);

    drop(second);
    assert!(!manager.is_connected());
    wait_until("server cleanup", || publisher.connection_count() == 0).await;
}

#[tokio::test]
async fn test_shutdown_closes_without_reconnecting() {
    let (base_url, publisher) = start_test_server().await;
    let manager = manager_for(&base_url);
    let _subscription = manager.subscribe();
    wait_until("connection", || manager.is_connected()).await;
    wait_until("registration", || publisher.connection_count() == 1).await;

    manager.shutdown();
    wait_until("server cleanup", || publisher.connection_count() == 0).await;
    assert_eq!(publisher.broadcast(EventType::ArticleDeleted, json!({"id": "a1"})), 0);

    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(!manager.is_connected());
    assert_eq!(publisher.connection_count(), 0);
}

#[tokio::test]
async fn test_unreachable_server_leaves_closed_state() {
    // Reserve a port, then free it so nothing is listening there
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let manager = manager_for(&format!("http://{}", addr));
    let mut connected = manager.watch_connected();
    let _subscription = manager.subscribe();

    tokio::time::timeout(Duration::from_secs(5), connected.changed())
        .await
        .expect("failed open should notify watchers")
        .unwrap();
    assert!(!manager.is_connected());
    assert_eq!(manager.connection_state(), Some(ConnectionState::Closed));
}
