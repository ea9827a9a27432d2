use std::collections::HashSet;
use std::sync::Arc;

use inkwell_client::config::ClientConfig;
use inkwell_client::display::describe;
use inkwell_client::refresh::WorkspaceDirectory;
use inkwell_client::transport::WsConnector;
use inkwell_client::{ConnectionManager, ConnectionState};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = ClientConfig::load()?;

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new("inkwell_client=info"))?;
    if config.json_logs {
        tracing_subscriber::fmt().json().with_env_filter(env_filter).init();
    } else {
        tracing_subscriber::fmt().pretty().with_env_filter(env_filter).init();
    }

    let manager = ConnectionManager::new(&config, Arc::new(WsConnector))?;
    tracing::info!(
        endpoint = %manager.endpoint(),
        "inkwell-watch v{} starting",
        env!("CARGO_PKG_VERSION")
    );

    let directory = WorkspaceDirectory::new(reqwest::Client::new(), &config.api_url);
    match directory.refresh().await {
        Ok(count) => tracing::info!(workspaces = count, "Loaded workspace list"),
        Err(e) => tracing::warn!(error = %e, "Could not load workspace list"),
    }
    let follower = {
        let directory = directory.clone();
        let events = manager.events();
        tokio::spawn(async move { directory.follow(events).await })
    };

    // Watch before subscribing so a fast failed open is not missed
    let mut connected = manager.watch_connected();
    let subscription = manager.subscribe();
    let mut notifications = manager.watch_notifications();
    let mut workspaces = directory.watch();
    let mut shown: HashSet<String> = HashSet::new();
    let mut was_connected = false;
    let mut never_opened = false;

    loop {
        tokio::select! {
            changed = notifications.changed() => {
                if changed.is_err() {
                    break;
                }
                let current = notifications.borrow_and_update().clone();
                for notification in &current {
                    if shown.insert(notification.id.clone()) {
                        println!("{}", describe(&notification.envelope));
                    }
                }
                shown.retain(|id| current.iter().any(|n| &n.id == id));
            }
            changed = connected.changed() => {
                if changed.is_err() {
                    break;
                }
                let is_connected = *connected.borrow_and_update();
                if is_connected {
                    was_connected = true;
                    tracing::info!("Listening for changes");
                } else if was_connected {
                    tracing::warn!("Event stream closed by server");
                    break;
                } else if manager.connection_state() == Some(ConnectionState::Closed) {
                    tracing::error!(endpoint = %manager.endpoint(), "Could not open event stream");
                    never_opened = true;
                    break;
                }
            }
            changed = workspaces.changed() => {
                if changed.is_err() {
                    break;
                }
                let names: Vec<String> = workspaces
                    .borrow_and_update()
                    .iter()
                    .map(|w| w.name.clone())
                    .collect();
                tracing::info!(workspaces = ?names, "Workspace list refreshed");
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Interrupted");
                break;
            }
        }
    }

    drop(subscription);
    manager.shutdown();
    follower.abort();
    tracing::info!("inkwell-watch stopped");

    if never_opened {
        return Err(format!("could not connect to {}", manager.endpoint()).into());
    }
    Ok(())
}
