//! Views that refetch their data when a matching event arrives.

use inkwell_shared::{Envelope, Resource};
use serde::Deserialize;
use tokio::sync::{broadcast, watch};

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct WorkspaceEntry {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// Workspace list kept in sync with the server.
#[derive(Clone)]
pub struct WorkspaceDirectory {
    http: reqwest::Client,
    api_url: String,
    workspaces: watch::Sender<Vec<WorkspaceEntry>>,
}

impl WorkspaceDirectory {
    pub fn new(http: reqwest::Client, api_url: &str) -> Self {
        let (workspaces, _) = watch::channel(Vec::new());
        Self {
            http,
            api_url: api_url.trim_end_matches('/').to_string(),
            workspaces,
        }
    }

    /// Fetch `GET /workspaces` and replace the cached list.
    pub async fn refresh(&self) -> Result<usize, reqwest::Error> {
        let list: Vec<WorkspaceEntry> = self
            .http
            .get(format!("{}/workspaces", self.api_url))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        let count = list.len();
        self.workspaces.send_replace(list);
        Ok(count)
    }

    pub fn workspaces(&self) -> Vec<WorkspaceEntry> {
        self.workspaces.borrow().clone()
    }

    pub fn watch(&self) -> watch::Receiver<Vec<WorkspaceEntry>> {
        self.workspaces.subscribe()
    }

    /// Refetch on every workspace event until the event channel closes.
    pub async fn follow(&self, mut events: broadcast::Receiver<Envelope>) {
        loop {
            match events.recv().await {
                Ok(envelope) if envelope.event_type.resource() == Resource::Workspace => {
                    tracing::debug!(event_type = %envelope.event_type, "Refreshing workspace list");
                    self.refresh_logged().await;
                }
                Ok(_) => {}
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped = skipped, "Event listener lagged, refreshing anyway");
                    self.refresh_logged().await;
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    }

    /// Failures keep the previous list.
    async fn refresh_logged(&self) {
        if let Err(e) = self.refresh().await {
            tracing::warn!(error = %e, "Failed to refresh workspace list");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{routing::get, Json, Router};
    use inkwell_shared::EventType;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    async fn serve(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}", addr)
    }

    fn envelope(event_type: EventType) -> Envelope {
        Envelope::now(event_type, Default::default())
    }

    #[tokio::test]
    async fn test_refetches_on_workspace_events_only() {
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();
        let router = Router::new().route(
            "/workspaces",
            get(move || {
                let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
                async move {
                    Json(json!([{"id": "w1", "name": format!("Desk {}", n), "description": null}]))
                }
            }),
        );
        let base = serve(router).await;

        let directory = WorkspaceDirectory::new(reqwest::Client::new(), &format!("{}/", base));
        let (tx, rx) = broadcast::channel(8);
        let follower = {
            let directory = directory.clone();
            tokio::spawn(async move { directory.follow(rx).await })
        };

        tx.send(envelope(EventType::ArticleUpdated)).unwrap();
        tx.send(envelope(EventType::WorkspaceCreated)).unwrap();
        drop(tx);
        follower.await.unwrap();

        assert_eq!(hits.load(Ordering::SeqCst), 1);
        let workspaces = directory.workspaces();
        assert_eq!(workspaces.len(), 1);
        assert_eq!(workspaces[0].name, "Desk 1");
    }

    #[tokio::test]
    async fn test_failed_fetch_keeps_previous_list() {
        let base = serve(Router::new().route(
            "/workspaces",
            get(|| async { (axum::http::StatusCode::INTERNAL_SERVER_ERROR, "boom") }),
        ))
        .await;
        let directory = WorkspaceDirectory::new(reqwest::Client::new(), &base);
        directory.workspaces.send_replace(vec![WorkspaceEntry {
            id: "w1".to_string(),
            name: "Kept".to_string(),
            description: None,
        }]);

        assert!(directory.refresh().await.is_err());
        assert_eq!(directory.workspaces()[0].name, "Kept");
    }
}
