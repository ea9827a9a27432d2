use clap::Parser;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::time::Duration;

const DEFAULT_CONFIG_PATH: &str = "./inkwell-watch.toml";

/// Inkwell realtime notification watcher
#[derive(Parser, Serialize, Debug)]
#[command(name = "inkwell-watch", version, about = "Inkwell realtime notification watcher")]
pub struct WatchArgs {
    /// Base URL of the Inkwell HTTP API; the event stream shares its host and port
    /// [default: http://localhost:3001]
    #[arg(long)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,

    /// Path to TOML config file [default: ./inkwell-watch.toml]
    #[arg(long)]
    #[serde(skip)]
    pub config: Option<String>,

    /// Enable structured JSON logging
    #[arg(long)]
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub json_logs: bool,

    /// How long a notification stays visible, in milliseconds [default: 5000]
    #[arg(long)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_window_ms: Option<u64>,

    /// How long after removal an event's dedup key stays held, in milliseconds [default: 5000]
    #[arg(long)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dedup_grace_ms: Option<u64>,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct ClientConfig {
    pub api_url: String,
    pub json_logs: bool,
    pub display_window_ms: u64,
    pub dedup_grace_ms: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: "http://localhost:3001".to_string(),
            json_logs: false,
            display_window_ms: 5000,
            dedup_grace_ms: 5000,
        }
    }
}

impl ClientConfig {
    /// Load config with layered precedence:
    /// built-in defaults < TOML file < env vars (INKWELL_*) < CLI args
    pub fn load() -> Result<Self, figment::Error> {
        Self::load_from(std::env::args_os())
    }

    pub fn load_from<I, T>(args: I) -> Result<Self, figment::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        let args = WatchArgs::parse_from(args);
        let config_path = args
            .config
            .clone()
            .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());

        Figment::new()
            .merge(Serialized::defaults(ClientConfig::default()))
            .merge(Toml::file(&config_path))
            .merge(Env::prefixed("INKWELL_").ignore(&["config"]))
            .merge(Serialized::defaults(args))
            .extract()
    }

    pub fn display_window(&self) -> Duration {
        Duration::from_millis(self.display_window_ms)
    }

    pub fn dedup_grace(&self) -> Duration {
        Duration::from_millis(self.dedup_grace_ms)
    }

    pub fn event_endpoint(&self) -> Result<String, EndpointError> {
        event_endpoint(&self.api_url)
    }
}

/// Error type for deriving the event-stream endpoint.
#[derive(Debug, PartialEq, Eq)]
pub enum EndpointError {
    NotHttp(String),
}

impl std::fmt::Display for EndpointError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EndpointError::NotHttp(url) => {
                write!(f, "API URL must start with http:// or https://: {}", url)
            }
        }
    }
}

impl std::error::Error for EndpointError {}

/// Derive the WebSocket endpoint from the API base URL by swapping the
/// scheme (`http` -> `ws`, `https` -> `wss`). The path is kept as given.
pub fn event_endpoint(api_url: &str) -> Result<String, EndpointError> {
    let api_url = api_url.trim();
    if let Some(rest) = api_url.strip_prefix("https://") {
        return Ok(format!("wss://{}", rest));
    }
    if let Some(rest) = api_url.strip_prefix("http://") {
        return Ok(format!("ws://{}", rest));
    }
    Err(EndpointError::NotHttp(api_url.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_swaps_scheme() {
        assert_eq!(
            event_endpoint("http://localhost:3001").unwrap(),
            "ws://localhost:3001"
        );
        assert_eq!(
            event_endpoint("https://news.example.com").unwrap(),
            "wss://news.example.com"
        );
        assert_eq!(
            event_endpoint("http://10.0.0.5:8080/").unwrap(),
            "ws://10.0.0.5:8080/"
        );
    }

    #[test]
    fn test_endpoint_rejects_other_schemes() {
        assert!(matches!(
            event_endpoint("ftp://example.com"),
            Err(EndpointError::NotHttp(_))
        ));
        assert!(event_endpoint("localhost:3001").is_err());
    }

    #[test]
    fn test_windows_from_toml() {
        let config: ClientConfig = Figment::new()
            .merge(Serialized::defaults(ClientConfig::default()))
            .merge(Toml::string("api_url = \"https://api.example.com\"\ndedup_grace_ms = 750\n"))
            .extract()
            .unwrap();

        assert_eq!(config.display_window(), Duration::from_secs(5));
        assert_eq!(config.dedup_grace(), Duration::from_millis(750));
        assert_eq!(config.event_endpoint().unwrap(), "wss://api.example.com");
    }

    #[test]
    fn test_load_from_reads_toml_file() {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let path = dir.path().join("inkwell-watch.toml");
        std::fs::write(
            &path,
            "api_url = \"http://127.0.0.1:9\"\ndisplay_window_ms = 2500\n",
        )
        .unwrap();
        let path = path.to_string_lossy().into_owned();

        let config =
            ClientConfig::load_from(["inkwell-watch", "--config", path.as_str()]).unwrap();
        assert_eq!(config.event_endpoint().unwrap(), "ws://127.0.0.1:9");
        assert_eq!(config.display_window(), Duration::from_millis(2500));
        assert_eq!(config.dedup_grace(), Duration::from_secs(5));

        let config = ClientConfig::load_from([
            "inkwell-watch",
            "--config",
            path.as_str(),
            "--api-url",
            "https://news.example.com",
        ])
        .unwrap();
        assert_eq!(config.api_url, "https://news.example.com");
        assert_eq!(config.display_window_ms, 2500);
    }
}
