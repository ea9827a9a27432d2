use clap::Parser;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::time::Duration;

use crate::ws::Keepalive;

const DEFAULT_CONFIG_PATH: &str = "./inkwell.toml";

/// Inkwell article API and realtime notification server
///
/// Only flags the user actually passed are serialized, so unset flags never
/// mask values from the TOML file or the environment.
#[derive(Parser, Serialize, Debug)]
#[command(
    name = "inkwell-server",
    version,
    about = "Inkwell article API and realtime notification server"
)]
pub struct Cli {
    /// Port to listen on (HTTP API and event stream share it) [default: 3001]
    #[arg(long)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,

    /// Bind address [default: 0.0.0.0]
    #[arg(long)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bind_address: Option<String>,

    /// Path to TOML config file [default: ./inkwell.toml]
    #[arg(long)]
    #[serde(skip)]
    pub config: Option<String>,

    /// Emit logs as JSON lines instead of pretty text
    #[arg(long)]
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub json_logs: bool,

    /// Output a commented TOML config template and exit
    #[arg(long)]
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub generate_config: bool,
}

/// Resolved server configuration.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Config {
    pub port: u16,
    pub bind_address: String,
    pub json_logs: bool,
    #[serde(default)]
    pub generate_config: bool,

    /// Realtime event stream configuration ([realtime] section in TOML)
    #[serde(default)]
    pub realtime: RealtimeConfig,
}

/// Keepalive settings for event stream connections.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RealtimeConfig {
    /// Seconds between server pings (default: 30)
    #[serde(default = "default_ping_interval")]
    pub ping_interval_secs: u64,

    /// Seconds to wait for a pong before closing (default: 10)
    #[serde(default = "default_pong_timeout")]
    pub pong_timeout_secs: u64,
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            ping_interval_secs: 30,
            pong_timeout_secs: 10,
        }
    }
}

fn default_ping_interval() -> u64 {
    30
}

fn default_pong_timeout() -> u64 {
    10
}

impl RealtimeConfig {
    pub fn keepalive(&self) -> Keepalive {
        Keepalive {
            ping_interval: Duration::from_secs(self.ping_interval_secs.max(1)),
            pong_timeout: Duration::from_secs(self.pong_timeout_secs.max(1)),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 3001,
            bind_address: "0.0.0.0".to_string(),
            json_logs: false,
            generate_config: false,
            realtime: RealtimeConfig::default(),
        }
    }
}

impl Config {
    /// Load config with layered precedence:
    /// built-in defaults < TOML file < env vars (INKWELL_*) < CLI args
    pub fn load() -> Result<Self, figment::Error> {
        Self::load_from(std::env::args_os())
    }

    /// Same as [`Config::load`] with an explicit argument list (first item is the binary name).
    pub fn load_from<I, T>(args: I) -> Result<Self, figment::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        let cli = Cli::parse_from(args);
        let config_path = cli
            .config
            .clone()
            .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());

        Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(&config_path))
            .merge(Env::prefixed("INKWELL_").ignore(&["config"]))
            .merge(Serialized::defaults(cli))
            .extract()
    }
}

/// Generate a commented TOML config template
pub fn generate_config_template() -> String {
    r#"# Inkwell Server Configuration
# Place this file at ./inkwell.toml or specify with --config <path>
# All settings can be overridden via environment variables (INKWELL_PORT, etc.)
# or CLI flags (--port, etc.)

# Server port, shared by the HTTP API and the WebSocket event stream (default: 3001)
# port = 3001

# Bind address (default: 0.0.0.0, all interfaces)
# bind_address = "0.0.0.0"

# Emit logs as JSON lines instead of pretty text
# json_logs = false

# ---- Realtime Event Stream ----
# [realtime]

# Seconds between server pings on each connection (default: 30)
# ping_interval_secs = 30

# Seconds to wait for a pong before dropping the connection (default: 10)
# pong_timeout_secs = 10
"#
    .to_string()
}
