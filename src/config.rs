//! Configuration types for dns-supervisor.

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::time::Duration;

/// Top-level configuration snapshot.
///
/// Loaded once by the hosting daemon and handed to
/// [`Supervisor::new`](crate::Supervisor::new). The supervisor treats it as
/// read-only afterwards; collaborators only ever see the defensive copy
/// produced by [`Config::sanitized`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Cluster master addresses records are pulled from.
    #[serde(default)]
    pub masters: Vec<String>,

    /// Upstream resolver addresses for non-authoritative queries.
    #[serde(default)]
    pub resolvers: Vec<String>,

    /// Whether to launch the DNS responder.
    #[serde(default = "default_true")]
    pub dns_on: bool,

    /// Whether to launch the built-in HTTP API plugin.
    #[serde(default = "default_true")]
    pub http_on: bool,

    /// Listen address for the HTTP API.
    #[serde(default = "default_http_listen_addr")]
    pub http_listen_addr: SocketAddr,

    /// Fallback record-reload interval, in seconds. A reload resets the
    /// timer, so this is the longest the daemon goes without refreshing.
    #[serde(default = "default_refresh_seconds")]
    pub refresh_seconds: u64,

    /// Leader-election endpoint (e.g. "zk://10.0.0.1:2181/dns").
    /// `None` selects static single-authority mode.
    #[serde(default)]
    pub leader_endpoint: Option<String>,

    /// Third-party plugins to launch, in order.
    #[serde(default)]
    pub plugins: Vec<PluginSettings>,

    /// Telemetry configuration.
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

/// One entry of the plugin list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PluginSettings {
    /// Registry name the plugin resolves under.
    pub name: String,

    /// Plugin-specific settings, passed verbatim to the plugin factory.
    #[serde(default)]
    pub settings: serde_json::Value,
}

/// Telemetry configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryConfig {
    /// Log level filter (e.g. "info", "debug", "dns_supervisor=debug,warn").
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Config {
    /// Return a defensive copy of this snapshot, minus plugin-specific
    /// settings.
    ///
    /// The copy owns its master and resolver address lists, so mutating it
    /// never reaches back into the supervisor's own snapshot.
    pub fn sanitized(&self) -> Config {
        let mut cfg = self.clone();
        cfg.plugins = Vec::new();
        cfg
    }

    /// Fallback reload interval as a [`Duration`].
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_seconds)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            masters: Vec::new(),
            resolvers: Vec::new(),
            dns_on: true,
            http_on: true,
            http_listen_addr: default_http_listen_addr(),
            refresh_seconds: default_refresh_seconds(),
            leader_endpoint: None,
            plugins: Vec::new(),
            telemetry: TelemetryConfig::default(),
        }
    }
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_http_listen_addr() -> SocketAddr {
    "127.0.0.1:8123".parse().expect("static address")
}

fn default_refresh_seconds() -> u64 {
    60
}

fn default_log_level() -> String {
    "info".to_string()
}
