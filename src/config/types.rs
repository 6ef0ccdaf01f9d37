//! Core configuration types and loading.

use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

use super::defaults::{
    PLAIN_PORT, SECURE_PORT, default_cache_path, default_quit_message, default_true,
    default_workers,
};
use super::validation::ValidationError;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid configuration: {}", .0.iter().map(ToString::to_string).collect::<Vec<_>>().join("; "))]
    Invalid(Vec<ValidationError>),
}

/// Bot configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Prometheus metrics HTTP port. Metrics are not served when unset.
    pub metrics_port: Option<u16>,
    /// Event delivery configuration.
    #[serde(default)]
    pub events: EventsConfig,
    /// Plugin loading and cache configuration.
    #[serde(default)]
    pub plugins: PluginsConfig,
    /// One block per chat network to connect to.
    #[serde(default)]
    pub networks: Vec<NetworkConfig>,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Parse configuration from TOML text.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }
}

/// Event worker pool configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct EventsConfig {
    /// Number of event deliveries allowed to run at once (default: 1).
    #[serde(default = "default_workers")]
    pub workers: usize,
}

impl Default for EventsConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
        }
    }
}

/// Where plugin caches are persisted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackend {
    /// Process memory; caches survive unload/load but not restarts.
    #[default]
    Memory,
    /// Embedded redb database at `cache_path`.
    Redb,
}

/// Plugin configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct PluginsConfig {
    /// Bundled plugins to load at startup, by catalogue name.
    #[serde(default)]
    pub enabled: Vec<String>,
    /// Cache storage backend.
    #[serde(default)]
    pub cache: CacheBackend,
    /// Database file used by the redb backend.
    #[serde(default = "default_cache_path")]
    pub cache_path: String,
}

impl Default for PluginsConfig {
    fn default() -> Self {
        Self {
            enabled: Vec::new(),
            cache: CacheBackend::default(),
            cache_path: default_cache_path(),
        }
    }
}

/// One network the bot connects to.
#[derive(Debug, Clone, Deserialize)]
pub struct NetworkConfig {
    /// Display name used in logs and events (default: hostname).
    pub name: Option<String>,
    /// Server hostname.
    #[serde(default)]
    pub hostname: String,
    /// Server port (default: 6667, or 6697 when `secure`).
    pub port: Option<u16>,
    /// Connect over TLS.
    #[serde(default)]
    pub secure: bool,
    /// Verify the server certificate against the system roots.
    #[serde(default = "default_true")]
    pub verify_certificates: bool,
    /// Nickname to register with. Required.
    #[serde(default)]
    pub nickname: String,
    /// Username (default: nickname).
    pub username: Option<String>,
    /// Real name (default: username).
    pub realname: Option<String>,
    /// Connection password, sent before registration when set.
    pub password: Option<String>,
    /// Channels joined once registration completes.
    #[serde(default)]
    pub channels: Vec<String>,
    /// Queue outbound messages sent before registration completes instead of
    /// rejecting them.
    #[serde(default = "default_true")]
    pub queue_while_disconnected: bool,
    /// Farewell text sent with QUIT.
    #[serde(default = "default_quit_message")]
    pub quit_message: String,
}

impl NetworkConfig {
    /// Minimal network block; every optional field takes its default.
    pub fn new(hostname: impl Into<String>, nickname: impl Into<String>) -> Self {
        Self {
            name: None,
            hostname: hostname.into(),
            port: None,
            secure: false,
            verify_certificates: true,
            nickname: nickname.into(),
            username: None,
            realname: None,
            password: None,
            channels: Vec::new(),
            queue_while_disconnected: true,
            quit_message: default_quit_message(),
        }
    }

    /// Name used to identify this network.
    pub fn name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.hostname)
    }

    /// Effective port.
    pub fn port(&self) -> u16 {
        match self.port {
            Some(port) => port,
            None if self.secure => SECURE_PORT,
            None => PLAIN_PORT,
        }
    }

    /// Effective username.
    pub fn username(&self) -> &str {
        self.username.as_deref().unwrap_or(&self.nickname)
    }

    /// Effective real name.
    pub fn realname(&self) -> &str {
        self.realname.as_deref().unwrap_or_else(|| self.username())
    }
}
