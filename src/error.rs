//! Unified error handling for slirc-bot.
//!
//! Errors are local to the component that raised them: protocol and
//! connection failures stay with their `ServerConnection`, plugin failures
//! stay with their `PluginUnit`. Only configuration problems and transport
//! initialization failures reach the caller of `Session`.

use slirc_proto::{MessageParseError, ProtocolError};
use thiserror::Error;

use crate::config::ConfigError;

// ============================================================================
// Connection Errors (transport level)
// ============================================================================

/// Transport-level failures. Never fatal to the process.
#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error("failed to connect to {host}:{port}: {source}")]
    Connect {
        host: String,
        port: u16,
        #[source]
        source: std::io::Error,
    },

    #[error("TLS handshake with {host} failed: {message}")]
    Tls { host: String, message: String },

    #[error("{network} is not connected")]
    NotConnected { network: String },

    #[error("{network} is already connected")]
    AlreadyConnected { network: String },

    #[error("transport closed")]
    Closed,

    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}

// ============================================================================
// Handler Errors (built-in command processing)
// ============================================================================

/// Errors raised by built-in protocol handlers.
#[derive(Debug, Error)]
pub enum HandlerError {
    #[error(transparent)]
    MissingParameter(#[from] MessageParseError),

    #[error("message has no sender")]
    MissingSender,

    #[error(transparent)]
    Send(#[from] ConnectionError),
}

impl HandlerError {
    /// Get a static error code string for metrics labeling.
    #[inline]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::MissingParameter(_) => "missing_parameter",
            Self::MissingSender => "missing_sender",
            Self::Send(_) => "send_error",
        }
    }
}

/// Result type for command handlers.
pub type HandlerResult = Result<(), HandlerError>;

// ============================================================================
// Plugin Errors
// ============================================================================

/// Failures of the plugin cache store.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Database error: {0}")]
    Database(String),
    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Plugin load and unload failures.
#[derive(Debug, Error)]
pub enum PluginError {
    /// The declarative body failed or produced an unusable declaration.
    #[error("plugin {plugin} failed to evaluate: {message}")]
    Evaluation { plugin: String, message: String },

    /// A declared dependency is absent or does not satisfy the requirement.
    #[error("dependency {dependency} {requirement} for plugin {plugin} is missing")]
    MissingDependency {
        plugin: String,
        dependency: String,
        requirement: String,
    },

    /// A callback failed or panicked while handling an event.
    #[error("plugin {plugin} callback at {location} failed: {message}")]
    Runtime {
        plugin: String,
        location: String,
        message: String,
    },

    /// A plugin with the same name is already registered.
    #[error("plugin {0} is already loaded")]
    AlreadyLoaded(String),

    #[error(transparent)]
    Cache(#[from] CacheError),
}

impl PluginError {
    /// Name of the plugin the error is about.
    pub fn plugin(&self) -> Option<&str> {
        match self {
            Self::Evaluation { plugin, .. }
            | Self::MissingDependency { plugin, .. }
            | Self::Runtime { plugin, .. } => Some(plugin),
            Self::AlreadyLoaded(plugin) => Some(plugin),
            Self::Cache(_) => None,
        }
    }
}

// ============================================================================
// Session Errors (surfaced to the top-level caller)
// ============================================================================

/// Errors that abort session construction or startup.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("failed to open plugin cache: {0}")]
    Cache(#[from] CacheError),

    #[error("no network could be connected")]
    NoConnections,
}
