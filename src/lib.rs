//! slirc-bot - a chat-network client engine with plugins.
//!
//! One [`Session`] owns a [`ServerConnection`] per configured network.
//! Inbound lines are parsed, routed through the built-in handlers and turned
//! into [`Event`]s, which the [`EventBus`] fans out to plugins.

pub mod config;
pub mod error;
pub mod events;
pub mod handlers;
pub mod http;
pub mod metrics;
pub mod network;
pub mod plugins;
pub mod session;
pub mod state;
pub mod telemetry;

pub use config::Config;
pub use events::{Event, EventBus, EventKind};
pub use network::{NetworkHandle, ServerConnection};
pub use plugins::{Declaration, Plugin, PluginRegistry};
pub use session::Session;

/// Package version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
