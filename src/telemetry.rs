//! Telemetry utilities for handler timing and span construction.

use std::time::Instant;

/// Guard for timing handler execution and recording metrics.
///
/// Records command latency when dropped.
pub struct CommandTimer {
    command: String,
    start: Instant,
}

impl CommandTimer {
    /// Start timing a command.
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            start: Instant::now(),
        }
    }
}

impl Drop for CommandTimer {
    fn drop(&mut self) {
        let duration = self.start.elapsed().as_secs_f64();
        crate::metrics::record_command(&self.command, duration);
    }
}

/// Standardized span constructors.
pub mod spans {
    use tracing::{Level, Span, info_span, span};

    /// Span for one server connection.
    pub fn connection(network: &str, host: &str) -> Span {
        info_span!("connection", network = %network, host = %host)
    }

    /// Span for one dispatched inbound command.
    pub fn command(name: &str, network: &str, source: Option<&str>) -> Span {
        span!(
            Level::DEBUG,
            "irc.command",
            command = %name,
            network = %network,
            source = source,
        )
    }

    /// Span for a plugin callback invocation.
    pub fn plugin(name: &str, event: &str) -> Span {
        span!(Level::DEBUG, "plugin", name = %name, event = %event)
    }
}
