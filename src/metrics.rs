//! Prometheus metrics collection for slirc-bot.
//!
//! Exposed on the optional `/metrics` HTTP endpoint.
//!
//! - `irc_command_total{command}` - inbound commands handled by a built-in
//! - `irc_command_duration_seconds{command}` - handler latency
//! - `irc_command_errors_total{command,error}` - handler failures
//! - `irc_malformed_lines_total` - inbound lines that failed to parse
//! - `irc_messages_sent_total{command}` - outbound lines written
//! - `bot_events_published_total{event}` - events handed to the bus
//! - `bot_plugin_failures_total{plugin}` - plugin callbacks that failed
//! - `bot_plugins_loaded` - plugins currently registered and ready

use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder,
};
use std::sync::OnceLock;

/// Global Prometheus registry for all metrics.
pub static REGISTRY: OnceLock<Registry> = OnceLock::new();

pub fn registry() -> &'static Registry {
    REGISTRY.get_or_init(Registry::new)
}

// ========================================================================
// Protocol
// ========================================================================

/// Commands handled by type (PING, PRIVMSG, 353, ...).
pub static COMMAND_COUNTER: OnceLock<IntCounterVec> = OnceLock::new();

/// Handler latency by command type.
pub static COMMAND_LATENCY: OnceLock<HistogramVec> = OnceLock::new();

/// Handler errors by type and error kind.
pub static COMMAND_ERRORS: OnceLock<IntCounterVec> = OnceLock::new();

/// Inbound lines dropped as malformed.
pub static MALFORMED_LINES: OnceLock<IntCounter> = OnceLock::new();

/// Outbound lines written, by command.
pub static MESSAGES_SENT: OnceLock<IntCounterVec> = OnceLock::new();

// ========================================================================
// Events and plugins
// ========================================================================

/// Events published, by event name.
pub static EVENTS_PUBLISHED: OnceLock<IntCounterVec> = OnceLock::new();

/// Plugin callback failures (errors and panics), by plugin.
pub static PLUGIN_FAILURES: OnceLock<IntCounterVec> = OnceLock::new();

/// Plugins currently ready.
pub static PLUGINS_LOADED: OnceLock<IntGauge> = OnceLock::new();

/// Initialize the Prometheus metrics registry.
///
/// Called once at startup. Metrics recorded before this are ignored.
pub fn init() {
    let r = registry();

    macro_rules! register {
        ($metric:ident, $init:expr) => {
            match $init {
                Ok(m) => {
                    if let Err(e) = r.register(Box::new(m.clone())) {
                        tracing::warn!(error = %e, concat!("Failed to register metric ", stringify!($metric)));
                    }
                    let _ = $metric.set(m);
                }
                Err(e) => {
                    tracing::warn!(error = %e, concat!("Failed to create metric ", stringify!($metric)));
                }
            }
        };
    }

    register!(COMMAND_COUNTER, IntCounterVec::new(Opts::new("irc_command_total", "IRC commands handled by type"), &["command"]));
    register!(COMMAND_LATENCY, HistogramVec::new(
        HistogramOpts::new("irc_command_duration_seconds", "IRC command handler latency by type")
            .buckets(vec![0.00001, 0.00005, 0.0001, 0.0005, 0.001, 0.005, 0.01]),
        &["command"]));
    register!(COMMAND_ERRORS, IntCounterVec::new(Opts::new("irc_command_errors_total", "IRC command handler errors"), &["command", "error"]));
    register!(MALFORMED_LINES, IntCounter::new("irc_malformed_lines_total", "Inbound lines dropped as malformed"));
    register!(MESSAGES_SENT, IntCounterVec::new(Opts::new("irc_messages_sent_total", "Outbound lines written"), &["command"]));
    register!(EVENTS_PUBLISHED, IntCounterVec::new(Opts::new("bot_events_published_total", "Events published to the bus"), &["event"]));
    register!(PLUGIN_FAILURES, IntCounterVec::new(Opts::new("bot_plugin_failures_total", "Plugin callback failures"), &["plugin"]));
    register!(PLUGINS_LOADED, IntGauge::new("bot_plugins_loaded", "Plugins currently ready"));
}

/// Gather all metrics and encode them in Prometheus text format.
pub fn gather_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = registry().gather();
    let mut buffer = vec![];
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!(error = %e, "Failed to encode Prometheus metrics");
        return String::new();
    }
    match String::from_utf8(buffer) {
        Ok(s) => s,
        Err(e) => {
            tracing::error!(error = %e, "Prometheus metrics were not valid UTF-8");
            String::new()
        }
    }
}

// ============================================================================
// Helper functions for metric updates
// ============================================================================

fn inc_vec(metric: &OnceLock<IntCounterVec>, labels: &[&str]) {
    if let Some(c) = metric.get() {
        c.with_label_values(labels).inc();
    }
}

/// Record a handled command with latency.
#[inline]
pub fn record_command(command: &str, duration_secs: f64) {
    inc_vec(&COMMAND_COUNTER, &[command]);
    if let Some(h) = COMMAND_LATENCY.get() {
        h.with_label_values(&[command]).observe(duration_secs);
    }
}

/// Record a handler error.
#[inline]
pub fn record_command_error(command: &str, error: &str) {
    inc_vec(&COMMAND_ERRORS, &[command, error]);
}

/// Record an inbound line that failed to parse.
#[inline]
pub fn record_malformed() {
    if let Some(c) = MALFORMED_LINES.get() {
        c.inc();
    }
}

/// Record an outbound line.
#[inline]
pub fn record_sent(command: &str) {
    inc_vec(&MESSAGES_SENT, &[command]);
}

/// Record a published event.
#[inline]
pub fn record_event(event: &str) {
    inc_vec(&EVENTS_PUBLISHED, &[event]);
}

/// Record a failed plugin callback.
#[inline]
pub fn record_plugin_failure(plugin: &str) {
    inc_vec(&PLUGIN_FAILURES, &[plugin]);
}

/// Track the number of ready plugins.
#[inline]
pub fn set_plugins_loaded(count: usize) {
    if let Some(g) = PLUGINS_LOADED.get() {
        g.set(count as i64);
    }
}
