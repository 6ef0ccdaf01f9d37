//! Default value functions for configuration.
//!
//! Separated into its own module for clarity and reuse.

/// Returns `true` (for serde defaults).
pub fn default_true() -> bool {
    true
}

// =============================================================================
// Network Defaults
// =============================================================================

/// Port used when none is configured and the link is plaintext.
pub const PLAIN_PORT: u16 = 6667;

/// Port used when none is configured and the link is TLS.
pub const SECURE_PORT: u16 = 6697;

pub fn default_quit_message() -> String {
    "Got SIGINT?".to_string()
}

// =============================================================================
// Event Defaults
// =============================================================================

pub fn default_workers() -> usize {
    1
}

// =============================================================================
// Plugin Defaults
// =============================================================================

pub fn default_cache_path() -> String {
    "plugins.db".to_string()
}
