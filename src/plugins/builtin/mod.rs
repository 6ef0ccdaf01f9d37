//! Plugins shipped with the bot, selectable by name in the configuration.

mod search;

pub use search::SearchPlugin;

use super::Plugin;

/// Names accepted in `plugins.enabled`.
pub const NAMES: &[&str] = &["search"];

/// Look up a bundled plugin by its catalogue name.
pub fn bundled(name: &str) -> Option<Box<dyn Plugin>> {
    match name {
        "search" => Some(Box::new(SearchPlugin)),
        _ => None,
    }
}
