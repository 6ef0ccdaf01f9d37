//! Loaded plugin units and their public description.

use super::cache::PluginCache;
use super::declaration::Hook;
use super::deps::Dependency;
use crate::events::EventKind;

/// Where a unit is in its lifecycle. Units leave the registry when they
/// are unloaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PluginStatus {
    /// The declarative body is being checked and the cache restored.
    Evaluating,
    /// Subscriptions are live.
    Ready,
    /// Evaluation failed. The unit stays registered but inert.
    Failed(String),
}

/// What other plugins and the host can learn about a unit.
#[derive(Debug, Clone)]
pub struct PluginInfo {
    pub name: String,
    pub version: String,
    pub author: Option<String>,
    pub status: PluginStatus,
    pub events: Vec<EventKind>,
    pub commands: Vec<String>,
    pub dependencies: Vec<Dependency>,
}

impl PluginInfo {
    pub(crate) fn evaluating(name: &str) -> Self {
        Self {
            name: name.to_string(),
            version: String::new(),
            author: None,
            status: PluginStatus::Evaluating,
            events: Vec::new(),
            commands: Vec::new(),
            dependencies: Vec::new(),
        }
    }

    pub fn is_ready(&self) -> bool {
        self.status == PluginStatus::Ready
    }
}

pub(crate) struct PluginUnit {
    pub info: PluginInfo,
    pub cache: PluginCache,
    pub on_unloaded: Option<Hook>,
}

impl PluginUnit {
    pub fn new(info: PluginInfo) -> Self {
        Self {
            info,
            cache: PluginCache::new(),
            on_unloaded: None,
        }
    }
}
