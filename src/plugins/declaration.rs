//! The declarative body of a plugin.
//!
//! [`Plugin::declare`](super::Plugin::declare) receives a [`Declaration`]
//! and fills in identity, event subscriptions, command triggers,
//! dependencies and lifecycle hooks. Nothing runs until the registry has
//! checked the declaration and marked the plugin ready.

use std::panic::Location;
use std::sync::Arc;

use super::cache::PluginCache;
use super::commands::{CommandTable, Invocation};
use super::deps::Dependency;
use crate::events::{Callback, Event, EventKind};

/// Version reported for plugins that do not declare one.
pub const DEFAULT_VERSION: &str = "1.0";

/// A lifecycle hook.
pub type Hook = Box<dyn FnOnce() -> anyhow::Result<()> + Send>;

pub(crate) struct DeclaredSubscription {
    pub kind: EventKind,
    pub location: &'static Location<'static>,
    pub callback: Callback,
}

/// Builder handed to a plugin's declarative body.
pub struct Declaration {
    pub(crate) name: Option<String>,
    pub(crate) version: String,
    pub(crate) author: Option<String>,
    pub(crate) subscriptions: Vec<DeclaredSubscription>,
    pub(crate) commands: CommandTable,
    pub(crate) dependencies: Vec<Dependency>,
    pub(crate) on_loaded: Option<Hook>,
    pub(crate) on_unloaded: Option<Hook>,
    pub(crate) cache: PluginCache,
}

impl Default for Declaration {
    fn default() -> Self {
        Self::new()
    }
}

impl Declaration {
    pub fn new() -> Self {
        Self {
            name: None,
            version: DEFAULT_VERSION.to_string(),
            author: None,
            subscriptions: Vec::new(),
            commands: CommandTable::default(),
            dependencies: Vec::new(),
            on_loaded: None,
            on_unloaded: None,
            cache: PluginCache::new(),
        }
    }

    /// Unique plugin name. Required.
    pub fn name(&mut self, name: impl Into<String>) -> &mut Self {
        self.name = Some(name.into());
        self
    }

    pub fn version(&mut self, version: impl Into<String>) -> &mut Self {
        self.version = version.into();
        self
    }

    pub fn author(&mut self, author: impl Into<String>) -> &mut Self {
        self.author = Some(author.into());
        self
    }

    /// Subscribe to an event. The caller's source location is recorded for
    /// failure reports.
    #[track_caller]
    pub fn on<F>(&mut self, kind: EventKind, callback: F) -> &mut Self
    where
        F: Fn(&Event) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.subscriptions.push(DeclaredSubscription {
            kind,
            location: Location::caller(),
            callback: Arc::new(callback),
        });
        self
    }

    /// Replace the command trigger prefix (default `.`).
    pub fn trigger(&mut self, prefix: impl Into<String>) -> &mut Self {
        self.commands.set_prefix(prefix);
        self
    }

    /// Declare a chat command and its aliases.
    #[track_caller]
    pub fn command<F>(&mut self, name: &str, aliases: &[&str], handler: F) -> &mut Self
    where
        F: Fn(&Invocation) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.commands
            .insert(name, aliases, Arc::new(handler), Location::caller());
        self
    }

    /// Declare a dependency on a package. Fails when the requirement is not
    /// a valid version requirement.
    pub fn requires(&mut self, name: &str, requirement: &str) -> anyhow::Result<&mut Self> {
        let dep = Dependency::new(name, requirement)
            .map_err(|e| anyhow::anyhow!("bad requirement {requirement:?} for {name}: {e}"))?;
        self.dependencies.push(dep);
        Ok(self)
    }

    /// Run once the plugin is ready and its cache restored.
    pub fn on_loaded<F>(&mut self, hook: F) -> &mut Self
    where
        F: FnOnce() -> anyhow::Result<()> + Send + 'static,
    {
        self.on_loaded = Some(Box::new(hook));
        self
    }

    /// Run on unload, after the cache has been saved.
    pub fn on_unloaded<F>(&mut self, hook: F) -> &mut Self
    where
        F: FnOnce() -> anyhow::Result<()> + Send + 'static,
    {
        self.on_unloaded = Some(Box::new(hook));
        self
    }

    /// The plugin's persisted cache. Clone it into callbacks that need it.
    pub fn cache(&self) -> PluginCache {
        self.cache.clone()
    }
}
