//! Plugin registry: load, unload and lookup of plugin units.
//!
//! ```text
//! (absent) -> Evaluating -> Ready  -> (absent)
//!                        \-> Failed -> (absent)
//! ```
//!
//! A failing unit never stops other units from loading. Unload persists the
//! cache, runs the unload hook and removes every subscription the unit
//! owns, in that order.

use parking_lot::Mutex;
use std::panic::{AssertUnwindSafe, Location, catch_unwind};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use super::Plugin;
use super::cache::{CacheStore, PluginCache};
use super::declaration::{Declaration, Hook};
use super::deps::{self, DependencyResolver, StaticResolver};
use super::unit::{PluginInfo, PluginStatus, PluginUnit};
use crate::error::PluginError;
use crate::events::{Event, EventBus, EventKind, panic_message};

/// Name reported for plugins that fail before declaring one.
const UNNAMED: &str = "<unnamed>";

pub struct PluginRegistry {
    bus: EventBus,
    store: Arc<dyn CacheStore>,
    resolver: Arc<dyn DependencyResolver>,
    units: Mutex<Vec<PluginUnit>>,
}

impl PluginRegistry {
    /// A registry resolving dependencies against the packages in this binary.
    pub fn new(bus: EventBus, store: Arc<dyn CacheStore>) -> Self {
        Self::with_resolver(bus, store, Arc::new(StaticResolver::builtin()))
    }

    pub fn with_resolver(
        bus: EventBus,
        store: Arc<dyn CacheStore>,
        resolver: Arc<dyn DependencyResolver>,
    ) -> Self {
        Self {
            bus,
            store,
            resolver,
            units: Mutex::new(Vec::new()),
        }
    }

    /// Evaluate a plugin and, if it checks out, make it live.
    ///
    /// On failure the unit stays registered as [`PluginStatus::Failed`]
    /// (unless it never declared a name) and the error is returned.
    pub async fn load(&self, plugin: &dyn Plugin) -> Result<PluginInfo, PluginError> {
        let mut decl = Declaration::new();
        let evaluated = match catch_unwind(AssertUnwindSafe(|| plugin.declare(&mut decl))) {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(format!("{e:#}")),
            Err(panic) => Err(format!("panicked: {}", panic_message(panic.as_ref()))),
        };

        let Some(name) = decl.name.clone().filter(|n| !n.is_empty()) else {
            let message = evaluated
                .err()
                .unwrap_or_else(|| "no name declared".to_string());
            warn!(plugin = UNNAMED, error = %message, "plugin failed to evaluate");
            return Err(PluginError::Evaluation {
                plugin: UNNAMED.to_string(),
                message,
            });
        };

        self.reserve(&name)?;
        let mut events: Vec<EventKind> = decl.subscriptions.iter().map(|s| s.kind).collect();
        // Commands are dispatched from a message subscription.
        if !decl.commands.is_empty() && !events.contains(&EventKind::Message) {
            events.push(EventKind::Message);
        }
        let mut info = PluginInfo {
            name: name.clone(),
            version: decl.version.clone(),
            author: decl.author.clone(),
            status: PluginStatus::Evaluating,
            events,
            commands: decl.commands.words(),
            dependencies: decl.dependencies.clone(),
        };

        if let Err(message) = evaluated {
            return Err(self.fail(&mut info, PluginError::Evaluation {
                plugin: name,
                message,
            }));
        }

        if let Err(e) = deps::check(self.resolver.as_ref(), &name, &decl.dependencies) {
            if let PluginError::MissingDependency {
                dependency,
                requirement,
                ..
            } = &e
            {
                error!(plugin = %name, dependency = %dependency, requirement = %requirement,
                    "Dependency for plugin missing");
            }
            return Err(self.fail(&mut info, e));
        }

        match self.store.load(&name).await {
            Ok(Some(blob)) => {
                debug!(plugin = %name, entries = blob.len(), "cache restored");
                decl.cache.restore(blob);
            }
            Ok(None) => {}
            Err(e) => return Err(self.fail(&mut info, e.into())),
        }

        if let Some(hook) = decl.on_loaded.take() {
            run_hook(&name, "loaded", hook);
        }

        let ready = {
            let mut units = self.units.lock();
            let Some(unit) = units.iter_mut().find(|u| u.info.name == name) else {
                return Err(PluginError::Evaluation {
                    plugin: name,
                    message: "unit vanished during load".to_string(),
                });
            };

            for sub in decl.subscriptions {
                self.bus.subscribe(sub.kind, &name, sub.location, sub.callback);
            }
            if !decl.commands.is_empty() {
                let location = decl.commands.location().unwrap_or(Location::caller());
                let table = decl.commands;
                self.bus.subscribe(
                    EventKind::Message,
                    &name,
                    location,
                    Arc::new(move |event: &Event| table.dispatch(event)),
                );
            }

            info.status = PluginStatus::Ready;
            unit.info = info.clone();
            unit.cache = decl.cache;
            unit.on_unloaded = decl.on_unloaded;
            units.iter().filter(|u| u.info.is_ready()).count()
        };
        crate::metrics::set_plugins_loaded(ready);

        info!(
            plugin = %name,
            version = %info.version,
            events = info.events.len(),
            commands = info.commands.len(),
            "plugin loaded"
        );
        Ok(info)
    }

    /// Unload a plugin. Returns `Ok(false)` when no unit by that name is
    /// registered, so a repeated unload is a no-op.
    ///
    /// A cache save failure is reported after the hook has run and the
    /// subscriptions are gone.
    pub async fn unload(&self, name: &str) -> Result<bool, PluginError> {
        let (unit, ready) = {
            let mut units = self.units.lock();
            let Some(pos) = units.iter().position(|u| u.info.name == name) else {
                return Ok(false);
            };
            if units[pos].info.status == PluginStatus::Evaluating {
                debug!(plugin = %name, "unload requested while evaluating; ignored");
                return Ok(false);
            }
            let unit = units.remove(pos);
            (unit, units.iter().filter(|u| u.info.is_ready()).count())
        };
        crate::metrics::set_plugins_loaded(ready);

        if !unit.info.is_ready() {
            debug!(plugin = %name, "failed plugin removed");
            return Ok(true);
        }

        let saved = self.store.save(name, &unit.cache.snapshot()).await;
        if let Err(ref e) = saved {
            warn!(plugin = %name, error = %e, "failed to persist plugin cache");
        }

        if let Some(hook) = unit.on_unloaded {
            run_hook(name, "unloaded", hook);
        }

        let removed = self.bus.unsubscribe_owner(name);
        info!(plugin = %name, subscriptions = removed, "plugin unloaded");

        saved?;
        Ok(true)
    }

    /// Unload every unit. Failures are logged; returns how many units were
    /// removed.
    pub async fn unload_all(&self) -> usize {
        let names: Vec<String> = self
            .units
            .lock()
            .iter()
            .filter(|u| u.info.status != PluginStatus::Evaluating)
            .map(|u| u.info.name.clone())
            .collect();

        let mut count = 0;
        for name in names {
            match self.unload(&name).await {
                Ok(true) => count += 1,
                Ok(false) => {}
                Err(e) => {
                    warn!(plugin = %name, error = %e, "unload failed");
                    count += 1;
                }
            }
        }
        count
    }

    /// Look up another unit by name.
    pub fn get(&self, name: &str) -> Option<PluginInfo> {
        self.units
            .lock()
            .iter()
            .find(|u| u.info.name == name)
            .map(|u| u.info.clone())
    }

    /// Every registered unit, in load order.
    pub fn list(&self) -> Vec<PluginInfo> {
        self.units.lock().iter().map(|u| u.info.clone()).collect()
    }

    /// The live cache of a ready unit.
    pub fn cache(&self, name: &str) -> Option<PluginCache> {
        self.units
            .lock()
            .iter()
            .find(|u| u.info.name == name && u.info.is_ready())
            .map(|u| u.cache.clone())
    }

    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    /// Claim `name` for a unit being evaluated. A failed unit of the same
    /// name is replaced.
    fn reserve(&self, name: &str) -> Result<(), PluginError> {
        let mut units = self.units.lock();
        if let Some(pos) = units.iter().position(|u| u.info.name == name) {
            if !matches!(units[pos].info.status, PluginStatus::Failed(_)) {
                return Err(PluginError::AlreadyLoaded(name.to_string()));
            }
            units.remove(pos);
        }
        units.push(PluginUnit::new(PluginInfo::evaluating(name)));
        Ok(())
    }

    /// Record a load failure on the unit and hand the error back.
    fn fail(&self, info: &mut PluginInfo, err: PluginError) -> PluginError {
        info.status = PluginStatus::Failed(err.to_string());
        if let Some(unit) = self
            .units
            .lock()
            .iter_mut()
            .find(|u| u.info.name == info.name)
        {
            unit.info = info.clone();
        }
        warn!(plugin = %info.name, error = %err, "plugin failed to load");
        err
    }
}

/// Run a lifecycle hook inside its own failure boundary.
fn run_hook(plugin: &str, hook_name: &str, hook: Hook) {
    let error = match catch_unwind(AssertUnwindSafe(hook)) {
        Ok(Ok(())) => return,
        Ok(Err(e)) => format!("{e:#}"),
        Err(panic) => format!("panicked: {}", panic_message(panic.as_ref())),
    };
    warn!(plugin = %plugin, hook = hook_name, error = %error, "plugin hook failed");
    crate::metrics::record_plugin_failure(plugin);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plugins::cache::{CacheBlob, MemoryStore};
    use crate::plugins::from_fn;
    use serde_json::Value;

    fn registry() -> (PluginRegistry, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let registry = PluginRegistry::new(EventBus::start(1), store.clone());
        (registry, store)
    }

    #[tokio::test]
    async fn test_load_subscribes_declared_events() {
        let (registry, _) = registry();
        let plugin = from_fn(|p| {
            p.name("greeter").version("2.1").author("me");
            p.on(EventKind::UserJoined, |_| Ok(()));
            p.command("hello", &["hi"], |_| Ok(()));
            Ok(())
        });

        let info = registry.load(&plugin).await.unwrap();
        assert!(info.is_ready());
        assert_eq!(info.version, "2.1");
        assert_eq!(info.commands, vec!["hello", "hi"]);
        assert_eq!(registry.bus().owner_count("greeter"), 2);
        assert_eq!(registry.bus().subscriber_count(EventKind::Message), 1);
        assert_eq!(info.events, vec![EventKind::UserJoined, EventKind::Message]);
        assert_eq!(registry.get("greeter").unwrap().events, info.events);
    }

    #[tokio::test]
    async fn test_command_only_plugin_reports_message_once() {
        let (registry, _) = registry();
        let plugin = from_fn(|p| {
            p.name("chatty");
            p.on(EventKind::Message, |_| Ok(()));
            p.command("ping", &[], |_| Ok(()));
            Ok(())
        });

        let info = registry.load(&plugin).await.unwrap();
        assert_eq!(info.events, vec![EventKind::Message]);
        assert_eq!(registry.bus().owner_count("chatty"), 2);
    }

    #[tokio::test]
    async fn test_evaluation_failure_leaves_inert_unit() {
        let (registry, _) = registry();
        let plugin = from_fn(|p| {
            p.name("broken");
            p.on(EventKind::Message, |_| Ok(()));
            anyhow::bail!("syntax error on line 3")
        });

        let err = registry.load(&plugin).await.unwrap_err();
        assert!(matches!(err, PluginError::Evaluation { ref plugin, .. } if plugin == "broken"));
        let info = registry.get("broken").unwrap();
        assert!(matches!(info.status, PluginStatus::Failed(ref m) if m.contains("syntax error")));
        assert_eq!(registry.bus().owner_count("broken"), 0);
    }

    #[tokio::test]
    async fn test_panicking_declaration_is_contained() {
        let (registry, _) = registry();
        let plugin = from_fn(|p| {
            p.name("panicky");
            panic!("bad plugin")
        });
        assert!(registry.load(&plugin).await.is_err());

        let ok = from_fn(|p| {
            p.name("fine");
            Ok(())
        });
        assert!(registry.load(&ok).await.is_ok());
    }

    #[tokio::test]
    async fn test_missing_name_is_rejected() {
        let (registry, _) = registry();
        let plugin = from_fn(|_| Ok(()));
        let err = registry.load(&plugin).await.unwrap_err();
        assert_eq!(err.plugin(), Some(UNNAMED));
        assert!(registry.list().is_empty());
    }

    #[tokio::test]
    async fn test_missing_dependency_fails_load() {
        let (registry, _) = registry();
        let plugin = from_fn(|p| {
            p.name("needy");
            p.requires("left-pad", "^1")?;
            p.on(EventKind::Message, |_| Ok(()));
            Ok(())
        });

        let err = registry.load(&plugin).await.unwrap_err();
        assert!(matches!(err, PluginError::MissingDependency { ref dependency, .. } if dependency == "left-pad"));
        assert!(!registry.get("needy").unwrap().is_ready());
        assert_eq!(registry.bus().owner_count("needy"), 0);
    }

    #[tokio::test]
    async fn test_duplicate_name_is_rejected_failed_is_replaced() {
        let (registry, _) = registry();
        let ok = from_fn(|p| {
            p.name("dup");
            Ok(())
        });
        registry.load(&ok).await.unwrap();
        assert!(matches!(
            registry.load(&ok).await.unwrap_err(),
            PluginError::AlreadyLoaded(_)
        ));

        let bad = from_fn(|p| {
            p.name("retry");
            anyhow::bail!("first attempt")
        });
        assert!(registry.load(&bad).await.is_err());
        let good = from_fn(|p| {
            p.name("retry");
            Ok(())
        });
        assert!(registry.load(&good).await.unwrap().is_ready());
    }

    #[tokio::test]
    async fn test_cache_restored_before_loaded_hook() {
        let (registry, store) = registry();
        let mut blob = CacheBlob::new();
        blob.insert("count".into(), Value::from(41));
        store.save("counter", &blob).await.unwrap();

        let seen = Arc::new(Mutex::new(None));
        let s = seen.clone();
        let plugin = from_fn(move |p| {
            p.name("counter");
            let cache = p.cache();
            let s = s.clone();
            p.on_loaded(move || {
                *s.lock() = cache.get("count");
                Ok(())
            });
            Ok(())
        });
        registry.load(&plugin).await.unwrap();
        assert_eq!(*seen.lock(), Some(Value::from(41)));
    }

    #[tokio::test]
    async fn test_unload_persists_then_hooks_then_unsubscribes() {
        let (registry, store) = registry();
        let hook_calls = Arc::new(Mutex::new(0));
        let h = hook_calls.clone();
        let plugin = from_fn(move |p| {
            p.name("tidy");
            p.on(EventKind::Message, |_| Ok(()));
            p.on(EventKind::UserLeft, |_| Ok(()));
            p.cache().set("kept", true);
            let h = h.clone();
            p.on_unloaded(move || {
                *h.lock() += 1;
                Ok(())
            });
            Ok(())
        });
        registry.load(&plugin).await.unwrap();

        assert!(registry.unload("tidy").await.unwrap());
        assert!(!registry.unload("tidy").await.unwrap());

        assert_eq!(*hook_calls.lock(), 1);
        assert_eq!(registry.bus().owner_count("tidy"), 0);
        assert!(registry.get("tidy").is_none());
        let blob = store.load("tidy").await.unwrap().unwrap();
        assert_eq!(blob["kept"], Value::from(true));
    }

    #[tokio::test]
    async fn test_failing_hooks_do_not_block_lifecycle() {
        let (registry, _) = registry();
        let plugin = from_fn(|p| {
            p.name("grumpy");
            p.on_loaded(|| anyhow::bail!("no"));
            p.on_unloaded(|| panic!("never"));
            Ok(())
        });
        assert!(registry.load(&plugin).await.unwrap().is_ready());
        assert!(registry.unload("grumpy").await.unwrap());
    }

    #[tokio::test]
    async fn test_unload_all() {
        let (registry, _) = registry();
        for name in ["a", "b"] {
            let plugin = from_fn(move |p| {
                p.name(name);
                Ok(())
            });
            registry.load(&plugin).await.unwrap();
        }
        let bad = from_fn(|p| {
            p.name("c");
            anyhow::bail!("x")
        });
        let _ = registry.load(&bad).await;

        assert_eq!(registry.unload_all().await, 3);
        assert!(registry.list().is_empty());
        assert_eq!(registry.unload_all().await, 0);
    }
}
