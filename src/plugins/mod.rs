//! Plugin system.
//!
//! Plugins are linked into the binary and describe themselves through
//! [`Plugin::declare`]: identity, event subscriptions, chat command
//! triggers, dependencies and lifecycle hooks. The [`PluginRegistry`]
//! checks the declaration, restores the plugin's cache and wires its
//! callbacks into the event bus.
//!
//! ```ignore
//! struct Hello;
//!
//! impl Plugin for Hello {
//!     fn declare(&self, plugin: &mut Declaration) -> anyhow::Result<()> {
//!         plugin.name("hello").author("someone");
//!         plugin.command("hello", &["hi"], |inv| {
//!             inv.reply(&format!("hello, {}", inv.user.nickname))?;
//!             Ok(())
//!         });
//!         Ok(())
//!     }
//! }
//! ```

pub mod builtin;
pub mod cache;
pub mod commands;
pub mod declaration;
pub mod deps;
pub mod registry;
pub mod unit;

pub use cache::{CacheStore, PluginCache};
pub use commands::{Invocation, parse_trigger};
pub use declaration::Declaration;
pub use deps::{Dependency, DependencyResolver, StaticResolver};
pub use registry::PluginRegistry;
pub use unit::{PluginInfo, PluginStatus};

/// A plugin linked into the host.
pub trait Plugin: Send + Sync {
    /// Fill in the plugin's declaration. An error (or panic) marks the
    /// plugin as failed.
    fn declare(&self, plugin: &mut Declaration) -> anyhow::Result<()>;
}

/// A plugin whose declarative body is a closure.
pub struct FnPlugin<F>(F);

impl<F> Plugin for FnPlugin<F>
where
    F: Fn(&mut Declaration) -> anyhow::Result<()> + Send + Sync,
{
    fn declare(&self, plugin: &mut Declaration) -> anyhow::Result<()> {
        (self.0)(plugin)
    }
}

/// Build a plugin from a closure.
pub fn from_fn<F>(declare: F) -> FnPlugin<F>
where
    F: Fn(&mut Declaration) -> anyhow::Result<()> + Send + Sync,
{
    FnPlugin(declare)
}
