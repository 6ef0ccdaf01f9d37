//! `.search <terms>` (aliases `.g`, `.google`).

use crate::plugins::{Declaration, Plugin};

pub struct SearchPlugin;

impl Plugin for SearchPlugin {
    fn declare(&self, plugin: &mut Declaration) -> anyhow::Result<()> {
        plugin
            .name("search")
            .version(crate::VERSION)
            .author("slirc");
        plugin.requires("slirc-proto", "^2.0")?;

        let cache = plugin.cache();
        plugin.command("search", &["g", "google"], move |inv| {
            let queries = cache.get_as::<u64>("queries")?.unwrap_or(0) + 1;
            cache.set("queries", queries);
            inv.reply(&format!("Searching for {} …", inv.args))?;
            Ok(())
        });
        Ok(())
    }
}
