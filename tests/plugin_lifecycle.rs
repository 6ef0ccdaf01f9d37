//! Plugins loaded into a running bot: isolation, commands, caches.

mod common;

use common::Harness;
use parking_lot::Mutex;
use serde_json::json;
use slirc_bot::events::EventKind;
use slirc_bot::plugins::builtin::SearchPlugin;
use slirc_bot::plugins::cache::{MemoryStore, RedbStore};
use slirc_bot::plugins::{Declaration, Plugin, PluginStatus};
use std::sync::Arc;
use std::time::Duration;

/// Answers `.test` / `.t` with its arguments.
struct Echo {
    trigger: Option<&'static str>,
}

impl Plugin for Echo {
    fn declare(&self, plugin: &mut Declaration) -> anyhow::Result<()> {
        plugin.name("echo");
        if let Some(trigger) = self.trigger {
            plugin.trigger(trigger);
        }
        plugin.command("test", &["t"], |inv| {
            inv.reply(&format!("{} said {:?}", inv.user.nickname, inv.args))?;
            Ok(())
        });
        Ok(())
    }
}

/// Fails on every message it sees.
struct Broken;

impl Plugin for Broken {
    fn declare(&self, plugin: &mut Declaration) -> anyhow::Result<()> {
        plugin.name("broken");
        plugin.on(EventKind::Message, |_| anyhow::bail!("always fails"));
        plugin.on(EventKind::UserJoined, |_| panic!("join handler panicked"));
        Ok(())
    }
}

/// Counts messages in its cache.
struct Counter;

impl Plugin for Counter {
    fn declare(&self, plugin: &mut Declaration) -> anyhow::Result<()> {
        plugin.name("counter");
        let cache = plugin.cache();
        plugin.on(EventKind::Message, move |_| {
            let seen = cache.get_as::<u64>("seen")?.unwrap_or(0);
            cache.set("seen", seen + 1);
            Ok(())
        });
        Ok(())
    }
}

async fn established(nick: &str, plugins: &[&dyn Plugin]) -> Harness {
    let mut h = Harness::start_with(nick, &[], Arc::new(MemoryStore::new()), plugins).await;
    h.register().await;
    h.join("#test", &format!("{nick} alice")).await;
    h
}

#[tokio::test]
async fn test_failing_plugin_does_not_affect_others() {
    let mut h = established("bot", &[&Broken]).await;

    h.peer.send_raw(":carol!c@h JOIN #test").await.unwrap();
    h.peer.send_raw(":alice!a@h PRIVMSG #test :first").await.unwrap();
    h.peer.send_raw(":alice!a@h PRIVMSG #test :second").await.unwrap();

    h.recorder.wait_for_kind(EventKind::Message, 2).await;
    assert_eq!(h.recorder.count(EventKind::UserJoined), 1);
    assert!(h.plugins.get("broken").unwrap().is_ready());

    // The connection keeps working too.
    h.peer.send_raw("PING :ok").await.unwrap();
    assert_eq!(h.peer.recv_line().await.unwrap(), "PONG :ok");

    h.stop().await;
}

#[tokio::test]
async fn test_declaration_failure_is_reported_and_isolated() {
    let h = established("bot", &[]).await;

    let failing = slirc_bot::plugins::from_fn(|plugin| {
        plugin.name("half-done");
        anyhow::bail!("config missing")
    });
    assert!(h.plugins.load(&failing).await.is_err());
    assert!(matches!(
        h.plugins.get("half-done").unwrap().status,
        PluginStatus::Failed(_)
    ));
    assert!(h.plugins.get("recorder").unwrap().is_ready());

    h.stop().await;
}

#[tokio::test]
async fn test_commands_run_through_the_whole_pipeline() {
    let mut h = established("bot", &[&Echo { trigger: None }]).await;

    h.peer.send_raw(":alice!a@h PRIVMSG #test :.test  hello world").await.unwrap();
    assert_eq!(
        h.peer.recv_line().await.unwrap(),
        r#"PRIVMSG #test :alice said "hello world""#
    );

    h.peer.send_raw(":alice!a@h PRIVMSG #test :.t").await.unwrap();
    assert_eq!(h.peer.recv_line().await.unwrap(), r#"PRIVMSG #test :alice said """#);

    // No trigger prefix, unknown word: nothing is sent.
    h.peer.send_raw(":alice!a@h PRIVMSG #test :test hello").await.unwrap();
    h.peer.send_raw(":alice!a@h PRIVMSG #test :.nope").await.unwrap();
    assert!(
        h.peer
            .recv_line_timeout(Duration::from_millis(200))
            .await
            .is_err()
    );

    h.stop().await;
}

#[tokio::test]
async fn test_custom_trigger_prefix() {
    let mut h = established("bot", &[&Echo { trigger: Some("!") }]).await;

    h.peer.send_raw(":alice!a@h PRIVMSG #test :.test x").await.unwrap();
    h.peer.send_raw(":alice!a@h PRIVMSG #test :!test y").await.unwrap();
    assert_eq!(h.peer.recv_line().await.unwrap(), r#"PRIVMSG #test :alice said "y""#);

    h.stop().await;
}

#[tokio::test]
async fn test_bundled_search_command() {
    let mut h = established("bot", &[&SearchPlugin]).await;

    h.peer.send_raw(":alice!a@h PRIVMSG #test :.g rust traits").await.unwrap();
    assert_eq!(
        h.peer.recv_line().await.unwrap(),
        "PRIVMSG #test :Searching for rust traits …"
    );

    h.stop().await;
}

#[tokio::test]
async fn test_unloaded_plugin_stops_receiving_events() {
    let mut h = established("bot", &[&Echo { trigger: None }]).await;

    assert!(h.plugins.unload("echo").await.unwrap());
    assert!(!h.plugins.unload("echo").await.unwrap());

    h.peer.send_raw(":alice!a@h PRIVMSG #test :.test gone").await.unwrap();
    h.recorder.wait_for_kind(EventKind::Message, 1).await;
    assert!(
        h.peer
            .recv_line_timeout(Duration::from_millis(200))
            .await
            .is_err()
    );

    h.stop().await;
}

#[tokio::test]
async fn test_cache_survives_restart_with_redb() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("plugins.db");

    for run in 1..=2u64 {
        let store = Arc::new(RedbStore::new(&path).unwrap());
        let mut h = Harness::start_with("bot", &[], store, &[&Counter]).await;
        h.register().await;
        h.join("#test", "bot alice").await;

        h.peer.send_raw(":alice!a@h PRIVMSG #test :tick").await.unwrap();
        h.recorder.wait_for_kind(EventKind::Message, 1).await;
        // The recorder and the counter share the bus; let the counter finish.
        h.plugins.bus().flush().await;
        let cache = h.plugins.cache("counter").unwrap();
        assert_eq!(cache.get("seen"), Some(json!(run)));

        let (session, result, _, _) = h.stop().await;
        assert!(result.is_ok());
        // Release the database file before the next run opens it.
        drop(session);
    }
}

#[tokio::test]
async fn test_cache_survives_reload_in_memory() {
    let mut h = established("bot", &[&Counter]).await;

    h.peer.send_raw(":alice!a@h PRIVMSG #test :one").await.unwrap();
    h.recorder.wait_for_kind(EventKind::Message, 1).await;
    h.plugins.bus().flush().await;

    assert!(h.plugins.unload("counter").await.unwrap());
    assert!(h.plugins.cache("counter").is_none());
    h.plugins.load(&Counter).await.unwrap();
    assert_eq!(h.plugins.cache("counter").unwrap().get("seen"), Some(json!(1)));

    h.stop().await;
}

#[tokio::test]
async fn test_lifecycle_hooks_bracket_the_plugin() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let hooks = {
        let log = log.clone();
        slirc_bot::plugins::from_fn(move |plugin| {
            plugin.name("hooks");
            let loaded = log.clone();
            let unloaded = log.clone();
            plugin
                .on_loaded(move || {
                    loaded.lock().push("loaded");
                    Ok(())
                })
                .on_unloaded(move || {
                    unloaded.lock().push("unloaded");
                    Ok(())
                });
            Ok(())
        })
    };

    let h = established("bot", &[&hooks]).await;
    assert_eq!(*log.lock(), vec!["loaded"]);
    h.stop().await;
    assert_eq!(*log.lock(), vec!["loaded", "unloaded"]);
}

#[tokio::test]
async fn test_shutdown_does_not_wait_for_stuck_callbacks() {
    let (release, gate) = std::sync::mpsc::channel::<()>();
    let gate = Arc::new(Mutex::new(gate));
    let unloaded = Arc::new(Mutex::new(false));
    let stuck = {
        let gate = gate.clone();
        let unloaded = unloaded.clone();
        slirc_bot::plugins::from_fn(move |plugin| {
            plugin.name("stuck");
            let gate = gate.clone();
            plugin.on(EventKind::ConnectionReady, move |_| {
                let _ = gate.lock().recv_timeout(Duration::from_secs(30));
                Ok(())
            });
            let unloaded = unloaded.clone();
            plugin.on_unloaded(move || {
                *unloaded.lock() = true;
                Ok(())
            });
            Ok(())
        })
    };

    let h = established("bot", &[&stuck]).await;
    let (session, result, farewell, _) = tokio::time::timeout(Duration::from_secs(10), h.stop())
        .await
        .expect("shutdown finishes while a callback is blocked");

    assert!(result.is_ok());
    assert_eq!(farewell, vec!["QUIT :Got SIGINT?".to_string()]);
    assert!(*unloaded.lock());
    assert!(session.plugins().list().is_empty());
    let _ = release.send(());
}
