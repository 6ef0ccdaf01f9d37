//! Runs a session against a [`TestServer`] in the background.

use slirc_bot::Config;
use slirc_bot::error::SessionError;
use slirc_bot::events::EventKind;
use slirc_bot::network::TcpConnector;
use slirc_bot::plugins::cache::{CacheStore, MemoryStore};
use slirc_bot::plugins::{Plugin, PluginRegistry};
use slirc_bot::Session;
use std::sync::Arc;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use super::{Recorder, TestPeer, TestServer};

pub struct Harness {
    pub server: TestServer,
    pub peer: TestPeer,
    pub recorder: Recorder,
    pub plugins: Arc<PluginRegistry>,
    pub nick: String,
    shutdown: Option<oneshot::Sender<()>>,
    task: JoinHandle<(Session, Result<(), SessionError>)>,
}

impl Harness {
    /// Connect a bot with the recorder plugin loaded and consume its
    /// handshake.
    pub async fn start(nick: &str, channels: &[&str]) -> Self {
        Self::start_with(nick, channels, Arc::new(MemoryStore::new()), &[]).await
    }

    pub async fn start_with(
        nick: &str,
        channels: &[&str],
        store: Arc<dyn CacheStore>,
        plugins: &[&dyn Plugin],
    ) -> Self {
        let server = TestServer::spawn().await.expect("Failed to spawn test server");
        let mut network = server.network(nick);
        network.channels = channels.iter().map(|c| c.to_string()).collect();
        let config = Config {
            networks: vec![network],
            ..Config::default()
        };

        let mut session = Session::with_transport(config, Arc::new(TcpConnector), store)
            .expect("valid config");
        let recorder = Recorder::default();
        session.load_plugin(&recorder).await.expect("recorder loads");
        for plugin in plugins {
            session.load_plugin(*plugin).await.expect("plugin loads");
        }
        let registry = session.plugins().clone();

        let (shutdown, rx) = oneshot::channel();
        let task = tokio::spawn(async move {
            let result = session
                .run(async {
                    let _ = rx.await;
                })
                .await;
            (session, result)
        });

        let mut peer = server.accept().await.expect("bot connects");
        peer.expect_handshake(nick).await.expect("handshake");

        Self {
            server,
            peer,
            recorder,
            plugins: registry,
            nick: nick.to_string(),
            shutdown: Some(shutdown),
            task,
        }
    }

    /// Complete registration with end-of-MOTD and wait for the ready event.
    pub async fn register(&mut self) {
        let line = format!(":server 376 {} :End of MOTD", self.nick);
        self.peer.send_raw(&line).await.unwrap();
        self.recorder.wait_for_kind(EventKind::ConnectionReady, 1).await;
    }

    /// Join `channel` as the bot with the given NAMES list.
    pub async fn join(&mut self, channel: &str, names: &str) {
        let nick = self.nick.clone();
        for line in [
            format!(":{nick}!bot@me JOIN {channel}"),
            format!(":server 353 {nick} = {channel} :{names}"),
            format!(":server 366 {nick} {channel} :End of /NAMES list"),
        ] {
            self.peer.send_raw(&line).await.unwrap();
        }
    }

    /// Request shutdown and return what the bot wrote on its way out.
    pub async fn stop(mut self) -> (Session, Result<(), SessionError>, Vec<String>, Recorder) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        let farewell = self.peer.drain().await;
        let (session, result) = self.task.await.expect("session task");
        (session, result, farewell, self.recorder)
    }

    /// Close the connection from the server side and wait for the session
    /// to notice and wind down on its own.
    pub async fn hang_up(self) -> (Session, Result<(), SessionError>, Recorder) {
        let Self {
            peer,
            shutdown,
            task,
            recorder,
            ..
        } = self;
        drop(peer);
        let (session, result) = tokio::time::timeout(std::time::Duration::from_secs(5), task)
            .await
            .expect("session stops after hang-up")
            .expect("session task");
        drop(shutdown);
        (session, result, recorder)
    }
}
