//! Process-wide orchestration.
//!
//! The session owns every [`ServerConnection`], the dispatcher and the
//! plugin registry. One task runs [`Session::run`]: it multiplexes inbound
//! lines from all connections and routes them in arrival order, so protocol
//! state is only ever touched from that task. Plugin callbacks run on the
//! event bus workers.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::config::{Config, ConfigError, validate};
use crate::error::{PluginError, SessionError};
use crate::events::EventBus;
use crate::handlers::Registry;
use crate::network::{ConnectionState, Connector, Inbound, ServerConnection, TcpConnector};
use crate::plugins::cache::{CacheStore, open_store};
use crate::plugins::{Plugin, PluginInfo, PluginRegistry, builtin};

/// How long shutdown waits for in-flight plugin callbacks before moving on.
const EVENT_DRAIN_TIMEOUT: Duration = Duration::from_secs(2);

pub struct Session {
    config: Config,
    connections: Vec<ServerConnection>,
    dispatcher: Registry,
    plugins: Arc<PluginRegistry>,
    bus: EventBus,
    connector: Arc<dyn Connector>,
    inbox_tx: mpsc::UnboundedSender<Inbound>,
    inbox: mpsc::UnboundedReceiver<Inbound>,
    shut_down: bool,
}

impl Session {
    /// Build a session over TCP with the configured cache store.
    ///
    /// An invalid configuration (a network without a nickname, for
    /// instance) is fatal here. Must be called inside a tokio runtime.
    pub fn new(config: Config) -> Result<Self, SessionError> {
        validate(&config).map_err(ConfigError::Invalid)?;
        let store = open_store(&config.plugins)?;
        Self::with_transport(config, Arc::new(TcpConnector), store)
    }

    /// Build a session with an explicit transport and cache store.
    pub fn with_transport(
        config: Config,
        connector: Arc<dyn Connector>,
        store: Arc<dyn CacheStore>,
    ) -> Result<Self, SessionError> {
        validate(&config).map_err(ConfigError::Invalid)?;

        let bus = EventBus::start(config.events.workers);
        let connections = config
            .networks
            .iter()
            .enumerate()
            .map(|(index, net)| ServerConnection::new(index, net.clone(), bus.clone()))
            .collect();
        let plugins = Arc::new(PluginRegistry::new(bus.clone(), store));
        let (inbox_tx, inbox) = mpsc::unbounded_channel();

        Ok(Self {
            config,
            connections,
            dispatcher: Registry::new(),
            plugins,
            bus,
            connector,
            inbox_tx,
            inbox,
            shut_down: false,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    pub fn plugins(&self) -> &Arc<PluginRegistry> {
        &self.plugins
    }

    pub fn connections(&self) -> &[ServerConnection] {
        &self.connections
    }

    pub fn connection(&self, name: &str) -> Option<&ServerConnection> {
        self.connections.iter().find(|c| c.name() == name)
    }

    /// Load one plugin. Failures are local to the plugin.
    pub async fn load_plugin(&self, plugin: &dyn Plugin) -> Result<PluginInfo, PluginError> {
        self.plugins.load(plugin).await
    }

    /// Load the bundled plugins named in `plugins.enabled`. Returns how many
    /// became ready; the rest are logged and skipped.
    pub async fn load_enabled(&self) -> usize {
        let mut ready = 0;
        for name in &self.config.plugins.enabled {
            let Some(plugin) = builtin::bundled(name) else {
                warn!(plugin = %name, available = ?builtin::NAMES, "unknown plugin");
                continue;
            };
            if self.plugins.load(plugin.as_ref()).await.is_ok() {
                ready += 1;
            }
        }
        ready
    }

    /// Connect every network. Fails only when none could be connected.
    pub async fn connect_all(&mut self) -> Result<usize, SessionError> {
        let mut connected = 0;
        for conn in &mut self.connections {
            if conn.state() != ConnectionState::Disconnected {
                continue;
            }
            match conn
                .connect(self.connector.as_ref(), self.inbox_tx.clone())
                .await
            {
                Ok(()) => connected += 1,
                Err(e) => warn!(network = %conn.name(), error = %e, "network unavailable"),
            }
        }

        if connected == 0 {
            return Err(SessionError::NoConnections);
        }
        info!(connected, total = self.connections.len(), "networks connected");
        Ok(connected)
    }

    /// Connect and process inbound traffic until `shutdown` resolves or
    /// every connection has closed, then shut down. `shutdown` is honored
    /// while connecting too.
    pub async fn run<F>(&mut self, shutdown: F) -> Result<(), SessionError>
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        let connected = tokio::select! {
            _ = &mut shutdown => None,
            result = self.connect_all() => Some(result),
        };
        match connected {
            None => {
                info!("shutdown requested while connecting");
                self.shutdown().await;
                return Ok(());
            }
            Some(Err(e)) => {
                self.shutdown().await;
                return Err(e);
            }
            Some(Ok(_)) => {}
        }

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("shutdown requested");
                    break;
                }
                processed = self.process_next() => {
                    if !processed || self.all_disconnected() {
                        info!("all connections closed");
                        break;
                    }
                }
            }
        }

        self.shutdown().await;
        Ok(())
    }

    /// Wait for one inbound item and handle it. Returns false when the
    /// inbox is closed.
    pub async fn process_next(&mut self) -> bool {
        match self.inbox.recv().await {
            Some(inbound) => {
                self.process(inbound);
                true
            }
            None => false,
        }
    }

    fn process(&mut self, inbound: Inbound) {
        match inbound {
            Inbound::Line { network, line } => {
                if let Some(conn) = self.connections.get_mut(network) {
                    conn.handle_line(&line, &self.dispatcher);
                }
            }
            Inbound::Closed { network, error } => {
                if let Some(conn) = self.connections.get_mut(network) {
                    conn.transport_closed(error);
                }
            }
        }
    }

    fn all_disconnected(&self) -> bool {
        self.connections
            .iter()
            .all(|c| c.state() == ConnectionState::Disconnected)
    }

    /// Quit every network, give pending events a bounded time to reach
    /// plugins, then unload every plugin. Idempotent.
    pub async fn shutdown(&mut self) {
        if self.shut_down {
            return;
        }
        self.shut_down = true;

        for conn in &mut self.connections {
            conn.disconnect().await;
        }
        self.drain_events().await;

        let unloaded = self.plugins.unload_all().await;
        self.drain_events().await;
        info!(plugins = unloaded, "session shut down");
    }

    async fn drain_events(&self) {
        if tokio::time::timeout(EVENT_DRAIN_TIMEOUT, self.bus.flush())
            .await
            .is_err()
        {
            warn!("plugin callbacks still running; not waiting for them");
        }
    }
}
