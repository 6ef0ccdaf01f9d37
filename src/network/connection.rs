//! Server connection state machine.
//!
//! ```text
//! Disconnected -> Connecting -> Registering -> Established -> Disconnected
//! ```
//!
//! The connection owns its channel map and identity. Inbound lines arrive
//! through the session inbox, are parsed here and routed through the
//! handler registry on the session task, so handlers for one connection
//! never interleave. Outbound lines go through the [`NetworkHandle`] to a
//! writer task that owns the transport sink.

use futures_util::{SinkExt, StreamExt};
use slirc_proto::Message;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{Instrument, debug, info, warn};

use super::handle::NetworkHandle;
use super::transport::{Connector, Endpoint, Frame};
use crate::config::NetworkConfig;
use crate::error::ConnectionError;
use crate::events::{Event, EventBus};
use crate::handlers::Registry;
use crate::state::{Channel, Identity};

/// How long `disconnect` waits for the writer to flush before giving up.
const WRITER_DRAIN_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Registering,
    Established,
}

/// What reader tasks feed into the session.
#[derive(Debug)]
pub enum Inbound {
    Line { network: usize, line: String },
    Closed { network: usize, error: Option<String> },
}

/// One link to a chat network.
pub struct ServerConnection {
    index: usize,
    config: NetworkConfig,
    identity: Identity,
    state: ConnectionState,
    channels: HashMap<String, Channel>,
    handle: NetworkHandle,
    bus: EventBus,
    reader: Option<JoinHandle<()>>,
    writer: Option<JoinHandle<()>>,
    /// Whether `connection_closed` has been published for the current link.
    closed_published: bool,
}

impl ServerConnection {
    /// `index` identifies the connection in [`Inbound`] messages.
    pub fn new(index: usize, config: NetworkConfig, bus: EventBus) -> Self {
        let handle = NetworkHandle::new(config.name(), config.queue_while_disconnected);
        Self {
            index,
            identity: Identity::from_config(&config),
            config,
            state: ConnectionState::Disconnected,
            channels: HashMap::new(),
            handle,
            bus,
            reader: None,
            writer: None,
            closed_published: true,
        }
    }

    pub fn name(&self) -> &str {
        self.handle.name()
    }

    pub fn config(&self) -> &NetworkConfig {
        &self.config
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn is_established(&self) -> bool {
        self.state == ConnectionState::Established
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub fn identity_mut(&mut self) -> &mut Identity {
        &mut self.identity
    }

    /// A clonable handle for sending on this network.
    pub fn handle(&self) -> NetworkHandle {
        self.handle.clone()
    }

    // ------------------------------------------------------------------
    // Channel map
    // ------------------------------------------------------------------

    pub fn channel(&self, name: &str) -> Option<&Channel> {
        self.channels.get(&slirc_proto::irc_to_lower(name))
    }

    pub fn channel_mut(&mut self, name: &str) -> Option<&mut Channel> {
        self.channels.get_mut(&slirc_proto::irc_to_lower(name))
    }

    /// Look up a channel, creating it when first observed.
    pub fn ensure_channel(&mut self, name: &str) -> &mut Channel {
        self.channels
            .entry(slirc_proto::irc_to_lower(name))
            .or_insert_with(|| Channel::new(name))
    }

    pub fn remove_channel(&mut self, name: &str) -> Option<Channel> {
        self.channels.remove(&slirc_proto::irc_to_lower(name))
    }

    pub fn channels(&self) -> impl Iterator<Item = &Channel> {
        self.channels.values()
    }

    pub fn channels_mut(&mut self) -> impl Iterator<Item = &mut Channel> {
        self.channels.values_mut()
    }

    // ------------------------------------------------------------------
    // Outbound
    // ------------------------------------------------------------------

    /// Send a command. Fire-and-forget; subject to the registration gate.
    pub fn transmit<I, P>(&self, command: &str, params: I) -> Result<(), ConnectionError>
    where
        I: IntoIterator<Item = P>,
        P: Into<String>,
    {
        self.handle.transmit(command, params)
    }

    /// Send protocol housekeeping that must go out during registration.
    pub fn send_now(&self, msg: &Message) -> Result<(), ConnectionError> {
        self.handle.send_now(msg)
    }

    pub fn publish(&self, event: Event) {
        self.bus.publish(event);
    }

    // ------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------

    /// Acquire the transport and start registration.
    ///
    /// On success the connection is Registering and PASS (if configured),
    /// NICK and USER have been handed to the writer. On failure it is back
    /// in Disconnected.
    pub async fn connect(
        &mut self,
        connector: &dyn Connector,
        inbox: mpsc::UnboundedSender<Inbound>,
    ) -> Result<(), ConnectionError> {
        if self.state != ConnectionState::Disconnected {
            return Err(ConnectionError::AlreadyConnected {
                network: self.name().to_string(),
            });
        }

        let endpoint = Endpoint::from_config(&self.config);
        let span = crate::telemetry::spans::connection(self.name(), &endpoint.host);
        self.state = ConnectionState::Connecting;
        info!(parent: &span, port = endpoint.port, tls = endpoint.tls, "connecting");

        let link = match connector.establish(&endpoint).instrument(span.clone()).await {
            Ok(link) => link,
            Err(e) => {
                self.state = ConnectionState::Disconnected;
                warn!(parent: &span, error = %e, "connection failed");
                return Err(e);
            }
        };

        let (tx, mut rx) = mpsc::unbounded_channel::<String>();
        let mut sink = link.sink;
        let network = self.name().to_string();
        self.writer = Some(tokio::spawn(
            async move {
                while let Some(line) = rx.recv().await {
                    if let Err(e) = sink.send(line).await {
                        warn!(network = %network, error = %e, "write failed");
                        break;
                    }
                }
                let _ = sink.close().await;
            }
            .instrument(span.clone()),
        ));

        let mut lines = link.lines;
        let index = self.index;
        let network = self.name().to_string();
        self.reader = Some(tokio::spawn(
            async move {
                let mut error = None;
                while let Some(item) = lines.next().await {
                    match item {
                        Ok(Frame::Line(line)) => {
                            if inbox.send(Inbound::Line { network: index, line }).is_err() {
                                return;
                            }
                        }
                        Ok(Frame::Malformed(e)) => {
                            debug!(network = %network, error = %e, "dropping undecodable line");
                            crate::metrics::record_malformed();
                        }
                        Err(e) => {
                            error = Some(e.to_string());
                            break;
                        }
                    }
                }
                let _ = inbox.send(Inbound::Closed { network: index, error });
            }
            .instrument(span.clone()),
        ));

        self.handle.attach(tx);
        self.closed_published = false;
        self.state = ConnectionState::Registering;
        info!(parent: &span, nickname = %self.identity.nickname, "registering");

        if let Some(password) = &self.config.password {
            self.send_now(&Message::pass(password.as_str()))?;
        }
        self.send_now(&Message::nick(self.identity.nickname.as_str()))?;
        self.send_now(&Message::user(
            self.identity.username.as_str(),
            self.identity.realname.as_str(),
        ))?;
        Ok(())
    }

    /// Parse one inbound line and route it. Malformed lines are logged and
    /// dropped; handler errors are logged and do not affect the connection.
    pub fn handle_line(&mut self, line: &str, registry: &Registry) {
        let msg: Message = match line.parse() {
            Ok(msg) => msg,
            Err(e) => {
                debug!(network = %self.name(), error = %e, "dropping malformed line");
                crate::metrics::record_malformed();
                return;
            }
        };
        debug!(network = %self.name(), "← {}", line);

        if let Err(e) = registry.route(self, &msg) {
            warn!(network = %self.name(), command = %msg.command, error = %e, "handler failed");
        }
    }

    /// End of registration. Returns false when not Registering, so the
    /// ready event fires exactly once per link.
    pub fn mark_established(&mut self) -> bool {
        if self.state != ConnectionState::Registering {
            return false;
        }
        self.state = ConnectionState::Established;
        let flushed = self.handle.establish();
        info!(network = %self.name(), nickname = %self.identity.nickname, flushed, "connection established");

        for channel in &self.config.channels {
            if let Err(e) = self.handle.send(Message::join(channel.as_str())) {
                warn!(network = %self.name(), channel = %channel, error = %e, "auto-join failed");
            }
        }

        self.publish(Event::ConnectionReady {
            network: self.handle(),
        });
        true
    }

    /// The transport reported closure.
    pub fn transport_closed(&mut self, error: Option<String>) {
        if self.state == ConnectionState::Disconnected {
            return;
        }
        match &error {
            Some(e) => warn!(network = %self.name(), error = %e, "transport closed with error"),
            None => info!(network = %self.name(), "transport closed"),
        }
        self.handle.detach();
        self.reader = None;
        self.writer = None;
        self.mark_disconnected();
    }

    /// Close the link. Valid in every state.
    ///
    /// When Established a QUIT goes out first, best effort. The writer gets
    /// a bounded amount of time to flush; the server's acknowledgment is
    /// never awaited.
    pub async fn disconnect(&mut self) {
        if self.state == ConnectionState::Disconnected {
            return;
        }

        if self.state == ConnectionState::Established {
            let quit = Message::quit(self.config.quit_message.as_str());
            if let Err(e) = self.send_now(&quit) {
                debug!(network = %self.name(), error = %e, "QUIT not sent");
            }
        }

        self.handle.detach();
        if let Some(reader) = self.reader.take() {
            reader.abort();
        }
        if let Some(mut writer) = self.writer.take()
            && tokio::time::timeout(WRITER_DRAIN_TIMEOUT, &mut writer).await.is_err()
        {
            warn!(network = %self.name(), "writer did not drain in time");
            writer.abort();
        }

        info!(network = %self.name(), "disconnected");
        self.mark_disconnected();
    }

    fn mark_disconnected(&mut self) {
        self.state = ConnectionState::Disconnected;
        self.channels.clear();
        if !self.closed_published {
            self.closed_published = true;
            self.publish(Event::ConnectionClosed {
                network: self.handle(),
            });
        }
    }
}

impl std::fmt::Debug for ServerConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerConnection")
            .field("name", &self.name())
            .field("state", &self.state)
            .field("nickname", &self.identity.nickname)
            .field("channels", &self.channels.len())
            .finish()
    }
}
