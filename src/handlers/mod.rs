//! Built-in protocol handlers.
//!
//! This module contains the Handler trait and the command registry that
//! routes inbound messages to the handler for their command token. Handlers
//! run synchronously on the session task: they mutate connection state and
//! publish the resulting events, and never wait on plugins.

mod channel;
mod connection;
mod messaging;
mod user;

pub use channel::{EndOfNamesHandler, JoinHandler, NamesHandler, PartHandler, QuitHandler};
pub use connection::{EndOfMotdHandler, NicknameInUseHandler, PingHandler};
pub use messaging::PrivmsgHandler;
pub use user::NickHandler;

use slirc_proto::Message;
use std::collections::HashMap;
use tracing::debug;

use crate::error::HandlerResult;
use crate::network::ServerConnection;
use crate::telemetry::CommandTimer;

/// A built-in handler for one inbound command.
pub trait Handler: Send + Sync {
    fn handle(&self, conn: &mut ServerConnection, msg: &Message) -> HandlerResult;
}

/// Registry of command handlers, built once at startup.
pub struct Registry {
    handlers: HashMap<&'static str, Box<dyn Handler>>,
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl Registry {
    /// Create a new registry with all handlers registered.
    pub fn new() -> Self {
        let mut handlers: HashMap<&'static str, Box<dyn Handler>> = HashMap::new();

        // Connection/registration handlers
        handlers.insert("PING", Box::new(PingHandler));
        handlers.insert("376", Box::new(EndOfMotdHandler)); // RPL_ENDOFMOTD
        handlers.insert("422", Box::new(EndOfMotdHandler)); // ERR_NOMOTD
        handlers.insert("433", Box::new(NicknameInUseHandler)); // ERR_NICKNAMEINUSE

        // Channel handlers
        handlers.insert("JOIN", Box::new(JoinHandler));
        handlers.insert("PART", Box::new(PartHandler));
        handlers.insert("QUIT", Box::new(QuitHandler));
        handlers.insert("353", Box::new(NamesHandler)); // RPL_NAMREPLY
        handlers.insert("366", Box::new(EndOfNamesHandler)); // RPL_ENDOFNAMES

        // Messaging and user handlers
        handlers.insert("PRIVMSG", Box::new(PrivmsgHandler));
        handlers.insert("NICK", Box::new(NickHandler));

        Self { handlers }
    }

    /// Whether a handler exists for `command`.
    pub fn handles(&self, command: &str) -> bool {
        self.handlers.contains_key(command.to_ascii_uppercase().as_str())
    }

    /// Route a message to the handler for its command.
    ///
    /// Commands without a handler are ignored.
    pub fn route(&self, conn: &mut ServerConnection, msg: &Message) -> HandlerResult {
        let Some(handler) = self.handlers.get(msg.command.as_str()) else {
            return Ok(());
        };

        let span = crate::telemetry::spans::command(&msg.command, conn.name(), msg.sender_nick());
        let _enter = span.enter();
        let _timer = CommandTimer::new(&msg.command);

        let result = handler.handle(conn, msg);
        if let Err(ref e) = result {
            crate::metrics::record_command_error(&msg.command, e.error_code());
            debug!(command = %msg.command, error = %e, "Command error");
        }
        result
    }
}
