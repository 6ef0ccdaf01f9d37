//! Registration and keepalive handlers.

use slirc_proto::Message;
use tracing::{info, warn};

use super::Handler;
use crate::error::HandlerResult;
use crate::network::{ConnectionState, ServerConnection};

/// `PING :payload` is answered with `PONG :payload`.
pub struct PingHandler;

impl Handler for PingHandler {
    fn handle(&self, conn: &mut ServerConnection, msg: &Message) -> HandlerResult {
        let payload = msg.param(0)?;
        // Keepalive must go out even while registering.
        conn.send_now(&Message::pong(payload))?;
        Ok(())
    }
}

/// End of MOTD, or no MOTD at all: registration is complete.
pub struct EndOfMotdHandler;

impl Handler for EndOfMotdHandler {
    fn handle(&self, conn: &mut ServerConnection, _msg: &Message) -> HandlerResult {
        conn.mark_established();
        Ok(())
    }
}

/// The requested nickname is taken. During registration retry with a
/// mangled one; afterwards the server keeps the old nickname and nothing
/// needs to change.
pub struct NicknameInUseHandler;

impl Handler for NicknameInUseHandler {
    fn handle(&self, conn: &mut ServerConnection, msg: &Message) -> HandlerResult {
        if conn.state() != ConnectionState::Registering {
            warn!(network = %conn.name(), rejected = ?msg.param_opt(1), "nickname in use");
            return Ok(());
        }

        let nick = conn.identity_mut().collide().to_string();
        info!(network = %conn.name(), nickname = %nick, "nickname in use, retrying");
        conn.send_now(&Message::nick(nick))?;
        Ok(())
    }
}
