//! Channel membership handlers: JOIN, PART, QUIT and the NAMES replies.

use slirc_proto::Message;
use tracing::debug;

use super::Handler;
use crate::error::{HandlerError, HandlerResult};
use crate::events::Event;
use crate::network::ServerConnection;

/// Someone entered a channel.
///
/// The client's own JOIN is the join confirmation and creates the channel.
/// Other JOINs are only tracked for channels the client knows.
pub struct JoinHandler;

impl Handler for JoinHandler {
    fn handle(&self, conn: &mut ServerConnection, msg: &Message) -> HandlerResult {
        let name = msg.param(0)?;
        let prefix = msg.prefix.as_ref().ok_or(HandlerError::MissingSender)?;

        if conn.identity().is(&prefix.nickname) {
            debug!(network = %conn.name(), channel = %name, "joined");
            conn.ensure_channel(name)
                .ensure_user(&prefix.nickname)
                .synchronize(prefix);
            return Ok(());
        }

        let Some(channel) = conn.channel_mut(name) else {
            return Ok(());
        };
        let user = channel.ensure_user(&prefix.nickname);
        user.synchronize(prefix);
        let user = user.clone();
        let channel = channel.clone();

        conn.publish(Event::UserJoined {
            network: conn.handle(),
            channel,
            user,
        });
        Ok(())
    }
}

/// Someone left a channel.
pub struct PartHandler;

impl Handler for PartHandler {
    fn handle(&self, conn: &mut ServerConnection, msg: &Message) -> HandlerResult {
        let name = msg.param(0)?;
        let nick = msg.sender_nick().ok_or(HandlerError::MissingSender)?;

        if conn.identity().is(nick) {
            debug!(network = %conn.name(), channel = %name, "left");
            conn.remove_channel(name);
            return Ok(());
        }

        let Some(channel) = conn.channel_mut(name) else {
            return Ok(());
        };
        let Some(user) = channel.remove_user(nick) else {
            return Ok(());
        };
        let channel = channel.clone();

        conn.publish(Event::UserLeft {
            network: conn.handle(),
            channel,
            user,
        });
        Ok(())
    }
}

/// Someone disconnected from the network: they leave every channel.
pub struct QuitHandler;

impl Handler for QuitHandler {
    fn handle(&self, conn: &mut ServerConnection, msg: &Message) -> HandlerResult {
        let nick = msg.sender_nick().ok_or(HandlerError::MissingSender)?;
        if conn.identity().is(nick) {
            return Ok(());
        }

        let mut departures = Vec::new();
        for channel in conn.channels_mut() {
            if let Some(user) = channel.remove_user(nick) {
                departures.push((channel.clone(), user));
            }
        }

        for (channel, user) in departures {
            conn.publish(Event::UserLeft {
                network: conn.handle(),
                channel,
                user,
            });
        }
        Ok(())
    }
}

/// `353 <me> <type> <channel> :<names>`
///
/// Creates the channel when first observed and replaces or extends its
/// member set.
pub struct NamesHandler;

impl Handler for NamesHandler {
    fn handle(&self, conn: &mut ServerConnection, msg: &Message) -> HandlerResult {
        let name = msg.param(2)?;
        let names = msg.param(3)?;
        conn.ensure_channel(name).apply_names(names);
        Ok(())
    }
}

/// `366 <me> <channel> :End of /NAMES list`
pub struct EndOfNamesHandler;

impl Handler for EndOfNamesHandler {
    fn handle(&self, conn: &mut ServerConnection, msg: &Message) -> HandlerResult {
        let name = msg.param(1)?;
        let network = conn.name().to_string();
        if let Some(channel) = conn.channel_mut(name) {
            channel.end_names();
            debug!(network = %network, channel = %name, members = channel.len(), "names complete");
        }
        Ok(())
    }
}
