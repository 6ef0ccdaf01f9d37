//! Chat message handler.

use slirc_proto::Message;

use super::Handler;
use crate::error::{HandlerError, HandlerResult};
use crate::events::Event;
use crate::network::ServerConnection;

/// `:nick!user@host PRIVMSG <target> :<text>`
///
/// Only messages to known channels produce events. The sender is created
/// in the channel if it was not seen before and its username and hostname
/// are filled in from the prefix.
pub struct PrivmsgHandler;

impl Handler for PrivmsgHandler {
    fn handle(&self, conn: &mut ServerConnection, msg: &Message) -> HandlerResult {
        let target = msg.param(0)?;
        let text = msg.param(1)?;
        let prefix = msg.prefix.as_ref().ok_or(HandlerError::MissingSender)?;

        let Some(channel) = conn.channel_mut(target) else {
            return Ok(());
        };
        let user = channel.ensure_user(&prefix.nickname);
        user.synchronize(prefix);
        let user = user.clone();
        let channel = channel.clone();

        conn.publish(Event::Message {
            network: conn.handle(),
            channel,
            user,
            text: text.to_string(),
        });
        Ok(())
    }
}
