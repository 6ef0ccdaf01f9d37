//! Nickname changes.

use slirc_proto::Message;
use tracing::info;

use super::Handler;
use crate::error::{HandlerError, HandlerResult};
use crate::events::Event;
use crate::network::ServerConnection;

/// `:old!user@host NICK new`
///
/// Every per-channel instance of the user is renamed in place and a rename
/// event is published for each. The client's own rename also updates its
/// identity.
pub struct NickHandler;

impl Handler for NickHandler {
    fn handle(&self, conn: &mut ServerConnection, msg: &Message) -> HandlerResult {
        let old = msg.sender_nick().ok_or(HandlerError::MissingSender)?;
        let new = msg.param(0)?;

        if conn.identity().is(old) {
            info!(network = %conn.name(), from = %old, to = %new, "nickname changed");
            conn.identity_mut().nickname = new.to_string();
        }

        let mut renames = Vec::new();
        for channel in conn.channels_mut() {
            if let Some(user) = channel.user_mut(old) {
                user.rename(new);
                let user = user.clone();
                renames.push((channel.clone(), user));
            }
        }

        for (channel, user) in renames {
            conn.publish(Event::Rename {
                network: conn.handle(),
                channel,
                user,
                old_nickname: old.to_string(),
            });
        }
        Ok(())
    }
}
