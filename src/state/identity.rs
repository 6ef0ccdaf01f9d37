//! The client's own registration identity on one network.

use crate::config::NetworkConfig;

/// Nickname, username and real name the client registers with.
///
/// The nickname changes on collision during registration and whenever the
/// server confirms a NICK for the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub nickname: String,
    pub username: String,
    pub realname: String,
}

impl Identity {
    /// Build the identity from a network block, applying its defaults.
    pub fn from_config(config: &NetworkConfig) -> Self {
        Self {
            nickname: config.nickname.clone(),
            username: config.username().to_string(),
            realname: config.realname().to_string(),
        }
    }

    /// Pick the next nickname after a collision.
    pub fn collide(&mut self) -> &str {
        self.nickname.push('_');
        &self.nickname
    }

    /// Whether `nick` is this identity's nickname.
    pub fn is(&self, nick: &str) -> bool {
        slirc_proto::irc_eq(&self.nickname, nick)
    }
}
