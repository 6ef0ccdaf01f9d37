//! Channel members.

use slirc_proto::{Prefix, irc_eq};

/// Status characters servers put in front of nicknames in NAMES replies.
const SIGILS: [char; 5] = ['@', '~', '+', '%', '&'];

/// Remove leading privilege markers from a nickname.
pub fn strip_sigils(nick: &str) -> &str {
    nick.trim_start_matches(SIGILS)
}

/// A person as seen from one channel.
///
/// Instances are scoped to a channel: someone sitting in two channels is
/// two `User` values, one per channel, and `channel` names the one this
/// instance belongs to. Username and hostname stay empty until a message
/// carrying the sender's full prefix is seen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub nickname: String,
    pub username: String,
    pub hostname: String,
    /// Name of the channel this instance belongs to.
    pub channel: String,
}

impl User {
    /// Create a member, normalizing the nickname.
    pub fn new(nickname: &str, channel: impl Into<String>) -> Self {
        Self {
            nickname: strip_sigils(nickname).to_string(),
            username: String::new(),
            hostname: String::new(),
            channel: channel.into(),
        }
    }

    /// Fill in username and hostname from a message prefix.
    ///
    /// Empty prefix parts never overwrite known values.
    pub fn synchronize(&mut self, prefix: &Prefix) {
        if !prefix.username.is_empty() {
            self.username.clone_from(&prefix.username);
        }
        if !prefix.hostname.is_empty() {
            self.hostname.clone_from(&prefix.hostname);
        }
    }

    /// Change the nickname in place.
    pub fn rename(&mut self, nickname: &str) {
        self.nickname = strip_sigils(nickname).to_string();
    }

    /// Case-insensitive nickname comparison.
    pub fn is(&self, nickname: &str) -> bool {
        irc_eq(&self.nickname, strip_sigils(nickname))
    }

    /// `nick!user@host`, with absent parts omitted.
    pub fn prefix(&self) -> Prefix {
        Prefix::new(&self.nickname, &self.username, &self.hostname)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sigils_are_stripped() {
        assert_eq!(strip_sigils("@op"), "op");
        assert_eq!(strip_sigils("~&founder"), "founder");
        assert_eq!(strip_sigils("+%voice"), "voice");
        assert_eq!(strip_sigils("plain"), "plain");
        assert_eq!(User::new("@alice", "#x").nickname, "alice");
    }

    #[test]
    fn test_synchronize_fills_metadata() {
        let mut user = User::new("alice", "#x");
        user.synchronize(&Prefix::parse("alice!a@host.example"));
        assert_eq!(user.username, "a");
        assert_eq!(user.hostname, "host.example");

        user.synchronize(&Prefix::parse("alice"));
        assert_eq!(user.hostname, "host.example");
        assert_eq!(user.prefix().to_string(), "alice!a@host.example");
    }

    #[test]
    fn test_rename_and_compare() {
        let mut user = User::new("alice", "#x");
        user.rename("alicia");
        assert!(user.is("ALICIA"));
        assert!(user.is("@alicia"));
        assert!(!user.is("alice"));
    }
}
