//! IRC message prefix types.
//!
//! The prefix identifies the origin of a relayed message. Its grammar is
//! `nick["!"user]["@"host]`; any part may be absent.
//!
//! # Reference
//! - RFC 2812 Section 2.3.1: Message format

use std::str::FromStr;

/// Sender of a server-relayed message.
///
/// Absent parts are represented by empty strings rather than errors, so a
/// bare server name such as `irc.example.net` parses into a prefix whose
/// nickname is the server name and whose user and host are empty.
#[derive(Clone, Eq, PartialEq, Debug, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Prefix {
    /// Nickname (or server name).
    pub nickname: String,
    /// Username (ident), empty when absent.
    pub username: String,
    /// Hostname, empty when absent.
    pub hostname: String,
}

impl Prefix {
    /// Create a prefix from its three components.
    ///
    /// # Example
    ///
    /// ```
    /// use slirc_proto::Prefix;
    ///
    /// let prefix = Prefix::new("nick", "user", "host.example.com");
    /// assert_eq!(prefix.to_string(), "nick!user@host.example.com");
    /// ```
    pub fn new(
        nickname: impl Into<String>,
        username: impl Into<String>,
        hostname: impl Into<String>,
    ) -> Self {
        Self {
            nickname: nickname.into(),
            username: username.into(),
            hostname: hostname.into(),
        }
    }

    /// Decompose a prefix string. Never fails.
    pub fn parse(s: &str) -> Self {
        #[derive(Copy, Clone, Eq, PartialEq)]
        enum Part {
            Name,
            User,
            Host,
        }

        let mut prefix = Prefix::default();
        let mut part = Part::Name;

        for c in s.chars() {
            match c {
                '!' if part == Part::Name => part = Part::User,
                '@' if part != Part::Host => part = Part::Host,
                _ => match part {
                    Part::Name => &mut prefix.nickname,
                    Part::User => &mut prefix.username,
                    Part::Host => &mut prefix.hostname,
                }
                .push(c),
            }
        }

        prefix
    }

    /// Whether this looks like a server name rather than a user mask.
    pub fn is_server(&self) -> bool {
        self.username.is_empty() && self.hostname.is_empty() && self.nickname.contains('.')
    }
}

impl FromStr for Prefix {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Prefix::parse(s))
    }
}

impl From<&str> for Prefix {
    fn from(s: &str) -> Self {
        Prefix::parse(s)
    }
}
