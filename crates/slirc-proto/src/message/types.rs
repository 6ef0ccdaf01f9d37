use crate::chan::ChannelExt;
use crate::error::MessageParseError;
use crate::prefix::Prefix;
use crate::response::Response;

/// One parsed protocol line.
///
/// The command token is stored upper-cased so comparisons are
/// case-insensitive by construction. The last parameter may contain spaces.
///
/// # Example
///
/// ```
/// use slirc_proto::Message;
///
/// let msg: Message = ":nick!user@host privmsg #channel :Hello!".parse().unwrap();
/// assert_eq!(msg.command, "PRIVMSG");
/// assert_eq!(msg.params, vec!["#channel", "Hello!"]);
/// ```
#[derive(Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Message {
    /// Sender, present only on server-relayed messages.
    pub prefix: Option<Prefix>,
    /// Upper-cased command verb or three-digit numeric.
    pub command: String,
    /// Ordered parameters, trailing text included as the last element.
    pub params: Vec<String>,
}

impl Message {
    /// Create an outbound message with no prefix.
    pub fn new<C, I, P>(command: C, params: I) -> Self
    where
        C: AsRef<str>,
        I: IntoIterator<Item = P>,
        P: Into<String>,
    {
        Message {
            prefix: None,
            command: command.as_ref().to_ascii_uppercase(),
            params: params.into_iter().map(Into::into).collect(),
        }
    }

    /// Attach a sender prefix.
    #[must_use]
    pub fn with_prefix(mut self, prefix: Prefix) -> Self {
        self.prefix = Some(prefix);
        self
    }

    /// Bounds-checked parameter access.
    ///
    /// Out-of-range access is an error, never a silent default.
    pub fn param(&self, index: usize) -> Result<&str, MessageParseError> {
        self.params
            .get(index)
            .map(String::as_str)
            .ok_or_else(|| MessageParseError::MissingParameter {
                command: self.command.clone(),
                index,
                len: self.params.len(),
            })
    }

    /// Parameter access for call sites where a missing value means "not given".
    pub fn param_opt(&self, index: usize) -> Option<&str> {
        self.params.get(index).map(String::as_str)
    }

    /// Case-insensitive command comparison.
    pub fn is(&self, command: &str) -> bool {
        self.command.eq_ignore_ascii_case(command)
    }

    /// The numeric value when the command is a three-digit reply.
    pub fn numeric(&self) -> Option<u16> {
        if self.command.len() == 3 && self.command.bytes().all(|b| b.is_ascii_digit()) {
            self.command.parse().ok()
        } else {
            None
        }
    }

    /// The known [`Response`] for numeric replies.
    pub fn response(&self) -> Option<Response> {
        self.numeric().and_then(Response::from_code)
    }

    /// Nickname of the sender, if there is a non-empty one.
    pub fn sender_nick(&self) -> Option<&str> {
        self.prefix
            .as_ref()
            .map(|p| p.nickname.as_str())
            .filter(|n| !n.is_empty())
    }

    /// Where a reply to this message should go: the channel for channel
    /// messages, otherwise the sender.
    pub fn response_target(&self) -> Option<&str> {
        match self.param_opt(0) {
            Some(target) if target.is_channel_name() => Some(target),
            _ => self.sender_nick(),
        }
    }

    /// Create a PRIVMSG message to a target with text.
    pub fn privmsg(target: impl Into<String>, text: impl Into<String>) -> Self {
        Message::new("PRIVMSG", [target.into(), text.into()])
    }

    /// Create a NOTICE message to a target with text.
    pub fn notice(target: impl Into<String>, text: impl Into<String>) -> Self {
        Message::new("NOTICE", [target.into(), text.into()])
    }

    /// Create a JOIN message for a channel.
    pub fn join(channel: impl Into<String>) -> Self {
        Message::new("JOIN", [channel.into()])
    }

    /// Create a PART message for a channel.
    pub fn part(channel: impl Into<String>) -> Self {
        Message::new("PART", [channel.into()])
    }

    /// Create a NICK message.
    pub fn nick(nickname: impl Into<String>) -> Self {
        Message::new("NICK", [nickname.into()])
    }

    /// Create a PASS message.
    pub fn pass(password: impl Into<String>) -> Self {
        Message::new("PASS", [password.into()])
    }

    /// Create a USER registration message.
    ///
    /// The two unused middle fields carry the conventional placeholders.
    pub fn user(username: impl Into<String>, realname: impl Into<String>) -> Self {
        Message::new(
            "USER",
            [username.into(), "0".into(), "*".into(), realname.into()],
        )
    }

    /// Create a PONG echoing a PING payload.
    pub fn pong(payload: impl Into<String>) -> Self {
        Message::new("PONG", [payload.into()])
    }

    /// Create a QUIT message with a farewell text.
    pub fn quit(reason: impl Into<String>) -> Self {
        Message::new("QUIT", [reason.into()])
    }
}
