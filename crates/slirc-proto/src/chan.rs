//! Channel name recognition.
//!
//! # Reference
//! - RFC 2812 Section 1.3: Channels

/// Characters a channel name may start with.
pub const CHANNEL_PREFIXES: [char; 4] = ['#', '&', '+', '!'];

const MAX_CHANNEL_LEN: usize = 50;

/// Extension trait telling channel targets apart from nicknames.
pub trait ChannelExt {
    /// Whether this string names a channel: a known prefix character, no
    /// separators or control characters, and at most 50 characters.
    fn is_channel_name(&self) -> bool;
}

impl ChannelExt for str {
    fn is_channel_name(&self) -> bool {
        self.starts_with(CHANNEL_PREFIXES)
            && self.chars().count() <= MAX_CHANNEL_LEN
            && !self.chars().any(|c| c == ' ' || c == ',' || c.is_control())
    }
}

impl ChannelExt for String {
    fn is_channel_name(&self) -> bool {
        self.as_str().is_channel_name()
    }
}
