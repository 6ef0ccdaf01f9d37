//! Message codec for tokio.
//!
//! Wraps [`LineCodec`] and converts lines to and from [`Message`] values.

use bytes::BytesMut;
use tokio_util::codec::{Decoder, Encoder};

use crate::error::{self, ProtocolError};
use crate::line::{is_illegal_control_char, LineCodec};
use crate::message::Message;

/// Tokio codec for encoding/decoding IRC messages.
#[derive(Debug, Default)]
pub struct IrcCodec {
    inner: LineCodec,
}

impl IrcCodec {
    /// Create a codec with the standard line limit.
    pub fn new() -> Self {
        Self {
            inner: LineCodec::new(),
        }
    }

    /// Create a codec with a custom line limit.
    pub fn with_max_len(max_len: usize) -> Self {
        Self {
            inner: LineCodec::with_max_len(max_len),
        }
    }

    /// Sanitize outgoing message data.
    ///
    /// Everything after the first line ending is dropped so a parameter can
    /// never smuggle in a second command. Remaining NULs are rejected.
    pub fn sanitize(mut data: String) -> error::Result<String> {
        if let Some(pos) = data.find(['\r', '\n']) {
            data.truncate(pos);
        }

        match data.chars().find(|c| is_illegal_control_char(*c)) {
            Some(ch) => Err(ProtocolError::IllegalControlChar(ch)),
            None => Ok(data),
        }
    }
}

impl Decoder for IrcCodec {
    type Item = Message;
    type Error = ProtocolError;

    fn decode(&mut self, src: &mut BytesMut) -> error::Result<Option<Message>> {
        self.inner
            .decode(src)
            .and_then(|res| res.map_or(Ok(None), |line| line.parse::<Message>().map(Some)))
    }
}

impl Encoder<Message> for IrcCodec {
    type Error = ProtocolError;

    fn encode(&mut self, msg: Message, dst: &mut BytesMut) -> error::Result<()> {
        let sanitized = Self::sanitize(msg.to_string())?;
        self.inner.encode(sanitized, dst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_truncates_newline() {
        let result = IrcCodec::sanitize("PRIVMSG #test :hello\r\nQUIT".to_string());
        assert_eq!(result.unwrap(), "PRIVMSG #test :hello");
    }

    #[test]
    fn test_sanitize_rejects_nul() {
        let result = IrcCodec::sanitize("PRIVMSG #test :hel\0lo".to_string());
        assert!(matches!(result, Err(ProtocolError::IllegalControlChar('\0'))));
    }

    #[test]
    fn test_decode_message() {
        let mut codec = IrcCodec::new();
        let mut buf = BytesMut::from(":srv 376 bot :End of MOTD\r\n");

        let msg = codec.decode(&mut buf).unwrap().unwrap();
        assert_eq!(msg.numeric(), Some(376));
    }

    #[test]
    fn test_encode_message() {
        let mut codec = IrcCodec::new();
        let mut buf = BytesMut::new();

        codec
            .encode(Message::privmsg("#x", "one\ntwo"), &mut buf)
            .unwrap();
        assert_eq!(&buf[..], b"PRIVMSG #x :one\r\n");
    }
}
