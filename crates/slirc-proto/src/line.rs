//! Line framing for tokio.
//!
//! Splits an inbound byte stream on `\n`, strips the terminator, and frames
//! outbound strings with `\r\n`.
//!
//! Per-line decode errors (see [`ProtocolError::is_line_error`]) leave the
//! codec positioned at the start of the next line, so a caller driving the
//! decoder directly can skip the bad line and keep reading.

use bytes::BytesMut;
use tokio_util::codec::{Decoder, Encoder};

use crate::error::{self, ProtocolError};

/// Classic IRC line limit, terminator included.
pub const DEFAULT_MAX_LINE: usize = 512;

/// Whether a character may never appear inside a framed line.
pub(crate) fn is_illegal_control_char(c: char) -> bool {
    matches!(c, '\0' | '\r' | '\n')
}

/// Codec that yields one `String` per protocol line.
#[derive(Debug)]
pub struct LineCodec {
    /// Index of next byte to check for newline
    next_index: usize,
    max_len: usize,
    /// Dropping the tail of an over-long line until its terminator arrives.
    discarding: bool,
}

impl Default for LineCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl LineCodec {
    /// Create a codec with the standard 512 byte limit.
    pub fn new() -> Self {
        Self::with_max_len(DEFAULT_MAX_LINE)
    }

    /// Create a codec with a custom line limit.
    ///
    /// Servers that send IRCv3 tags routinely exceed 512 bytes.
    pub fn with_max_len(max_len: usize) -> Self {
        Self {
            next_index: 0,
            max_len,
            discarding: false,
        }
    }

    fn validate_line(s: &str) -> error::Result<()> {
        match s.chars().find(|c| is_illegal_control_char(*c)) {
            Some(ch) => Err(ProtocolError::IllegalControlChar(ch)),
            None => Ok(()),
        }
    }
}

impl Decoder for LineCodec {
    type Item = String;
    type Error = ProtocolError;

    fn decode(&mut self, src: &mut BytesMut) -> error::Result<Option<String>> {
        if self.discarding {
            let Some(offset) = src.iter().position(|b| *b == b'\n') else {
                src.clear();
                return Ok(None);
            };
            let _ = src.split_to(offset + 1);
            self.discarding = false;
        }

        let Some(offset) = src[self.next_index..].iter().position(|b| *b == b'\n') else {
            self.next_index = src.len();
            if src.len() > self.max_len {
                let actual = src.len();
                src.clear();
                self.next_index = 0;
                self.discarding = true;
                return Err(ProtocolError::MessageTooLong {
                    actual,
                    limit: self.max_len,
                });
            }
            return Ok(None);
        };

        let line = src.split_to(self.next_index + offset + 1);
        self.next_index = 0;

        if line.len() > self.max_len {
            return Err(ProtocolError::MessageTooLong {
                actual: line.len(),
                limit: self.max_len,
            });
        }

        let mut data = String::from_utf8(line.to_vec()).map_err(|e| ProtocolError::InvalidUtf8 {
            byte_pos: e.utf8_error().valid_up_to(),
            command_hint: error::extract_command_hint(&line),
        })?;

        let trimmed = data.trim_end_matches(['\r', '\n']).len();
        data.truncate(trimmed);
        Self::validate_line(&data)?;

        tracing::trace!(len = data.len(), "decoded line");
        Ok(Some(data))
    }
}

impl Encoder<String> for LineCodec {
    type Error = ProtocolError;

    fn encode(&mut self, line: String, dst: &mut BytesMut) -> error::Result<()> {
        let body = line.trim_end_matches(['\r', '\n']);
        Self::validate_line(body)?;
        dst.reserve(body.len() + 2);
        dst.extend_from_slice(body.as_bytes());
        dst.extend_from_slice(b"\r\n");
        Ok(())
    }
}
