//! Error types for the IRC protocol library.
//!
//! [`ProtocolError`] covers framing and I/O failures on the line transport,
//! [`MessageParseError`] covers lines that do not fit the wire grammar and
//! out-of-range parameter access on parsed messages.

use thiserror::Error;

/// Convenience type alias for Results using [`ProtocolError`].
pub type Result<T, E = ProtocolError> = std::result::Result<T, E>;

/// Extract the IRC command name from a raw line (for error reporting).
///
/// The command is the first token after the optional tags (`@...`) and
/// sender (`:...`) sections. Returns `None` when no alphanumeric token is found.
pub(crate) fn extract_command_hint(raw_line: &[u8]) -> Option<String> {
    let mut pos = 0;

    for sigil in [b'@', b':'] {
        if raw_line.get(pos) == Some(&sigil) {
            while pos < raw_line.len() && raw_line[pos] != b' ' {
                pos += 1;
            }
            while raw_line.get(pos) == Some(&b' ') {
                pos += 1;
            }
        }
    }

    let start = pos;
    while pos < raw_line.len() && raw_line[pos].is_ascii_alphanumeric() {
        pos += 1;
    }

    if pos > start {
        String::from_utf8(raw_line[start..pos].to_vec()).ok()
    } else {
        None
    }
}

/// Top-level protocol errors.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ProtocolError {
    /// I/O error during reading or writing.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid UTF-8 bytes in a received line.
    #[error("invalid UTF-8 in line at byte {byte_pos}")]
    InvalidUtf8 {
        /// Byte position where UTF-8 validation failed.
        byte_pos: usize,
        /// Command name recovered from the raw bytes, if any.
        command_hint: Option<String>,
    },

    /// Line exceeded maximum allowed length.
    #[error("message too long: {actual} bytes (limit: {limit})")]
    MessageTooLong {
        /// Actual line length.
        actual: usize,
        /// Maximum allowed length.
        limit: usize,
    },

    /// Illegal control character inside a line.
    #[error("illegal control character: {0:?}")]
    IllegalControlChar(char),

    /// A line did not fit the wire grammar.
    #[error("malformed message {string:?}: {cause}")]
    InvalidMessage {
        /// The offending line.
        string: String,
        /// The underlying parse error.
        #[source]
        cause: MessageParseError,
    },
}

impl ProtocolError {
    /// Whether the error concerns a single line rather than the transport.
    ///
    /// The offending line has already been consumed; reading can continue.
    pub fn is_line_error(&self) -> bool {
        !matches!(self, Self::Io(_))
    }
}

/// Errors encountered when parsing or inspecting IRC messages.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum MessageParseError {
    /// Line was empty or whitespace only.
    #[error("empty message")]
    EmptyMessage,

    /// Command token was missing or was neither letters nor a 3-digit numeric.
    #[error("invalid command at position {position}")]
    InvalidCommand {
        /// Character position where the command was expected.
        position: usize,
    },

    /// Sender section (`:...`) was not followed by a command.
    #[error("unterminated sender prefix")]
    UnterminatedOrigin,

    /// A parameter index past the end of the parameter list was requested.
    #[error("{command} has no parameter at index {index} (got {len})")]
    MissingParameter {
        /// Command of the inspected message.
        command: String,
        /// Requested index.
        index: usize,
        /// Number of parameters present.
        len: usize,
    },
}
