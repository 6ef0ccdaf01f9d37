//! # slirc-proto
//!
//! Client-side IRC wire protocol for the slirc bot engine.
//!
//! ## Features
//!
//! - Parsing of single protocol lines into [`Message`] values
//! - Serialization back to the wire format via [`std::fmt::Display`]
//! - Sender (`nick!user@host`) decomposition into [`Prefix`]
//! - RFC 1459 case mapping and channel-name detection
//! - Optional Tokio line framing ([`LineCodec`], [`IrcCodec`])

#![deny(clippy::all)]
#![warn(missing_docs)]

//! ## Quick Start
//!
//! ```rust
//! use slirc_proto::Message;
//!
//! let msg: Message = ":alice!a@host PRIVMSG #rust :hello there".parse().unwrap();
//! assert_eq!(msg.command, "PRIVMSG");
//! assert_eq!(msg.param(1).unwrap(), "hello there");
//! assert_eq!(msg.sender_nick(), Some("alice"));
//!
//! let reply = Message::privmsg("#rust", "hi alice");
//! assert_eq!(reply.to_string(), "PRIVMSG #rust :hi alice");
//! ```
//!
//! ## Acknowledgments
//!
//! This project was inspired by the architectural patterns established by
//! [Aaron Weiss (aatxe)](https://github.com/aatxe) in the
//! [irc](https://github.com/aatxe/irc) crate.

pub mod casemap;
pub mod chan;
pub mod error;
#[cfg(feature = "tokio")]
pub mod irc;
#[cfg(feature = "tokio")]
pub mod line;
pub mod message;
pub mod prefix;
pub mod response;

pub use self::casemap::{irc_eq, irc_lower_char, irc_to_lower};
pub use self::chan::ChannelExt;
pub use self::error::{MessageParseError, ProtocolError};
#[cfg(feature = "tokio")]
pub use self::irc::IrcCodec;
#[cfg(feature = "tokio")]
pub use self::line::LineCodec;
pub use self::message::Message;
pub use self::prefix::Prefix;
pub use self::response::Response;

/// Version of this protocol crate.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
