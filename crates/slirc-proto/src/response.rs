//! IRC numeric replies a client reacts to.
//!
//! Only the numerics with client-side meaning are enumerated; everything else
//! stays an opaque three-digit command token on [`crate::Message`].
//!
//! # Reference
//! - RFC 2812: Internet Relay Chat: Client Protocol
//! - Modern IRC documentation: <https://modern.ircdocs.horse/>

#![allow(non_camel_case_types)]

/// IRC server numeric reply.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u16)]
pub enum Response {
    /// 001 - Welcome to the IRC network
    RPL_WELCOME = 1,
    /// 353 - NAMES list entry
    RPL_NAMREPLY = 353,
    /// 366 - End of NAMES list
    RPL_ENDOFNAMES = 366,
    /// 376 - End of MOTD
    RPL_ENDOFMOTD = 376,
    /// 422 - MOTD file is missing
    ERR_NOMOTD = 422,
    /// 432 - Erroneous nickname
    ERR_ERRONEUSNICKNAME = 432,
    /// 433 - Nickname is already in use
    ERR_NICKNAMEINUSE = 433,
}

impl Response {
    /// Numeric value of the reply.
    pub fn code(&self) -> u16 {
        *self as u16
    }

    /// Look up a known numeric.
    pub fn from_code(code: u16) -> Option<Response> {
        Some(match code {
            1 => Response::RPL_WELCOME,
            353 => Response::RPL_NAMREPLY,
            366 => Response::RPL_ENDOFNAMES,
            376 => Response::RPL_ENDOFMOTD,
            422 => Response::ERR_NOMOTD,
            432 => Response::ERR_ERRONEUSNICKNAME,
            433 => Response::ERR_NICKNAMEINUSE,
            _ => return None,
        })
    }

    /// The zero-padded command token as it appears on the wire (`"001"`).
    pub fn token(&self) -> String {
        format!("{:03}", self.code())
    }

    /// Whether the numeric is in the error range.
    pub fn is_error(&self) -> bool {
        (400..600).contains(&self.code())
    }

    /// Whether the numeric marks the end of connection registration.
    ///
    /// Servers close the welcome burst with either the end of the MOTD or,
    /// when no MOTD is configured, `ERR_NOMOTD`.
    pub fn ends_registration(&self) -> bool {
        matches!(self, Response::RPL_ENDOFMOTD | Response::ERR_NOMOTD)
    }
}
