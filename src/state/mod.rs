//! State management module.
//!
//! Per-connection entities: the client's own [`Identity`], and the
//! [`Channel`]s it occupies with their [`User`] members. All of it is owned
//! by a single `ServerConnection` and only mutated from its dispatch path.

mod channel;
mod identity;
mod user;

pub use channel::Channel;
pub use identity::Identity;
pub use user::{User, strip_sigils};
