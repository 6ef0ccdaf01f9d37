//! IRC message sender prefix (`nick!user@host`).

mod serialize;
mod types;

pub use self::types::Prefix;
