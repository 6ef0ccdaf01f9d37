//! Network module.
//!
//! Contains the server connection state machine, the transport it runs
//! over, and the handle plugins use to send on a network.

pub mod connection;
pub mod handle;
#[cfg(test)]
pub(crate) mod testing;
pub mod transport;

pub use connection::{ConnectionState, Inbound, ServerConnection};
pub use handle::NetworkHandle;
pub use transport::{Connector, Endpoint, Frame, Link, TcpConnector};
