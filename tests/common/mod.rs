//! Integration test common infrastructure.
//!
//! Provides a loopback server the bot connects to, the server side of that
//! connection, a plugin that records every event, and a harness that runs a
//! session in the background.

pub mod harness;
pub mod peer;
pub mod recorder;
pub mod server;

#[allow(unused_imports)]
pub use harness::Harness;
#[allow(unused_imports)]
pub use peer::TestPeer;
#[allow(unused_imports)]
pub use recorder::Recorder;
#[allow(unused_imports)]
pub use server::TestServer;
