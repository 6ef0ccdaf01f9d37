//! Loopback chat server for the bot to connect to.

use slirc_bot::config::NetworkConfig;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::time::timeout;

use super::peer::TestPeer;

/// Listens on an ephemeral localhost port.
pub struct TestServer {
    listener: TcpListener,
    port: u16,
}

impl TestServer {
    pub async fn spawn() -> anyhow::Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let port = listener.local_addr()?.port();
        Ok(Self { listener, port })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// A network block pointing at this server.
    pub fn network(&self, nickname: &str) -> NetworkConfig {
        let mut network = NetworkConfig::new("127.0.0.1", nickname);
        network.name = Some(format!("test-{}", self.port));
        network.port = Some(self.port);
        network
    }

    /// Accept the bot's connection.
    pub async fn accept(&self) -> anyhow::Result<TestPeer> {
        let (stream, _) = timeout(Duration::from_secs(5), self.listener.accept()).await??;
        Ok(TestPeer::new(stream))
    }
}
