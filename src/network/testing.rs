//! In-memory transport for unit tests.

use async_trait::async_trait;
use slirc_proto::ProtocolError;
use std::time::Duration;
use tokio::sync::mpsc;

use super::transport::{Connector, Endpoint, Frame, Link};
use crate::error::ConnectionError;

/// The server side of a scripted link.
pub(crate) struct ServerEnd {
    pub to_client: mpsc::UnboundedSender<String>,
    pub from_client: mpsc::UnboundedReceiver<String>,
}

impl ServerEnd {
    pub fn send(&self, line: &str) {
        self.to_client.send(line.to_string()).unwrap();
    }
}

/// Connector that hands each new link's server end to the test.
pub(crate) struct ScriptedConnector {
    servers: mpsc::UnboundedSender<ServerEnd>,
    fail: bool,
}

impl ScriptedConnector {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<ServerEnd>) {
        let (servers, rx) = mpsc::unbounded_channel();
        (Self { servers, fail: false }, rx)
    }

    pub fn failing() -> (Self, mpsc::UnboundedReceiver<ServerEnd>) {
        let (mut connector, rx) = Self::new();
        connector.fail = true;
        (connector, rx)
    }
}

#[async_trait]
impl Connector for ScriptedConnector {
    async fn establish(&self, endpoint: &Endpoint) -> Result<Link, ConnectionError> {
        if self.fail {
            return Err(ConnectionError::Connect {
                host: endpoint.host.clone(),
                port: endpoint.port,
                source: std::io::ErrorKind::ConnectionRefused.into(),
            });
        }

        let (to_client, inbound) = mpsc::unbounded_channel::<String>();
        let (outbound, from_client) = mpsc::unbounded_channel::<String>();

        let lines = futures_util::stream::unfold(inbound, |mut rx| async move {
            rx.recv().await.map(|line| (Ok(Frame::Line(line)), rx))
        });
        let sink = futures_util::sink::unfold(outbound, |tx, line: String| async move {
            tx.send(line)
                .map_err(|_| ProtocolError::Io(std::io::ErrorKind::BrokenPipe.into()))?;
            Ok::<_, ProtocolError>(tx)
        });

        let _ = self.servers.send(ServerEnd {
            to_client,
            from_client,
        });
        Ok(Link::new(lines, sink))
    }
}

/// Next line the client wrote, failing the test after a second.
pub(crate) async fn recv_line(server: &mut ServerEnd) -> String {
    tokio::time::timeout(Duration::from_secs(1), server.from_client.recv())
        .await
        .expect("timed out waiting for client line")
        .expect("client closed the link")
}
