//! Transport collaborator: turns an endpoint into a stream of inbound lines
//! and a sink for outbound lines.
//!
//! The connection state machine only ever sees complete lines. Framing is
//! done by [`LineCodec`], TLS by rustls with the system root store. A line
//! that cannot be decoded arrives as [`Frame::Malformed`]; only I/O errors
//! end the stream.

use async_trait::async_trait;
use bytes::BytesMut;
use futures_util::{Sink, Stream, StreamExt};
use slirc_proto::{LineCodec, ProtocolError};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio_rustls::TlsConnector;
use tokio_rustls::rustls::client::danger::{
    HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier,
};
use tokio_rustls::rustls::pki_types::{CertificateDer, ServerName, UnixTime};
use tokio_rustls::rustls::{
    ClientConfig, DigitallySignedStruct, Error as TlsError, RootCertStore, SignatureScheme,
};
use tokio_util::codec::{Decoder, Encoder, Framed};
use tracing::{info, warn};

use crate::config::NetworkConfig;
use crate::error::ConnectionError;

/// Inbound line limit. Tagged lines may carry up to 8191 bytes of tags on
/// top of the classic 512.
pub const MAX_LINE: usize = 8191 + 512;

/// Upper bound on acquiring a transport, TLS handshake included.
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// One inbound item.
#[derive(Debug)]
pub enum Frame {
    /// A complete line, terminator removed.
    Line(String),
    /// A line that could not be decoded. It has been skipped.
    Malformed(ProtocolError),
}

pub type LineStream = Pin<Box<dyn Stream<Item = Result<Frame, ProtocolError>> + Send>>;
pub type LineSink = Pin<Box<dyn Sink<String, Error = ProtocolError> + Send>>;

/// An established transport: inbound lines until closure, plus a writer.
pub struct Link {
    pub lines: LineStream,
    pub sink: LineSink,
}

impl Link {
    pub fn new<L, S>(lines: L, sink: S) -> Self
    where
        L: Stream<Item = Result<Frame, ProtocolError>> + Send + 'static,
        S: Sink<String, Error = ProtocolError> + Send + 'static,
    {
        Self {
            lines: Box::pin(lines),
            sink: Box::pin(sink),
        }
    }

    /// Frame a byte stream into lines.
    pub fn framed<IO>(io: IO) -> Self
    where
        IO: AsyncRead + AsyncWrite + Send + 'static,
    {
        let codec = FrameCodec {
            lines: LineCodec::with_max_len(MAX_LINE),
        };
        let (sink, lines) = Framed::new(io, codec).split::<String>();
        Self::new(lines, sink)
    }
}

/// [`LineCodec`] that reports bad lines as items instead of failing the
/// stream. `Framed` stops after the first decoder error.
struct FrameCodec {
    lines: LineCodec,
}

impl Decoder for FrameCodec {
    type Item = Frame;
    type Error = ProtocolError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Frame>, ProtocolError> {
        match self.lines.decode(src) {
            Ok(line) => Ok(line.map(Frame::Line)),
            Err(e) if e.is_line_error() => Ok(Some(Frame::Malformed(e))),
            Err(e) => Err(e),
        }
    }
}

impl Encoder<String> for FrameCodec {
    type Error = ProtocolError;

    fn encode(&mut self, line: String, dst: &mut BytesMut) -> Result<(), ProtocolError> {
        self.lines.encode(line, dst)
    }
}

/// Where to connect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub host: String,
    pub port: u16,
    pub tls: bool,
    pub verify_certificates: bool,
}

impl Endpoint {
    pub fn from_config(config: &NetworkConfig) -> Self {
        Self {
            host: config.hostname.clone(),
            port: config.port(),
            tls: config.secure,
            verify_certificates: config.verify_certificates,
        }
    }
}

/// Acquires transports for connections.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn establish(&self, endpoint: &Endpoint) -> Result<Link, ConnectionError>;
}

/// TCP connector with optional TLS.
#[derive(Debug, Default, Clone, Copy)]
pub struct TcpConnector;

#[async_trait]
impl Connector for TcpConnector {
    async fn establish(&self, endpoint: &Endpoint) -> Result<Link, ConnectionError> {
        within(endpoint, CONNECT_TIMEOUT, async {
            let tcp = TcpStream::connect((endpoint.host.as_str(), endpoint.port))
                .await
                .map_err(|source| ConnectionError::Connect {
                    host: endpoint.host.clone(),
                    port: endpoint.port,
                    source,
                })?;
            if let Err(e) = tcp.set_nodelay(true) {
                warn!(host = %endpoint.host, error = %e, "failed to set TCP_NODELAY");
            }

            if endpoint.tls {
                let tls = upgrade_to_tls(tcp, &endpoint.host, endpoint.verify_certificates).await?;
                Ok(Link::framed(tls))
            } else {
                Ok(Link::framed(tcp))
            }
        })
        .await
    }
}

/// Bound a connection attempt. Expiry is reported as a connect failure.
async fn within<T, F>(endpoint: &Endpoint, limit: Duration, attempt: F) -> Result<T, ConnectionError>
where
    F: Future<Output = Result<T, ConnectionError>>,
{
    tokio::time::timeout(limit, attempt)
        .await
        .unwrap_or_else(|_| {
            Err(ConnectionError::Connect {
                host: endpoint.host.clone(),
                port: endpoint.port,
                source: std::io::ErrorKind::TimedOut.into(),
            })
        })
}

/// Upgrades a TCP stream to TLS for outbound connections.
async fn upgrade_to_tls(
    tcp_stream: TcpStream,
    hostname: &str,
    verify_cert: bool,
) -> Result<tokio_rustls::client::TlsStream<TcpStream>, ConnectionError> {
    let tls_error = |message: String| ConnectionError::Tls {
        host: hostname.to_string(),
        message,
    };

    let config = if verify_cert {
        let mut roots = RootCertStore::empty();
        let certs = rustls_native_certs::load_native_certs();
        for cert in certs.certs {
            if let Err(e) = roots.add(cert) {
                warn!("Failed to add root cert: {}", e);
            }
        }
        for e in &certs.errors {
            warn!("Error loading native certs: {}", e);
        }
        ClientConfig::builder()
            .with_root_certificates(roots)
            .with_no_client_auth()
    } else {
        ClientConfig::builder()
            .dangerous()
            .with_custom_certificate_verifier(Arc::new(AcceptAnyCertificate))
            .with_no_client_auth()
    };

    let connector = TlsConnector::from(Arc::new(config));
    let server_name =
        ServerName::try_from(hostname.to_string()).map_err(|e| tls_error(e.to_string()))?;

    let tls_stream = connector
        .connect(server_name, tcp_stream)
        .await
        .map_err(|e| tls_error(e.to_string()))?;

    info!(hostname = %hostname, verify = verify_cert, "TLS handshake completed");
    Ok(tls_stream)
}

/// Certificate verifier for `verify_certificates = false`.
#[derive(Debug)]
struct AcceptAnyCertificate;

impl ServerCertVerifier for AcceptAnyCertificate {
    fn verify_server_cert(
        &self,
        _end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _now: UnixTime,
    ) -> Result<ServerCertVerified, TlsError> {
        Ok(ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        _message: &[u8],
        _cert: &CertificateDer<'_>,
        _dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, TlsError> {
        Ok(HandshakeSignatureValid::assertion())
    }

    fn verify_tls13_signature(
        &self,
        _message: &[u8],
        _cert: &CertificateDer<'_>,
        _dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, TlsError> {
        Ok(HandshakeSignatureValid::assertion())
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        vec![
            SignatureScheme::ECDSA_NISTP256_SHA256,
            SignatureScheme::ECDSA_NISTP384_SHA384,
            SignatureScheme::ED25519,
            SignatureScheme::RSA_PSS_SHA256,
            SignatureScheme::RSA_PSS_SHA384,
            SignatureScheme::RSA_PSS_SHA512,
            SignatureScheme::RSA_PKCS1_SHA256,
            SignatureScheme::RSA_PKCS1_SHA384,
            SignatureScheme::RSA_PKCS1_SHA512,
        ]
    }
}
