//! Plain and TLS TCP streams behind one type.
//!
//! - Plain: `tokio::net::TcpStream`
//! - TLS: `tokio_rustls::client::TlsStream` over a `TcpStream`, verified
//!   against the Mozilla root store from `webpki-roots`
//!
//! # Example
//!
//! ```ignore
//! use nntp_client::transport::{connect, secure_connect};
//!
//! let plain = connect("news.example.com", "nntp").await?;
//! let tls = secure_connect("news.example.com", "nntps").await?;
//! ```

use std::io;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio::net::{lookup_host, TcpStream};
use tokio_rustls::client::TlsStream;
use tokio_rustls::rustls::crypto::ring;
use tokio_rustls::rustls::pki_types::ServerName;
use tokio_rustls::rustls::{ClientConfig, RootCertStore};
use tokio_rustls::TlsConnector;
use tracing::debug;

use crate::error::{NntpError, Result};

/// Well-known port of the `nntp` service.
pub const NNTP_PORT: u16 = 119;

/// Well-known port of the `nntps` service.
pub const NNTPS_PORT: u16 = 563;

/// A connected transport, plain or TLS.
pub enum NntpStream {
    /// Unencrypted TCP.
    Plain(TcpStream),
    /// TLS over TCP.
    Tls(Box<TlsStream<TcpStream>>),
}

impl NntpStream {
    /// Check whether this is a TLS stream.
    pub fn is_tls(&self) -> bool {
        matches!(self, NntpStream::Tls(_))
    }

    /// Get a reference to the underlying TCP stream.
    pub fn tcp(&self) -> &TcpStream {
        match self {
            NntpStream::Plain(stream) => stream,
            NntpStream::Tls(stream) => stream.get_ref().0,
        }
    }
}

/// Resolve a service name or port number.
///
/// Accepts `nntp`, `nntps` or a decimal port.
pub fn resolve_service(service: &str) -> Result<u16> {
    match service {
        "nntp" => Ok(NNTP_PORT),
        "nntps" => Ok(NNTPS_PORT),
        other => other.parse().map_err(|_| {
            NntpError::Network(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("Unknown service: {}", other),
            ))
        }),
    }
}

/// Open a plain TCP connection.
pub async fn connect(host: &str, service: &str) -> Result<NntpStream> {
    let tcp = connect_tcp(host, resolve_service(service)?).await?;
    Ok(NntpStream::Plain(tcp))
}

/// Open a TCP connection and perform the TLS handshake.
pub async fn secure_connect(host: &str, service: &str) -> Result<NntpStream> {
    let tcp = connect_tcp(host, resolve_service(service)?).await?;

    let server_name = ServerName::try_from(host.to_owned())
        .map_err(|e| NntpError::Tls(format!("Invalid server name {}: {}", host, e)))?;

    let tls = tls_connector()?
        .connect(server_name, tcp)
        .await
        .map_err(|e| NntpError::Tls(format!("TLS handshake failed: {}", e)))?;

    debug!(host, "TLS handshake complete");
    Ok(NntpStream::Tls(Box::new(tls)))
}

/// Try every resolved address in order until one accepts.
async fn connect_tcp(host: &str, port: u16) -> Result<TcpStream> {
    let mut last_error = None;

    for addr in lookup_host((host, port)).await? {
        debug!(%addr, "connecting");
        match TcpStream::connect(addr).await {
            Ok(stream) => {
                stream.set_nodelay(true)?;
                return Ok(stream);
            }
            Err(e) => {
                debug!(%addr, error = %e, "connect attempt failed");
                last_error = Some(e);
            }
        }
    }

    Err(NntpError::Network(last_error.unwrap_or_else(|| {
        io::Error::new(
            io::ErrorKind::NotFound,
            format!("No addresses found for {}", host),
        )
    })))
}

fn tls_connector() -> Result<TlsConnector> {
    let mut roots = RootCertStore::empty();
    roots.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());

    let config = ClientConfig::builder_with_provider(Arc::new(ring::default_provider()))
        .with_safe_default_protocol_versions()
        .map_err(|e| NntpError::Tls(e.to_string()))?
        .with_root_certificates(roots)
        .with_no_client_auth();

    Ok(TlsConnector::from(Arc::new(config)))
}

impl AsyncRead for NntpStream {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        match self.get_mut() {
            NntpStream::Plain(stream) => Pin::new(stream).poll_read(cx, buf),
            NntpStream::Tls(stream) => Pin::new(stream.as_mut()).poll_read(cx, buf),
        }
    }
}

impl AsyncWrite for NntpStream {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        match self.get_mut() {
            NntpStream::Plain(stream) => Pin::new(stream).poll_write(cx, buf),
            NntpStream::Tls(stream) => Pin::new(stream.as_mut()).poll_write(cx, buf),
        }
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.get_mut() {
            NntpStream::Plain(stream) => Pin::new(stream).poll_flush(cx),
            NntpStream::Tls(stream) => Pin::new(stream.as_mut()).poll_flush(cx),
        }
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.get_mut() {
            NntpStream::Plain(stream) => Pin::new(stream).poll_shutdown(cx),
            NntpStream::Tls(stream) => Pin::new(stream.as_mut()).poll_shutdown(cx),
        }
    }
}
