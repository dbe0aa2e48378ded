//! Session layer: greeting, login and newsgroup selection.
//!
//! The [`Session`] sits on top of a [`Connection`] and tracks which group
//! the server currently has selected, since article commands implicitly
//! operate on it.
//!
//! # Example
//!
//! ```ignore
//! use nntp_client::{config::ServerConfig, Session};
//!
//! let server = ServerConfig::new("news.example.com")
//!     .with_tls(true)
//!     .with_credentials("joe", "secret");
//!
//! let mut session = Session::builder()
//!     .read_chunk_size(128 * 1024)
//!     .connect(&server)
//!     .await?;
//!
//! if let Some(group) = session.open_group("alt.binaries.test").await? {
//!     if let Some(mut article) = group.fetch_article(&mut session, group.high()).await? {
//!         let decoded = article.decode(&mut session).await?;
//!         println!("{} ({} bytes)", decoded.filename(), decoded.decoded_bytes().len());
//!     }
//! }
//!
//! session.disconnect().await;
//! ```

use tokio::io::{AsyncRead, AsyncWrite};
use tracing::{debug, warn};

use crate::config::{BufferConfig, ServerConfig};
use crate::connection::Connection;
use crate::error::{NntpError, Result};
use crate::group::Group;
use crate::protocol::{codes, command};
use crate::transport::{self, NntpStream};

/// Builder for configuring and opening a [`Session`].
#[derive(Debug, Clone, Default)]
pub struct SessionBuilder {
    buffer: BufferConfig,
}

impl SessionBuilder {
    /// Create a new builder with default buffering.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the largest response the engine will buffer.
    ///
    /// Default: 16 MiB
    pub fn max_buffer_size(mut self, size: usize) -> Self {
        self.buffer.max_buffer_size = size;
        self
    }

    /// Set the maximum bytes requested per transport read.
    ///
    /// Default: 64 KiB
    pub fn read_chunk_size(mut self, size: usize) -> Self {
        self.buffer.read_chunk_size = size;
        self
    }

    /// Set the buffer capacity allocated up front.
    ///
    /// Default: 64 KiB
    pub fn initial_capacity(mut self, capacity: usize) -> Self {
        self.buffer.initial_capacity = capacity;
        self
    }

    /// Connect to the server, read the greeting and log in when the
    /// config carries credentials.
    pub async fn connect(self, server: &ServerConfig) -> Result<Session> {
        let service = server.service();
        debug!(host = %server.host, port = server.port(), tls = server.tls, "connecting");

        let stream = if server.tls {
            transport::secure_connect(&server.host, &service).await?
        } else {
            transport::connect(&server.host, &service).await?
        };

        let mut session = self.handshake(stream).await?;
        if let Some((user, pass)) = server.credentials() {
            session.login(user, pass).await?;
        }
        Ok(session)
    }

    /// Start a session on an already connected stream.
    pub async fn handshake<S>(self, stream: S) -> Result<Session<S>>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        Session::handshake(Connection::with_config(stream, self.buffer)).await
    }
}

/// A logged-in conversation with one news server.
pub struct Session<S = NntpStream> {
    connection: Connection<S>,
    /// Group the server has selected, by name.
    current_group: Option<String>,
}

impl Session {
    /// Create a new session builder.
    pub fn builder() -> SessionBuilder {
        SessionBuilder::new()
    }

    /// Plain connection with default buffering.
    pub async fn connect(host: &str, service: &str) -> Result<Self> {
        let stream = transport::connect(host, service).await?;
        Self::handshake(Connection::new(stream)).await
    }

    /// TLS connection with default buffering.
    pub async fn secure_connect(host: &str, service: &str) -> Result<Self> {
        let stream = transport::secure_connect(host, service).await?;
        Self::handshake(Connection::new(stream)).await
    }
}

impl<S: AsyncRead + AsyncWrite + Unpin> Session<S> {
    /// Read the greeting, which must be 200.
    ///
    /// On any other reply, or a transport failure, the connection is closed.
    pub async fn handshake(mut connection: Connection<S>) -> Result<Self> {
        let greeting = match connection.read_status_line().await {
            Ok(status) => status,
            Err(e) => {
                connection.close().await;
                return Err(e);
            }
        };

        if greeting.code != codes::SERVICE_READY {
            warn!(code = greeting.code, text = %greeting.text, "server refused connection");
            connection.close().await;
            return Err(NntpError::Server {
                code: greeting.code,
                expected: codes::SERVICE_READY,
                message: greeting.text,
            });
        }

        debug!(text = %greeting.text, "server ready");
        Ok(Self {
            connection,
            current_group: None,
        })
    }

    /// Authenticate with `AUTHINFO USER` / `AUTHINFO PASS`.
    pub async fn login(&mut self, user: &str, pass: &str) -> Result<()> {
        self.connection
            .expect_command(&command::authinfo_user(user), codes::AUTH_CONTINUE)
            .await?;
        self.connection
            .expect_command(&command::authinfo_pass(pass), codes::AUTH_ACCEPTED)
            .await?;
        debug!(user, "authenticated");
        Ok(())
    }

    /// Select a group and read its watermarks.
    ///
    /// Returns `None` if the server does not answer 211.
    pub async fn open_group(&mut self, name: &str) -> Result<Option<Group>> {
        let status = self.connection.send_command(&command::group(name)).await?;
        if status.code != codes::GROUP_SELECTED {
            debug!(group = name, code = status.code, "group not available");
            return Ok(None);
        }

        let group = Group::from_reply(name, &status.text)?;
        debug!(
            group = name,
            count = group.count(),
            low = group.low(),
            high = group.high(),
            "group selected"
        );
        self.current_group = Some(name.to_string());
        Ok(Some(group))
    }

    /// Make `group` the server's current group unless it already is.
    pub async fn activate_group(&mut self, group: &Group) -> Result<()> {
        if self.current_group.as_deref() == Some(group.name()) {
            return Ok(());
        }

        self.connection
            .expect_command(&command::group(group.name()), codes::GROUP_SELECTED)
            .await?;
        debug!(group = group.name(), "group activated");
        self.current_group = Some(group.name().to_string());
        Ok(())
    }

    /// Name of the group the server has selected.
    pub fn current_group(&self) -> Option<&str> {
        self.current_group.as_deref()
    }

    /// Send `QUIT` and close. Never fails.
    pub async fn disconnect(&mut self) {
        if self.connection.is_open() {
            if let Err(e) = self.connection.send_command(&command::quit()).await {
                warn!(error = %e, "QUIT failed during disconnect");
            }
        }
        self.connection.close().await;
        self.current_group = None;
    }

    /// Check whether the underlying connection is open.
    pub fn is_open(&self) -> bool {
        self.connection.is_open()
    }

    /// Incoming bytes per second.
    pub fn download_speed(&mut self) -> u64 {
        self.connection.download_speed()
    }

    /// Outgoing bytes per second.
    pub fn upload_speed(&mut self) -> u64 {
        self.connection.upload_speed()
    }

    /// The protocol engine, for commands not wrapped here.
    pub fn connection_mut(&mut self) -> &mut Connection<S> {
        &mut self.connection
    }
}
