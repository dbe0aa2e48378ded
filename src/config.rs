//! Connection and server configuration.
//!
//! [`BufferConfig`] tunes the protocol engine's response buffer.
//! [`ServerConfig`] describes where and how to connect; it derives serde
//! traits so it can live inside an application's own config file.
//!
//! # Example
//!
//! ```
//! use nntp_client::config::ServerConfig;
//!
//! let server = ServerConfig::from_json(
//!     r#"{"host": "news.example.com", "tls": true, "username": "joe", "password": "pw"}"#,
//! )
//! .unwrap();
//!
//! assert_eq!(server.port(), 563);
//! assert!(server.credentials().is_some());
//! ```

use serde::{Deserialize, Serialize};

use crate::error::{NntpError, Result};
use crate::protocol::{DEFAULT_INITIAL_CAPACITY, DEFAULT_MAX_BUFFER_SIZE};
use crate::transport::{NNTPS_PORT, NNTP_PORT};

/// Default size of a single transport read (64 KiB).
pub const DEFAULT_READ_CHUNK_SIZE: usize = 64 * 1024;

/// Configuration for the protocol engine's buffering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferConfig {
    /// Maximum unconsumed bytes held while assembling one response.
    pub max_buffer_size: usize,
    /// Maximum bytes requested from the transport per read.
    pub read_chunk_size: usize,
    /// Capacity allocated up front.
    pub initial_capacity: usize,
}

impl Default for BufferConfig {
    fn default() -> Self {
        Self {
            max_buffer_size: DEFAULT_MAX_BUFFER_SIZE,
            read_chunk_size: DEFAULT_READ_CHUNK_SIZE,
            initial_capacity: DEFAULT_INITIAL_CAPACITY,
        }
    }
}

/// Where to connect and how to authenticate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host name or address.
    pub host: String,
    /// Port; the well-known port for the transport when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    /// Use TLS.
    #[serde(default)]
    pub tls: bool,
    /// User for `AUTHINFO USER`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    /// Password for `AUTHINFO PASS`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

impl ServerConfig {
    /// Plain connection to `host` on the default port.
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: None,
            tls: false,
            username: None,
            password: None,
        }
    }

    /// Switch TLS on or off.
    pub fn with_tls(mut self, tls: bool) -> Self {
        self.tls = tls;
        self
    }

    /// Use an explicit port.
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    /// Authenticate with these credentials after connecting.
    pub fn with_credentials(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }

    /// Parse from JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| NntpError::Config(format!("Invalid server config: {}", e)))?;

        if config.host.is_empty() {
            return Err(NntpError::Config("Server host must not be empty".into()));
        }
        Ok(config)
    }

    /// Serialize to JSON.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| NntpError::Config(e.to_string()))
    }

    /// Effective port.
    pub fn port(&self) -> u16 {
        match (self.port, self.tls) {
            (Some(port), _) => port,
            (None, true) => NNTPS_PORT,
            (None, false) => NNTP_PORT,
        }
    }

    /// Effective port as a service string for the transport.
    pub fn service(&self) -> String {
        self.port().to_string()
    }

    /// Username and password, when both are set.
    pub fn credentials(&self) -> Option<(&str, &str)> {
        match (&self.username, &self.password) {
            (Some(user), Some(pass)) => Some((user, pass)),
            _ => None,
        }
    }
}
