//! Transport module - TCP and TLS connections to the news server.
//!
//! Provides abstraction over:
//! - Plain TCP (`nntp`, port 119)
//! - TLS over TCP (`nntps`, port 563)

mod stream;

pub use stream::{connect, resolve_service, secure_connect, NntpStream, NNTPS_PORT, NNTP_PORT};
