//! # nntp-client
//!
//! Async NNTP client with a yEnc decoder for binary postings.
//!
//! ## Architecture
//!
//! ```text
//! transport (TCP/TLS) -> Metered (throughput) -> Connection (protocol units)
//!     -> Session (login, groups) -> Group / Article -> yEnc decoder
//! ```
//!
//! - **Connection**: assembles status lines, multi-line responses and raw
//!   data blocks from an arbitrarily fragmented byte stream
//! - **yEnc**: parses `=ybegin`/`=ypart` headers and decodes the payload,
//!   including multipart placement
//! - **Meter**: bytes per second over a 3 second sliding window
//!
//! One connection is driven by one task; open several sessions to download
//! in parallel.
//!
//! ## Example
//!
//! ```ignore
//! use nntp_client::{ServerConfig, Session};
//!
//! #[tokio::main]
//! async fn main() -> nntp_client::Result<()> {
//!     let server = ServerConfig::new("news.example.com")
//!         .with_tls(true)
//!         .with_credentials("joe", "secret");
//!
//!     let mut session = Session::builder().connect(&server).await?;
//!
//!     if let Some(group) = session.open_group("alt.binaries.test").await? {
//!         if let Some(mut article) = group.fetch_article(&mut session, group.high()).await? {
//!             let file = article.decode(&mut session).await?;
//!             println!("{}: {} bytes", file.filename(), file.decoded_bytes().len());
//!         }
//!     }
//!
//!     session.disconnect().await;
//!     Ok(())
//! }
//! ```

pub mod article;
pub mod config;
pub mod connection;
pub mod error;
pub mod group;
pub mod meter;
pub mod protocol;
pub mod session;
pub mod transport;
pub mod yenc;

pub use article::Article;
pub use config::{BufferConfig, ServerConfig};
pub use connection::Connection;
pub use error::{NntpError, Result};
pub use group::Group;
pub use meter::{Metered, ThroughputMeter};
pub use session::{Session, SessionBuilder};
pub use transport::NntpStream;
pub use yenc::DecodedArticle;
