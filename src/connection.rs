//! Protocol I/O engine.
//!
//! A [`Connection`] owns one transport stream plus the [`ResponseBuffer`]
//! that persists across every command issued on it. It turns the byte
//! stream into protocol units:
//!
//! - a status line ([`Connection::read_status_line`])
//! - one line of a multi-line response ([`Connection::read_multiline_entry`])
//! - a whole multi-line response ([`Connection::read_multiline`])
//! - a raw data block ([`Connection::read_block`])
//!
//! Any transport failure, including end of stream, closes the connection and
//! surfaces `NntpError::Network`. An unexpected status code surfaces
//! `NntpError::Server` and leaves the connection usable.
//!
//! # Example
//!
//! ```ignore
//! use nntp_client::Connection;
//!
//! let mut conn = Connection::new(stream);
//! let greeting = conn.read_status_line().await?;
//! let body = conn.send_block_command("BODY <id@host>", Some(222)).await?;
//! ```

use std::io;

use bytes::{BufMut, Bytes, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, trace, warn};

use crate::config::BufferConfig;
use crate::error::{NntpError, Result};
use crate::meter::Metered;
use crate::protocol::command::loggable;
use crate::protocol::{encode_command, ResponseBuffer, StatusLine, CRLF};

/// Buffered protocol reader/writer over one transport stream.
pub struct Connection<S> {
    /// Metered transport; `None` once closed.
    stream: Option<Metered<S>>,
    /// Bytes received but not yet consumed by a complete unit.
    buffer: ResponseBuffer,
    /// Scratch space for a single transport read.
    read_buf: Vec<u8>,
}

impl<S: AsyncRead + AsyncWrite + Unpin> Connection<S> {
    /// Wrap a connected stream with default buffering.
    pub fn new(stream: S) -> Self {
        Self::with_config(stream, BufferConfig::default())
    }

    /// Wrap a connected stream.
    pub fn with_config(stream: S, config: BufferConfig) -> Self {
        Self {
            stream: Some(Metered::new(stream)),
            buffer: ResponseBuffer::with_capacity_and_limit(
                config.initial_capacity.min(config.max_buffer_size),
                config.max_buffer_size,
            ),
            read_buf: vec![0u8; config.read_chunk_size.max(1)],
        }
    }

    /// Check whether the transport is still open.
    pub fn is_open(&self) -> bool {
        self.stream.is_some()
    }

    /// Number of received bytes not yet consumed.
    pub fn buffered_len(&self) -> usize {
        self.buffer.len()
    }

    /// Shut the transport down and discard buffered input.
    ///
    /// Shutdown errors are ignored; the stream is dropped either way.
    pub async fn close(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            if let Err(e) = stream.shutdown().await {
                debug!(error = %e, "shutdown failed while closing");
            }
        }
        self.buffer.clear();
    }

    /// Send one command line. The CRLF terminator is appended here.
    pub async fn write_command(&mut self, line: &str) -> Result<()> {
        let stream = self.stream.as_mut().ok_or(NntpError::NotConnected)?;
        debug!(command = loggable(line), "sending command");

        let data = encode_command(line);
        let result = match stream.write_all(&data).await {
            Ok(()) => stream.flush().await,
            Err(e) => Err(e),
        };

        result.map_err(|e| self.fail(e))
    }

    /// Read one status line.
    pub async fn read_status_line(&mut self) -> Result<StatusLine> {
        let line = self.read_line().await?;
        StatusLine::parse(&line)
    }

    /// Read one line of a multi-line response.
    ///
    /// Returns `None` at the terminating `.` line. A leading stuffed dot is
    /// removed from every other line.
    pub async fn read_multiline_entry(&mut self) -> Result<Option<Bytes>> {
        let line = self.read_line().await?;

        if &line[..] == b"." {
            return Ok(None);
        }
        if line.starts_with(b".") {
            return Ok(Some(line.slice(1..)));
        }
        Ok(Some(line))
    }

    /// Read a whole multi-line response, lines joined with CRLF.
    pub async fn read_multiline(&mut self) -> Result<Bytes> {
        let mut out = BytesMut::new();
        let mut first = true;

        while let Some(line) = self.read_multiline_entry().await? {
            if !first {
                out.put_slice(CRLF);
            }
            out.put_slice(&line);
            first = false;
        }

        Ok(out.freeze())
    }

    /// Read a raw data block up to the `CRLF.CRLF` marker.
    ///
    /// The block is returned without the marker and without dot-unstuffing.
    pub async fn read_block(&mut self) -> Result<Bytes> {
        loop {
            if let Some(block) = self.buffer.take_block() {
                debug!(bytes = block.len(), "block received");
                return Ok(block);
            }
            self.fill().await?;
        }
    }

    /// Send a command and read its status line.
    pub async fn send_command(&mut self, line: &str) -> Result<StatusLine> {
        self.write_command(line).await?;
        let status = self.read_status_line().await?;
        debug!(code = status.code, "reply received");
        Ok(status)
    }

    /// Send a command and return only the status code.
    pub async fn send_command_code(&mut self, line: &str) -> Result<u16> {
        Ok(self.send_command(line).await?.code)
    }

    /// Send a command and require a specific status code.
    pub async fn expect_command(&mut self, line: &str, expected: u16) -> Result<StatusLine> {
        self.send_command(line).await?.expect(expected)
    }

    /// Send a command, check its status, then read the data block.
    ///
    /// With `expected` set to `None` the status is not checked, so the
    /// caller must only use it for commands that always answer with a block.
    pub async fn send_block_command(
        &mut self,
        line: &str,
        expected: Option<u16>,
    ) -> Result<Bytes> {
        let status = self.send_command(line).await?;
        if let Some(expected) = expected {
            status.expect(expected)?;
        }
        self.read_block().await
    }

    /// Incoming bytes per second; 0 when closed.
    pub fn download_speed(&mut self) -> u64 {
        self.stream
            .as_mut()
            .map_or(0, |stream| stream.meter_mut().download_speed())
    }

    /// Outgoing bytes per second; 0 when closed.
    pub fn upload_speed(&mut self) -> u64 {
        self.stream
            .as_mut()
            .map_or(0, |stream| stream.meter_mut().upload_speed())
    }

    async fn read_line(&mut self) -> Result<Bytes> {
        loop {
            if let Some(line) = self.buffer.take_line() {
                return Ok(line);
            }
            self.fill().await?;
        }
    }

    /// Perform one transport read into the response buffer.
    async fn fill(&mut self) -> Result<()> {
        let stream = self.stream.as_mut().ok_or(NntpError::NotConnected)?;

        let result = stream.read(&mut self.read_buf).await;
        let n = match result {
            Ok(0) => {
                return Err(self.fail(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "Connection closed by server",
                )))
            }
            Ok(n) => n,
            Err(e) => return Err(self.fail(e)),
        };

        trace!(bytes = n, buffered = self.buffer.len(), "transport read");

        if let Err(e) = self.buffer.push(&self.read_buf[..n]) {
            warn!(error = %e, "response too large, closing connection");
            self.drop_stream();
            return Err(e);
        }
        Ok(())
    }

    /// Close after a transport failure.
    fn fail(&mut self, error: io::Error) -> NntpError {
        warn!(error = %error, "transport failure, closing connection");
        self.drop_stream();
        NntpError::Network(error)
    }

    fn drop_stream(&mut self) {
        self.stream = None;
        self.buffer.clear();
    }
}
