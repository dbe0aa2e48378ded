//! Response buffer for accumulating partial reads.
//!
//! Uses `bytes::BytesMut` as a growable store with an explicit read cursor.
//! Bytes before the cursor belong to units already handed out and are
//! dropped on the next [`ResponseBuffer::push`] (compaction). Bytes after
//! the cursor are the residual tail still waiting for a complete unit.
//!
//! Two kinds of unit can be extracted:
//! - a line, terminated by `CRLF` (status lines and multi-line entries)
//! - a block, terminated by `CRLF.CRLF` (raw article data)
//!
//! Each search remembers how far it already scanned, so a large block that
//! arrives in many chunks is only re-searched near the previous read
//! boundary instead of from the cursor every time.
//!
//! # Example
//!
//! ```
//! use nntp_client::protocol::ResponseBuffer;
//!
//! let mut buffer = ResponseBuffer::new();
//!
//! buffer.push(b"211 3 1 3 misc.te").unwrap();
//! assert!(buffer.take_line().is_none());
//!
//! buffer.push(b"st\r\n").unwrap();
//! assert_eq!(&buffer.take_line().unwrap()[..], b"211 3 1 3 misc.test");
//! ```

use bytes::{Buf, Bytes, BytesMut};
use tracing::trace;

use crate::error::{NntpError, Result};

/// Terminator of a single line.
pub const LINE_TERMINATOR: &[u8] = b"\r\n";

/// Terminator of a raw data block.
pub const BLOCK_TERMINATOR: &[u8] = b"\r\n.\r\n";

/// Default maximum number of unconsumed bytes (16 MiB).
pub const DEFAULT_MAX_BUFFER_SIZE: usize = 16 * 1024 * 1024;

/// Default initial capacity (64 KiB).
pub const DEFAULT_INITIAL_CAPACITY: usize = 64 * 1024;

/// Buffer for accumulating incoming bytes and extracting complete units.
pub struct ResponseBuffer {
    /// Accumulated bytes from transport reads.
    buffer: BytesMut,
    /// Offset of the first unconsumed byte.
    cursor: usize,
    /// Unconsumed bytes already searched for a line terminator.
    line_scanned: usize,
    /// Unconsumed bytes already searched for a block terminator.
    block_scanned: usize,
    /// Maximum allowed unconsumed bytes.
    max_size: usize,
}

impl ResponseBuffer {
    /// Create a new response buffer with default settings.
    ///
    /// Default capacity: 64KB, max size: 16MB.
    pub fn new() -> Self {
        Self::with_capacity_and_limit(DEFAULT_INITIAL_CAPACITY, DEFAULT_MAX_BUFFER_SIZE)
    }

    /// Create a new response buffer with a custom size limit.
    pub fn with_limit(max_size: usize) -> Self {
        Self::with_capacity_and_limit(DEFAULT_INITIAL_CAPACITY.min(max_size), max_size)
    }

    /// Create a new response buffer with custom capacity and size limit.
    pub fn with_capacity_and_limit(capacity: usize, max_size: usize) -> Self {
        Self {
            buffer: BytesMut::with_capacity(capacity),
            cursor: 0,
            line_scanned: 0,
            block_scanned: 0,
            max_size,
        }
    }

    /// Append bytes received from the transport.
    ///
    /// Consumed bytes are compacted away first, so the limit applies to the
    /// residual tail plus the new data only.
    ///
    /// # Errors
    ///
    /// Returns `NntpError::BufferExceeded` if the unconsumed bytes would
    /// exceed the configured maximum. Nothing is appended in that case.
    pub fn push(&mut self, data: &[u8]) -> Result<()> {
        self.compact();

        if self.buffer.len() + data.len() > self.max_size {
            return Err(NntpError::BufferExceeded {
                limit: self.max_size,
            });
        }

        self.buffer.extend_from_slice(data);
        Ok(())
    }

    /// Extract the next complete line, without its CRLF.
    ///
    /// Returns `None` if no full line is buffered yet.
    pub fn take_line(&mut self) -> Option<Bytes> {
        let region = &self.buffer[self.cursor..];
        // A terminator may straddle the previous boundary by one byte.
        let start = self.line_scanned.saturating_sub(LINE_TERMINATOR.len() - 1);

        match find(&region[start..], LINE_TERMINATOR) {
            Some(pos) => {
                let end = start + pos;
                let line = Bytes::copy_from_slice(&region[..end]);
                self.consume(end + LINE_TERMINATOR.len());
                Some(line)
            }
            None => {
                self.line_scanned = region.len();
                None
            }
        }
    }

    /// Extract the next complete data block, without its `CRLF.CRLF`.
    ///
    /// No dot-unstuffing happens here. A block with no content at all
    /// (the terminating `.` line right after the status line) yields an
    /// empty `Bytes`.
    ///
    /// Returns `None` if the terminator has not arrived yet.
    pub fn take_block(&mut self) -> Option<Bytes> {
        let region = &self.buffer[self.cursor..];

        if region.starts_with(b".\r\n") {
            self.consume(3);
            return Some(Bytes::new());
        }

        let start = self
            .block_scanned
            .saturating_sub(BLOCK_TERMINATOR.len() - 1);

        match find(&region[start..], BLOCK_TERMINATOR) {
            Some(pos) => {
                let end = start + pos;
                let block = Bytes::copy_from_slice(&region[..end]);
                self.consume(end + BLOCK_TERMINATOR.len());
                Some(block)
            }
            None => {
                self.block_scanned = region.len();
                None
            }
        }
    }

    /// Unconsumed bytes (the residual tail).
    pub fn unconsumed(&self) -> &[u8] {
        &self.buffer[self.cursor..]
    }

    /// Get the number of unconsumed bytes.
    pub fn len(&self) -> usize {
        self.buffer.len() - self.cursor
    }

    /// Check if there are no unconsumed bytes.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Offset of the cursor from the start of the physical buffer.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Maximum allowed unconsumed bytes.
    pub fn limit(&self) -> usize {
        self.max_size
    }

    /// Drop everything, consumed or not. Used on reconnect.
    pub fn clear(&mut self) {
        self.buffer.clear();
        self.cursor = 0;
        self.line_scanned = 0;
        self.block_scanned = 0;
    }

    /// Move the residual tail to the start of the buffer.
    fn compact(&mut self) {
        if self.cursor == 0 {
            return;
        }
        trace!(
            consumed = self.cursor,
            residual = self.len(),
            "compacting response buffer"
        );
        self.buffer.advance(self.cursor);
        self.cursor = 0;
    }

    fn consume(&mut self, n: usize) {
        self.cursor += n;
        self.line_scanned = 0;
        self.block_scanned = 0;
    }
}

impl Default for ResponseBuffer {
    fn default() -> Self {
        Self::new()
    }
}

/// Offset of the first occurrence of `needle` in `haystack`.
pub(crate) fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}
