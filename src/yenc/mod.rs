//! yEnc decoding of article bodies.
//!
//! A raw block from [`Connection::read_block`](crate::Connection::read_block)
//! goes through three stages:
//!
//! 1. `=ybegin` header (size, name, optional part number)
//! 2. `=ypart` header, multipart only (1-based inclusive byte range)
//! 3. the escaped payload, up to the `=yend` trailer
//!
//! The trailer itself is not parsed and no CRC is checked.
//!
//! # Example
//!
//! ```
//! use nntp_client::yenc::DecodedArticle;
//!
//! let block = b"=ybegin size=2 name=hi.bin\r\n*+\r\n=yend size=2";
//! let article = DecodedArticle::decode(block).unwrap();
//!
//! assert_eq!(article.filename(), "hi.bin");
//! assert_eq!(article.decoded_bytes(), &[0, 1]);
//! assert!(!article.is_multipart());
//! ```

mod decoder;
mod header;

use crate::error::{NntpError, Result};

/// A decoded yEnc unit and its placement in the full file.
///
/// Immutable once constructed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedArticle {
    size: u64,
    part: u64,
    parts: u64,
    part_begin: u64,
    part_end: u64,
    filename: String,
    data: Vec<u8>,
}

impl DecodedArticle {
    /// Parse the headers of `block` and decode its payload.
    ///
    /// # Errors
    ///
    /// Returns `NntpError::Decode` for missing or invalid header fields and
    /// when the payload does not decode to exactly the announced length.
    pub fn decode(block: &[u8]) -> Result<Self> {
        let header = header::parse(block)?;

        let expected = if header.is_multipart() {
            header.part_size()
        } else {
            header.size
        };
        let expected = usize::try_from(expected)
            .map_err(|_| NntpError::decode(format!("Size {} too large", expected)))?;

        let data = decoder::decode(&block[header.data_start..], expected)?;

        Ok(Self {
            size: header.size,
            part: header.part,
            parts: header.total,
            part_begin: header.begin,
            part_end: header.end,
            filename: header.name,
            data,
        })
    }

    /// Whether this is one part of a larger file.
    pub fn is_multipart(&self) -> bool {
        self.part != 0
    }

    /// Part number, 0 when not multipart.
    pub fn part_number(&self) -> u64 {
        self.part
    }

    /// Number of parts, 0 when not multipart.
    pub fn parts(&self) -> u64 {
        self.parts
    }

    /// First byte of this part in the full file (1-based), 0 when not multipart.
    pub fn part_begin(&self) -> u64 {
        self.part_begin
    }

    /// Last byte of this part in the full file (1-based, inclusive).
    pub fn part_end(&self) -> u64 {
        self.part_end
    }

    /// Bytes in this part, 0 when not multipart.
    pub fn part_size(&self) -> u64 {
        if self.is_multipart() {
            self.part_end - self.part_begin + 1
        } else {
            0
        }
    }

    /// Size of the full file.
    pub fn size(&self) -> u64 {
        self.size
    }

    /// File name from the header.
    pub fn filename(&self) -> &str {
        &self.filename
    }

    /// The decoded payload.
    pub fn decoded_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Take the decoded payload.
    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }
}
