//! Status line parsing.
//!
//! Every NNTP reply starts with a single status line:
//! ```text
//! ┌──────────┬───────┬──────────────────────┬──────┐
//! │ Code     │ SP    │ Text                 │ CRLF │
//! │ 3 digits │ 1 byte│ free form, optional  │      │
//! └──────────┴───────┴──────────────────────┴──────┘
//! ```
//!
//! The CRLF is stripped by the response buffer before the line gets here.

use crate::error::{NntpError, Result};

/// Status code constants used by this client.
pub mod codes {
    /// Service available, posting allowed.
    pub const SERVICE_READY: u16 = 200;
    /// Connection closing (reply to QUIT).
    pub const CLOSING: u16 = 205;
    /// Group selected; text carries count, low and high watermark.
    pub const GROUP_SELECTED: u16 = 211;
    /// Headers follow as a multi-line response.
    pub const HEAD_FOLLOWS: u16 = 221;
    /// Body follows as a data block.
    pub const BODY_FOLLOWS: u16 = 222;
    /// Article exists; text carries number and message id.
    pub const ARTICLE_EXISTS: u16 = 223;
    /// Authentication accepted.
    pub const AUTH_ACCEPTED: u16 = 281;
    /// Password required.
    pub const AUTH_CONTINUE: u16 = 381;

    /// Check if a code is in the 2xx success class.
    #[inline]
    pub fn is_success(code: u16) -> bool {
        (200..300).contains(&code)
    }
}

/// A parsed status line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusLine {
    /// Three digit status code.
    pub code: u16,
    /// Text after the code, without the separating space.
    pub text: String,
}

impl StatusLine {
    /// Create a new status line.
    pub fn new(code: u16, text: impl Into<String>) -> Self {
        Self {
            code,
            text: text.into(),
        }
    }

    /// Parse a status line (CRLF already removed).
    ///
    /// # Example
    ///
    /// ```
    /// use nntp_client::protocol::StatusLine;
    ///
    /// let status = StatusLine::parse(b"211 1234 3000 4234 alt.binaries.test").unwrap();
    /// assert_eq!(status.code, 211);
    /// assert_eq!(status.text, "1234 3000 4234 alt.binaries.test");
    /// ```
    ///
    /// # Errors
    ///
    /// Returns `NntpError::Protocol` if the line does not start with three
    /// ASCII digits followed by a space or the end of the line.
    pub fn parse(line: &[u8]) -> Result<Self> {
        let digits = line
            .get(..3)
            .filter(|d| d.iter().all(u8::is_ascii_digit))
            .ok_or_else(|| malformed(line))?;

        let code = digits
            .iter()
            .fold(0u16, |acc, d| acc * 10 + u16::from(d - b'0'));

        let text = match &line[3..] {
            [] => String::new(),
            [b' ', rest @ ..] => String::from_utf8_lossy(rest).into_owned(),
            _ => return Err(malformed(line)),
        };

        Ok(Self { code, text })
    }

    /// Check if this is a 2xx reply.
    #[inline]
    pub fn is_success(&self) -> bool {
        codes::is_success(self.code)
    }

    /// Fail with `NntpError::Server` unless the code matches.
    pub fn expect(self, expected: u16) -> Result<Self> {
        if self.code == expected {
            Ok(self)
        } else {
            Err(NntpError::Server {
                code: self.code,
                expected,
                message: self.text,
            })
        }
    }
}

fn malformed(line: &[u8]) -> NntpError {
    NntpError::Protocol(format!(
        "Malformed status line: {:?}",
        String::from_utf8_lossy(line)
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_code_and_text() {
        let status = StatusLine::parse(b"200 news.example.com ready").unwrap();
        assert_eq!(status.code, 200);
        assert_eq!(status.text, "news.example.com ready");
        assert!(status.is_success());
    }

    #[test]
    fn test_parse_code_only() {
        let status = StatusLine::parse(b"205").unwrap();
        assert_eq!(status.code, codes::CLOSING);
        assert!(status.text.is_empty());
    }

    #[test]
    fn test_parse_keeps_inner_spaces() {
        let status = StatusLine::parse(b"223 0 <id@host>").unwrap();
        assert_eq!(status.text, "0 <id@host>");
    }

    #[test]
    fn test_parse_rejects_non_numeric() {
        let result = StatusLine::parse(b"OK fine");
        assert!(matches!(result, Err(NntpError::Protocol(_))));
    }

    #[test]
    fn test_parse_rejects_short_line() {
        assert!(StatusLine::parse(b"20").is_err());
        assert!(StatusLine::parse(b"").is_err());
    }

    #[test]
    fn test_parse_rejects_four_digits() {
        assert!(StatusLine::parse(b"2000 too long").is_err());
    }

    #[test]
    fn test_expect_match_and_mismatch() {
        let ok = StatusLine::new(211, "3 1 3 misc.test").expect(codes::GROUP_SELECTED);
        assert!(ok.is_ok());

        let err = StatusLine::new(411, "No such group")
            .expect(codes::GROUP_SELECTED)
            .unwrap_err();
        match err {
            NntpError::Server {
                code,
                expected,
                message,
            } => {
                assert_eq!(code, 411);
                assert_eq!(expected, 211);
                assert_eq!(message, "No such group");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_success_class() {
        assert!(codes::is_success(222));
        assert!(!codes::is_success(430));
        assert!(!codes::is_success(199));
    }
}
