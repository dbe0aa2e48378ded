//! Command line builders.
//!
//! Builders return the command text without the line terminator;
//! [`encode_command`] appends the CRLF when the line goes on the wire.
//!
//! # Example
//!
//! ```
//! use nntp_client::protocol::{encode_command, group};
//!
//! assert_eq!(&encode_command(&group("alt.test"))[..], b"GROUP alt.test\r\n");
//! ```

use bytes::{BufMut, Bytes, BytesMut};

/// Line terminator for everything sent to the server.
pub const CRLF: &[u8] = b"\r\n";

/// `AUTHINFO USER <user>`
pub fn authinfo_user(user: &str) -> String {
    format!("AUTHINFO USER {}", user)
}

/// `AUTHINFO PASS <pass>`
pub fn authinfo_pass(pass: &str) -> String {
    format!("AUTHINFO PASS {}", pass)
}

/// `GROUP <name>`
pub fn group(name: &str) -> String {
    format!("GROUP {}", name)
}

/// `STAT <number>`
pub fn stat_number(number: u64) -> String {
    format!("STAT {}", number)
}

/// `STAT <message-id>`. The id must already carry its angle brackets.
pub fn stat_id(message_id: &str) -> String {
    format!("STAT {}", message_id)
}

/// `HEAD <message-id>`
pub fn head(message_id: &str) -> String {
    format!("HEAD {}", message_id)
}

/// `BODY <message-id>`
pub fn body(message_id: &str) -> String {
    format!("BODY {}", message_id)
}

/// `QUIT`
pub fn quit() -> String {
    "QUIT".to_string()
}

/// Wrap a bare message id in angle brackets if it has none.
pub fn bracket_message_id(id: &str) -> String {
    if id.starts_with('<') {
        id.to_string()
    } else {
        format!("<{}>", id)
    }
}

/// Encode a command line for the wire (text + CRLF).
pub fn encode_command(line: &str) -> Bytes {
    let mut buf = BytesMut::with_capacity(line.len() + CRLF.len());
    buf.put_slice(line.as_bytes());
    buf.put_slice(CRLF);
    buf.freeze()
}

/// Text of a command safe to log (credentials masked).
pub fn loggable(line: &str) -> &str {
    if line.starts_with("AUTHINFO PASS") {
        "AUTHINFO PASS ****"
    } else {
        line
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_text() {
        assert_eq!(authinfo_user("joe"), "AUTHINFO USER joe");
        assert_eq!(authinfo_pass("secret"), "AUTHINFO PASS secret");
        assert_eq!(stat_number(42), "STAT 42");
        assert_eq!(stat_id("<a@b>"), "STAT <a@b>");
        assert_eq!(head("<a@b>"), "HEAD <a@b>");
        assert_eq!(body("<a@b>"), "BODY <a@b>");
        assert_eq!(quit(), "QUIT");
    }

    #[test]
    fn test_encode_appends_crlf() {
        let encoded = encode_command("QUIT");
        assert_eq!(&encoded[..], b"QUIT\r\n");
    }

    #[test]
    fn test_bracket_message_id() {
        assert_eq!(bracket_message_id("part1@host"), "<part1@host>");
        assert_eq!(bracket_message_id("<part1@host>"), "<part1@host>");
    }

    #[test]
    fn test_loggable_masks_password() {
        assert_eq!(loggable("AUTHINFO PASS hunter2"), "AUTHINFO PASS ****");
        assert_eq!(loggable("AUTHINFO USER joe"), "AUTHINFO USER joe");
    }
}
