//! The yEnc byte transform.
//!
//! ```text
//! plain byte    b  ->  (b + 214) mod 256
//! escaped  '=' b   ->  (b + 150) mod 256
//! ```
//!
//! Line breaks are dropped, a dot doubled at the start of a line loses one
//! dot, and a line starting with `=yend` ends the payload.

use crate::error::{NntpError, Result};

const ESCAPE: u8 = b'=';
const YEND: &[u8] = b"=yend";

/// Decode `data` into exactly `expected` bytes.
///
/// `data` normally starts at the CRLF that ends the header, so the first
/// payload line is seen as a line start.
pub(crate) fn decode(data: &[u8], expected: usize) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(expected.min(data.len()));
    let mut line_start = true;
    let mut i = 0;

    while i < data.len() {
        let byte = data[i];

        if byte == b'\r' || byte == b'\n' {
            line_start = true;
            i += 1;
            continue;
        }

        if line_start {
            line_start = false;
            if is_trailer(&data[i..]) {
                break;
            }
            if byte == b'.' {
                i += 1;
                continue;
            }
        }

        let value = if byte == ESCAPE {
            let next = *data
                .get(i + 1)
                .ok_or_else(|| NntpError::decode("Truncated escape sequence"))?;
            i += 2;
            next.wrapping_add(150)
        } else {
            i += 1;
            byte.wrapping_add(214)
        };

        if out.len() == expected {
            return Err(NntpError::decode(format!(
                "Too many characters: more than {} expected",
                expected
            )));
        }
        out.push(value);
    }

    if out.len() < expected {
        return Err(NntpError::decode(format!(
            "Not enough characters: got {} of {}",
            out.len(),
            expected
        )));
    }

    Ok(out)
}

fn is_trailer(line: &[u8]) -> bool {
    line.starts_with(YEND) && matches!(line.get(YEND.len()), None | Some(b' ' | b'\r'))
}
