//! `=ybegin` / `=ypart` header parsing.

use crate::error::{NntpError, Result};
use crate::protocol::find;

const YBEGIN: &[u8] = b"=ybegin ";
const YPART: &[u8] = b"=ypart ";
const NAME_KEY: &[u8] = b" name=";

/// Fields of the header lines, after the fake-multipart rule is applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Header {
    pub size: u64,
    pub name: String,
    /// 0 when not multipart.
    pub part: u64,
    /// 0 when unknown or not multipart.
    pub total: u64,
    pub begin: u64,
    pub end: u64,
    /// Offset of the CRLF that ends the last header line.
    pub data_start: usize,
}

impl Header {
    pub fn is_multipart(&self) -> bool {
        self.part != 0
    }

    pub fn part_size(&self) -> u64 {
        if self.is_multipart() {
            self.end - self.begin + 1
        } else {
            0
        }
    }
}

/// Parse the header lines of a raw article block.
pub(crate) fn parse(block: &[u8]) -> Result<Header> {
    let begin_at = find_line_start(block, YBEGIN)
        .ok_or_else(|| NntpError::decode("No =ybegin line found"))?;
    let begin_end = line_end(block, begin_at);
    // Keep the separating space so a leading `name=` is found too.
    let line = &block[begin_at + YBEGIN.len() - 1..begin_end];

    // The name runs to the end of the line. Parameters before it win;
    // numeric tokens after it are still honoured.
    let name_at = find(line, NAME_KEY).ok_or_else(|| NntpError::decode("Missing name"))?;
    let name = String::from_utf8_lossy(&line[name_at + NAME_KEY.len()..])
        .trim_end()
        .to_string();
    let (params, tail) = line.split_at(name_at);
    let lookup = |key: &str| -> Result<Option<u64>> {
        Ok(param(params, key)?.or_else(|| trailing_param(tail, key)))
    };

    let size = lookup("size")?
        .filter(|&size| size != 0)
        .ok_or_else(|| NntpError::decode("Missing or zero size"))?;
    let mut part = lookup("part")?.unwrap_or(0);
    let mut total = lookup("total")?.unwrap_or(0);

    let mut header = Header {
        size,
        name,
        part: 0,
        total: 0,
        begin: 0,
        end: 0,
        data_start: begin_end,
    };

    let next = (begin_end + 2).min(block.len());
    let has_ypart = block[next..].starts_with(YPART);

    if part == 0 {
        // Some posters emit =ypart for single-part files; skip it.
        if has_ypart {
            header.data_start = line_end(block, next);
        }
        return Ok(header);
    }

    if !has_ypart {
        return Err(NntpError::decode("Missing =ypart line"));
    }

    let part_end = line_end(block, next);
    let part_params = &block[next + YPART.len()..part_end];

    let begin = param(part_params, "begin")?
        .filter(|&v| v != 0)
        .ok_or_else(|| NntpError::decode("Missing part begin"))?;
    let end = param(part_params, "end")?
        .filter(|&v| v != 0)
        .ok_or_else(|| NntpError::decode("Missing part end"))?;
    if end < begin {
        return Err(NntpError::decode(format!(
            "Part end {} before begin {}",
            end, begin
        )));
    }
    if let Some(t) = param(part_params, "total")? {
        total = t;
    }

    let part_size = end - begin + 1;
    if part_size == size {
        // "Part 1 of 1" covering the whole file.
        part = 0;
        total = 0;
    } else if total == 0 {
        total = (size - 1) / part_size + 1;
    }

    if part != 0 {
        header.part = part;
        header.total = total;
        header.begin = begin;
        header.end = end;
    }
    header.data_start = part_end;
    Ok(header)
}

/// Position of `prefix` at the start of the block or right after a CRLF.
fn find_line_start(block: &[u8], prefix: &[u8]) -> Option<usize> {
    if block.starts_with(prefix) {
        return Some(0);
    }

    let mut from = 0;
    while let Some(pos) = find(&block[from..], b"\r\n") {
        let start = from + pos + 2;
        if block[start..].starts_with(prefix) {
            return Some(start);
        }
        from = start;
    }
    None
}

/// Offset of the CRLF ending the line that starts at `from`, or the block end.
fn line_end(block: &[u8], from: usize) -> usize {
    find(&block[from..], b"\r\n").map_or(block.len(), |pos| from + pos)
}

/// Values of the `key=value` tokens among space separated text.
fn values<'a>(text: &'a [u8], key: &'a str) -> impl Iterator<Item = &'a [u8]> {
    text.split(|&b| b == b' ').filter_map(move |token| {
        token
            .strip_prefix(key.as_bytes())
            .and_then(|rest| rest.strip_prefix(b"="))
    })
}

fn number(value: &[u8]) -> Option<u64> {
    std::str::from_utf8(value).ok()?.parse().ok()
}

/// Numeric `key=value` token among space separated parameters.
fn param(params: &[u8], key: &str) -> Result<Option<u64>> {
    let Some(value) = values(params, key).next() else {
        return Ok(None);
    };

    number(value).map(Some).ok_or_else(|| {
        NntpError::decode(format!(
            "Invalid {} value: {}",
            key,
            String::from_utf8_lossy(value)
        ))
    })
}

/// First numeric `key=value` token in the text after the name. Tokens that
/// are not numbers belong to the name.
fn trailing_param(tail: &[u8], key: &str) -> Option<u64> {
    values(tail, key).find_map(number)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_part_header() {
        let block = b"=ybegin line=128 size=5 name=test\r\nABCDE\r\n=yend size=5";
        let header = parse(block).unwrap();

        assert_eq!(header.size, 5);
        assert_eq!(header.name, "test");
        assert!(!header.is_multipart());
        assert_eq!(header.data_start, 33);
        assert_eq!(&block[header.data_start..header.data_start + 2], b"\r\n");
    }

    #[test]
    fn test_header_after_other_lines() {
        let block = b"some text\r\n=ybegin size=3 name=a b.bin\r\nxyz";
        let header = parse(block).unwrap();
        assert_eq!(header.name, "a b.bin");
        assert_eq!(header.size, 3);
    }

    #[test]
    fn test_ybegin_must_start_a_line() {
        let block = b"text =ybegin size=3 name=a\r\nxyz";
        assert!(matches!(parse(block), Err(NntpError::Decode(_))));
    }

    #[test]
    fn test_name_with_parameter_text() {
        let block = b"=ybegin size=3 name=size=9 part=2.bin\r\nxyz";
        let header = parse(block).unwrap();
        assert_eq!(header.size, 3);
        assert_eq!(header.name, "size=9 part=2.bin");
        assert!(!header.is_multipart());
    }

    #[test]
    fn test_name_runs_to_line_end() {
        let header = parse(b"=ybegin name=x\r\n=ybegin size=4 name=y\r\n");
        // The name swallows the rest of the line, leaving no size.
        assert!(matches!(header, Err(NntpError::Decode(_))));

        let block = b"=ybegin size=4 name=x size=9\r\n";
        assert_eq!(parse(block).unwrap().name, "x size=9");
    }

    #[test]
    fn test_size_after_name() {
        let header = parse(b"=ybegin name=t size=2\r\n*+\r\n").unwrap();
        assert_eq!(header.size, 2);
        assert_eq!(header.name, "t size=2");
    }

    #[test]
    fn test_part_after_name() {
        let block =
            b"=ybegin size=1500 name=big.bin part=1 total=3\r\n=ypart begin=1 end=500\r\n";
        let header = parse(block).unwrap();

        assert!(header.is_multipart());
        assert_eq!(header.part, 1);
        assert_eq!(header.total, 3);
        assert_eq!((header.begin, header.end), (1, 500));
        assert_eq!(header.data_start, block.len() - 2);
    }

    #[test]
    fn test_parameter_before_name_wins() {
        let block = b"=ybegin part=2 size=1500 name=f part=9\r\n=ypart begin=501 end=1000\r\n";
        let header = parse(block).unwrap();
        assert_eq!(header.part, 2);
    }

    #[test]
    fn test_missing_fields() {
        for block in [
            &b"=ybegin name=x\r\n"[..],
            b"=ybegin size=0 name=x\r\n",
            b"=ybegin size=10\r\n",
            b"=ybegin size=ten name=x\r\n",
        ] {
            assert!(matches!(parse(block), Err(NntpError::Decode(_))));
        }
    }

    #[test]
    fn test_multipart_header() {
        let block = b"=ybegin part=2 total=3 size=1500 name=f\r\n=ypart begin=501 end=1000\r\n";
        let header = parse(block).unwrap();

        assert!(header.is_multipart());
        assert_eq!(header.part, 2);
        assert_eq!(header.total, 3);
        assert_eq!(header.begin, 501);
        assert_eq!(header.end, 1000);
        assert_eq!(header.part_size(), 500);
        assert_eq!(header.data_start, block.len() - 2);
    }

    #[test]
    fn test_total_derived_from_part_size() {
        let block = b"=ybegin part=1 size=1500 name=f\r\n=ypart begin=1 end=500\r\n";
        assert_eq!(parse(block).unwrap().total, 3);

        let block = b"=ybegin part=1 size=1501 name=f\r\n=ypart begin=1 end=500\r\n";
        assert_eq!(parse(block).unwrap().total, 4);
    }

    #[test]
    fn test_total_on_ypart_line() {
        let block = b"=ybegin part=1 size=1500 name=f\r\n=ypart begin=1 end=500 total=7\r\n";
        assert_eq!(parse(block).unwrap().total, 7);
    }

    #[test]
    fn test_fake_multipart_collapses() {
        let block = b"=ybegin part=1 total=1 size=5 name=test\r\n=ypart begin=1 end=5\r\n";
        let header = parse(block).unwrap();

        assert!(!header.is_multipart());
        assert_eq!(header.total, 0);
        assert_eq!(header.begin, 0);
        assert_eq!(header.end, 0);
        assert_eq!(header.part_size(), 0);
        assert_eq!(header.data_start, block.len() - 2);
    }

    #[test]
    fn test_multipart_requires_ypart() {
        let block = b"=ybegin part=1 size=1500 name=f\r\nabc";
        assert!(matches!(parse(block), Err(NntpError::Decode(_))));

        let block = b"=ybegin part=1 size=1500 name=f\r\n=ypart end=500\r\n";
        assert!(matches!(parse(block), Err(NntpError::Decode(_))));

        let block = b"=ybegin part=1 size=1500 name=f\r\n=ypart begin=500 end=1\r\n";
        assert!(matches!(parse(block), Err(NntpError::Decode(_))));
    }

    #[test]
    fn test_stray_ypart_skipped_for_single_part() {
        let block = b"=ybegin size=5 name=x\r\n=ypart begin=1 end=5\r\nABCDE";
        let header = parse(block).unwrap();
        assert!(!header.is_multipart());
        assert_eq!(&block[header.data_start..header.data_start + 7], b"\r\nABCDE");
    }
}
