//! Article handle with lazily fetched header, body and decoded payload.
//!
//! Each part is fetched on first use and cached on the handle:
//!
//! - headers: `HEAD <id>` expecting 221, a multi-line response
//! - body: `BODY <id>` expecting 222, read as a raw block
//! - decoded: the body run through [`DecodedArticle::decode`]
//!
//! Commands address the article by message id, so no group needs to be
//! selected.

use std::collections::HashMap;

use bytes::Bytes;
use tokio::io::{AsyncRead, AsyncWrite};

use crate::error::Result;
use crate::protocol::{body, codes, head};
use crate::session::Session;
use crate::yenc::DecodedArticle;

/// One article in a group.
#[derive(Debug, Clone)]
pub struct Article {
    number: u64,
    message_id: String,
    /// Header fields keyed by lowercase name.
    headers: Option<HashMap<String, String>>,
    body: Option<Bytes>,
    decoded: Option<DecodedArticle>,
}

impl Article {
    /// Create a handle; nothing is fetched yet.
    pub fn new(number: u64, message_id: impl Into<String>) -> Self {
        Self {
            number,
            message_id: message_id.into(),
            headers: None,
            body: None,
            decoded: None,
        }
    }

    /// Article number in its group.
    pub fn number(&self) -> u64 {
        self.number
    }

    /// Message id, with angle brackets.
    pub fn message_id(&self) -> &str {
        &self.message_id
    }

    /// Value of one header field. Names are case-insensitive.
    pub async fn header<S>(
        &mut self,
        session: &mut Session<S>,
        name: &str,
    ) -> Result<Option<&str>>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let headers = self.headers(session).await?;
        Ok(headers.get(&name.to_ascii_lowercase()).map(String::as_str))
    }

    /// All header fields, keyed by lowercase name.
    pub async fn headers<S>(
        &mut self,
        session: &mut Session<S>,
    ) -> Result<&HashMap<String, String>>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let headers = match self.headers.take() {
            Some(headers) => headers,
            None => {
                let connection = session.connection_mut();
                connection
                    .expect_command(&head(&self.message_id), codes::HEAD_FOLLOWS)
                    .await?;

                let mut lines = Vec::new();
                while let Some(line) = connection.read_multiline_entry().await? {
                    lines.push(line);
                }
                parse_headers(&lines)
            }
        };

        Ok(&*self.headers.insert(headers))
    }

    /// Raw body block, still yEnc encoded.
    pub async fn body<S>(&mut self, session: &mut Session<S>) -> Result<&Bytes>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let data = match self.body.take() {
            Some(data) => data,
            None => {
                session
                    .connection_mut()
                    .send_block_command(&body(&self.message_id), Some(codes::BODY_FOLLOWS))
                    .await?
            }
        };

        Ok(&*self.body.insert(data))
    }

    /// Decoded body.
    pub async fn decode<S>(&mut self, session: &mut Session<S>) -> Result<&DecodedArticle>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let decoded = match self.decoded.take() {
            Some(decoded) => decoded,
            None => {
                let data = self.body(session).await?.clone();
                DecodedArticle::decode(&data)?
            }
        };

        Ok(&*self.decoded.insert(decoded))
    }
}

/// Parse `Name: value` lines. Lines starting with whitespace continue the
/// previous field.
fn parse_headers(lines: &[Bytes]) -> HashMap<String, String> {
    let mut headers: HashMap<String, String> = HashMap::new();
    let mut last: Option<String> = None;

    for line in lines {
        let line = String::from_utf8_lossy(line);

        if line.starts_with(|c: char| c == ' ' || c == '\t') {
            if let Some(value) = last.as_ref().and_then(|key| headers.get_mut(key)) {
                value.push(' ');
                value.push_str(line.trim());
            }
            continue;
        }

        let Some((name, value)) = line.split_once(':') else {
            continue;
        };
        let key = name.trim().to_ascii_lowercase();
        headers.insert(key.clone(), value.trim().to_string());
        last = Some(key);
    }

    headers
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::Connection;
    use crate::error::NntpError;
    use tokio_test::io::{Builder, Mock};

    async fn session(mock: Mock) -> Session<Mock> {
        Session::handshake(Connection::new(mock)).await.unwrap()
    }

    #[test]
    fn test_parse_headers() {
        let lines = [
            Bytes::from_static(b"Subject: test [1/3]"),
            Bytes::from_static(b"From: poster@example.com"),
            Bytes::from_static(b"X-Long: first"),
            Bytes::from_static(b"\tsecond"),
            Bytes::from_static(b"garbage"),
        ];
        let headers = parse_headers(&lines);

        assert_eq!(headers["subject"], "test [1/3]");
        assert_eq!(headers["from"], "poster@example.com");
        assert_eq!(headers["x-long"], "first second");
        assert_eq!(headers.len(), 3);
    }

    #[tokio::test]
    async fn test_header_fetched_once() {
        let mock = Builder::new()
            .read(b"200 ready\r\n")
            .write(b"HEAD <a@b>\r\n")
            .read(b"221 0 <a@b>\r\nSubject: hello\r\nLines: 2\r\n.\r\n")
            .build();
        let mut session = session(mock).await;
        let mut article = Article::new(1, "<a@b>");

        let subject = article.header(&mut session, "Subject").await.unwrap();
        assert_eq!(subject, Some("hello"));

        // Cached: no second HEAD.
        let lines = article.header(&mut session, "lines").await.unwrap();
        assert_eq!(lines, Some("2"));
        let missing = article.header(&mut session, "Missing").await.unwrap();
        assert_eq!(missing, None);
    }

    #[tokio::test]
    async fn test_body_and_decode_cached() {
        let mock = Builder::new()
            .read(b"200 ready\r\n")
            .write(b"BODY <a@b>\r\n")
            .read(b"222 0 <a@b>\r\n=ybegin size=2 name=x.bin\r\n*+\r\n=yend size=2\r\n.\r\n")
            .build();
        let mut session = session(mock).await;
        let mut article = Article::new(1, "<a@b>");

        let decoded = article.decode(&mut session).await.unwrap();
        assert_eq!(decoded.filename(), "x.bin");
        assert_eq!(decoded.decoded_bytes(), &[0, 1]);

        let body = article.body(&mut session).await.unwrap();
        assert!(body.starts_with(b"=ybegin"));
        assert!(article.decode(&mut session).await.is_ok());
    }

    #[tokio::test]
    async fn test_missing_body() {
        let mock = Builder::new()
            .read(b"200 ready\r\n")
            .write(b"BODY <a@b>\r\n")
            .read(b"430 no such article\r\n")
            .build();
        let mut session = session(mock).await;
        let mut article = Article::new(1, "<a@b>");

        let result = article.body(&mut session).await;
        assert!(matches!(result, Err(NntpError::Server { code: 430, .. })));
        assert!(session.is_open());
    }
}
