//! Newsgroup descriptor.

use tokio::io::{AsyncRead, AsyncWrite};
use tracing::debug;

use crate::article::Article;
use crate::error::{NntpError, Result};
use crate::protocol::{bracket_message_id, codes, stat_id, stat_number};
use crate::session::Session;

/// A newsgroup and its watermarks, as reported when it was selected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Group {
    name: String,
    low: u64,
    high: u64,
    count: u64,
}

impl Group {
    /// Create a group descriptor.
    pub fn new(name: impl Into<String>, low: u64, high: u64, count: u64) -> Self {
        Self {
            name: name.into(),
            low,
            high,
            count,
        }
    }

    /// Parse the text of a 211 reply: `count low high [name]`.
    pub fn from_reply(name: &str, text: &str) -> Result<Self> {
        let mut tokens = text.split_whitespace();
        let mut next = |field: &str| -> Result<u64> {
            let token = tokens.next().ok_or_else(|| {
                NntpError::Protocol(format!("Group reply missing {}: {:?}", field, text))
            })?;
            token.parse().map_err(|_| {
                NntpError::Protocol(format!("Invalid group {}: {:?}", field, token))
            })
        };

        let count = next("count")?;
        let low = next("low watermark")?;
        let high = next("high watermark")?;

        Ok(Self::new(name, low, high, count))
    }

    /// Group name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Lowest article number.
    pub fn low(&self) -> u64 {
        self.low
    }

    /// Highest article number.
    pub fn high(&self) -> u64 {
        self.high
    }

    /// Estimated number of articles.
    pub fn count(&self) -> u64 {
        self.count
    }

    /// Check whether `number` lies within the watermarks.
    pub fn contains(&self, number: u64) -> bool {
        (self.low..=self.high).contains(&number)
    }

    /// Look up an article by number with `STAT`.
    ///
    /// Numbers outside the watermarks return `None` without asking the
    /// server. Selects this group first if another one is current.
    pub async fn fetch_article<S>(
        &self,
        session: &mut Session<S>,
        number: u64,
    ) -> Result<Option<Article>>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        if !self.contains(number) {
            return Ok(None);
        }

        session.activate_group(self).await?;
        let status = session
            .connection_mut()
            .send_command(&stat_number(number))
            .await?;
        if status.code != codes::ARTICLE_EXISTS {
            debug!(group = %self.name, number, code = status.code, "no such article");
            return Ok(None);
        }

        let message_id = status
            .text
            .find('<')
            .and_then(|start| status.text[start..].split_whitespace().next())
            .ok_or_else(|| {
                NntpError::Protocol(format!("STAT reply without message id: {:?}", status.text))
            })?;

        Ok(Some(Article::new(number, message_id)))
    }

    /// Look up an article by message id with `STAT`.
    ///
    /// Angle brackets are added when missing.
    pub async fn fetch_article_by_id<S>(
        &self,
        session: &mut Session<S>,
        message_id: &str,
    ) -> Result<Option<Article>>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let message_id = bracket_message_id(message_id);

        session.activate_group(self).await?;
        let status = session
            .connection_mut()
            .send_command(&stat_id(&message_id))
            .await?;
        if status.code != codes::ARTICLE_EXISTS {
            debug!(group = %self.name, %message_id, code = status.code, "no such article");
            return Ok(None);
        }

        let number = status
            .text
            .split_whitespace()
            .next()
            .and_then(|token| token.parse().ok())
            .ok_or_else(|| {
                NntpError::Protocol(format!("STAT reply without number: {:?}", status.text))
            })?;

        Ok(Some(Article::new(number, message_id)))
    }
}
