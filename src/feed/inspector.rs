use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;

use crate::episode::EpisodeDescriptor;
use crate::feed::date::{parse_pub_date, DateParseError};
use crate::feed::parser::{parse_first_item, FeedParseError};
use crate::feed::FeedEndpoint;
use crate::http::{self, FetchError};

const MAX_FEED_SIZE: usize = 10 * 1024 * 1024; // 10MB

/// Errors that can occur while turning a feed URL into an episode descriptor.
#[derive(Debug, Error)]
pub enum InspectError {
    /// Feed could not be downloaded
    #[error(transparent)]
    Fetch(#[from] FetchError),
    /// Feed is not well-formed XML or has no `channel/item`
    #[error("Parse error: {0}")]
    Parse(#[from] FeedParseError),
    /// The newest item lacks a required element
    #[error("Missing field: <{0}> is absent or empty")]
    MissingField(&'static str),
    /// `pubDate` could not be turned into a calendar date
    #[error("Date parse error: {0}")]
    DateParse(#[from] DateParseError),
}

/// Which element of the newest item names the media to download.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ContentSource {
    /// Use the `<guid>` text as a direct media link.
    #[default]
    Guid,
    /// Prefer `<enclosure url=...>`, falling back to `<guid>`.
    Enclosure,
}

/// Fetches a feed and describes its newest episode.
#[derive(Debug, Clone)]
pub struct FeedInspector {
    client: reqwest::Client,
    source: ContentSource,
    timeout: Duration,
}

impl FeedInspector {
    pub fn new(client: reqwest::Client, source: ContentSource, timeout: Duration) -> Self {
        Self {
            client,
            source,
            timeout,
        }
    }

    /// Downloads the feed at `endpoint.url` and extracts its newest episode.
    ///
    /// The first `<item>` is taken as the newest; feeds are not re-sorted.
    ///
    /// # Errors
    ///
    /// - [`InspectError::Fetch`] - network failure, timeout or non-2xx status
    /// - [`InspectError::Parse`] - malformed XML, or no `channel/item`
    /// - [`InspectError::MissingField`] - no usable content URL or `pubDate`
    /// - [`InspectError::DateParse`] - `pubDate` not in RFC 822 form
    pub async fn inspect(&self, endpoint: &FeedEndpoint) -> Result<EpisodeDescriptor, InspectError> {
        // The timeout covers both the response head and the body
        let bytes = tokio::time::timeout(self.timeout, async {
            let response = http::get_checked(&self.client, &endpoint.url, self.timeout).await?;
            http::read_limited_bytes(response, MAX_FEED_SIZE).await
        })
        .await
        .map_err(|_| FetchError::Timeout)??;

        tracing::debug!(feed = %endpoint.url, bytes = bytes.len(), "Fetched feed");

        let descriptor = describe(&endpoint.nickname, &bytes, self.source)?;

        tracing::info!(
            nickname = %descriptor.nickname,
            date = %descriptor.publication_date,
            url = %descriptor.content_url,
            "Found latest episode"
        );
        Ok(descriptor)
    }
}

/// Parses a feed body into an [`EpisodeDescriptor`] without any I/O.
pub fn describe(
    nickname: &str,
    bytes: &[u8],
    source: ContentSource,
) -> Result<EpisodeDescriptor, InspectError> {
    let item = parse_first_item(bytes)?;

    let content_url = match source {
        ContentSource::Guid => item.guid,
        ContentSource::Enclosure => item.enclosure_url.or(item.guid),
    }
    .ok_or(InspectError::MissingField("guid"))?;

    let pub_date = item.pub_date.ok_or(InspectError::MissingField("pubDate"))?;
    let publication_date = parse_pub_date(&pub_date)?;

    Ok(EpisodeDescriptor {
        nickname: nickname.to_string(),
        publication_date,
        content_url,
    })
}
