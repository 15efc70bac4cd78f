//! Episode download: from an [`EpisodeDescriptor`] to a file on disk.
//!
//! Files land at `OUTPUT_ROOT/<nickname>/<YYYY-MM-DD>[.<ext>]`. The extension
//! comes from the media URL's path, and the write goes through a temp file so
//! a failed download never leaves a truncated episode behind.

mod fetcher;
mod target;

pub use fetcher::{DownloadError, DownloadOutcome, EpisodeFetcher};
pub use target::{DownloadTarget, OverwritePolicy};

use chrono::NaiveDate;

/// The newest episode of one feed, as found by the feed inspector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EpisodeDescriptor {
    /// Nickname of the feed this episode came from
    pub nickname: String,
    /// Calendar date from the item's `pubDate`
    pub publication_date: NaiveDate,
    /// Direct media URL
    pub content_url: String,
}

impl EpisodeDescriptor {
    /// Publication date as `YYYY-MM-DD`.
    pub fn iso_date(&self) -> String {
        self.publication_date.format("%Y-%m-%d").to_string()
    }
}
