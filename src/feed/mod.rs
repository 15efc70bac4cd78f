//! Feed inspection: from an RSS URL to the newest episode's descriptor.
//!
//! - [`parser`] - streaming quick-xml extraction of the first `channel/item`
//! - [`date`] - `pubDate` to calendar date via the fixed month table
//! - [`inspector`] - [`FeedInspector`], which fetches a feed and combines the two
//!
//! # Example
//!
//! ```ignore
//! use podget::feed::{ContentSource, FeedEndpoint, FeedInspector};
//!
//! let inspector = FeedInspector::new(client, ContentSource::Guid, timeout);
//! let episode = inspector.inspect(&FeedEndpoint { url, nickname }).await?;
//! ```

mod date;
mod inspector;
mod parser;

pub use date::{month_number, parse_pub_date, DateParseError};
pub use inspector::{describe, ContentSource, FeedInspector, InspectError};
pub use parser::{parse_first_item, FeedParseError, RawItem};

/// One configured podcast source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedEndpoint {
    /// URL of the RSS document
    pub url: String,
    /// Short name, used as the output subdirectory
    pub nickname: String,
}
