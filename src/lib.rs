//! Fetch the latest episode of each configured podcast feed.
//!
//! For every `(url, nickname)` pair the [`feed::FeedInspector`] reads the
//! feed's first item, then the [`episode::EpisodeFetcher`] saves its media
//! as `OUTPUT_ROOT/<nickname>/<YYYY-MM-DD>.<ext>`. [`batch::Pipeline`] runs
//! the pair over many feeds with bounded concurrency.

pub mod batch;
pub mod config;
pub mod episode;
pub mod feed;
pub mod http;
pub mod serverlist;
pub mod util;
