//! Runs the inspect-then-download pipeline over every configured feed.
//!
//! Feeds are independent: each gets its own `Result`, and one feed failing
//! never stops the others. Within a feed the two requests are sequential,
//! since the media URL comes out of the feed.

use futures::stream::{self, StreamExt};
use std::path::PathBuf;
use thiserror::Error;

use crate::config::Config;
use crate::episode::{DownloadError, DownloadOutcome, DownloadTarget, EpisodeFetcher};
use crate::feed::{FeedEndpoint, FeedInspector, InspectError};
use crate::http;

/// Why one feed's run failed.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Inspect(#[from] InspectError),
    #[error(transparent)]
    Download(#[from] DownloadError),
}

impl PipelineError {
    /// Short name of the failure class, for reports and log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Inspect(InspectError::Fetch(_)) | Self::Download(DownloadError::Fetch(_)) => {
                "FetchError"
            }
            Self::Inspect(InspectError::Parse(_)) => "ParseError",
            Self::Inspect(InspectError::MissingField(_)) => "MissingFieldError",
            Self::Inspect(InspectError::DateParse(_)) => "DateParseError",
            Self::Download(DownloadError::Directory { .. }) => "DirectoryError",
            Self::Download(DownloadError::Write { .. }) => "WriteError",
        }
    }
}

/// Whether to actually download, or only report what would be written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunMode {
    #[default]
    Download,
    DryRun,
}

/// Successful result for one feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedOutcome {
    Downloaded(DownloadOutcome),
    /// Dry run: the episode that would be fetched and where it would go
    Planned {
        target: DownloadTarget,
        content_url: String,
    },
}

/// Outcome of running the pipeline for one feed.
#[derive(Debug)]
pub struct FeedReport {
    pub nickname: String,
    pub url: String,
    pub result: Result<FeedOutcome, PipelineError>,
}

/// Counts over a finished batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub written: usize,
    pub skipped: usize,
    pub planned: usize,
    pub failed: usize,
}

impl BatchSummary {
    pub fn from_reports(reports: &[FeedReport]) -> Self {
        let mut summary = Self::default();
        for report in reports {
            match &report.result {
                Ok(FeedOutcome::Downloaded(DownloadOutcome::Written { .. })) => summary.written += 1,
                Ok(FeedOutcome::Downloaded(DownloadOutcome::Skipped { .. })) => summary.skipped += 1,
                Ok(FeedOutcome::Planned { .. }) => summary.planned += 1,
                Err(_) => summary.failed += 1,
            }
        }
        summary
    }
}

/// The two pipeline stages, configured once and shared by every feed.
#[derive(Debug, Clone)]
pub struct Pipeline {
    inspector: FeedInspector,
    fetcher: EpisodeFetcher,
}

impl Pipeline {
    pub fn new(inspector: FeedInspector, fetcher: EpisodeFetcher) -> Self {
        Self { inspector, fetcher }
    }

    /// Builds both stages from `config`, sharing one HTTP client.
    ///
    /// `output_root` is the already-resolved form of `config.output_root`.
    pub fn from_config(config: &Config, output_root: PathBuf) -> Result<Self, reqwest::Error> {
        let client = http::build_client(&config.user_agent)?;
        let timeout = config.request_timeout();
        Ok(Self::new(
            FeedInspector::new(client.clone(), config.content_source, timeout),
            EpisodeFetcher::new(client, output_root, config.overwrite, timeout),
        ))
    }

    /// Runs one feed through inspection and download.
    pub async fn run_one(&self, endpoint: &FeedEndpoint, mode: RunMode) -> FeedReport {
        let result = self.process(endpoint, mode).await;

        if let Err(e) = &result {
            tracing::warn!(
                nickname = %endpoint.nickname,
                feed = %endpoint.url,
                kind = e.kind(),
                error = %e,
                "Feed failed"
            );
        }

        FeedReport {
            nickname: endpoint.nickname.clone(),
            url: endpoint.url.clone(),
            result,
        }
    }

    async fn process(
        &self,
        endpoint: &FeedEndpoint,
        mode: RunMode,
    ) -> Result<FeedOutcome, PipelineError> {
        let descriptor = self.inspector.inspect(endpoint).await?;

        match mode {
            RunMode::Download => Ok(FeedOutcome::Downloaded(
                self.fetcher.fetch(&descriptor).await?,
            )),
            RunMode::DryRun => Ok(FeedOutcome::Planned {
                target: self.fetcher.target(&descriptor)?,
                content_url: descriptor.content_url,
            }),
        }
    }

    /// Runs every feed with at most `concurrency` in flight.
    ///
    /// Reports come back in the same order as `endpoints`.
    pub async fn run_all(
        &self,
        endpoints: Vec<FeedEndpoint>,
        concurrency: usize,
        mode: RunMode,
    ) -> Vec<FeedReport> {
        if endpoints.is_empty() {
            return Vec::new();
        }

        let total = endpoints.len();
        tracing::info!(feeds = total, concurrency = concurrency, "Processing feeds");

        let reports: Vec<FeedReport> = stream::iter(endpoints)
            .map(|endpoint| async move { self.run_one(&endpoint, mode).await })
            .buffered(concurrency.max(1))
            .collect()
            .await;

        let summary = BatchSummary::from_reports(&reports);
        tracing::info!(
            total = total,
            written = summary.written,
            skipped = summary.skipped,
            planned = summary.planned,
            failed = summary.failed,
            "Finished processing feeds"
        );

        reports
    }
}
