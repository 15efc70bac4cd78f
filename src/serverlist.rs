//! Serverlist parser for ~/.config/podget/serverlist.
//!
//! One `<url> <nickname>` pair per line. Lines starting with `#` are
//! comments, and lines that do not split into exactly two fields are
//! skipped without complaint.
use std::collections::HashSet;
use std::path::Path;
use thiserror::Error;

use crate::feed::FeedEndpoint;
use crate::util::{is_single_component, validate_url};

#[derive(Debug, Error)]
pub enum ServerListError {
    #[error("Failed to read serverlist '{path}': {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
}

/// Reads and parses the serverlist at `path`.
pub fn load(path: &Path) -> Result<Vec<FeedEndpoint>, ServerListError> {
    let content = std::fs::read_to_string(path).map_err(|source| ServerListError::Io {
        path: path.display().to_string(),
        source,
    })?;
    let endpoints = parse(&content);
    tracing::info!(path = %path.display(), feeds = endpoints.len(), "Loaded serverlist");
    Ok(endpoints)
}

/// Parses serverlist content into feed endpoints, in file order.
///
/// Besides comments and wrong field counts, this also drops entries the
/// pipeline could never process: non-HTTP(S) URLs, nicknames that are not a
/// single path component, and repeated nicknames (two feeds cannot share
/// one output directory). Those are logged as warnings.
pub fn parse(content: &str) -> Vec<FeedEndpoint> {
    let mut endpoints = Vec::new();
    let mut nicknames = HashSet::new();

    for (idx, line) in content.lines().enumerate() {
        let line_no = idx + 1;
        if line.trim_start().starts_with('#') {
            continue;
        }

        let fields: Vec<&str> = line.split_whitespace().collect();
        let [url, nickname] = fields.as_slice() else {
            if !fields.is_empty() {
                tracing::debug!(line = line_no, fields = fields.len(), "Skipping serverlist line");
            }
            continue;
        };

        if let Err(e) = validate_url(url) {
            tracing::warn!(line = line_no, url = %url, error = %e, "Skipping invalid feed URL");
            continue;
        }
        if !is_single_component(nickname) {
            tracing::warn!(line = line_no, nickname = %nickname, "Skipping unusable nickname");
            continue;
        }
        if !nicknames.insert(nickname.to_string()) {
            tracing::warn!(line = line_no, nickname = %nickname, "Skipping duplicate nickname");
            continue;
        }

        endpoints.push(FeedEndpoint {
            url: url.to_string(),
            nickname: nickname.to_string(),
        });
    }

    endpoints
}
