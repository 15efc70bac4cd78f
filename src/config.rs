//! Configuration file parser for ~/.config/podget/config.toml.
//!
//! The config file is optional — a missing file yields `Config::default()`.
//! Unknown keys are silently ignored by serde (with `deny_unknown_fields` off),
//! though we log a warning when the file contains potential typos.
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::episode::OverwritePolicy;
use crate::feed::ContentSource;

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid TOML in config file: {0}")]
    Parse(#[from] toml::de::Error),

    /// SEC-014: Config file exceeds maximum allowed size.
    #[error("Config file too large: {0}")]
    TooLarge(String),

    #[error("HOME environment variable not set, cannot expand '{0}'")]
    HomeNotSet(String),
}

// ============================================================================
// Configuration Structs
// ============================================================================

/// Top-level application configuration.
///
/// All fields use `#[serde(default)]` so any subset of keys can be specified.
/// Missing keys fall back to `Default::default()`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Base directory for per-feed subdirectories. A leading `~` is expanded.
    pub output_root: String,

    /// What to do when today's episode file already exists.
    pub overwrite: OverwritePolicy,

    /// Which item element names the media URL.
    pub content_source: ContentSource,

    /// Maximum number of feeds processed at once.
    pub concurrency: usize,

    /// Bound on each HTTP wait (feed fetch, media response head, media chunk).
    pub request_timeout_secs: u64,

    /// User-Agent header sent with every request.
    pub user_agent: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            output_root: "~/Podcasts".to_string(),
            overwrite: OverwritePolicy::default(),
            content_source: ContentSource::default(),
            concurrency: 4,
            request_timeout_secs: 30,
            user_agent: concat!("podget/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl Config {
    /// SEC-014: Maximum config file size (1 MB).
    const MAX_FILE_SIZE: u64 = 1_048_576;

    /// Hard ceiling on `concurrency`, whatever the file says.
    pub const MAX_CONCURRENCY: usize = 16;

    /// Load configuration from a TOML file.
    ///
    /// - Missing file → `Ok(Config::default())`
    /// - Empty file → `Ok(Config::default())`
    /// - Invalid TOML → `Err(ConfigError::Parse)` with line number info
    /// - Unknown keys → silently accepted (serde default behavior), logged as warning
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        // SEC-014: Check file size before reading to prevent memory exhaustion
        // from a maliciously large or corrupted config file.
        match std::fs::metadata(path) {
            Ok(meta) if meta.len() > Self::MAX_FILE_SIZE => {
                return Err(ConfigError::TooLarge(format!(
                    "Config file is {} bytes (max {} bytes)",
                    meta.len(),
                    Self::MAX_FILE_SIZE
                )));
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "No config file found, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
            Ok(_) => {} // Size is within limits, proceed
        }

        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                // Race condition: file deleted between metadata and read
                tracing::debug!(path = %path.display(), "Config file disappeared, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
        };

        if content.trim().is_empty() {
            tracing::debug!(path = %path.display(), "Config file is empty, using defaults");
            return Ok(Self::default());
        }

        // Parse the TOML content first as a raw table to detect unknown keys
        if let Ok(raw) = content.parse::<toml::Table>() {
            let known_keys = [
                "output_root",
                "overwrite",
                "content_source",
                "concurrency",
                "request_timeout_secs",
                "user_agent",
            ];
            for key in raw.keys() {
                if !known_keys.contains(&key.as_str()) {
                    tracing::warn!(key = %key, "Unknown key in config file, ignoring");
                }
            }
        }

        let config: Config = toml::from_str(&content)?;
        tracing::info!(
            path = %path.display(),
            output_root = %config.output_root,
            "Loaded configuration"
        );
        Ok(config)
    }

    /// Worker count actually used, clamped to `1..=MAX_CONCURRENCY`.
    pub fn effective_concurrency(&self) -> usize {
        self.concurrency.clamp(1, Self::MAX_CONCURRENCY)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }

    /// Resolves `output_root` to a path, expanding a leading `~` from `$HOME`.
    pub fn resolve_output_root(&self) -> Result<PathBuf, ConfigError> {
        let home = std::env::var("HOME").ok();
        expand_home(&self.output_root, home.as_deref())
    }
}

/// Expands `~` and `~/...` against `home`. Other paths are returned unchanged.
pub fn expand_home(path: &str, home: Option<&str>) -> Result<PathBuf, ConfigError> {
    let rest = match path.strip_prefix('~') {
        Some(rest) if rest.is_empty() || rest.starts_with('/') => rest,
        _ => return Ok(PathBuf::from(path)),
    };
    let home = home
        .filter(|h| !h.is_empty())
        .ok_or_else(|| ConfigError::HomeNotSet(path.to_string()))?;
    let rest = rest.trim_start_matches('/');
    if rest.is_empty() {
        Ok(PathBuf::from(home))
    } else {
        Ok(PathBuf::from(home).join(rest))
    }
}

// ============================================================================
// Tests
// ============================================================================
