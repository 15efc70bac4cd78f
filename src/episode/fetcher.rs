use futures::StreamExt;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tokio::io::AsyncWriteExt;

use crate::episode::{DownloadTarget, EpisodeDescriptor, OverwritePolicy};
use crate::http::{self, FetchError};

/// Upper bound on `<date>-<n>` alternatives tried by [`OverwritePolicy::VersionSuffix`].
const MAX_VERSION_SUFFIX: u32 = 999;

/// Errors that can occur while downloading an episode to disk.
#[derive(Debug, Error)]
pub enum DownloadError {
    /// Media could not be downloaded
    #[error(transparent)]
    Fetch(#[from] FetchError),
    /// Output directory could not be created or is unusable
    #[error("Directory error at '{}': {source}", .path.display())]
    Directory { path: PathBuf, source: io::Error },
    /// Episode content could not be written
    #[error("Write error at '{}': {source}", .path.display())]
    Write { path: PathBuf, source: io::Error },
}

/// What [`EpisodeFetcher::fetch`] did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadOutcome {
    /// Episode written to `path`
    Written { path: PathBuf, bytes: u64 },
    /// File already present and the policy said to keep it
    Skipped { path: PathBuf },
}

impl DownloadOutcome {
    pub fn path(&self) -> &Path {
        match self {
            Self::Written { path, .. } | Self::Skipped { path } => path,
        }
    }
}

/// Streams episode media into `OUTPUT_ROOT/<nickname>/`.
#[derive(Debug, Clone)]
pub struct EpisodeFetcher {
    client: reqwest::Client,
    output_root: PathBuf,
    policy: OverwritePolicy,
    timeout: Duration,
}

impl EpisodeFetcher {
    /// `output_root` must already be absolute and expanded; it is used as-is.
    pub fn new(
        client: reqwest::Client,
        output_root: PathBuf,
        policy: OverwritePolicy,
        timeout: Duration,
    ) -> Self {
        Self {
            client,
            output_root,
            policy,
            timeout,
        }
    }

    /// Computes where `descriptor` would be written, without touching disk.
    pub fn target(&self, descriptor: &EpisodeDescriptor) -> Result<DownloadTarget, DownloadError> {
        DownloadTarget::for_episode(&self.output_root, descriptor).ok_or_else(|| {
            DownloadError::Directory {
                path: self.output_root.join(&descriptor.nickname),
                source: io::Error::new(
                    io::ErrorKind::InvalidInput,
                    format!(
                        "nickname {:?} must be a single path component",
                        descriptor.nickname
                    ),
                ),
            }
        })
    }

    /// Downloads the episode's media to its target path.
    ///
    /// The per-feed directory is created (one level only) before any request
    /// is made. The body is streamed into a hidden temp file beside the
    /// target, synced, then renamed into place; on any failure the temp file
    /// is removed and nothing appears at the target path.
    ///
    /// # Errors
    ///
    /// - [`DownloadError::Directory`] - bad nickname, or the directory cannot be created
    /// - [`DownloadError::Fetch`] - network failure, timeout, non-2xx status, short body
    /// - [`DownloadError::Write`] - temp file creation, write, sync or rename failed
    pub async fn fetch(&self, descriptor: &EpisodeDescriptor) -> Result<DownloadOutcome, DownloadError> {
        let target = self.target(descriptor)?;
        ensure_directory(&target.directory).await?;

        let path = match self.policy {
            OverwritePolicy::Overwrite => target.full_path.clone(),
            OverwritePolicy::SkipIfExists => {
                if path_exists(&target.full_path).await? {
                    tracing::info!(
                        nickname = %descriptor.nickname,
                        path = %target.full_path.display(),
                        "Episode already downloaded, skipping"
                    );
                    return Ok(DownloadOutcome::Skipped {
                        path: target.full_path,
                    });
                }
                target.full_path.clone()
            }
            OverwritePolicy::VersionSuffix => next_free_path(&target).await?,
        };

        tracing::info!(url = %descriptor.content_url, path = %path.display(), "Downloading episode");

        let response = http::get_checked(&self.client, &descriptor.content_url, self.timeout).await?;
        let bytes = write_atomically(response, &path, self.timeout).await?;

        tracing::info!(path = %path.display(), bytes = bytes, "Saved episode");
        Ok(DownloadOutcome::Written { path, bytes })
    }
}

/// Creates `dir` (single level) unless a directory is already there.
async fn ensure_directory(dir: &Path) -> Result<(), DownloadError> {
    let directory_error = |source| DownloadError::Directory {
        path: dir.to_path_buf(),
        source,
    };

    match tokio::fs::create_dir(dir).await {
        Ok(()) => {
            tracing::debug!(path = %dir.display(), "Created feed directory");
            Ok(())
        }
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
            let metadata = tokio::fs::metadata(dir).await.map_err(directory_error)?;
            if metadata.is_dir() {
                Ok(())
            } else {
                Err(directory_error(io::Error::new(
                    io::ErrorKind::AlreadyExists,
                    "path exists and is not a directory",
                )))
            }
        }
        Err(e) => Err(directory_error(e)),
    }
}

async fn path_exists(path: &Path) -> Result<bool, DownloadError> {
    tokio::fs::try_exists(path)
        .await
        .map_err(|source| DownloadError::Write {
            path: path.to_path_buf(),
            source,
        })
}

async fn next_free_path(target: &DownloadTarget) -> Result<PathBuf, DownloadError> {
    if !path_exists(&target.full_path).await? {
        return Ok(target.full_path.clone());
    }
    for n in 1..=MAX_VERSION_SUFFIX {
        let candidate = target.versioned(n);
        if !path_exists(&candidate).await? {
            return Ok(candidate);
        }
    }
    Err(DownloadError::Write {
        path: target.full_path.clone(),
        source: io::Error::new(
            io::ErrorKind::AlreadyExists,
            format!("all {} versioned names are taken", MAX_VERSION_SUFFIX),
        ),
    })
}

/// Hidden sibling of `path` to stream into before the final rename.
fn temp_path_for(path: &Path) -> PathBuf {
    // SEC-009: Randomized suffix so a pre-planted path cannot be predicted
    use std::time::{SystemTime, UNIX_EPOCH};
    let random_suffix = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or(0);
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!(".{}.{:016x}.part", name, random_suffix))
}

/// Streams the response body into `path` via a temp file and rename.
///
/// Returns the number of bytes written.
async fn write_atomically(
    response: reqwest::Response,
    path: &Path,
    chunk_timeout: Duration,
) -> Result<u64, DownloadError> {
    let temp_path = temp_path_for(path);
    let write_error = |source| DownloadError::Write {
        path: temp_path.clone(),
        source,
    };

    let mut file = tokio::fs::OpenOptions::new()
        .write(true)
        .create_new(true) // Fails atomically if file exists (prevents symlink race)
        .open(&temp_path)
        .await
        .map_err(write_error)?;

    let copied = async {
        let written = copy_body(response, &mut file, &temp_path, chunk_timeout).await?;
        file.flush().await.map_err(write_error)?;
        // Sync to disk to ensure data is persisted before rename
        file.sync_all().await.map_err(write_error)?;
        Ok::<_, DownloadError>(written)
    }
    .await;

    // Drop the file handle before rename or cleanup
    drop(file);

    let written = match copied {
        Ok(written) => written,
        Err(e) => {
            let _ = tokio::fs::remove_file(&temp_path).await;
            return Err(e);
        }
    };

    // On Windows, rename fails if destination exists, so remove it first
    #[cfg(windows)]
    if tokio::fs::try_exists(path).await.unwrap_or(false) {
        if let Err(source) = tokio::fs::remove_file(path).await {
            let _ = tokio::fs::remove_file(&temp_path).await;
            return Err(DownloadError::Write {
                path: path.to_path_buf(),
                source,
            });
        }
    }

    if let Err(source) = tokio::fs::rename(&temp_path, path).await {
        let _ = tokio::fs::remove_file(&temp_path).await;
        return Err(DownloadError::Write {
            path: path.to_path_buf(),
            source,
        });
    }

    Ok(written)
}

async fn copy_body(
    response: reqwest::Response,
    file: &mut tokio::fs::File,
    temp_path: &Path,
    chunk_timeout: Duration,
) -> Result<u64, DownloadError> {
    let expected_length = response.content_length();
    let mut stream = response.bytes_stream();
    let mut written: u64 = 0;

    // Each chunk gets its own timeout: a stalled server fails, a long download does not
    while let Some(chunk) = tokio::time::timeout(chunk_timeout, stream.next())
        .await
        .map_err(|_| FetchError::Timeout)?
    {
        let chunk = chunk.map_err(FetchError::Network)?;
        file.write_all(&chunk)
            .await
            .map_err(|source| DownloadError::Write {
                path: temp_path.to_path_buf(),
                source,
            })?;
        written += chunk.len() as u64;
    }

    http::check_complete(expected_length, written)?;
    Ok(written)
}
