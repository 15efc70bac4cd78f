use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::episode::EpisodeDescriptor;
use crate::util::{extension_from_url, is_single_component};

/// What to do when the destination file already exists.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum OverwritePolicy {
    /// Replace the existing file.
    #[default]
    Overwrite,
    /// Leave the existing file alone and skip the download.
    SkipIfExists,
    /// Keep the existing file and write `<date>-<n>.<ext>` instead.
    VersionSuffix,
}

/// Where an episode is written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadTarget {
    /// `OUTPUT_ROOT/<nickname>`
    pub directory: PathBuf,
    /// `<YYYY-MM-DD>[.<ext>]`
    pub filename: String,
    /// `directory/filename`
    pub full_path: PathBuf,
    stem: String,
    extension: String,
}

impl DownloadTarget {
    /// Derives the target for `descriptor` under `output_root`.
    ///
    /// Returns `None` when the nickname is not a single path component.
    pub fn for_episode(output_root: &Path, descriptor: &EpisodeDescriptor) -> Option<Self> {
        if !is_single_component(&descriptor.nickname) {
            return None;
        }

        let directory = output_root.join(&descriptor.nickname);
        let stem = descriptor.iso_date();
        let extension = extension_from_url(&descriptor.content_url);
        let filename = join_extension(&stem, &extension);
        let full_path = directory.join(&filename);

        Some(Self {
            directory,
            filename,
            full_path,
            stem,
            extension,
        })
    }

    /// Path of the `n`th alternative name, `<date>-<n>[.<ext>]`.
    pub fn versioned(&self, n: u32) -> PathBuf {
        let stem = format!("{}-{}", self.stem, n);
        self.directory.join(join_extension(&stem, &self.extension))
    }
}

fn join_extension(stem: &str, extension: &str) -> String {
    if extension.is_empty() {
        stem.to_string()
    } else {
        format!("{}.{}", stem, extension)
    }
}
