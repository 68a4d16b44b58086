//! JSON file result store

use super::traits::{ResultStore, StoreResult};
use crate::listing::Listing;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Writes `<directory>/<platform>.json`, one file per platform
///
/// Files hold the complete accumulated sequence as a pretty-printed array
/// (two-space indent, non-ASCII kept literal, trailing newline). Each write
/// goes to a temporary sibling first and is renamed into place, so a reader
/// never observes a half-written file.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    directory: PathBuf,
}

impl JsonFileStore {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
        }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Output path for a platform's results
    pub fn path_for(&self, platform: &str) -> PathBuf {
        self.directory.join(format!("{}.json", platform))
    }

    /// Writes one platform's results, returning the file path
    pub fn write(&self, platform: &str, listings: &[Listing]) -> StoreResult<PathBuf> {
        let path = self.path_for(platform);
        write_atomic(&path, &render_json(listings)?)?;
        Ok(path)
    }

    /// Writes every platform's results into one file keyed by platform
    pub fn persist_combined(
        &self,
        file_name: &str,
        results: &BTreeMap<String, Vec<Listing>>,
    ) -> StoreResult<PathBuf> {
        let path = self.directory.join(file_name);
        write_atomic(&path, &render_json(results)?)?;
        tracing::info!("Saved combined results to {}", path.display());
        Ok(path)
    }
}

impl ResultStore for JsonFileStore {
    fn persist(&self, platform: &str, listings: &[Listing]) {
        match self.write(platform, listings) {
            Ok(path) => tracing::debug!(
                "Saved {} {} listings to {}",
                listings.len(),
                platform,
                path.display()
            ),
            Err(e) => tracing::error!("Failed to save {} results: {}", platform, e),
        }
    }
}

/// Serializes a value the way every output file is written
pub fn render_json<T: Serialize + ?Sized>(value: &T) -> StoreResult<String> {
    let mut text = serde_json::to_string_pretty(value)?;
    text.push('\n');
    Ok(text)
}

fn write_atomic(path: &Path, contents: &str) -> StoreResult<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    let written = fs::write(&tmp, contents).and_then(|()| fs::rename(&tmp, path));
    if written.is_err() {
        if let Err(e) = fs::remove_file(&tmp) {
            tracing::trace!("No temporary file to clean up at {}: {}", tmp.display(), e);
        }
    }
    Ok(written?)
}
