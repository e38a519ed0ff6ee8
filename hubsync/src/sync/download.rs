use std::path::{Path, PathBuf};

use hubsync_core::{RemoteEntry, RepositoryRef};
use tokio::io::AsyncWriteExt;
use tracing::{info, warn};

use super::error::SyncError;
use super::naming::unique_name;
use super::outcome::TransferOutcome;
use super::paths::local_path_for;
use super::store::ContentStore;

/// Fetches one remote file and stores it under `dest_root` without ever
/// overwriting an existing local file.
pub struct DownloadOperation<'a, S: ?Sized> {
    store: &'a S,
    dest_root: PathBuf,
}

impl<'a, S: ContentStore + ?Sized> DownloadOperation<'a, S> {
    pub fn new(store: &'a S, dest_root: impl Into<PathBuf>) -> Self {
        Self {
            store,
            dest_root: dest_root.into(),
        }
    }

    pub async fn execute(&self, repo: &RepositoryRef, path: &str) -> TransferOutcome {
        match self.fetch_to_disk(repo, path).await {
            Ok(destination) => {
                info!(%path, destination = %destination.display(), "downloaded");
                TransferOutcome::downloaded(path, destination)
            }
            Err(err) => {
                warn!(%path, error = %err, "download failed");
                TransferOutcome::from_error(path, &err)
            }
        }
    }

    async fn fetch_to_disk(&self, repo: &RepositoryRef, path: &str) -> Result<PathBuf, SyncError> {
        let bytes = self.store.fetch_content(repo, path).await?;
        let candidate = local_path_for(&self.dest_root, path)?;
        if let Some(parent) = candidate.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|source| SyncError::local_io(parent, source))?;
        }
        let destination = unique_name(&candidate);
        write_new(&destination, &bytes).await?;
        Ok(destination)
    }

    /// Rejects paths missing from `listing` and entries that are not files.
    /// Runs before any content fetch.
    pub fn validate(listing: &[RemoteEntry], path: &str) -> Result<(), SyncError> {
        let entry = listing
            .iter()
            .find(|entry| entry.path == path)
            .ok_or_else(|| SyncError::NotInListing {
                path: path.to_string(),
            })?;
        if !entry.is_file() {
            return Err(SyncError::NotAFile {
                path: path.to_string(),
            });
        }
        Ok(())
    }
}

async fn write_new(destination: &Path, bytes: &[u8]) -> Result<(), SyncError> {
    // create_new: a file that appeared after naming is reported, not clobbered.
    let mut file = tokio::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(destination)
        .await
        .map_err(|source| SyncError::local_io(destination, source))?;
    if let Err(source) = write_all_flushed(&mut file, bytes).await {
        drop(file);
        // Created by the open above; a truncated file must not hold the name.
        if let Err(err) = tokio::fs::remove_file(destination).await {
            warn!(
                destination = %destination.display(),
                error = %err,
                "failed to remove partial download"
            );
        }
        return Err(SyncError::local_io(destination, source));
    }
    Ok(())
}

async fn write_all_flushed(file: &mut tokio::fs::File, bytes: &[u8]) -> std::io::Result<()> {
    file.write_all(bytes).await?;
    file.flush().await
}
