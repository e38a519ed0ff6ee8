use std::path::Path;

use hubsync_core::{RepositoryRef, RevisionToken};
use tracing::{info, warn};

use super::error::SyncError;
use super::outcome::TransferOutcome;
use super::revision::RevisionResolver;
use super::store::ContentStore;

pub const DEFAULT_COMMIT_MESSAGE: &str = "Update file";

/// Conditional upsert of one file: resolve the current revision, then write
/// with it (update) or without it (create).
pub struct UploadOperation<'a, S: ?Sized> {
    store: &'a S,
}

impl<'a, S: ContentStore + ?Sized> UploadOperation<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    pub async fn execute(
        &self,
        repo: &RepositoryRef,
        path: &str,
        local_bytes: &[u8],
        message: &str,
    ) -> TransferOutcome {
        match self.upsert(repo, path, local_bytes, message).await {
            Ok(revision) => {
                info!(%path, %revision, bytes = local_bytes.len(), "uploaded");
                TransferOutcome::uploaded(path, revision)
            }
            Err(err) => {
                warn!(%path, error = %err, "upload failed");
                TransferOutcome::from_error(path, &err)
            }
        }
    }

    /// Reads `local_path` and uploads it to `remote_path`. An unreadable file
    /// fails the item without touching the store.
    pub async fn execute_file(
        &self,
        repo: &RepositoryRef,
        local_path: &Path,
        remote_path: &str,
        message: &str,
    ) -> TransferOutcome {
        match read_local(local_path).await {
            Ok(bytes) => self.execute(repo, remote_path, &bytes, message).await,
            Err(err) => {
                warn!(path = %remote_path, error = %err, "upload source unreadable");
                TransferOutcome::from_error(remote_path, &err)
            }
        }
    }

    async fn upsert(
        &self,
        repo: &RepositoryRef,
        path: &str,
        local_bytes: &[u8],
        message: &str,
    ) -> Result<RevisionToken, SyncError> {
        let revision = RevisionResolver::new(self.store).resolve(repo, path).await?;
        let written = self
            .store
            .write_content(
                repo,
                path,
                local_bytes,
                commit_message(message),
                revision.as_ref(),
            )
            .await?;
        Ok(written)
    }
}

pub fn commit_message(message: &str) -> &str {
    let message = message.trim();
    if message.is_empty() {
        DEFAULT_COMMIT_MESSAGE
    } else {
        message
    }
}

/// Opens `path` for reading and closes it again.
pub async fn ensure_readable(path: &Path) -> Result<(), SyncError> {
    tokio::fs::File::open(path)
        .await
        .map(drop)
        .map_err(|source| SyncError::local_io(path, source))
}

pub async fn read_local(path: &Path) -> Result<Vec<u8>, SyncError> {
    tokio::fs::read(path)
        .await
        .map_err(|source| SyncError::local_io(path, source))
}
