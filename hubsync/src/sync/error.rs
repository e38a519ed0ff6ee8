use std::io;
use std::path::PathBuf;

use hubsync_core::ContentsError;
use thiserror::Error;

use super::paths::PathError;

/// Failure of a single transfer item. Never escapes the batch; the
/// orchestrator turns it into a failed outcome.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("local I/O error on {}: {source}", .path.display())]
    LocalIo {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("invalid path: {0}")]
    InvalidPath(#[from] PathError),
    #[error("{path} not found in repository")]
    NotInListing { path: String },
    #[error("{path} is not a file")]
    NotAFile { path: String },
    #[error("cannot list {dir:?}: {reason}")]
    ListingUnavailable { dir: String, reason: String },
    #[error(transparent)]
    Remote(#[from] ContentsError),
}

impl SyncError {
    pub(crate) fn local_io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        SyncError::LocalIo {
            path: path.into(),
            source,
        }
    }

    pub fn remote_body(&self) -> Option<&str> {
        match self {
            SyncError::Remote(err) => err.remote_body(),
            _ => None,
        }
    }
}
