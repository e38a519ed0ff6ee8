use std::fmt;
use std::path::PathBuf;

use hubsync_core::RevisionToken;

use super::error::SyncError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutcomeStatus {
    Uploaded { revision: RevisionToken },
    Downloaded { destination: PathBuf },
    /// `remote_body` is the store's response body, unmodified, when the
    /// failure came back from the API.
    Failed {
        error: String,
        remote_body: Option<String>,
    },
}

/// Result of one batch item. Built once and never changed afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferOutcome {
    pub path: String,
    pub status: OutcomeStatus,
}

impl TransferOutcome {
    pub fn uploaded(path: impl Into<String>, revision: RevisionToken) -> Self {
        Self {
            path: path.into(),
            status: OutcomeStatus::Uploaded { revision },
        }
    }

    pub fn downloaded(path: impl Into<String>, destination: PathBuf) -> Self {
        Self {
            path: path.into(),
            status: OutcomeStatus::Downloaded { destination },
        }
    }

    pub fn failed(path: impl Into<String>, error: &dyn fmt::Display) -> Self {
        Self {
            path: path.into(),
            status: OutcomeStatus::Failed {
                error: error.to_string(),
                remote_body: None,
            },
        }
    }

    pub fn from_error(path: impl Into<String>, error: &SyncError) -> Self {
        Self {
            path: path.into(),
            status: OutcomeStatus::Failed {
                error: error.to_string(),
                remote_body: error.remote_body().map(str::to_string),
            },
        }
    }

    pub fn is_success(&self) -> bool {
        !matches!(self.status, OutcomeStatus::Failed { .. })
    }

    pub fn error(&self) -> Option<&str> {
        match &self.status {
            OutcomeStatus::Failed { error, .. } => Some(error),
            _ => None,
        }
    }

    pub fn remote_body(&self) -> Option<&str> {
        match &self.status {
            OutcomeStatus::Failed { remote_body, .. } => remote_body.as_deref(),
            _ => None,
        }
    }

    pub fn revision(&self) -> Option<&RevisionToken> {
        match &self.status {
            OutcomeStatus::Uploaded { revision } => Some(revision),
            _ => None,
        }
    }

    pub fn destination(&self) -> Option<&PathBuf> {
        match &self.status {
            OutcomeStatus::Downloaded { destination } => Some(destination),
            _ => None,
        }
    }
}
