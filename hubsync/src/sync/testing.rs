use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;
use hubsync_core::{
    ContentsError, EntryKind, Metadata, RemoteEntry, RepositoryRef, RevisionToken, StatusCode,
};

use super::paths::parent_dir;
use super::store::ContentStore;

/// In-memory store that applies the same revision rules as the real API:
/// creating over existing content or updating a stale revision is rejected.
#[derive(Default)]
pub(crate) struct MemoryStore {
    files: Mutex<BTreeMap<String, (Vec<u8>, RevisionToken)>>,
    dirs: Mutex<BTreeSet<String>>,
    failing: Mutex<HashSet<String>>,
    blind_metadata: Mutex<bool>,
    calls: Mutex<Vec<String>>,
    next_revision: Mutex<u64>,
}

impl MemoryStore {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_file(self, path: &str, bytes: &[u8]) -> Self {
        let revision = self.allocate_revision();
        self.files
            .lock()
            .unwrap()
            .insert(path.to_string(), (bytes.to_vec(), revision));
        self
    }

    pub(crate) fn with_dir(self, path: &str) -> Self {
        self.dirs.lock().unwrap().insert(path.to_string());
        self
    }

    /// Every remote call touching `path` fails with a 500.
    pub(crate) fn failing_on(self, path: &str) -> Self {
        self.failing.lock().unwrap().insert(path.to_string());
        self
    }

    /// Metadata lookups claim nothing exists, simulating a skipped resolve.
    pub(crate) fn with_blind_metadata(self) -> Self {
        *self.blind_metadata.lock().unwrap() = true;
        self
    }

    pub(crate) fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub(crate) fn content(&self, path: &str) -> Option<Vec<u8>> {
        self.files
            .lock()
            .unwrap()
            .get(path)
            .map(|(bytes, _)| bytes.clone())
    }

    pub(crate) fn revision(&self, path: &str) -> Option<RevisionToken> {
        self.files
            .lock()
            .unwrap()
            .get(path)
            .map(|(_, revision)| revision.clone())
    }

    fn allocate_revision(&self) -> RevisionToken {
        let mut next = self.next_revision.lock().unwrap();
        *next += 1;
        RevisionToken::new(format!("rev-{next}"))
    }

    fn record(&self, call: &str, path: &str) -> Result<(), ContentsError> {
        self.calls.lock().unwrap().push(format!("{call} {path}"));
        if self.failing.lock().unwrap().contains(path) {
            return Err(api_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                r#"{"message":"Server Error"}"#,
            ));
        }
        Ok(())
    }
}

fn api_error(status: StatusCode, body: &str) -> ContentsError {
    ContentsError::Api {
        status,
        body: body.to_string(),
    }
}

#[async_trait]
impl ContentStore for MemoryStore {
    async fn fetch_metadata(
        &self,
        _repo: &RepositoryRef,
        path: &str,
    ) -> Result<Metadata, ContentsError> {
        self.record("metadata", path)?;
        if *self.blind_metadata.lock().unwrap() {
            return Ok(Metadata::absent());
        }
        Ok(match self.revision(path) {
            Some(revision) => Metadata {
                exists: true,
                revision: Some(revision),
            },
            None => Metadata::absent(),
        })
    }

    async fn fetch_content(
        &self,
        _repo: &RepositoryRef,
        path: &str,
    ) -> Result<Vec<u8>, ContentsError> {
        self.record("content", path)?;
        self.content(path).ok_or_else(|| ContentsError::NotFound {
            path: path.to_string(),
        })
    }

    async fn write_content(
        &self,
        _repo: &RepositoryRef,
        path: &str,
        bytes: &[u8],
        _message: &str,
        revision: Option<&RevisionToken>,
    ) -> Result<RevisionToken, ContentsError> {
        self.record("write", path)?;
        let current = self.revision(path);
        match (current.as_ref(), revision) {
            (Some(_), None) => {
                return Err(api_error(
                    StatusCode::UNPROCESSABLE_ENTITY,
                    r#"{"message":"Invalid request.\n\n\"sha\" wasn't supplied."}"#,
                ));
            }
            (Some(current), Some(given)) if current != given => {
                return Err(api_error(
                    StatusCode::CONFLICT,
                    &format!(r#"{{"message":"{path} does not match {given}"}}"#),
                ));
            }
            (None, Some(given)) => {
                return Err(api_error(
                    StatusCode::CONFLICT,
                    &format!(r#"{{"message":"{path} does not match {given}"}}"#),
                ));
            }
            _ => {}
        }
        let written = self.allocate_revision();
        self.files
            .lock()
            .unwrap()
            .insert(path.to_string(), (bytes.to_vec(), written.clone()));
        Ok(written)
    }

    async fn list_directory(
        &self,
        _repo: &RepositoryRef,
        path: &str,
    ) -> Result<Vec<RemoteEntry>, ContentsError> {
        self.record("list", path)?;
        let entry = |entry_path: &str, kind: EntryKind| RemoteEntry {
            name: entry_path.rsplit('/').next().unwrap_or(entry_path).to_string(),
            path: entry_path.to_string(),
            kind,
        };
        let mut entries: Vec<RemoteEntry> = self
            .dirs
            .lock()
            .unwrap()
            .iter()
            .filter(|dir| parent_dir(dir.as_str()) == path)
            .map(|dir| entry(dir.as_str(), EntryKind::Dir))
            .collect();
        entries.extend(
            self.files
                .lock()
                .unwrap()
                .keys()
                .filter(|file| parent_dir(file.as_str()) == path)
                .map(|file| entry(file.as_str(), EntryKind::File)),
        );
        Ok(entries)
    }
}
