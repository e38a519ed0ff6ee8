use std::collections::HashMap;
use std::path::PathBuf;

use hubsync_core::{RemoteEntry, RepositoryRef};
use tracing::{debug, info, warn};

use super::download::DownloadOperation;
use super::error::SyncError;
use super::outcome::TransferOutcome;
use super::paths::{PathError, parent_dir, remote_path_for};
use super::store::ContentStore;
use super::upload::{UploadOperation, ensure_readable};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchMode {
    Upload { message: String },
    Download,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemState {
    Pending,
    Dispatched,
    Succeeded,
    Failed,
}

impl ItemState {
    pub fn is_terminal(self) -> bool {
        matches!(self, ItemState::Succeeded | ItemState::Failed)
    }

    /// Items rejected during validation go straight from pending to failed.
    pub fn can_advance_to(self, next: ItemState) -> bool {
        matches!(
            (self, next),
            (ItemState::Pending, ItemState::Dispatched)
                | (ItemState::Pending, ItemState::Failed)
                | (ItemState::Dispatched, ItemState::Succeeded)
                | (ItemState::Dispatched, ItemState::Failed)
        )
    }

    fn advance(&mut self, next: ItemState, path: &str) {
        debug_assert!(self.can_advance_to(next), "{self:?} -> {next:?}");
        debug!(%path, from = ?*self, to = ?next, "batch item state");
        *self = next;
    }
}

/// Receives per-item events while a batch runs.
pub trait BatchObserver {
    fn item_dispatched(&mut self, _path: &str) {}
    fn item_finished(&mut self, _outcome: &TransferOutcome) {}
}

impl BatchObserver for () {}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchReport {
    outcomes: Vec<TransferOutcome>,
}

impl BatchReport {
    pub fn outcomes(&self) -> &[TransferOutcome] {
        &self.outcomes
    }

    pub fn into_outcomes(self) -> Vec<TransferOutcome> {
        self.outcomes
    }

    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_success()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.succeeded()
    }

    pub fn all_succeeded(&self) -> bool {
        self.failed() == 0
    }
}

enum Listing {
    Entries(Vec<RemoteEntry>),
    Unavailable(String),
}

enum Prepared {
    Upload {
        local_path: PathBuf,
        remote_path: String,
        message: String,
    },
    Download { remote_path: String },
}

/// Drives uploads or downloads over a list of paths, one at a time, in the
/// order given. A failing item never stops the batch.
pub struct BatchOrchestrator<'a, S: ?Sized> {
    store: &'a S,
    local_root: PathBuf,
    listings: HashMap<(RepositoryRef, String), Listing>,
}

impl<'a, S: ContentStore + ?Sized> BatchOrchestrator<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self {
            store,
            local_root: PathBuf::from("."),
            listings: HashMap::new(),
        }
    }

    /// Upload sources are read relative to this directory and downloads land
    /// under it.
    pub fn with_local_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.local_root = root.into();
        self
    }

    /// Seeds the listing of `dir` so download validation does not refetch it.
    pub fn with_listing(
        mut self,
        repo: &RepositoryRef,
        dir: &str,
        entries: Vec<RemoteEntry>,
    ) -> Self {
        self.listings.insert(
            (repo.clone(), dir.trim_matches('/').to_string()),
            Listing::Entries(entries),
        );
        self
    }

    pub async fn run<I, P>(
        &mut self,
        repo: &RepositoryRef,
        paths: I,
        mode: &BatchMode,
    ) -> BatchReport
    where
        I: IntoIterator<Item = P>,
        P: AsRef<str>,
    {
        self.run_with_observer(repo, paths, mode, &mut ()).await
    }

    pub async fn run_with_observer<I, P>(
        &mut self,
        repo: &RepositoryRef,
        paths: I,
        mode: &BatchMode,
        observer: &mut dyn BatchObserver,
    ) -> BatchReport
    where
        I: IntoIterator<Item = P>,
        P: AsRef<str>,
    {
        let mut report = BatchReport::default();
        for raw in paths {
            let path = raw.as_ref().trim();
            if path.is_empty() {
                continue;
            }

            let mut state = ItemState::Pending;
            let outcome = match self.prepare(repo, path, mode).await {
                Ok(prepared) => {
                    state.advance(ItemState::Dispatched, path);
                    observer.item_dispatched(path);
                    self.dispatch(repo, prepared).await
                }
                Err(err) => {
                    warn!(%path, error = %err, "batch item rejected");
                    TransferOutcome::from_error(path, &err)
                }
            };
            let terminal = if outcome.is_success() {
                ItemState::Succeeded
            } else {
                ItemState::Failed
            };
            state.advance(terminal, path);

            observer.item_finished(&outcome);
            report.outcomes.push(outcome);
        }

        info!(
            repo = %repo,
            succeeded = report.succeeded(),
            failed = report.failed(),
            "batch finished"
        );
        report
    }

    async fn prepare(
        &mut self,
        repo: &RepositoryRef,
        path: &str,
        mode: &BatchMode,
    ) -> Result<Prepared, SyncError> {
        match mode {
            BatchMode::Upload { message } => {
                let remote_path = remote_path_for(path)?;
                let local_path = self.local_root.join(path);
                ensure_readable(&local_path).await?;
                Ok(Prepared::Upload {
                    local_path,
                    remote_path,
                    message: message.clone(),
                })
            }
            BatchMode::Download => {
                let remote_path = path.trim_matches('/');
                if remote_path.is_empty() {
                    return Err(PathError::Empty.into());
                }
                let listing = self.listing_for(repo, parent_dir(remote_path)).await?;
                DownloadOperation::<S>::validate(listing, remote_path)?;
                Ok(Prepared::Download {
                    remote_path: remote_path.to_string(),
                })
            }
        }
    }

    async fn dispatch(&self, repo: &RepositoryRef, prepared: Prepared) -> TransferOutcome {
        match prepared {
            Prepared::Upload {
                local_path,
                remote_path,
                message,
            } => {
                UploadOperation::new(self.store)
                    .execute_file(repo, &local_path, &remote_path, &message)
                    .await
            }
            Prepared::Download { remote_path } => {
                DownloadOperation::new(self.store, self.local_root.clone())
                    .execute(repo, &remote_path)
                    .await
            }
        }
    }

    async fn listing_for(
        &mut self,
        repo: &RepositoryRef,
        dir: &str,
    ) -> Result<&[RemoteEntry], SyncError> {
        let key = (repo.clone(), dir.to_string());
        if !self.listings.contains_key(&key) {
            let listing = match self.store.list_directory(repo, dir).await {
                Ok(entries) => Listing::Entries(entries),
                Err(err) => {
                    warn!(dir = %dir, error = %err, "directory listing failed");
                    Listing::Unavailable(err.to_string())
                }
            };
            self.listings.insert(key.clone(), listing);
        }
        match self.listings.get(&key) {
            Some(Listing::Entries(entries)) => Ok(entries),
            Some(Listing::Unavailable(reason)) => Err(SyncError::ListingUnavailable {
                dir: dir.to_string(),
                reason: reason.clone(),
            }),
            None => Ok(&[]),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sync::paths::normalize_paths;
    use crate::sync::testing::MemoryStore;
    use hubsync_core::{ContentsClient, Credentials, EntryKind};
    use serde_json::json;
    use tempfile::tempdir;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, Request, ResponseTemplate};

    fn repo() -> RepositoryRef {
        RepositoryRef::new("octo", "demo", "main", "main")
    }

    fn upload(message: &str) -> BatchMode {
        BatchMode::Upload {
            message: message.to_string(),
        }
    }

    #[derive(Default)]
    struct Recorder {
        events: Vec<String>,
    }

    impl BatchObserver for Recorder {
        fn item_dispatched(&mut self, path: &str) {
            self.events.push(format!("dispatch {path}"));
        }

        fn item_finished(&mut self, outcome: &TransferOutcome) {
            let verdict = if outcome.is_success() { "ok" } else { "failed" };
            self.events.push(format!("{verdict} {}", outcome.path));
        }
    }

    #[tokio::test]
    async fn failing_middle_item_does_not_stop_batch() {
        let dir = tempdir().unwrap();
        for name in ["a.txt", "b.txt", "c.txt"] {
            std::fs::write(dir.path().join(name), name.as_bytes()).unwrap();
        }
        let store = MemoryStore::new().failing_on("b.txt");

        let report = BatchOrchestrator::new(&store)
            .with_local_root(dir.path())
            .run(&repo(), ["a.txt", "b.txt", "c.txt"], &upload(""))
            .await;

        let verdicts: Vec<(&str, bool)> = report
            .outcomes()
            .iter()
            .map(|o| (o.path.as_str(), o.is_success()))
            .collect();
        assert_eq!(
            verdicts,
            vec![("a.txt", true), ("b.txt", false), ("c.txt", true)]
        );
        assert_eq!(report.succeeded(), 2);
        assert_eq!(report.failed(), 1);
        assert_eq!(store.content("c.txt").unwrap(), b"c.txt");
    }

    #[tokio::test]
    async fn unreadable_file_fails_before_any_remote_call() {
        let dir = tempdir().unwrap();
        let store = MemoryStore::new();

        let report = BatchOrchestrator::new(&store)
            .with_local_root(dir.path())
            .run(&repo(), ["missing.txt"], &upload(""))
            .await;

        assert_eq!(report.failed(), 1);
        assert!(store.calls().is_empty());
    }

    #[tokio::test]
    async fn normalized_input_skips_blank_entries() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("a.txt"), b"a").unwrap();
        std::fs::write(dir.path().join("b.txt"), b"b").unwrap();
        let store = MemoryStore::new();

        let paths = normalize_paths(" a.txt, , b.txt ");
        assert_eq!(paths, vec!["a.txt", "b.txt"]);

        let report = BatchOrchestrator::new(&store)
            .with_local_root(dir.path())
            .run(&repo(), ["  ", " a.txt "], &upload(""))
            .await;
        assert_eq!(report.outcomes().len(), 1);
        assert_eq!(report.outcomes()[0].path, "a.txt");

        let report = BatchOrchestrator::new(&store)
            .with_local_root(dir.path())
            .run(&repo(), &paths, &upload(""))
            .await;
        assert!(report.all_succeeded());
    }

    #[tokio::test]
    async fn directory_download_is_rejected_before_fetch() {
        let dir = tempdir().unwrap();
        let store = MemoryStore::new()
            .with_dir("src")
            .with_file("a.txt", b"hello");

        let report = BatchOrchestrator::new(&store)
            .with_local_root(dir.path())
            .run(&repo(), ["src", "a.txt"], &BatchMode::Download)
            .await;

        assert!(!report.outcomes()[0].is_success());
        assert!(report.outcomes()[0].error().unwrap().contains("not a file"));
        assert!(report.outcomes()[1].is_success());
        assert!(!store.calls().contains(&"content src".to_string()));
        assert_eq!(store.calls(), vec!["list ", "content a.txt"]);
    }

    #[tokio::test]
    async fn seeded_listing_is_used_for_validation() {
        let dir = tempdir().unwrap();
        let store = MemoryStore::new().with_file("docs/a.txt", b"doc");
        let listing = vec![RemoteEntry {
            name: "a.txt".into(),
            path: "docs/a.txt".into(),
            kind: EntryKind::File,
        }];

        let report = BatchOrchestrator::new(&store)
            .with_local_root(dir.path())
            .with_listing(&repo(), "docs", listing)
            .run(&repo(), ["docs/a.txt", "docs/missing.txt"], &BatchMode::Download)
            .await;

        assert!(report.outcomes()[0].is_success());
        assert!(report.outcomes()[1].error().unwrap().contains("not found"));
        assert_eq!(store.calls(), vec!["content docs/a.txt"]);
        assert_eq!(
            std::fs::read(dir.path().join("docs/a.txt")).unwrap(),
            b"doc"
        );
    }

    #[tokio::test]
    async fn failed_listing_fails_items_under_that_directory() {
        let dir = tempdir().unwrap();
        let store = MemoryStore::new()
            .with_file("a.txt", b"root")
            .with_file("docs/b.txt", b"doc")
            .failing_on("docs");

        let report = BatchOrchestrator::new(&store)
            .with_local_root(dir.path())
            .run(
                &repo(),
                ["docs/b.txt", "a.txt", "docs/c.txt"],
                &BatchMode::Download,
            )
            .await;

        let verdicts: Vec<bool> = report.outcomes().iter().map(|o| o.is_success()).collect();
        assert_eq!(verdicts, vec![false, true, false]);
        assert_eq!(
            store
                .calls()
                .iter()
                .filter(|call| call.as_str() == "list docs")
                .count(),
            1
        );
    }

    #[tokio::test]
    async fn observer_sees_events_in_input_order() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("a.txt"), b"a").unwrap();
        let store = MemoryStore::new();
        let mut recorder = Recorder::default();

        BatchOrchestrator::new(&store)
            .with_local_root(dir.path())
            .run_with_observer(&repo(), ["a.txt", "nope.txt"], &upload(""), &mut recorder)
            .await;

        assert_eq!(
            recorder.events,
            vec!["dispatch a.txt", "ok a.txt", "failed nope.txt"]
        );
    }

    #[test]
    fn terminal_states_are_final() {
        assert!(ItemState::Succeeded.is_terminal());
        assert!(ItemState::Failed.is_terminal());
        assert!(!ItemState::Succeeded.can_advance_to(ItemState::Dispatched));
        assert!(!ItemState::Failed.can_advance_to(ItemState::Pending));
        assert!(ItemState::Pending.can_advance_to(ItemState::Dispatched));
    }

    #[tokio::test]
    async fn upload_against_api_creates_then_updates() {
        let server = MockServer::start().await;
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("notes.txt"), b"hello").unwrap();

        Mock::given(method("GET"))
            .and(path("/repos/octo/demo/contents/notes.txt"))
            .respond_with(ResponseTemplate::new(404))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .and(path("/repos/octo/demo/contents/notes.txt"))
            .and(|request: &Request| {
                request
                    .body_json::<serde_json::Value>()
                    .map(|body| body.get("sha").is_none())
                    .unwrap_or(false)
            })
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({
                "content": { "sha": "rev-1" }
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/repos/octo/demo/contents/notes.txt"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "sha": "rev-1",
                "content": "aGVsbG8=",
                "encoding": "base64"
            })))
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .and(path("/repos/octo/demo/contents/notes.txt"))
            .and(body_partial_json(json!({ "sha": "rev-1", "message": "second" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "content": { "sha": "rev-2" }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client =
            ContentsClient::with_base_url(&server.uri(), Credentials::new("octo", "t")).unwrap();
        let mut orchestrator = BatchOrchestrator::new(&client).with_local_root(dir.path());

        let first = orchestrator.run(&repo(), ["notes.txt"], &upload("")).await;
        let second = orchestrator
            .run(&repo(), ["notes.txt"], &upload("second"))
            .await;

        assert_eq!(first.outcomes()[0].revision().unwrap().as_str(), "rev-1");
        assert_eq!(second.outcomes()[0].revision().unwrap().as_str(), "rev-2");
    }
}
