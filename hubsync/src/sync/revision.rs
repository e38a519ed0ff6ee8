use hubsync_core::{ContentsError, RepositoryRef, RevisionToken};
use tracing::debug;

use super::store::ContentStore;

/// Looks up the revision a write must carry. `None` means the path is free
/// and the write will be a create.
pub struct RevisionResolver<'a, S: ?Sized> {
    store: &'a S,
}

impl<'a, S: ContentStore + ?Sized> RevisionResolver<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    pub async fn resolve(
        &self,
        repo: &RepositoryRef,
        path: &str,
    ) -> Result<Option<RevisionToken>, ContentsError> {
        let metadata = self.store.fetch_metadata(repo, path).await?;
        match &metadata.revision {
            Some(revision) => debug!(%path, %revision, "existing content, write will update"),
            None if metadata.exists => debug!(%path, "path exists without a file revision"),
            None => debug!(%path, "no existing content, write will create"),
        }
        Ok(metadata.revision)
    }
}
