use async_trait::async_trait;
use hubsync_core::{
    ContentsClient, ContentsError, Metadata, RemoteEntry, RepositoryRef, RevisionToken,
};

/// The content operations the sync core needs from the remote store.
#[async_trait]
pub trait ContentStore: Send + Sync {
    async fn fetch_metadata(
        &self,
        repo: &RepositoryRef,
        path: &str,
    ) -> Result<Metadata, ContentsError>;

    async fn fetch_content(
        &self,
        repo: &RepositoryRef,
        path: &str,
    ) -> Result<Vec<u8>, ContentsError>;

    async fn write_content(
        &self,
        repo: &RepositoryRef,
        path: &str,
        bytes: &[u8],
        message: &str,
        revision: Option<&RevisionToken>,
    ) -> Result<RevisionToken, ContentsError>;

    async fn list_directory(
        &self,
        repo: &RepositoryRef,
        path: &str,
    ) -> Result<Vec<RemoteEntry>, ContentsError>;
}

#[async_trait]
impl ContentStore for ContentsClient {
    async fn fetch_metadata(
        &self,
        repo: &RepositoryRef,
        path: &str,
    ) -> Result<Metadata, ContentsError> {
        ContentsClient::fetch_metadata(self, repo, path).await
    }

    async fn fetch_content(
        &self,
        repo: &RepositoryRef,
        path: &str,
    ) -> Result<Vec<u8>, ContentsError> {
        ContentsClient::fetch_content(self, repo, path).await
    }

    async fn write_content(
        &self,
        repo: &RepositoryRef,
        path: &str,
        bytes: &[u8],
        message: &str,
        revision: Option<&RevisionToken>,
    ) -> Result<RevisionToken, ContentsError> {
        ContentsClient::write_content(self, repo, path, bytes, message, revision).await
    }

    async fn list_directory(
        &self,
        repo: &RepositoryRef,
        path: &str,
    ) -> Result<Vec<RemoteEntry>, ContentsError> {
        ContentsClient::list_directory(self, repo, path).await
    }
}
