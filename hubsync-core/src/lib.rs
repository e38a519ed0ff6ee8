mod client;
mod model;

pub use client::{ApiErrorClass, ContentsClient, ContentsError, DEFAULT_BASE_URL};
pub use model::{
    Credentials, DEFAULT_BRANCH, EntryKind, Metadata, RemoteEntry, RepositoryRef, RevisionToken,
    is_allowed_branch, normalize_branch,
};
pub use reqwest::StatusCode;
