use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use reqwest::header::ACCEPT;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use crate::model::{Credentials, Metadata, RemoteEntry, RepositoryRef, RevisionToken};

pub const DEFAULT_BASE_URL: &str = "https://api.github.com";

const ACCEPT_JSON: &str = "application/vnd.github+json";
const USER_AGENT: &str = concat!("hubsync/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Error)]
pub enum ContentsError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("invalid url: {0}")]
    Url(#[from] url::ParseError),
    #[error("base url cannot take path segments: {0}")]
    BaseUrl(String),
    #[error("api returned {status}: {body}")]
    Api { status: StatusCode, body: String },
    #[error("no file at {path}")]
    NotFound { path: String },
    #[error("{path} is not a directory")]
    NotADirectory { path: String },
    #[error("cannot decode content of {path}: {reason}")]
    Decode { path: String, reason: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiErrorClass {
    Auth,
    NotFound,
    Conflict,
    RateLimit,
    Transient,
    Permanent,
}

/// Stateless binding to the contents API. Holds nothing across calls except
/// the credentials it was built with.
#[derive(Clone)]
pub struct ContentsClient {
    http: Client,
    base_url: Url,
    credentials: Credentials,
}

impl ContentsClient {
    pub fn new(credentials: Credentials) -> Result<Self, ContentsError> {
        Self::with_base_url(DEFAULT_BASE_URL, credentials)
    }

    pub fn with_base_url(base_url: &str, credentials: Credentials) -> Result<Self, ContentsError> {
        Self::with_options(base_url, credentials, None)
    }

    /// `timeout` bounds each round trip; the client itself never retries.
    pub fn with_options(
        base_url: &str,
        credentials: Credentials,
        timeout: Option<Duration>,
    ) -> Result<Self, ContentsError> {
        let mut builder = Client::builder().user_agent(USER_AGENT);
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            http: builder.build()?,
            base_url: Url::parse(base_url)?,
            credentials,
        })
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    /// A 404 is reported as `exists == false`, not as an error.
    pub async fn fetch_metadata(
        &self,
        repo: &RepositoryRef,
        path: &str,
    ) -> Result<Metadata, ContentsError> {
        let url = self.contents_url(repo, path, true)?;
        let response = self.authorized(self.http.get(url)).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(Metadata::absent());
        }
        let payload: ContentsPayload = Self::handle_response(response).await?;
        Ok(match payload {
            ContentsPayload::File(file) => Metadata {
                exists: true,
                revision: Some(file.sha),
            },
            ContentsPayload::Directory(_) => Metadata {
                exists: true,
                revision: None,
            },
        })
    }

    pub async fn fetch_content(
        &self,
        repo: &RepositoryRef,
        path: &str,
    ) -> Result<Vec<u8>, ContentsError> {
        let url = self.contents_url(repo, path, true)?;
        let response = self.authorized(self.http.get(url)).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(ContentsError::NotFound {
                path: path.to_string(),
            });
        }
        match Self::handle_response(response).await? {
            ContentsPayload::File(file) => decode_content(path, &file),
            ContentsPayload::Directory(_) => Err(ContentsError::NotFound {
                path: path.to_string(),
            }),
        }
    }

    /// Creates the file when `revision` is `None`, otherwise updates exactly
    /// that revision. Returns the revision of the written content.
    pub async fn write_content(
        &self,
        repo: &RepositoryRef,
        path: &str,
        bytes: &[u8],
        message: &str,
        revision: Option<&RevisionToken>,
    ) -> Result<RevisionToken, ContentsError> {
        let url = self.contents_url(repo, path, false)?;
        let body = WriteRequest {
            message,
            content: STANDARD.encode(bytes),
            branch: &repo.branch,
            sha: revision,
        };
        let response = self
            .authorized(self.http.put(url))
            .json(&body)
            .send()
            .await?;
        let written: WriteResponse = Self::handle_response(response).await?;
        Ok(written.content.sha)
    }

    /// Lists one level of `path`; an empty path lists the repository root.
    pub async fn list_directory(
        &self,
        repo: &RepositoryRef,
        path: &str,
    ) -> Result<Vec<RemoteEntry>, ContentsError> {
        let url = self.contents_url(repo, path, true)?;
        let response = self.authorized(self.http.get(url)).send().await?;
        match Self::handle_response(response).await? {
            ContentsPayload::Directory(entries) => Ok(entries),
            ContentsPayload::File(_) => Err(ContentsError::NotADirectory {
                path: path.to_string(),
            }),
        }
    }

    /// Only the first page the API returns is read.
    pub async fn list_repositories(&self, owner: &str) -> Result<Vec<String>, ContentsError> {
        let url = self.endpoint(["users", owner, "repos"])?;
        let response = self.authorized(self.http.get(url)).send().await?;
        let repos: Vec<RepositorySummary> = Self::handle_response(response).await?;
        Ok(repos.into_iter().map(|repo| repo.name).collect())
    }

    fn authorized(&self, builder: RequestBuilder) -> RequestBuilder {
        builder
            .basic_auth(self.credentials.username(), Some(self.credentials.token()))
            .header(ACCEPT, ACCEPT_JSON)
    }

    fn contents_url(
        &self,
        repo: &RepositoryRef,
        path: &str,
        with_ref: bool,
    ) -> Result<Url, ContentsError> {
        let prefix = ["repos", repo.owner.as_str(), repo.name.as_str(), "contents"];
        let segments = path.split('/').filter(|segment| !segment.is_empty());
        let mut url = self.endpoint(prefix.into_iter().chain(segments))?;
        if with_ref {
            url.query_pairs_mut().append_pair("ref", &repo.branch);
        }
        Ok(url)
    }

    fn endpoint<'a, I>(&self, segments: I) -> Result<Url, ContentsError>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ContentsError::BaseUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn handle_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, ContentsError> {
        if response.status().is_success() {
            Ok(response.json::<T>().await?)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(ContentsError::Api { status, body })
        }
    }
}

impl ContentsError {
    pub fn classification(&self) -> Option<ApiErrorClass> {
        match self {
            ContentsError::Api { status, .. } => Some(classify_api_status(*status)),
            ContentsError::NotFound { .. } => Some(ApiErrorClass::NotFound),
            _ => None,
        }
    }

    /// Raw diagnostic body returned by the store, if any.
    pub fn remote_body(&self) -> Option<&str> {
        match self {
            ContentsError::Api { body, .. } => Some(body),
            _ => None,
        }
    }
}

fn classify_api_status(status: StatusCode) -> ApiErrorClass {
    if matches!(status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN) {
        ApiErrorClass::Auth
    } else if status == StatusCode::NOT_FOUND {
        ApiErrorClass::NotFound
    } else if matches!(
        status,
        StatusCode::CONFLICT | StatusCode::UNPROCESSABLE_ENTITY
    ) {
        ApiErrorClass::Conflict
    } else if status == StatusCode::TOO_MANY_REQUESTS {
        ApiErrorClass::RateLimit
    } else if status.is_server_error() || status == StatusCode::REQUEST_TIMEOUT {
        ApiErrorClass::Transient
    } else {
        ApiErrorClass::Permanent
    }
}

fn decode_content(path: &str, file: &FileContent) -> Result<Vec<u8>, ContentsError> {
    let decode_error = |reason: String| ContentsError::Decode {
        path: path.to_string(),
        reason,
    };
    if let Some(encoding) = file.encoding.as_deref()
        && encoding != "base64"
    {
        return Err(decode_error(format!("unsupported encoding {encoding:?}")));
    }
    let encoded = file
        .content
        .as_deref()
        .ok_or_else(|| decode_error("response carries no content".to_string()))?;
    // The API wraps base64 payloads at 60 columns.
    let compact: String = encoded
        .chars()
        .filter(|c| !c.is_ascii_whitespace())
        .collect();
    STANDARD
        .decode(compact)
        .map_err(|err| decode_error(err.to_string()))
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ContentsPayload {
    Directory(Vec<RemoteEntry>),
    File(FileContent),
}

#[derive(Debug, Deserialize)]
struct FileContent {
    sha: RevisionToken,
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    encoding: Option<String>,
}

#[derive(Debug, Serialize)]
struct WriteRequest<'a> {
    message: &'a str,
    content: String,
    branch: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    sha: Option<&'a RevisionToken>,
}

#[derive(Debug, Deserialize)]
struct WriteResponse {
    content: WrittenContent,
}

#[derive(Debug, Deserialize)]
struct WrittenContent {
    sha: RevisionToken,
}

#[derive(Debug, Deserialize)]
struct RepositorySummary {
    name: String,
}
