use std::fmt;

use serde::{Deserialize, Serialize};

pub const DEFAULT_BRANCH: &str = "main";

const ALLOWED_BRANCHES: [&str; 2] = ["main", "master"];

/// Username and token attached to every request as basic auth.
///
/// Lives for one run only; nothing here is ever written to disk.
#[derive(Clone)]
pub struct Credentials {
    username: String,
    token: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            token: token.into(),
        }
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub(crate) fn token(&self) -> &str {
        &self.token
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("token", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RepositoryRef {
    pub owner: String,
    pub name: String,
    pub branch: String,
}

impl RepositoryRef {
    /// Builds a reference whose branch is always one of the allow-listed
    /// names or `default_branch`.
    pub fn new(
        owner: impl Into<String>,
        name: impl Into<String>,
        branch: &str,
        default_branch: &str,
    ) -> Self {
        Self {
            owner: owner.into(),
            name: name.into(),
            branch: normalize_branch(branch, default_branch),
        }
    }
}

impl fmt::Display for RepositoryRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}@{}", self.owner, self.name, self.branch)
    }
}

pub fn is_allowed_branch(branch: &str) -> bool {
    let branch = branch.trim();
    ALLOWED_BRANCHES
        .iter()
        .any(|allowed| allowed.eq_ignore_ascii_case(branch))
}

pub fn normalize_branch(requested: &str, default_branch: &str) -> String {
    let requested = requested.trim();
    if is_allowed_branch(requested) {
        return requested.to_ascii_lowercase();
    }
    let fallback = default_branch.trim();
    if fallback.is_empty() {
        DEFAULT_BRANCH.to_string()
    } else {
        fallback.to_string()
    }
}

/// Opaque content version identifier (`sha` on the wire).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RevisionToken(String);

impl RevisionToken {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RevisionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    File,
    Dir,
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct RemoteEntry {
    pub name: String,
    pub path: String,
    #[serde(rename = "type")]
    pub kind: EntryKind,
}

impl RemoteEntry {
    pub fn is_file(&self) -> bool {
        self.kind == EntryKind::File
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Metadata {
    pub exists: bool,
    pub revision: Option<RevisionToken>,
}

impl Metadata {
    pub fn absent() -> Self {
        Self {
            exists: false,
            revision: None,
        }
    }
}
