use std::path::{Component, Path, PathBuf};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PathError {
    #[error("path is empty")]
    Empty,
    #[error("path {0} contains unsupported component")]
    UnsupportedComponent(String),
}

/// Splits raw user input on commas and whitespace, dropping empty entries.
pub fn normalize_paths(input: &str) -> Vec<String> {
    input
        .split(|c: char| c == ',' || c.is_whitespace())
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(str::to_string)
        .collect()
}

/// Maps a local relative path to the slash-separated path used on the remote.
pub fn remote_path_for(local: &str) -> Result<String, PathError> {
    let mut parts = Vec::new();
    for component in Path::new(local).components() {
        match component {
            Component::Normal(part) => parts.push(part.to_string_lossy().into_owned()),
            Component::CurDir => continue,
            Component::RootDir | Component::ParentDir | Component::Prefix(_) => {
                return Err(PathError::UnsupportedComponent(local.to_string()));
            }
        }
    }
    if parts.is_empty() {
        return Err(PathError::Empty);
    }
    Ok(parts.join("/"))
}

pub fn local_path_for(root: &Path, remote_path: &str) -> Result<PathBuf, PathError> {
    if remote_path.trim_matches('/').is_empty() {
        return Err(PathError::Empty);
    }

    // Remote paths are POSIX-like ("docs/a.txt"); map them under root.
    let mut out = root.to_path_buf();
    for component in Path::new(remote_path).components() {
        match component {
            Component::Normal(part) => out.push(part),
            Component::RootDir | Component::CurDir => continue,
            Component::ParentDir | Component::Prefix(_) => {
                return Err(PathError::UnsupportedComponent(remote_path.to_string()));
            }
        }
    }
    Ok(out)
}

/// Directory holding `remote_path`; the repository root is `""`.
pub fn parent_dir(remote_path: &str) -> &str {
    remote_path
        .trim_matches('/')
        .rsplit_once('/')
        .map(|(dir, _)| dir)
        .unwrap_or("")
}
