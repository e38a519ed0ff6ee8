use std::fs;
use std::path::{Path, PathBuf};

/// Picks a destination that does not refer to an existing local file:
/// `candidate` itself if free, else `stem(1)ext`, `stem(2)ext`, ...
///
/// The answer reflects the filesystem at call time only; nothing is locked.
pub fn unique_name(candidate: &Path) -> PathBuf {
    if !occupied(candidate) {
        return candidate.to_path_buf();
    }

    let file_name = candidate
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    let (stem, ext) = split_extension(&file_name);

    let mut counter = 1u64;
    loop {
        let probe = candidate.with_file_name(format!("{stem}({counter}){ext}"));
        if !occupied(&probe) {
            return probe;
        }
        counter += 1;
    }
}

/// `"a.tar.gz"` splits into `("a.tar", ".gz")`. Dotfiles have no extension,
/// as with `Path::extension`, so `.env` becomes `.env(1)` rather than
/// `(1).env`.
fn split_extension(name: &str) -> (&str, &str) {
    match name.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => name.split_at(stem.len()),
        _ => (name, ""),
    }
}

fn occupied(path: &Path) -> bool {
    fs::symlink_metadata(path).is_ok()
}
