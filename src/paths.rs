//! Path helpers: recursive file listing and trailing-slash normalization.

use crate::error::{HookError, Result};
use std::io;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// List every non-directory entry below `root`.
///
/// Directories are descended into but never yielded. Symlinks are yielded as
/// entries of their own and not followed. Order follows directory iteration
/// and is not stable across calls.
///
/// A missing or unreadable `root` is an error rather than an empty listing.
pub fn list_files_recursively(root: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    for entry in WalkDir::new(root).follow_links(false) {
        let entry = entry.map_err(|err| walk_error(root, err))?;
        if !entry.file_type().is_dir() {
            files.push(entry.into_path());
        }
    }

    Ok(files)
}

fn walk_error(root: &Path, err: walkdir::Error) -> HookError {
    let path = err.path().unwrap_or(root).to_path_buf();
    let source = err
        .into_io_error()
        .unwrap_or_else(|| io::Error::other("filesystem loop detected"));
    HookError::io(path, source)
}

/// Append `/` unless `path` already ends with one.
pub fn with_trailing_slash(path: &str) -> String {
    if path.ends_with('/') {
        path.to_string()
    } else {
        format!("{path}/")
    }
}

/// [`with_trailing_slash`] for paths that are not guaranteed to be UTF-8.
///
/// A trailing slash marks "the contents of this directory" when handed to the
/// merge step.
pub fn contents_of(path: &Path) -> PathBuf {
    let mut raw = path.as_os_str().to_os_string();
    if !raw.as_encoded_bytes().ends_with(b"/") {
        raw.push("/");
    }
    PathBuf::from(raw)
}
