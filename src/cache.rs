//! Cache storage backends.
//!
//! The hook only ever talks to a [`CacheService`], addressing entries by the
//! build-output path. [`DirCache`] is the bundled backend: one directory per
//! path under a cache root on the local filesystem.

use crate::copy::{copy_tree, OverwritePolicy};
use crate::error::{HookError, Result};

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

pub const DEFAULT_CACHE_DIR: &str = ".ttl-cache";

pub trait CacheService {
    /// Materialize the cached tree for `path` at `path`.
    ///
    /// Returns false when nothing is cached for `path`.
    fn restore(&self, path: &Path) -> Result<bool>;

    /// Persist the tree currently at `path` as the new cache entry for `path`.
    fn save(&self, path: &Path) -> Result<()>;
}

/// Filesystem cache keyed by build-output path.
#[derive(Debug, Clone)]
pub struct DirCache {
    root: PathBuf,
}

impl DirCache {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        DirCache { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory holding the cached tree for `path`.
    pub fn entry_dir(&self, path: &Path) -> PathBuf {
        self.root.join(cache_key(path))
    }

    fn entry_exists(&self, entry: &Path) -> Result<bool> {
        match fs::symlink_metadata(entry) {
            Ok(meta) => Ok(meta.is_dir()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(err) => Err(HookError::cache("restore", entry, err)),
        }
    }
}

impl CacheService for DirCache {
    fn restore(&self, path: &Path) -> Result<bool> {
        let entry = self.entry_dir(path);
        if !self.entry_exists(&entry)? {
            info!(path = %path.display(), "no cache entry to restore");
            return Ok(false);
        }

        let report = copy_tree(&entry, path, OverwritePolicy::Overwrite)
            .map_err(|err| HookError::cache("restore", path, err))?;
        info!(
            path = %path.display(),
            entry = %entry.display(),
            files = report.copied,
            "restored cache"
        );
        Ok(true)
    }

    fn save(&self, path: &Path) -> Result<()> {
        match fs::symlink_metadata(path) {
            Ok(meta) if meta.is_dir() => {}
            Ok(_) => {
                return Err(HookError::cache(
                    "save",
                    path,
                    io::Error::other("build output is not a directory"),
                ))
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                warn!(path = %path.display(), "build output missing, nothing to cache");
                return Ok(());
            }
            Err(err) => return Err(HookError::cache("save", path, err)),
        }

        let key = cache_key(path);
        let entry = self.root.join(&key);
        // '%' is always followed by two hex digits in a key, so this never names a live entry
        let staging = self.root.join(format!("{key}%partial"));

        // Copy next to the live entry, then swap, so a failed save leaves the old entry intact
        if staging.exists() {
            fs::remove_dir_all(&staging).map_err(|err| HookError::cache("save", &staging, err))?;
        }
        let report = copy_tree(path, &staging, OverwritePolicy::Overwrite)
            .map_err(|err| HookError::cache("save", path, err))?;

        if entry.exists() {
            fs::remove_dir_all(&entry).map_err(|err| HookError::cache("save", &entry, err))?;
        }
        fs::rename(&staging, &entry).map_err(|err| HookError::cache("save", &entry, err))?;

        info!(
            path = %path.display(),
            entry = %entry.display(),
            files = report.copied,
            "saved cache"
        );
        Ok(())
    }
}

/// Injective, filesystem-safe encoding of a path.
///
/// Bytes outside `[A-Za-z0-9._-]` become `%XX`, so `a/b` and `a_b` never share an entry.
pub fn cache_key(path: &Path) -> String {
    let raw = path.as_os_str().as_encoded_bytes();
    let trimmed = match raw.iter().rposition(|b| *b != b'/') {
        Some(last) => &raw[..=last],
        None => raw,
    };

    let mut key = String::with_capacity(trimmed.len());
    for &byte in trimmed {
        if byte.is_ascii_alphanumeric() || matches!(byte, b'-' | b'_') {
            key.push(byte as char);
        } else if byte == b'.' && !key.is_empty() {
            key.push('.');
        } else {
            key.push_str(&format!("%{byte:02X}"));
        }
    }

    if key.is_empty() {
        key.push_str("%root");
    }
    key
}
