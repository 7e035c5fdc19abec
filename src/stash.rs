//! Staging directory bridging the pre-build and post-build phases.

use crate::copy::{copy_tree, CopyReport, OverwritePolicy};
use crate::error::{HookError, Result};
use crate::paths::contents_of;

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

pub const DEFAULT_STASH_DIR: &str = ".ttl-cache-stash";

/// Result of probing the stash location.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StashState {
    Present,
    Absent,
}

/// The pruned pre-build tree, parked outside the build output until the build finishes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stash {
    dir: PathBuf,
}

impl Default for Stash {
    fn default() -> Self {
        Stash::new(DEFAULT_STASH_DIR)
    }
}

impl Stash {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Stash { dir: dir.into() }
    }

    pub fn path(&self) -> &Path {
        &self.dir
    }

    /// Only "not found" counts as absent. Permission and other I/O failures are
    /// errors, and so is a non-directory sitting at the stash path.
    pub fn state(&self) -> Result<StashState> {
        match fs::symlink_metadata(&self.dir) {
            Ok(meta) if meta.is_dir() => Ok(StashState::Present),
            Ok(_) => Err(HookError::Stash {
                path: self.dir.clone(),
                source: io::Error::other("stash path exists but is not a directory"),
            }),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(StashState::Absent),
            Err(source) => Err(HookError::Stash {
                path: self.dir.clone(),
                source,
            }),
        }
    }

    /// Deep-copy `source` into the stash.
    ///
    /// A stash left behind by an interrupted run is discarded first so the stash
    /// mirrors `source` exactly.
    pub fn fill_from(&self, source: &Path) -> Result<CopyReport> {
        if self.state()? == StashState::Present {
            warn!(stash = %self.dir.display(), "replacing stash left by a previous run");
            self.remove()?;
        }

        let report = copy_tree(source, &self.dir, OverwritePolicy::Overwrite)?;
        info!(
            from = %source.display(),
            stash = %self.dir.display(),
            files = report.copied,
            "stashed pruned tree"
        );
        Ok(report)
    }

    /// Copy stashed files into `dest` wherever `dest` has no file at the same relative path.
    pub fn merge_into(&self, dest: &Path) -> Result<CopyReport> {
        let from = contents_of(&self.dir);
        let to = contents_of(dest);
        let report = copy_tree(&from, &to, OverwritePolicy::SkipExisting)?;
        info!(
            stash = %from.display(),
            dest = %to.display(),
            copied = report.copied,
            skipped = report.skipped,
            "merged stash into build output"
        );
        Ok(report)
    }

    pub fn remove(&self) -> Result<()> {
        fs::remove_dir_all(&self.dir).map_err(|err| HookError::io(&self.dir, err))
    }
}
