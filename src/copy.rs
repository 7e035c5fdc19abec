//! Native recursive copy used for stashing and merging trees.
//!
//! Both the stash copy and the post-build merge walk the source tree and mirror
//! its structure under the destination. They differ only in what happens when a
//! destination file already exists, see [`OverwritePolicy`].

use crate::error::{HookError, Result};

use std::fs;
use std::io;
use std::path::Path;
use tracing::debug;
use walkdir::WalkDir;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverwritePolicy {
    /// Replace destination files with the source version.
    Overwrite,
    /// Leave existing destination files untouched; only fill in missing ones.
    SkipExisting,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CopyReport {
    pub copied: usize,
    pub skipped: usize,
}

/// Copy the contents of `from` into `to`, creating `to` if needed.
///
/// Directory structure is preserved and file modification times are carried
/// over, so a file's age survives a round-trip through the stash or the cache.
/// Symlinks are recreated as links on unix and never followed.
pub fn copy_tree(from: &Path, to: &Path, policy: OverwritePolicy) -> Result<CopyReport> {
    let mut report = CopyReport::default();

    for entry in WalkDir::new(from).follow_links(false) {
        let entry = entry.map_err(|err| {
            let path = err.path().unwrap_or(from).to_path_buf();
            let source = err
                .into_io_error()
                .unwrap_or_else(|| io::Error::other("filesystem loop detected"));
            HookError::copy(path, to, source)
        })?;

        let source = entry.path();
        let relative = source
            .strip_prefix(from)
            .map_err(|_| HookError::copy(source, to, io::Error::other("path escapes copy root")))?;
        let target = to.join(relative);
        let file_type = entry.file_type();

        if file_type.is_dir() {
            fs::create_dir_all(&target).map_err(|err| HookError::copy(source, &target, err))?;
            continue;
        }

        match fs::symlink_metadata(&target) {
            Ok(_) if policy == OverwritePolicy::SkipExisting => {
                debug!(path = %target.display(), "kept existing file");
                report.skipped += 1;
                continue;
            }
            Ok(existing) if existing.is_symlink() || file_type.is_symlink() => {
                // never write through a link, and never leave a stale one behind
                fs::remove_file(&target).map_err(|err| HookError::copy(source, &target, err))?;
            }
            Ok(_) => {}
            Err(err) if err.kind() == io::ErrorKind::NotFound => {}
            Err(err) => return Err(HookError::copy(source, &target, err)),
        }

        if file_type.is_symlink() {
            copy_symlink(source, &target).map_err(|err| HookError::copy(source, &target, err))?;
        } else {
            copy_file(source, &target).map_err(|err| HookError::copy(source, &target, err))?;
        }
        debug!(from = %source.display(), to = %target.display(), "copied file");
        report.copied += 1;
    }

    Ok(report)
}

fn copy_file(from: &Path, to: &Path) -> io::Result<()> {
    let metadata = fs::metadata(from)?;
    let mut reader = fs::File::open(from)?;
    let mut writer = fs::File::create(to)?;
    io::copy(&mut reader, &mut writer)?;
    writer.set_modified(metadata.modified()?)?;
    drop(writer);
    // permissions last, a read-only source must not block the mtime update
    fs::set_permissions(to, metadata.permissions())
}

#[cfg(unix)]
fn copy_symlink(from: &Path, to: &Path) -> io::Result<()> {
    let link_target = fs::read_link(from)?;
    std::os::unix::fs::symlink(link_target, to)
}

#[cfg(not(unix))]
fn copy_symlink(from: &Path, to: &Path) -> io::Result<()> {
    copy_file(from, to)
}
