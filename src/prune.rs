//! TTL and exclude-pattern pruning of a restored cache tree.
//!
//! Every file below the root is evaluated independently: it is removed when its
//! path matches the exclude pattern OR its age exceeds the TTL. Evaluations run
//! on a bounded rayon pool and all of them finish before [`PruneEngine::prune`]
//! returns, so callers can copy the tree right after.

use crate::error::{HookError, Result};
use crate::paths::list_files_recursively;
use crate::patterns::ExcludePattern;
use crate::time::TtlPolicy;

use rayon::prelude::*;
use rayon::ThreadPoolBuilder;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::{debug, info};

/// Why a file was (or was not) pruned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Keep,
    /// Path matched the exclude pattern. Takes precedence over expiry.
    Excluded,
    Expired,
}

impl Verdict {
    pub fn is_removal(self) -> bool {
        self != Verdict::Keep
    }
}

/// Statistics about a prune pass
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PruneReport {
    pub scanned: usize,
    pub expired: usize,
    pub excluded: usize,
    pub bytes_removed: u64,
    /// Removed paths (or paths that would be removed in dry-run mode), sorted.
    pub removed: Vec<PathBuf>,
    pub dry_run: bool,
}

impl PruneReport {
    pub fn kept(&self) -> usize {
        self.scanned - self.removed.len()
    }
}

struct FileOutcome {
    path: PathBuf,
    verdict: Verdict,
    size: u64,
}

pub struct PruneEngine {
    policy: TtlPolicy,
    exclude: ExcludePattern,
    jobs: Option<usize>,
    dry_run: bool,
}

impl PruneEngine {
    pub fn new(policy: TtlPolicy, exclude: ExcludePattern) -> Self {
        PruneEngine {
            policy,
            exclude,
            jobs: None,
            dry_run: false,
        }
    }

    /// Cap the number of concurrent per-file workers. Defaults to the number of CPUs.
    pub fn jobs(mut self, jobs: Option<usize>) -> Self {
        self.jobs = jobs;
        self
    }

    /// Evaluate files without deleting them.
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn evaluate(&self, path: &Path, mtime: SystemTime) -> Verdict {
        if self.exclude.is_match(path) {
            Verdict::Excluded
        } else if self.policy.is_expired(mtime) {
            Verdict::Expired
        } else {
            Verdict::Keep
        }
    }

    /// Remove every file below `root` that is excluded or past its TTL.
    ///
    /// The first stat or unlink failure aborts the pass; files already removed
    /// by other workers stay removed.
    pub fn prune(&self, root: &Path) -> Result<PruneReport> {
        let files = list_files_recursively(root)?;

        let pool = ThreadPoolBuilder::new()
            .num_threads(self.jobs.unwrap_or(0))
            .thread_name(|i| format!("ttl-prune-{i}"))
            .build()?;

        let outcomes: Vec<FileOutcome> = pool.install(|| {
            files
                .par_iter()
                .map(|path| self.prune_file(path))
                .collect::<Result<Vec<_>>>()
        })?;

        let mut report = PruneReport {
            scanned: outcomes.len(),
            dry_run: self.dry_run,
            ..PruneReport::default()
        };

        for outcome in outcomes {
            match outcome.verdict {
                Verdict::Keep => continue,
                Verdict::Excluded => report.excluded += 1,
                Verdict::Expired => report.expired += 1,
            }
            report.bytes_removed += outcome.size;
            report.removed.push(outcome.path);
        }
        report.removed.sort();

        info!(
            root = %root.display(),
            scanned = report.scanned,
            expired = report.expired,
            excluded = report.excluded,
            dry_run = self.dry_run,
            "prune complete"
        );

        Ok(report)
    }

    fn prune_file(&self, path: &Path) -> Result<FileOutcome> {
        // symlink_metadata so a link is judged by its own mtime and never followed
        let metadata = fs::symlink_metadata(path).map_err(|err| HookError::io(path, err))?;
        let mtime = metadata.modified().map_err(|err| HookError::io(path, err))?;

        let verdict = self.evaluate(path, mtime);
        if verdict.is_removal() {
            if !self.dry_run {
                fs::remove_file(path).map_err(|err| HookError::io(path, err))?;
            }
            debug!(path = %path.display(), ?verdict, dry_run = self.dry_run, "pruned file");
        }

        Ok(FileOutcome {
            path: path.to_path_buf(),
            verdict,
            size: metadata.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::days;
    use filetime::FileTime;
    use std::time::{Duration, UNIX_EPOCH};
    use tempfile::{tempdir, TempDir};

    fn reference() -> SystemTime {
        UNIX_EPOCH + Duration::from_secs(1_700_000_000)
    }

    fn write_aged(root: &Path, rel: &str, age: Duration) -> PathBuf {
        let path = root.join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, rel).unwrap();
        let mtime = reference() - age;
        filetime::set_file_mtime(&path, FileTime::from_system_time(mtime)).unwrap();
        path
    }

    fn engine(ttl: u64, exclude: &str) -> PruneEngine {
        PruneEngine::new(
            TtlPolicy::new(ttl, reference()),
            ExcludePattern::new(exclude).unwrap(),
        )
    }

    fn setup(files: &[(&str, u64)]) -> TempDir {
        let dir = tempdir().unwrap();
        for (rel, age_days) in files {
            write_aged(dir.path(), rel, days(*age_days));
        }
        dir
    }

    #[test]
    fn test_removes_only_expired_files() {
        let dir = setup(&[("a.txt", 1), ("b.txt", 15)]);

        let report = engine(10, "a^").prune(dir.path()).unwrap();

        assert!(dir.path().join("a.txt").exists());
        assert!(!dir.path().join("b.txt").exists());
        assert_eq!(report.scanned, 2);
        assert_eq!(report.expired, 1);
        assert_eq!(report.excluded, 0);
        assert_eq!(report.removed, vec![dir.path().join("b.txt")]);
    }

    #[test]
    fn test_removes_excluded_files_regardless_of_age() {
        let dir = setup(&[("x.png", 1), ("y.txt", 1)]);

        let report = engine(10, r".*\.png$").prune(dir.path()).unwrap();

        assert!(!dir.path().join("x.png").exists());
        assert!(dir.path().join("y.txt").exists());
        assert_eq!(report.excluded, 1);
        assert_eq!(report.expired, 0);
    }

    #[test]
    fn test_exclusion_and_expiry_are_ored() {
        let dir = setup(&[
            ("fresh.png", 1),
            ("old.png", 30),
            ("old.js", 30),
            ("nested/fresh.js", 2),
            ("nested/deep/old.css", 11),
        ]);

        let report = engine(10, r"\.png$").prune(dir.path()).unwrap();

        assert!(!dir.path().join("fresh.png").exists());
        assert!(!dir.path().join("old.png").exists());
        assert!(!dir.path().join("old.js").exists());
        assert!(dir.path().join("nested/fresh.js").exists());
        assert!(!dir.path().join("nested/deep/old.css").exists());
        // old.png counts as excluded, not expired
        assert_eq!(report.excluded, 2);
        assert_eq!(report.expired, 2);
        assert_eq!(report.kept(), 1);
    }

    #[test]
    fn test_file_exactly_at_ttl_survives() {
        let dir = tempdir().unwrap();
        let at_limit = write_aged(dir.path(), "limit.txt", days(10));
        let past_limit = write_aged(dir.path(), "past.txt", days(10) + Duration::from_secs(1));

        engine(10, "a^").prune(dir.path()).unwrap();

        assert!(at_limit.exists());
        assert!(!past_limit.exists());
    }

    #[test]
    fn test_directories_are_left_in_place() {
        let dir = setup(&[("assets/old.js", 40)]);

        engine(10, "a^").prune(dir.path()).unwrap();

        assert!(dir.path().join("assets").is_dir());
        assert!(!dir.path().join("assets/old.js").exists());
    }

    #[test]
    fn test_dry_run_deletes_nothing() {
        let dir = setup(&[("old.txt", 40), ("x.png", 1)]);

        let report = engine(10, r"\.png$")
            .dry_run(true)
            .prune(dir.path())
            .unwrap();

        assert!(report.dry_run);
        assert_eq!(report.removed.len(), 2);
        assert!(dir.path().join("old.txt").exists());
        assert!(dir.path().join("x.png").exists());
    }

    #[test]
    fn test_bytes_removed_counts_deleted_files() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("old.bin");
        fs::write(&path, vec![0u8; 1024]).unwrap();
        filetime::set_file_mtime(&path, FileTime::from_system_time(reference() - days(30)))
            .unwrap();

        let report = engine(10, "a^").prune(dir.path()).unwrap();

        assert_eq!(report.bytes_removed, 1024);
    }

    #[test]
    fn test_single_worker_prunes_everything() {
        let files: Vec<(String, u64)> = (0..50).map(|i| (format!("f{i}.txt"), 20)).collect();
        let dir = tempdir().unwrap();
        for (rel, age) in &files {
            write_aged(dir.path(), rel, days(*age));
        }

        let report = engine(10, "a^").jobs(Some(1)).prune(dir.path()).unwrap();

        assert_eq!(report.expired, 50);
        assert!(list_files_recursively(dir.path()).unwrap().is_empty());
    }

    #[test]
    fn test_missing_root_fails() {
        let dir = tempdir().unwrap();
        let result = engine(10, "a^").prune(&dir.path().join("missing"));
        assert!(matches!(result, Err(HookError::Io { .. })));
    }

    #[test]
    fn test_empty_root_is_a_noop() {
        let dir = tempdir().unwrap();
        let report = engine(10, "a^").prune(dir.path()).unwrap();
        assert_eq!(report, PruneReport::default());
    }

    #[test]
    fn test_evaluate_prefers_exclusion() {
        let engine = engine(10, r"\.map$");
        let old = reference() - days(100);
        assert_eq!(engine.evaluate(Path::new("a.js.map"), old), Verdict::Excluded);
        assert_eq!(engine.evaluate(Path::new("a.js"), old), Verdict::Expired);
        assert_eq!(engine.evaluate(Path::new("a.js"), reference()), Verdict::Keep);
    }
}
