//! Pre-build and post-build phases of one pipeline run.
//!
//! ```text
//! NoCache ───────────────────────────────────────────────► Saved
//! Pruned ─► Stashed ─► (build) ─► Merged ─► Cleaned ─► Saved
//! ```
//!
//! There is no retry or rollback; the first error aborts the phase and is
//! returned to the host pipeline.

use crate::cache::CacheService;
use crate::config::HookConfig;
use crate::copy::CopyReport;
use crate::error::Result;
use crate::prune::{PruneEngine, PruneReport};
use crate::stash::StashState;
use crate::time::TtlPolicy;

use std::time::SystemTime;
use tracing::info;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PreBuildOutcome {
    /// The cache service had nothing for this path; nothing was pruned or stashed.
    NoCache,
    Stashed {
        prune: PruneReport,
        stash: CopyReport,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostBuildOutcome {
    /// `None` when no stash was present.
    pub merge: Option<CopyReport>,
}

/// Restore the cache, prune it, and park the pruned tree in the stash.
pub fn pre_build<C: CacheService + ?Sized>(
    cache: &C,
    config: &HookConfig,
    now: SystemTime,
) -> Result<PreBuildOutcome> {
    let path = config.path.as_path();

    if !cache.restore(path)? {
        info!(path = %path.display(), "no cache for build output, skipping prune");
        return Ok(PreBuildOutcome::NoCache);
    }

    let prune = PruneEngine::new(
        TtlPolicy::new(config.ttl_days, now),
        config.exclude.clone(),
    )
    .jobs(config.jobs)
    .prune(path)?;

    // every deletion has completed once prune returns
    let stash = config.stash.fill_from(path)?;

    Ok(PreBuildOutcome::Stashed { prune, stash })
}

/// Fold the stash back into the fresh build output, drop it, and save the cache.
///
/// Files produced by the build always win over stashed ones. The cache is saved
/// exactly once whether or not a merge happened.
pub fn post_build<C: CacheService + ?Sized>(
    cache: &C,
    config: &HookConfig,
) -> Result<PostBuildOutcome> {
    let path = config.path.as_path();

    let merge = match config.stash.state()? {
        StashState::Present => {
            let report = config.stash.merge_into(path)?;
            config.stash.remove()?;
            Some(report)
        }
        StashState::Absent => {
            info!(stash = %config.stash.path().display(), "no stash to merge");
            None
        }
    };

    cache.save(path)?;

    Ok(PostBuildOutcome { merge })
}
