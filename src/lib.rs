//! ttl-cache - Build Output Cache Hook
//!
//! ttl-cache keeps a build output directory cached between pipeline runs without
//! letting it grow forever. Before the build it restores the previous output,
//! prunes files older than a TTL or matching an exclude pattern, and stashes
//! what is left. After the build it merges the stash back into the fresh output,
//! never overwriting a freshly built file, and saves the result as the new cache.
//!
//! ## Architecture
//!
//! - [`paths`] and [`time`]: file listing, trailing-slash normalization, day arithmetic
//! - [`prune`]: TTL and exclude policy applied per file on a bounded worker pool
//! - [`copy`] and [`stash`]: native recursive copy with an explicit overwrite policy
//! - [`hook`]: the pre-build and post-build phases tied to a [`CacheService`]

pub mod cache;
pub mod config;
pub mod copy;
pub mod error;
pub mod hook;
pub mod logging;
pub mod paths;
pub mod patterns;
pub mod prune;
pub mod stash;
pub mod time;

// Re-export commonly used items
pub use cache::{CacheService, DirCache};
pub use config::{FileConfig, HookConfig, Overrides, Settings};
pub use copy::{copy_tree, CopyReport, OverwritePolicy};
pub use error::{HookError, Result};
pub use hook::{post_build, pre_build, PostBuildOutcome, PreBuildOutcome};
pub use paths::{list_files_recursively, with_trailing_slash};
pub use patterns::ExcludePattern;
pub use prune::{PruneEngine, PruneReport, Verdict};
pub use stash::{Stash, StashState};
pub use time::{days_apart, parse_date, parse_ttl, TtlPolicy};
