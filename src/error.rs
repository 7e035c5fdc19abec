//! Error types shared by every stage of the hook.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, HookError>;

/// Boxed error returned by [`crate::cache::CacheService`] backends.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Error)]
pub enum HookError {
    /// Listing, stat, unlink or directory removal failed.
    #[error("I/O error on {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The exclude expression did not compile. Raised before any file is touched.
    #[error("invalid exclude pattern '{pattern}'")]
    Pattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    /// A file or directory could not be copied into the stash or merged back.
    #[error("failed to copy {} to {}", from.display(), to.display())]
    Copy {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The stash directory exists but could not be inspected.
    #[error("cannot inspect stash directory {}", path.display())]
    Stash {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("cache {operation} failed for {}", path.display())]
    Cache {
        operation: &'static str,
        path: PathBuf,
        #[source]
        source: BoxError,
    },

    #[error("failed to start prune workers")]
    WorkerPool(#[from] rayon::ThreadPoolBuildError),

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl HookError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        HookError::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn copy(from: impl Into<PathBuf>, to: impl Into<PathBuf>, source: io::Error) -> Self {
        HookError::Copy {
            from: from.into(),
            to: to.into(),
            source,
        }
    }

    pub(crate) fn cache(
        operation: &'static str,
        path: impl Into<PathBuf>,
        source: impl Into<BoxError>,
    ) -> Self {
        HookError::Cache {
            operation,
            path: path.into(),
            source: source.into(),
        }
    }
}
