//! Configuration: optional `ttl-cache.toml` file, command-line overrides, defaults.
//!
//! Precedence is command line, then file, then built-in defaults. Values are
//! validated while resolving, so a bad exclude expression fails before any file
//! is touched. Stash and cache placement is checked separately by
//! [`Settings::validate_storage`], since only the hook phases use them.

use crate::cache::DEFAULT_CACHE_DIR;
use crate::error::{HookError, Result};
use crate::patterns::ExcludePattern;
use crate::stash::{Stash, DEFAULT_STASH_DIR};
use crate::time::parse_ttl;

use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Component, Path, PathBuf};

pub const CONFIG_FILE_NAME: &str = "ttl-cache.toml";
pub const DEFAULT_TTL_DAYS: u64 = 30;

/// TTL as written in the config file: `ttl = 15` or `ttl = "2w"`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum TtlValue {
    Days(u64),
    Text(String),
}

impl TtlValue {
    fn days(&self) -> Result<u64> {
        match self {
            TtlValue::Days(days) => Ok(*days),
            TtlValue::Text(text) => parse_ttl(text),
        }
    }
}

/// Contents of `ttl-cache.toml`. Every key is optional.
#[derive(Debug, Default, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub path: Option<PathBuf>,
    pub ttl: Option<TtlValue>,
    pub exclude: Option<String>,
    pub stash_dir: Option<PathBuf>,
    pub cache_dir: Option<PathBuf>,
    pub jobs: Option<usize>,
}

impl FileConfig {
    pub fn parse(contents: &str, origin: &Path) -> Result<Self> {
        toml::from_str(contents).map_err(|err| {
            HookError::Config(format!("failed to parse {}: {}", origin.display(), err))
        })
    }

    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path).map_err(|err| HookError::io(path, err))?;
        Self::parse(&contents, path)
    }

    /// Load `explicit` if given, otherwise `ttl-cache.toml` in `dir` when it exists.
    pub fn discover(explicit: Option<&Path>, dir: &Path) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load(path);
        }

        let candidate = dir.join(CONFIG_FILE_NAME);
        if candidate.is_file() {
            Self::load(&candidate)
        } else {
            Ok(Self::default())
        }
    }
}

/// Values supplied on the command line.
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    pub path: Option<PathBuf>,
    pub ttl: Option<String>,
    pub exclude: Option<String>,
    pub stash_dir: Option<PathBuf>,
    pub cache_dir: Option<PathBuf>,
    pub jobs: Option<usize>,
}

/// Inputs of one pipeline run.
#[derive(Debug, Clone)]
pub struct HookConfig {
    /// Build output directory to prune, merge into and cache.
    pub path: PathBuf,
    pub ttl_days: u64,
    pub exclude: ExcludePattern,
    pub stash: Stash,
    /// Prune worker limit; `None` uses one worker per CPU.
    pub jobs: Option<usize>,
}

impl HookConfig {
    pub fn new(path: impl Into<PathBuf>, ttl_days: u64, exclude: ExcludePattern) -> Self {
        HookConfig {
            path: path.into(),
            ttl_days,
            exclude,
            stash: Stash::default(),
            jobs: None,
        }
    }

    pub fn with_stash(mut self, stash: Stash) -> Self {
        self.stash = stash;
        self
    }

    pub fn with_jobs(mut self, jobs: Option<usize>) -> Self {
        self.jobs = jobs;
        self
    }
}

/// Fully resolved settings for the binary.
#[derive(Debug, Clone)]
pub struct Settings {
    pub hook: HookConfig,
    pub cache_dir: PathBuf,
}

impl Settings {
    pub fn resolve(file: FileConfig, overrides: Overrides) -> Result<Self> {
        let path = overrides.path.or(file.path).ok_or_else(|| {
            HookError::Config(format!(
                "no build output path given; pass --path or set `path` in {}",
                CONFIG_FILE_NAME
            ))
        })?;

        let ttl_days = match (overrides.ttl, file.ttl) {
            (Some(text), _) => parse_ttl(&text)?,
            (None, Some(value)) => value.days()?,
            (None, None) => DEFAULT_TTL_DAYS,
        };

        let exclude = ExcludePattern::from_option(overrides.exclude.or(file.exclude).as_deref())?;

        let stash_dir = overrides
            .stash_dir
            .or(file.stash_dir)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_STASH_DIR));
        let cache_dir = overrides
            .cache_dir
            .or(file.cache_dir)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CACHE_DIR));

        let jobs = overrides.jobs.or(file.jobs);
        if jobs == Some(0) {
            return Err(HookError::Config("jobs must be at least 1".to_string()));
        }

        Ok(Settings {
            hook: HookConfig::new(path, ttl_days, exclude)
                .with_stash(Stash::new(stash_dir))
                .with_jobs(jobs),
            cache_dir,
        })
    }

    /// Reject a stash or cache directory that overlaps the build output.
    ///
    /// Required before `pre-build`/`post-build`; a plain prune never touches either.
    pub fn validate_storage(&self) -> Result<()> {
        let path = &self.hook.path;
        ensure_disjoint(path, "stash directory", self.hook.stash.path())?;
        ensure_disjoint(path, "cache directory", &self.cache_dir)
    }
}

/// `other` must be neither the build path, inside it, nor one of its ancestors.
fn ensure_disjoint(path: &Path, label: &str, other: &Path) -> Result<()> {
    let cwd = env::current_dir().map_err(|err| HookError::io(".", err))?;
    let a = lexical_absolute(&cwd, path);
    let b = lexical_absolute(&cwd, other);

    if a.starts_with(&b) || b.starts_with(&a) {
        return Err(HookError::Config(format!(
            "{} {} overlaps build output {}",
            label,
            other.display(),
            path.display()
        )));
    }
    Ok(())
}

/// Absolute form of `path` with `.` and `..` resolved without touching the filesystem.
fn lexical_absolute(cwd: &Path, path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in cwd.join(path).components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other),
        }
    }
    out
}
