//! Exclude-pattern matching over full file paths.

use crate::error::{HookError, Result};
use regex::Regex;
use std::path::Path;

/// Regular expression selecting files that are pruned regardless of age.
///
/// The expression is searched for anywhere in the file's full path, so anchor
/// it (`^`, `$`) to match a prefix or suffix. An empty pattern matches nothing.
#[derive(Debug, Clone, Default)]
pub struct ExcludePattern {
    regex: Option<Regex>,
}

impl ExcludePattern {
    /// Compile `pattern`. Fails before any file is touched if the expression is malformed.
    pub fn new(pattern: &str) -> Result<Self> {
        if pattern.trim().is_empty() {
            return Ok(Self::none());
        }

        let regex = Regex::new(pattern).map_err(|source| HookError::Pattern {
            pattern: pattern.to_string(),
            source,
        })?;

        Ok(ExcludePattern { regex: Some(regex) })
    }

    /// A pattern that never matches.
    pub fn none() -> Self {
        ExcludePattern { regex: None }
    }

    pub fn from_option(pattern: Option<&str>) -> Result<Self> {
        pattern.map_or_else(|| Ok(Self::none()), Self::new)
    }

    pub fn is_match(&self, path: &Path) -> bool {
        match &self.regex {
            Some(regex) => regex.is_match(&path.to_string_lossy()),
            None => false,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        self.regex.as_ref().map(Regex::as_str)
    }
}
