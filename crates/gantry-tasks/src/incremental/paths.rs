//! Path inspection and glob-based discovery

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use globset::{GlobBuilder, GlobMatcher};
use tracing::debug;
use walkdir::WalkDir;

use super::DependencyError;

/// A modification time with sentinels at both ends.
///
/// Ordering is `InfinitelyOld < At(_) < InfinitelyNew`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Timestamp {
    /// Older than any real file, used for declared outputs that do not exist
    InfinitelyOld,
    /// A real modification time
    At(SystemTime),
    /// Newer than any real file, used when there are no outputs at all
    InfinitelyNew,
}

impl Timestamp {
    pub fn of(path: &Path) -> Option<Self> {
        std::fs::metadata(path)
            .and_then(|m| m.modified())
            .ok()
            .map(Self::At)
    }
}

/// Attributes of a discovered filesystem entry, snapshotted at discovery
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathInfo {
    /// Path as discovered
    pub path: PathBuf,
    /// Canonical path with symlinks resolved
    pub real_path: PathBuf,
    pub is_regular_file: bool,
    pub last_modified: Timestamp,
}

impl PathInfo {
    /// Inspect a path, following symlinks
    pub fn inspect(path: &Path) -> std::io::Result<Self> {
        let real_path = std::fs::canonicalize(path)?;
        let metadata = std::fs::metadata(&real_path)?;
        Ok(Self {
            path: path.to_path_buf(),
            real_path,
            is_regular_file: metadata.is_file(),
            last_modified: Timestamp::At(metadata.modified()?),
        })
    }
}

/// Entries under a root directory matched by a glob pattern.
///
/// The pattern is matched against paths relative to `root`, with `*` not
/// crossing directory separators. Every call to
/// [`GlobSources::walk`] walks the filesystem again.
#[derive(Clone)]
pub struct GlobSources {
    root: PathBuf,
    pattern: String,
    matcher: GlobMatcher,
}

impl GlobSources {
    pub fn new(root: impl Into<PathBuf>, pattern: impl Into<String>) -> Result<Self, DependencyError> {
        let pattern = pattern.into();
        let matcher = GlobBuilder::new(&pattern)
            .literal_separator(true)
            .build()
            .map_err(|source| DependencyError::InvalidPattern {
                pattern: pattern.clone(),
                source,
            })?
            .compile_matcher();
        Ok(Self {
            root: root.into(),
            pattern,
            matcher,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Lazily walk the root, yielding matched entries
    pub fn walk(&self) -> impl Iterator<Item = PathInfo> + '_ {
        WalkDir::new(&self.root)
            .follow_links(true)
            .min_depth(1)
            .into_iter()
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry),
                Err(e) => {
                    debug!(root = %self.root.display(), error = %e, "skipping unreadable entry");
                    None
                }
            })
            .filter(|entry| {
                entry
                    .path()
                    .strip_prefix(&self.root)
                    .is_ok_and(|relative| self.matcher.is_match(relative))
            })
            .filter_map(|entry| PathInfo::inspect(entry.path()).ok())
    }
}

impl fmt::Debug for GlobSources {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GlobSources")
            .field("root", &self.root)
            .field("pattern", &self.pattern)
            .finish()
    }
}
