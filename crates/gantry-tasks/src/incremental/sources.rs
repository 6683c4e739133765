//! Source and target sets

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use super::paths::{GlobSources, PathInfo, Timestamp};

/// A restartable, lazy sequence of inspected input paths.
///
/// Each call to [`Sources::paths`] starts a fresh sequence so that changes on
/// disk between two checks are observed.
pub trait Sources: Send + Sync + fmt::Debug {
    fn paths(&self) -> Box<dyn Iterator<Item = PathInfo> + '_>;

    /// Only the regular files among [`Sources::paths`]
    fn regular_files(&self) -> Box<dyn Iterator<Item = PathInfo> + '_> {
        Box::new(self.paths().filter(|p| p.is_regular_file))
    }

    /// Short description used in logs and errors
    fn describe(&self) -> String;
}

impl Sources for GlobSources {
    fn paths(&self) -> Box<dyn Iterator<Item = PathInfo> + '_> {
        Box::new(self.walk())
    }

    fn describe(&self) -> String {
        format!("{}/{}", self.root().display(), self.pattern())
    }
}

/// An explicit list of source paths; missing ones are left out
#[derive(Debug, Clone, Default)]
pub struct FixedSources {
    paths: Vec<PathBuf>,
}

impl FixedSources {
    pub fn new<I, P>(paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Self {
            paths: paths.into_iter().map(Into::into).collect(),
        }
    }
}

impl Sources for FixedSources {
    fn paths(&self) -> Box<dyn Iterator<Item = PathInfo> + '_> {
        Box::new(self.paths.iter().filter_map(|p| PathInfo::inspect(p).ok()))
    }

    fn describe(&self) -> String {
        match self.paths.as_slice() {
            [single] => single.display().to_string(),
            many => format!("{} paths", many.len()),
        }
    }
}

/// A fixed set of output paths
#[derive(Debug, Clone, Default)]
pub struct Targets {
    paths: Vec<PathBuf>,
    eldest: OnceLock<Timestamp>,
}

impl Targets {
    pub fn new<I, P>(paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Self {
            paths: paths.into_iter().map(Into::into).collect(),
            eldest: OnceLock::new(),
        }
    }

    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// The oldest modification time across all outputs.
    ///
    /// `InfinitelyNew` when there are no outputs, `InfinitelyOld` when any
    /// output does not exist. Computed once per instance.
    pub fn eldest_modification_time(&self) -> Timestamp {
        *self.eldest.get_or_init(|| eldest_of(&self.paths))
    }

    /// Whether any regular source file is at least as new as the eldest output
    pub fn requires_rebuild(&self, sources: &dyn Sources) -> bool {
        let eldest = self.eldest_modification_time();
        if eldest == Timestamp::InfinitelyOld {
            return true;
        }
        sources.regular_files().any(|source| source.last_modified >= eldest)
    }
}

fn eldest_of(paths: &[PathBuf]) -> Timestamp {
    let mut eldest = Timestamp::InfinitelyNew;
    for path in paths {
        match Timestamp::of(Path::new(path)) {
            Some(modified) => eldest = eldest.min(modified),
            None => return Timestamp::InfinitelyOld,
        }
    }
    eldest
}
