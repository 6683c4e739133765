//! Build dependencies: composable "requires rebuild" predicates

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use tracing::debug;

use super::paths::PathInfo;
use super::sources::{FixedSources, Sources, Targets};
use super::DependencyError;

/// Decides whether the work guarded by it has to run again
pub trait BuildDependency: Send + Sync + fmt::Debug {
    fn requires_rebuild(&self) -> bool;
}

pub type SharedDependency = Arc<dyn BuildDependency>;

/// Rebuild when any source is at least as new as the eldest target
#[derive(Debug)]
pub struct FileDependency {
    sources: Arc<dyn Sources>,
    targets: Targets,
}

impl FileDependency {
    pub fn new(sources: Arc<dyn Sources>, targets: Targets) -> Self {
        Self { sources, targets }
    }
}

impl BuildDependency for FileDependency {
    fn requires_rebuild(&self) -> bool {
        let rebuild = self.targets.requires_rebuild(self.sources.as_ref());
        debug!(sources = %self.sources.describe(), targets = self.targets.paths().len(), rebuild, "checked file dependency");
        rebuild
    }
}

/// Logical OR of two dependencies; both sides are evaluated
#[derive(Debug)]
pub struct MergedDependency {
    left: SharedDependency,
    right: SharedDependency,
}

impl BuildDependency for MergedDependency {
    fn requires_rebuild(&self) -> bool {
        let left = self.left.requires_rebuild();
        let right = self.right.requires_rebuild();
        left || right
    }
}

/// Always requires a rebuild
#[derive(Debug, Default, Clone, Copy)]
pub struct AlwaysRebuild;

impl BuildDependency for AlwaysRebuild {
    fn requires_rebuild(&self) -> bool {
        true
    }
}

/// Combine two dependencies with OR
pub fn merge(left: SharedDependency, right: SharedDependency) -> SharedDependency {
    Arc::new(MergedDependency { left, right })
}

/// One dependency per regular file in `sources`, each against the outputs
/// `transformer` maps it to, all merged with OR.
///
/// Fails when `sources` has no regular files.
pub fn structural<F>(sources: &dyn Sources, transformer: F) -> Result<SharedDependency, DependencyError>
where
    F: Fn(&PathInfo) -> Vec<PathBuf>,
{
    sources
        .regular_files()
        .map(|file| -> SharedDependency {
            let targets = Targets::new(transformer(&file));
            Arc::new(FileDependency::new(
                Arc::new(FixedSources::new([file.path])),
                targets,
            ))
        })
        .reduce(merge)
        .ok_or_else(|| DependencyError::NoRegularFiles {
            description: sources.describe(),
        })
}
