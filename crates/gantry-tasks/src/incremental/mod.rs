//! Incremental rebuild engine
//!
//! Staleness is decided from file modification times only: outputs are
//! out of date when any regular source file is at least as new as the
//! oldest output, or when an output is missing.

mod dependency;
mod paths;
mod sources;

pub use dependency::{
    merge, structural, AlwaysRebuild, BuildDependency, FileDependency, MergedDependency,
    SharedDependency,
};
pub use paths::{GlobSources, PathInfo, Timestamp};
pub use sources::{FixedSources, Sources, Targets};

/// Errors while setting up a rebuild decision
#[derive(Debug, thiserror::Error)]
pub enum DependencyError {
    /// A structural dependency needs at least one regular source file
    #[error("No regular files found in {description}; cannot decide whether to rebuild")]
    NoRegularFiles { description: String },

    /// The glob pattern did not compile
    #[error("Invalid glob pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: globset::Error,
    },
}
