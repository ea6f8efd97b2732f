//! Error handling utilities shared across the crate.

use std::path::PathBuf;

use thiserror::Error;

use crate::pairs::WordPair;

/// Convenient result type used throughout the crate.
pub type Result<T, E = CloudError> = std::result::Result<T, E>;

/// Domain-specific error describing failures during configuration, counting,
/// or cloud computation.
#[derive(Debug, Error)]
pub enum CloudError {
    /// The selected or background population contains no entities, so no
    /// enrichment ratio can be computed.
    #[error("empty population: selected and background entity sets must be non-empty")]
    EmptyPopulation,
    /// Cloud configuration failed validation.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    /// A configured attribute has no matching column on the entity store.
    /// Surfaced to callers as a warning; never aborts a computation.
    #[error("attribute {attribute:?} does not exist on the entity store")]
    MissingAttribute {
        /// Name of the attribute absent from the store.
        attribute: String,
    },
    /// A word pair reached the cluster queue without a resolvable
    /// probability. Indicates a logic error rather than bad input.
    #[error("unresolved word pair ({first}, {second}): probability could not be computed", first = .0.first, second = .0.second)]
    UnresolvedPair(WordPair),
    /// Filesystem IO error with optional context path.
    #[error("io error while processing {path:?}: {source}")]
    Io {
        /// Underlying IO error returned by the standard library.
        source: std::io::Error,
        /// Target path associated with the IO failure if available.
        path: Option<PathBuf>,
    },
    /// Serialization or deserialization failure.
    #[error("serialization error: {0}")]
    Serialization(String),
    /// Catch-all variant for invariants that should not occur.
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<serde_json::Error> for CloudError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl CloudError {
    /// Helper constructor that attaches an optional path when wrapping IO errors.
    pub fn io(source: std::io::Error, path: Option<PathBuf>) -> Self {
        Self::Io { source, path }
    }
}
