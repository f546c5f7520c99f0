//! Error types for restitch-core.

/// Result type alias using [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in restitch-core operations.
///
/// Content conflicts are deliberately absent here: a conflict during
/// execution is an expected outcome, reported through
/// [`crate::execute::MutationOutcome`], not an error.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A span was constructed with its end line before its start line.
    #[error("invalid span in {path}: end line {end} is before start line {start}")]
    InvalidSpan {
        /// File the span belongs to.
        path: String,
        /// Start line of the malformed range.
        start: u32,
        /// End line of the malformed range.
        end: u32,
    },

    /// Squash requested in the wrong direction.
    #[error("cannot squash '{source}' into '{target}': source must come after target")]
    InvalidOrder {
        /// Commit whose changes would be folded.
        r#source: String,
        /// Commit the changes would be folded into.
        target: String,
    },

    /// Reorder request is not a permutation of the branch commits.
    #[error("new order is not a permutation of the branch commits")]
    InvalidReorder,

    /// A split request would produce no commits.
    #[error("split would produce no commits - the commit has no matching changes")]
    EmptySplit,

    /// A commit id named in a request is not on the branch slice.
    #[error("commit not found on branch: {0}")]
    UnknownCommit(String),

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML parsing error.
    #[error("toml error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Git operation error.
    #[error("git error: {0}")]
    Git(#[from] restitch_git::Error),
}
