//! Error types for restitch-git.

/// Result type alias using [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during git operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Not inside a git repository.
    #[error("not a git repository")]
    NotARepository,

    /// HEAD is detached (not on a branch).
    #[error("HEAD is detached - checkout a branch first")]
    DetachedHead,

    /// A commit-ish could not be resolved.
    #[error("unable to resolve '{0}' to a commit")]
    UnresolvedCommitIsh(String),

    /// Reference not found.
    #[error("reference not found: {0}")]
    RefNotFound(String),

    /// A branch ref could not be moved.
    #[error("failed to update ref '{name}': {reason}")]
    RefUpdateFailed {
        /// The ref that could not be moved.
        name: String,
        /// Why the update failed.
        reason: String,
    },

    /// Working directory has uncommitted changes.
    #[error("working directory has uncommitted changes")]
    DirtyWorkingDirectory,

    /// Underlying git2 error.
    #[error("git error: {0}")]
    Git2(#[from] git2::Error),
}
