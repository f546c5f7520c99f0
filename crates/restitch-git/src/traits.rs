//! The repository capability trait consumed by the rewrite engine.
//!
//! The engine never talks to an on-disk object store directly; it goes
//! through [`RepoCapability`], allowing the real [`crate::Repository`]
//! backend to be swapped with a deterministic in-memory fake in tests.

use crate::{Commit, CommitDiff, FileDiff, Result};

/// Which side(s) of a cherry-pick introduced the overlapping change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub enum ConflictSides {
    /// Only the base the commit was replayed onto.
    Ours,
    /// Only the commit being replayed.
    Theirs,
    /// Both sides changed the region.
    Both,
}

/// One conflicting path from a failed pick or patch application.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct ConflictPath {
    pub path: String,
    pub sides: ConflictSides,
}

/// Unresolved overlapping changes reported by the capability.
///
/// A conflict is an expected, first-class outcome of replaying commits, not
/// an error: callers branch on it to decide between manual resolution and
/// abandoning the operation.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct ConflictReport {
    pub paths: Vec<ConflictPath>,
}

impl ConflictReport {
    /// The conflicting paths, in report order.
    #[must_use]
    pub fn path_names(&self) -> Vec<String> {
        self.paths.iter().map(|p| p.path.clone()).collect()
    }
}

/// Outcome of a cherry-pick attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PickResult {
    /// The replay applied cleanly; carries the new commit OID.
    Picked(String),
    /// The replay hit overlapping changes; nothing was committed.
    Conflict(ConflictReport),
}

/// Outcome of applying file diffs to a tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplyResult {
    /// The patch applied cleanly; carries the new tree OID.
    Applied(String),
    /// The patch did not apply; nothing was written.
    Conflict(ConflictReport),
}

/// Abstraction over the git object store.
///
/// All OIDs are full hex strings. Methods that create objects write them
/// unreferenced: nothing becomes visible to readers of a branch until
/// [`update_ref`](Self::update_ref) moves the branch pointer. Failed or
/// abandoned rewrites therefore leave only garbage-collectable orphans
/// behind, never a corrupted branch.
#[allow(clippy::missing_errors_doc)]
pub trait RepoCapability {
    /// Find the merge base (reference point) of two commits.
    fn merge_base(&self, a: &str, b: &str) -> Result<String>;

    /// List commits reachable from `from` back to, but excluding, `to`.
    ///
    /// Returned oldest-first. `to` is the reference point and never appears
    /// in listings or mutations.
    fn list_commits(&self, from: &str, to: &str) -> Result<Vec<Commit>>;

    /// Extract a commit's diff against its first parent, with default
    /// context lines. Suitable for display.
    fn commit_diff(&self, oid: &str) -> Result<CommitDiff>;

    /// Extract a commit's diff with zero context and zero interhunk lines,
    /// so every logical change is its own hunk.
    ///
    /// This is the form span clustering and split planning consume; default
    /// context merges nearby hunks together and would coarsen the spans.
    fn commit_diff_precise(&self, oid: &str) -> Result<CommitDiff>;

    /// The tree OID of a commit.
    fn commit_tree(&self, oid: &str) -> Result<String>;

    /// The parent OIDs of a commit, in order.
    fn commit_parents(&self, oid: &str) -> Result<Vec<String>>;

    /// Replay one commit's change-set onto another commit.
    ///
    /// On success the new commit preserves the original author and message
    /// and has `onto` as its sole parent. No ref is updated.
    fn cherry_pick(&self, commit: &str, onto: &str) -> Result<PickResult>;

    /// Apply a set of file diffs to `onto`'s tree, returning the resulting
    /// tree OID. Used to replay a filtered subset of a commit's hunks.
    fn apply_files(&self, onto: &str, files: &[FileDiff]) -> Result<ApplyResult>;

    /// Create a commit object from a tree, parents, and message, using the
    /// repository's default signature. No ref is updated.
    fn create_commit(&self, tree: &str, parents: &[String], message: &str) -> Result<String>;

    /// Move a branch ref to `target`.
    ///
    /// The single externally visible mutation in this trait. Failures map
    /// to [`Error::RefUpdateFailed`](crate::Error::RefUpdateFailed).
    fn update_ref(&self, name: &str, target: &str) -> Result<()>;
}
