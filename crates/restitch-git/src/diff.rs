//! Pure data model for commits and their diffs.
//!
//! These types carry no git2 handles. They are immutable snapshots owned by
//! whichever call produced them; a rewritten commit always gets a fresh
//! [`Commit`] value with a new OID, never an in-place mutation.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Commit metadata extracted from the object store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Commit {
    /// Full hex OID. Content-derived: any rewrite produces a new one.
    pub oid: String,
    /// First line of the commit message.
    pub summary: String,
    /// Full commit message including body.
    pub message: String,
    pub author: String,
    pub author_email: String,
    pub author_date: DateTime<Utc>,
    pub committer: String,
    pub committer_email: String,
    pub commit_date: DateTime<Utc>,
    /// Parent OIDs in order; empty for a root commit.
    pub parent_oids: Vec<String>,
}

impl Commit {
    /// Short (8-character) form of the OID for display.
    #[must_use]
    pub fn short_oid(&self) -> &str {
        &self.oid[..8.min(self.oid.len())]
    }
}

/// The kind of change a diff line represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DiffLineKind {
    /// Unchanged line present in both versions.
    Context,
    /// Line added in the new version.
    Addition,
    /// Line removed from the old version.
    Deletion,
}

/// A single line from a diff.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiffLine {
    pub kind: DiffLineKind,
    /// Line text without the +/- prefix and without a trailing newline.
    pub content: String,
}

/// A contiguous block of changed lines within one file's diff.
///
/// Line numbers follow the `@@ -old_start,old_lines +new_start,new_lines @@`
/// convention of unified diff output: `old_*` addresses the pre-image file,
/// `new_*` the post-image file, both 1-indexed. A pure insertion has
/// `old_lines == 0`; a pure deletion has `new_lines == 0`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Hunk {
    pub old_start: u32,
    pub old_lines: u32,
    pub new_start: u32,
    pub new_lines: u32,
    pub lines: Vec<DiffLine>,
}

/// All changes made to one file in a single commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileDiff {
    /// Path in the parent version; `None` when the file was newly added.
    pub old_path: Option<String>,
    /// Path in the commit version; `None` when the file was deleted.
    pub new_path: Option<String>,
    pub hunks: Vec<Hunk>,
}

impl FileDiff {
    /// True when this diff introduces a previously absent path.
    #[must_use]
    pub const fn is_addition(&self) -> bool {
        self.old_path.is_none() && self.new_path.is_some()
    }

    /// True when this diff removes the path entirely.
    #[must_use]
    pub const fn is_deletion(&self) -> bool {
        self.old_path.is_some() && self.new_path.is_none()
    }

    /// The path this diff is filed under: the post-image path, falling back
    /// to the pre-image path for deletions.
    #[must_use]
    pub fn path(&self) -> Option<&str> {
        self.new_path.as_deref().or(self.old_path.as_deref())
    }
}

/// A commit plus the complete list of file changes it made relative to its
/// first parent.
///
/// Derived data, recomputed on demand. Never cache one across a mutation:
/// every commit after a rewrite carries a new OID.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommitDiff {
    pub commit: Commit,
    pub files: Vec<FileDiff>,
}
