//! Concrete repository backend built on git2.

use std::fmt::Write as _;
use std::path::Path;

use chrono::{DateTime, Utc};
use git2::Oid;

use crate::error::{Error, Result};
use crate::traits::{
    ApplyResult, ConflictPath, ConflictReport, ConflictSides, PickResult, RepoCapability,
};
use crate::{Commit, CommitDiff, DiffLine, DiffLineKind, FileDiff, Hunk};

/// High-level wrapper around a git repository.
///
/// Construct with [`Repository::open`]; the rewrite engine consumes it
/// through the [`RepoCapability`] trait, while the CLI also uses the
/// inherent helpers below.
pub struct Repository {
    inner: git2::Repository,
}

impl Repository {
    /// Open the repository containing the given path.
    ///
    /// # Errors
    /// Returns [`Error::NotARepository`] if no repository is found at the
    /// path or any parent.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let inner = git2::Repository::discover(path).map_err(|_| Error::NotARepository)?;
        Ok(Self { inner })
    }

    /// Open the repository containing the current directory.
    ///
    /// # Errors
    /// Returns error if not inside a git repository.
    pub fn open_current() -> Result<Self> {
        Self::open(".")
    }

    /// Path to the repository's .git directory.
    #[must_use]
    pub fn git_dir(&self) -> &Path {
        self.inner.path()
    }

    /// The OID that HEAD currently points at.
    ///
    /// # Errors
    /// Returns [`Error::DetachedHead`] if HEAD does not resolve to a direct
    /// commit reference.
    pub fn head_oid(&self) -> Result<String> {
        Ok(self
            .inner
            .head()?
            .target()
            .ok_or(Error::DetachedHead)?
            .to_string())
    }

    /// The name of the current branch.
    ///
    /// # Errors
    /// Returns [`Error::DetachedHead`] if HEAD is detached.
    pub fn current_branch(&self) -> Result<String> {
        let head = self.inner.head()?;
        if !head.is_branch() {
            return Err(Error::DetachedHead);
        }
        head.shorthand().map(String::from).ok_or(Error::DetachedHead)
    }

    /// Resolve a commit-ish (branch, tag, or hash prefix) to a commit OID.
    ///
    /// # Errors
    /// Returns [`Error::UnresolvedCommitIsh`] if the name does not resolve
    /// to a commit.
    pub fn resolve(&self, commit_ish: &str) -> Result<String> {
        let object = self
            .inner
            .revparse_single(commit_ish)
            .map_err(|_| Error::UnresolvedCommitIsh(commit_ish.into()))?;
        let commit = object
            .peel_to_commit()
            .map_err(|_| Error::UnresolvedCommitIsh(commit_ish.into()))?;
        Ok(commit.id().to_string())
    }

    /// Find the reference point: the merge base of HEAD and a commit-ish.
    ///
    /// The reference point is excluded from all listings and mutations.
    ///
    /// # Errors
    /// Returns error if the commit-ish does not resolve or no merge base
    /// exists.
    pub fn find_reference_point(&self, commit_ish: &str) -> Result<String> {
        let target = self.resolve(commit_ish)?;
        let head = self.head_oid()?;
        self.merge_base(&head, &target)
    }

    /// Check if the working directory is clean.
    ///
    /// # Errors
    /// Returns error if the status check fails.
    pub fn is_clean(&self) -> Result<bool> {
        let statuses = self.inner.statuses(None)?;
        Ok(statuses.is_empty())
    }

    /// Ensure the working directory is clean.
    ///
    /// # Errors
    /// Returns [`Error::DirtyWorkingDirectory`] if there are uncommitted
    /// changes.
    pub fn require_clean(&self) -> Result<()> {
        if self.is_clean()? {
            Ok(())
        } else {
            Err(Error::DirtyWorkingDirectory)
        }
    }

    /// Synthetic diff for changes staged in the index (index vs HEAD), or
    /// `None` when the index is clean.
    #[must_use]
    pub fn staged_diff(&self) -> Option<CommitDiff> {
        let head = self.inner.head().ok()?.peel_to_tree().ok();

        let mut opts = precise_diff_options();
        let diff = self
            .inner
            .diff_tree_to_index(head.as_ref(), None, Some(&mut opts))
            .ok()?;

        let files = extract_files(&diff).ok()?;
        if files.iter().all(|f| f.hunks.is_empty()) {
            return None;
        }
        Some(CommitDiff {
            commit: synthetic_commit("staged", "Staged changes"),
            files,
        })
    }

    /// Synthetic diff for unstaged working-tree changes (workdir vs index),
    /// or `None` when the working tree matches the index.
    #[must_use]
    pub fn unstaged_diff(&self) -> Option<CommitDiff> {
        let mut opts = precise_diff_options();
        let diff = self
            .inner
            .diff_index_to_workdir(None, Some(&mut opts))
            .ok()?;

        let files = extract_files(&diff).ok()?;
        if files.iter().all(|f| f.hunks.is_empty()) {
            return None;
        }
        Some(CommitDiff {
            commit: synthetic_commit("unstaged", "Unstaged changes"),
            files,
        })
    }

    fn find_commit(&self, oid: &str) -> Result<git2::Commit<'_>> {
        Ok(self.inner.find_commit(Oid::from_str(oid)?)?)
    }

    fn diff_for(&self, oid: &str, opts: Option<&mut git2::DiffOptions>) -> Result<CommitDiff> {
        let commit = self.find_commit(oid)?;
        let new_tree = commit.tree()?;
        let parent_tree = if commit.parent_count() > 0 {
            Some(commit.parent(0)?.tree()?)
        } else {
            None
        };
        let diff = self
            .inner
            .diff_tree_to_tree(parent_tree.as_ref(), Some(&new_tree), opts)?;
        Ok(CommitDiff {
            commit: commit_from(&commit),
            files: extract_files(&diff)?,
        })
    }
}

impl RepoCapability for Repository {
    fn merge_base(&self, a: &str, b: &str) -> Result<String> {
        let base = self
            .inner
            .merge_base(Oid::from_str(a)?, Oid::from_str(b)?)?;
        Ok(base.to_string())
    }

    fn list_commits(&self, from: &str, to: &str) -> Result<Vec<Commit>> {
        let mut revwalk = self.inner.revwalk()?;
        revwalk.push(Oid::from_str(from)?)?;
        revwalk.hide(Oid::from_str(to)?)?;

        let mut commits = Vec::new();
        for oid in revwalk {
            let commit = self.inner.find_commit(oid?)?;
            commits.push(commit_from(&commit));
        }
        commits.reverse();
        Ok(commits)
    }

    fn commit_diff(&self, oid: &str) -> Result<CommitDiff> {
        self.diff_for(oid, None)
    }

    fn commit_diff_precise(&self, oid: &str) -> Result<CommitDiff> {
        let mut opts = precise_diff_options();
        self.diff_for(oid, Some(&mut opts))
    }

    fn commit_tree(&self, oid: &str) -> Result<String> {
        Ok(self.find_commit(oid)?.tree_id().to_string())
    }

    fn commit_parents(&self, oid: &str) -> Result<Vec<String>> {
        Ok(self
            .find_commit(oid)?
            .parent_ids()
            .map(|id| id.to_string())
            .collect())
    }

    fn cherry_pick(&self, commit: &str, onto: &str) -> Result<PickResult> {
        let commit = self.find_commit(commit)?;
        let onto = self.find_commit(onto)?;

        let mut index = self.inner.cherrypick_commit(&commit, &onto, 0, None)?;
        if index.has_conflicts() {
            return Ok(PickResult::Conflict(report_from_index(&index)?));
        }

        let tree_oid = index.write_tree_to(&self.inner)?;
        let tree = self.inner.find_tree(tree_oid)?;
        let author = commit.author();
        let committer = self.inner.signature()?;
        let message = commit.message().unwrap_or("");

        // No ref is updated: the new commit stays on a detached staging
        // line until the caller's final ref update.
        let new_oid = self
            .inner
            .commit(None, &author, &committer, message, &tree, &[&onto])?;
        Ok(PickResult::Picked(new_oid.to_string()))
    }

    fn apply_files(&self, onto: &str, files: &[FileDiff]) -> Result<ApplyResult> {
        let onto_tree = self.find_commit(onto)?.tree()?;
        let patch = render_patch(files);
        let diff = git2::Diff::from_buffer(patch.as_bytes())?;

        match self.inner.apply_to_tree(&onto_tree, &diff, None) {
            Ok(mut index) => {
                if index.has_conflicts() {
                    return Ok(ApplyResult::Conflict(report_from_index(&index)?));
                }
                let tree_oid = index.write_tree_to(&self.inner)?;
                Ok(ApplyResult::Applied(tree_oid.to_string()))
            }
            // libgit2 reports a failed application as an error; surface it
            // as a conflict naming the paths the patch touched.
            Err(_) => Ok(ApplyResult::Conflict(ConflictReport {
                paths: files
                    .iter()
                    .filter_map(FileDiff::path)
                    .map(|p| ConflictPath {
                        path: p.to_string(),
                        sides: ConflictSides::Both,
                    })
                    .collect(),
            })),
        }
    }

    fn create_commit(&self, tree: &str, parents: &[String], message: &str) -> Result<String> {
        let tree = self.inner.find_tree(Oid::from_str(tree)?)?;
        let parent_commits = parents
            .iter()
            .map(|oid| self.find_commit(oid))
            .collect::<Result<Vec<_>>>()?;
        let parent_refs: Vec<&git2::Commit> = parent_commits.iter().collect();
        let sig = self.inner.signature()?;

        let oid = self
            .inner
            .commit(None, &sig, &sig, message, &tree, &parent_refs)?;
        Ok(oid.to_string())
    }

    fn update_ref(&self, name: &str, target: &str) -> Result<()> {
        let oid = Oid::from_str(target).map_err(|e| Error::RefUpdateFailed {
            name: name.into(),
            reason: e.to_string(),
        })?;
        let reference_name = format!("refs/heads/{name}");

        self.inner
            .reference(
                &reference_name,
                oid,
                true, // force
                &format!("restitch: rewrite to {}", &target[..8.min(target.len())]),
            )
            .map_err(|e| Error::RefUpdateFailed {
                name: name.into(),
                reason: e.message().to_string(),
            })?;

        // If this is the checked-out branch, keep the working tree in step.
        if self.current_branch().ok().as_deref() == Some(name) {
            let commit = self.inner.find_commit(oid)?;
            self.inner
                .reset(commit.as_object(), git2::ResetType::Hard, None)?;
        }

        Ok(())
    }
}

impl std::fmt::Debug for Repository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Repository")
            .field("path", &self.inner.path())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Private helpers
// ---------------------------------------------------------------------------

/// Zero context, zero interhunk lines: every logical change is its own hunk.
fn precise_diff_options() -> git2::DiffOptions {
    let mut opts = git2::DiffOptions::new();
    opts.context_lines(0);
    opts.interhunk_lines(0);
    opts
}

fn git_time_to_utc(time: git2::Time) -> DateTime<Utc> {
    DateTime::from_timestamp(time.seconds(), 0).unwrap_or(DateTime::UNIX_EPOCH)
}

fn commit_from(commit: &git2::Commit) -> Commit {
    Commit {
        oid: commit.id().to_string(),
        summary: commit.summary().unwrap_or("").to_string(),
        message: commit.message().unwrap_or("").to_string(),
        author: commit.author().name().unwrap_or("").to_string(),
        author_email: commit.author().email().unwrap_or("").to_string(),
        author_date: git_time_to_utc(commit.author().when()),
        committer: commit.committer().name().unwrap_or("").to_string(),
        committer_email: commit.committer().email().unwrap_or("").to_string(),
        commit_date: git_time_to_utc(commit.time()),
        parent_oids: commit.parent_ids().map(|id| id.to_string()).collect(),
    }
}

fn synthetic_commit(oid: &str, summary: &str) -> Commit {
    Commit {
        oid: oid.to_string(),
        summary: summary.to_string(),
        message: summary.to_string(),
        author: String::new(),
        author_email: String::new(),
        author_date: DateTime::UNIX_EPOCH,
        committer: String::new(),
        committer_email: String::new(),
        commit_date: DateTime::UNIX_EPOCH,
        parent_oids: vec![],
    }
}

fn extract_files(diff: &git2::Diff) -> Result<Vec<FileDiff>> {
    let mut files = Vec::new();

    for delta_idx in 0..diff.deltas().len() {
        let Some(delta) = diff.get_delta(delta_idx) else {
            continue;
        };

        let old_path = delta
            .old_file()
            .path()
            .map(|p| p.to_string_lossy().into_owned());
        let new_path = delta
            .new_file()
            .path()
            .map(|p| p.to_string_lossy().into_owned());
        // git2 reports both paths even for additions and deletions; narrow
        // them from the delta status so path presence mirrors the change.
        let (old_path, new_path) = match delta.status() {
            git2::Delta::Added | git2::Delta::Untracked => (None, new_path),
            git2::Delta::Deleted => (old_path, None),
            _ => (old_path, new_path),
        };

        let Some(patch) = git2::Patch::from_diff(diff, delta_idx)? else {
            continue;
        };

        let mut hunks = Vec::new();
        for hunk_idx in 0..patch.num_hunks() {
            let (header, _) = patch.hunk(hunk_idx)?;

            let mut lines = Vec::new();
            for line_idx in 0..patch.num_lines_in_hunk(hunk_idx)? {
                let line = patch.line_in_hunk(hunk_idx, line_idx)?;
                let kind = match line.origin() {
                    '+' => DiffLineKind::Addition,
                    '-' => DiffLineKind::Deletion,
                    _ => DiffLineKind::Context,
                };
                let content = String::from_utf8_lossy(line.content())
                    .trim_end_matches('\n')
                    .to_string();
                lines.push(DiffLine { kind, content });
            }

            hunks.push(Hunk {
                old_start: header.old_start(),
                old_lines: header.old_lines(),
                new_start: header.new_start(),
                new_lines: header.new_lines(),
                lines,
            });
        }

        files.push(FileDiff {
            old_path,
            new_path,
            hunks,
        });
    }

    Ok(files)
}

fn report_from_index(index: &git2::Index) -> Result<ConflictReport> {
    let mut paths = Vec::new();
    for conflict in index.conflicts()? {
        let conflict = conflict?;
        let sides = match (conflict.our.is_some(), conflict.their.is_some()) {
            (true, true) => ConflictSides::Both,
            (true, false) => ConflictSides::Ours,
            _ => ConflictSides::Theirs,
        };
        let path = conflict
            .our
            .as_ref()
            .or(conflict.their.as_ref())
            .or(conflict.ancestor.as_ref())
            .map(|entry| String::from_utf8_lossy(&entry.path).into_owned())
            .unwrap_or_default();
        paths.push(ConflictPath { path, sides });
    }
    Ok(ConflictReport { paths })
}

/// Render file diffs back into unified-diff text for `Diff::from_buffer`.
fn render_patch(files: &[FileDiff]) -> String {
    let mut out = String::new();

    for file in files {
        let old = file.old_path.as_deref();
        let new = file.new_path.as_deref();
        let a = old.or(new).unwrap_or_default();
        let b = new.or(old).unwrap_or_default();

        let _ = writeln!(out, "diff --git a/{a} b/{b}");
        if file.is_addition() {
            out.push_str("new file mode 100644\n");
        } else if file.is_deletion() {
            out.push_str("deleted file mode 100644\n");
        }
        match old {
            Some(p) => {
                let _ = writeln!(out, "--- a/{p}");
            }
            None => out.push_str("--- /dev/null\n"),
        }
        match new {
            Some(p) => {
                let _ = writeln!(out, "+++ b/{p}");
            }
            None => out.push_str("+++ /dev/null\n"),
        }

        for hunk in &file.hunks {
            let _ = writeln!(
                out,
                "@@ -{},{} +{},{} @@",
                hunk.old_start, hunk.old_lines, hunk.new_start, hunk.new_lines
            );
            for line in &hunk.lines {
                let prefix = match line.kind {
                    DiffLineKind::Context => ' ',
                    DiffLineKind::Addition => '+',
                    DiffLineKind::Deletion => '-',
                };
                out.push(prefix);
                out.push_str(&line.content);
                out.push('\n');
            }
        }
    }

    out
}
