//! Deterministic in-memory repository fake.
//!
//! Commits are content-addressed (hash of tree, parents, and message) so
//! replaying identical content yields identical ids, like the real object
//! store. Trees are whole-file snapshots; diffs come out as one
//! zero-context hunk per changed file.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::hash::{DefaultHasher, Hash, Hasher};

use restitch_git::{
    ApplyResult, Commit, CommitDiff, ConflictPath, ConflictReport, ConflictSides, DiffLine,
    DiffLineKind, Error, FileDiff, Hunk, PickResult, RepoCapability, Result,
};

type Tree = BTreeMap<String, String>;

#[derive(Debug, Clone)]
struct MemCommit {
    parents: Vec<String>,
    message: String,
    tree: Tree,
}

#[derive(Default)]
pub struct MemoryRepo {
    commits: RefCell<BTreeMap<String, MemCommit>>,
    trees: RefCell<BTreeMap<String, Tree>>,
    refs: RefCell<BTreeMap<String, String>>,
    fail_op: RefCell<Option<String>>,
}

impl MemoryRepo {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a commit whose tree is the parent's tree plus the given
    /// changes (`None` content deletes the path). Returns the new id.
    pub fn add_commit(
        &self,
        parent: Option<&str>,
        message: &str,
        changes: &[(&str, Option<&str>)],
    ) -> String {
        let mut tree = parent.map_or_else(Tree::new, |p| {
            self.commits.borrow()[p].tree.clone()
        });
        for (path, content) in changes {
            match content {
                Some(c) => {
                    tree.insert((*path).to_string(), (*c).to_string());
                }
                None => {
                    tree.remove(*path);
                }
            }
        }
        let parents: Vec<String> = parent.map(str::to_string).into_iter().collect();
        self.store_commit(tree, parents, message)
    }

    pub fn set_ref(&self, name: &str, target: &str) {
        self.refs.borrow_mut().insert(name.to_string(), target.to_string());
    }

    pub fn ref_target(&self, name: &str) -> Option<String> {
        self.refs.borrow().get(name).cloned()
    }

    pub fn tree_of(&self, oid: &str) -> Tree {
        self.commits.borrow()[oid].tree.clone()
    }

    pub fn message_of(&self, oid: &str) -> String {
        self.commits.borrow()[oid].message.clone()
    }

    /// Make the named capability operation fail with an injected error.
    pub fn fail_on(&self, op: &str) {
        *self.fail_op.borrow_mut() = Some(op.to_string());
    }

    fn check_fail(&self, op: &str) -> Result<()> {
        if self.fail_op.borrow().as_deref() == Some(op) {
            return Err(Error::UnresolvedCommitIsh(format!("injected failure in {op}")));
        }
        Ok(())
    }

    fn store_commit(&self, tree: Tree, parents: Vec<String>, message: &str) -> String {
        let tree_id = self.register_tree(&tree);
        let mut hasher = DefaultHasher::new();
        tree_id.hash(&mut hasher);
        parents.hash(&mut hasher);
        message.hash(&mut hasher);
        let oid = format!("c{:016x}", hasher.finish());

        self.commits.borrow_mut().insert(
            oid.clone(),
            MemCommit {
                parents,
                message: message.to_string(),
                tree,
            },
        );
        oid
    }

    fn register_tree(&self, tree: &Tree) -> String {
        let mut hasher = DefaultHasher::new();
        tree.hash(&mut hasher);
        let id = format!("t{:016x}", hasher.finish());
        self.trees.borrow_mut().insert(id.clone(), tree.clone());
        id
    }

    fn get_commit(&self, oid: &str) -> Result<MemCommit> {
        self.commits
            .borrow()
            .get(oid)
            .cloned()
            .ok_or_else(|| Error::UnresolvedCommitIsh(oid.to_string()))
    }

    fn commit_value(&self, oid: &str) -> Result<Commit> {
        let c = self.get_commit(oid)?;
        Ok(Commit {
            oid: oid.to_string(),
            summary: c.message.lines().next().unwrap_or("").to_string(),
            message: c.message.clone(),
            author: "Test".into(),
            author_email: "test@example.com".into(),
            author_date: chrono::DateTime::UNIX_EPOCH,
            committer: "Test".into(),
            committer_email: "test@example.com".into(),
            commit_date: chrono::DateTime::UNIX_EPOCH,
            parent_oids: c.parents,
        })
    }

    fn parent_tree(&self, commit: &MemCommit) -> Result<Tree> {
        match commit.parents.first() {
            Some(p) => Ok(self.get_commit(p)?.tree),
            None => Ok(Tree::new()),
        }
    }

    fn diff_trees(old: &Tree, new: &Tree) -> Vec<FileDiff> {
        let mut paths: Vec<&String> = old.keys().chain(new.keys()).collect();
        paths.sort();
        paths.dedup();

        paths
            .into_iter()
            .filter_map(|path| {
                let before = old.get(path).map(String::as_str);
                let after = new.get(path).map(String::as_str);
                if before == after {
                    return None;
                }
                Some(file_diff(path, before, after))
            })
            .collect()
    }
}

impl RepoCapability for MemoryRepo {
    fn merge_base(&self, a: &str, b: &str) -> Result<String> {
        let mut ancestors = Vec::new();
        let mut cursor = Some(a.to_string());
        while let Some(oid) = cursor {
            ancestors.push(oid.clone());
            cursor = self.get_commit(&oid)?.parents.first().cloned();
        }
        let mut cursor = Some(b.to_string());
        while let Some(oid) = cursor {
            if ancestors.contains(&oid) {
                return Ok(oid);
            }
            cursor = self.get_commit(&oid)?.parents.first().cloned();
        }
        Err(Error::UnresolvedCommitIsh(format!("no merge base of {a} and {b}")))
    }

    fn list_commits(&self, from: &str, to: &str) -> Result<Vec<Commit>> {
        let mut out = Vec::new();
        let mut cursor = from.to_string();
        while cursor != to {
            out.push(self.commit_value(&cursor)?);
            cursor = match self.get_commit(&cursor)?.parents.first() {
                Some(p) => p.clone(),
                None => break,
            };
        }
        out.reverse();
        Ok(out)
    }

    fn commit_diff(&self, oid: &str) -> Result<CommitDiff> {
        self.commit_diff_precise(oid)
    }

    fn commit_diff_precise(&self, oid: &str) -> Result<CommitDiff> {
        self.check_fail("commit_diff_precise")?;
        let commit = self.get_commit(oid)?;
        let base = self.parent_tree(&commit)?;
        Ok(CommitDiff {
            commit: self.commit_value(oid)?,
            files: Self::diff_trees(&base, &commit.tree),
        })
    }

    fn commit_tree(&self, oid: &str) -> Result<String> {
        let tree = self.get_commit(oid)?.tree;
        Ok(self.register_tree(&tree))
    }

    fn commit_parents(&self, oid: &str) -> Result<Vec<String>> {
        Ok(self.get_commit(oid)?.parents)
    }

    fn cherry_pick(&self, commit: &str, onto: &str) -> Result<PickResult> {
        self.check_fail("cherry_pick")?;
        let picked = self.get_commit(commit)?;
        let base = self.parent_tree(&picked)?;
        let onto_commit = self.get_commit(onto)?;

        // Whole-file three-way merge: a path conflicts when the target
        // version differs from both the pick's base and its result.
        let mut tree = onto_commit.tree.clone();
        let mut conflicts = Vec::new();
        let mut paths: Vec<&String> = base.keys().chain(picked.tree.keys()).collect();
        paths.sort();
        paths.dedup();

        for path in paths {
            let before = base.get(path);
            let after = picked.tree.get(path);
            if before == after {
                continue;
            }
            let current = onto_commit.tree.get(path);
            if current == before {
                match after {
                    Some(content) => {
                        tree.insert(path.clone(), content.clone());
                    }
                    None => {
                        tree.remove(path);
                    }
                }
            } else if current != after {
                conflicts.push(ConflictPath {
                    path: path.clone(),
                    sides: ConflictSides::Both,
                });
            }
        }

        if !conflicts.is_empty() {
            return Ok(PickResult::Conflict(ConflictReport { paths: conflicts }));
        }
        Ok(PickResult::Picked(self.store_commit(
            tree,
            vec![onto.to_string()],
            &picked.message,
        )))
    }

    fn apply_files(&self, onto: &str, files: &[FileDiff]) -> Result<ApplyResult> {
        self.check_fail("apply_files")?;
        let mut tree = self.get_commit(onto)?.tree;

        for file in files {
            if file.new_path.is_none() {
                if let Some(path) = file.old_path.as_deref() {
                    tree.remove(path);
                }
                continue;
            }
            let Some(path) = file.path() else { continue };
            let mut lines: Vec<String> = tree
                .get(path)
                .map(|c| c.lines().map(str::to_string).collect())
                .unwrap_or_default();

            // Highest hunk first so earlier splices don't shift later ones.
            let mut hunks: Vec<&Hunk> = file.hunks.iter().collect();
            hunks.sort_by_key(|h| std::cmp::Reverse(h.old_start));
            for hunk in hunks {
                match splice(&mut lines, hunk) {
                    Ok(()) => {}
                    Err(()) => {
                        return Ok(ApplyResult::Conflict(ConflictReport {
                            paths: vec![ConflictPath {
                                path: path.to_string(),
                                sides: ConflictSides::Both,
                            }],
                        }));
                    }
                }
            }
            tree.insert(path.to_string(), lines.join("\n"));
        }

        Ok(ApplyResult::Applied(self.register_tree(&tree)))
    }

    fn create_commit(&self, tree: &str, parents: &[String], message: &str) -> Result<String> {
        self.check_fail("create_commit")?;
        let tree = self
            .trees
            .borrow()
            .get(tree)
            .cloned()
            .ok_or_else(|| Error::UnresolvedCommitIsh(tree.to_string()))?;
        Ok(self.store_commit(tree, parents.to_vec(), message))
    }

    fn update_ref(&self, name: &str, target: &str) -> Result<()> {
        self.check_fail("update_ref")?;
        self.get_commit(target)?;
        self.set_ref(name, target);
        Ok(())
    }
}

/// Apply one zero-context hunk to a line buffer, verifying the pre-image.
fn splice(lines: &mut Vec<String>, hunk: &Hunk) -> std::result::Result<(), ()> {
    let removed: Vec<&str> = hunk
        .lines
        .iter()
        .filter(|l| l.kind == DiffLineKind::Deletion)
        .map(|l| l.content.as_str())
        .collect();
    let added: Vec<String> = hunk
        .lines
        .iter()
        .filter(|l| l.kind == DiffLineKind::Addition)
        .map(|l| l.content.clone())
        .collect();

    if hunk.old_lines == 0 {
        // Insertion after line `old_start`.
        let at = hunk.old_start as usize;
        if at > lines.len() {
            return Err(());
        }
        lines.splice(at..at, added);
        return Ok(());
    }

    let start = hunk.old_start as usize - 1;
    let end = start + hunk.old_lines as usize;
    if end > lines.len() {
        return Err(());
    }
    if lines[start..end]
        .iter()
        .map(String::as_str)
        .ne(removed.iter().copied())
    {
        return Err(());
    }
    lines.splice(start..end, added);
    Ok(())
}

/// Single zero-context hunk between two versions of one file, built by
/// trimming the common prefix and suffix.
fn file_diff(path: &str, before: Option<&str>, after: Option<&str>) -> FileDiff {
    let old_lines: Vec<&str> = before.map(|c| c.lines().collect()).unwrap_or_default();
    let new_lines: Vec<&str> = after.map(|c| c.lines().collect()).unwrap_or_default();

    let prefix = old_lines
        .iter()
        .zip(&new_lines)
        .take_while(|(a, b)| a == b)
        .count();
    let max_suffix = old_lines.len().min(new_lines.len()) - prefix;
    let suffix = old_lines
        .iter()
        .rev()
        .zip(new_lines.iter().rev())
        .take_while(|(a, b)| a == b)
        .count()
        .min(max_suffix);

    let removed = &old_lines[prefix..old_lines.len() - suffix];
    let added = &new_lines[prefix..new_lines.len() - suffix];

    let mut lines: Vec<DiffLine> = removed
        .iter()
        .map(|t| DiffLine {
            kind: DiffLineKind::Deletion,
            content: (*t).to_string(),
        })
        .collect();
    lines.extend(added.iter().map(|t| DiffLine {
        kind: DiffLineKind::Addition,
        content: (*t).to_string(),
    }));

    let hunks = if lines.is_empty() {
        vec![]
    } else {
        let prefix = prefix as u32;
        vec![Hunk {
            old_start: if removed.is_empty() { prefix } else { prefix + 1 },
            old_lines: removed.len() as u32,
            new_start: if added.is_empty() { prefix } else { prefix + 1 },
            new_lines: added.len() as u32,
            lines,
        }]
    };

    FileDiff {
        old_path: before.is_some().then(|| path.to_string()),
        new_path: after.is_some().then(|| path.to_string()),
        hunks,
    }
}
