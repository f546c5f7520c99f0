//! Rebase planning.
//!
//! Planners are pure functions from a requested transformation and the
//! current branch slice to a [`RebasePlan`]. They never touch a repository
//! and are repeatable; execution happens separately in [`crate::execute`].
//!
//! A branch slice is the sequence of commits between the reference point
//! (the merge base with the target branch, excluded) and the branch tip,
//! oldest first.

use restitch_git::{Commit, CommitDiff};
use serde::Serialize;

use crate::cluster;
use crate::error::{Error, Result};

/// One elementary operation of a rewrite.
///
/// Steps apply in order; each tree-producing step builds on the previous
/// step's result, starting from the plan's base.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum PlanStep {
    /// Replay `commit` onto the previous result.
    CherryPick {
        /// Original commit id to replay.
        commit: String,
    },
    /// Fold `commit`'s change-set into the previous result, replacing it
    /// with a single commit carrying `message`.
    Squash {
        /// Original commit id whose changes are folded.
        commit: String,
        /// Combined message for the folded commit.
        message: String,
    },
    /// Rewrite the previous result with a new message, same tree and
    /// parents.
    Reword {
        /// Replacement message.
        message: String,
    },
    /// Apply only the named hunks of one file from `commit`'s precise diff,
    /// as a new commit on top of the previous result.
    DropLines {
        /// Original commit id the hunks come from.
        commit: String,
        /// File whose hunks are retained.
        file: String,
        /// Indices into the file's precise-diff hunk list.
        hunk_indices: Vec<usize>,
        /// Message for the piece, subject tagged `(k/N)`.
        message: String,
    },
    /// Move branch `name` to the final produced commit. Always last, and
    /// only executed once every prior step succeeded.
    UpdateRef {
        /// Branch name, without the `refs/heads/` prefix.
        name: String,
    },
}

/// An ordered rewrite plan. Purely descriptive; owns no repository handles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RebasePlan {
    /// The reference point the first step builds on. Excluded from the
    /// rewrite itself.
    pub base: String,
    /// Steps in execution order.
    pub steps: Vec<PlanStep>,
}

/// How a split partitions a commit's hunks into pieces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SplitStrategy {
    /// One piece per touched file.
    PerFile,
    /// One piece per hunk.
    PerHunk,
    /// One piece per span cluster of the commit's own diff.
    PerCluster,
}

/// Plan a reorder of the branch slice.
///
/// `new_order` gives the desired sequence as indices into `commits`. Every
/// commit gets a cherry-pick step, including ones whose position did not
/// change, keeping execution uniform.
///
/// # Errors
/// Returns [`Error::InvalidReorder`] if `new_order` is not a permutation of
/// `0..commits.len()`.
pub fn plan_reorder(
    commits: &[Commit],
    new_order: &[usize],
    base: &str,
    branch: &str,
) -> Result<RebasePlan> {
    if new_order.len() != commits.len() {
        return Err(Error::InvalidReorder);
    }
    let mut seen = vec![false; commits.len()];
    for &idx in new_order {
        if idx >= commits.len() || seen[idx] {
            return Err(Error::InvalidReorder);
        }
        seen[idx] = true;
    }

    let mut steps: Vec<PlanStep> = new_order
        .iter()
        .map(|&idx| PlanStep::CherryPick {
            commit: commits[idx].oid.clone(),
        })
        .collect();
    steps.push(PlanStep::UpdateRef {
        name: branch.to_string(),
    });

    Ok(RebasePlan {
        base: base.to_string(),
        steps,
    })
}

/// Plan squashing `source` into the earlier commit `target`.
///
/// Commits before the target are replayed unchanged, the target and source
/// are folded into one commit with their messages joined by a blank line,
/// and every other commit (between the pair and after the source) is
/// replayed on top in its original order.
///
/// # Errors
/// Returns [`Error::UnknownCommit`] if either id is not on the slice, and
/// [`Error::InvalidOrder`] if `source` does not come after `target`.
pub fn plan_squash(
    source: &str,
    target: &str,
    commits: &[Commit],
    base: &str,
    branch: &str,
) -> Result<RebasePlan> {
    let source_idx = position_of(commits, source)?;
    let target_idx = position_of(commits, target)?;
    if source_idx <= target_idx {
        return Err(Error::InvalidOrder {
            source: source.to_string(),
            target: target.to_string(),
        });
    }

    let combined = format!(
        "{}\n\n{}",
        commits[target_idx].message.trim_end(),
        commits[source_idx].message.trim_end()
    );

    let mut steps = Vec::new();
    for commit in &commits[..=target_idx] {
        steps.push(PlanStep::CherryPick {
            commit: commit.oid.clone(),
        });
    }
    steps.push(PlanStep::Squash {
        commit: commits[source_idx].oid.clone(),
        message: combined,
    });
    for (idx, commit) in commits.iter().enumerate().skip(target_idx + 1) {
        if idx == source_idx {
            continue;
        }
        steps.push(PlanStep::CherryPick {
            commit: commit.oid.clone(),
        });
    }
    steps.push(PlanStep::UpdateRef {
        name: branch.to_string(),
    });

    Ok(RebasePlan {
        base: base.to_string(),
        steps,
    })
}

/// Plan splitting one commit into pieces.
///
/// `diff` must be the commit's precise (zero-context) diff; hunk indices in
/// the emitted steps refer into it. Pieces are numbered `(k/N)` on the
/// subject line in emission order.
///
/// # Errors
/// Returns [`Error::UnknownCommit`] if `commit` is not on the slice and
/// [`Error::EmptySplit`] if the strategy yields no pieces.
pub fn plan_split(
    commit: &str,
    strategy: SplitStrategy,
    diff: &CommitDiff,
    commits: &[Commit],
    base: &str,
    branch: &str,
) -> Result<RebasePlan> {
    let split_idx = position_of(commits, commit)?;
    let groups = partition(diff, strategy)?;
    if groups.is_empty() {
        return Err(Error::EmptySplit);
    }

    let total = groups.len();
    let mut steps = Vec::new();
    for c in &commits[..split_idx] {
        steps.push(PlanStep::CherryPick {
            commit: c.oid.clone(),
        });
    }
    for (k, (file, hunk_indices)) in groups.into_iter().enumerate() {
        steps.push(PlanStep::DropLines {
            commit: commit.to_string(),
            file,
            hunk_indices,
            message: numbered_message(&commits[split_idx].message, k + 1, total),
        });
    }
    for c in &commits[split_idx + 1..] {
        steps.push(PlanStep::CherryPick {
            commit: c.oid.clone(),
        });
    }
    steps.push(PlanStep::UpdateRef {
        name: branch.to_string(),
    });

    Ok(RebasePlan {
        base: base.to_string(),
        steps,
    })
}

/// Plan rewriting one commit's message.
///
/// # Errors
/// Returns [`Error::UnknownCommit`] if `commit` is not on the slice.
pub fn plan_reword(
    commit: &str,
    new_message: &str,
    commits: &[Commit],
    base: &str,
    branch: &str,
) -> Result<RebasePlan> {
    let idx = position_of(commits, commit)?;

    let mut steps = Vec::new();
    for c in &commits[..=idx] {
        steps.push(PlanStep::CherryPick {
            commit: c.oid.clone(),
        });
    }
    steps.push(PlanStep::Reword {
        message: new_message.to_string(),
    });
    for c in &commits[idx + 1..] {
        steps.push(PlanStep::CherryPick {
            commit: c.oid.clone(),
        });
    }
    steps.push(PlanStep::UpdateRef {
        name: branch.to_string(),
    });

    Ok(RebasePlan {
        base: base.to_string(),
        steps,
    })
}

fn position_of(commits: &[Commit], oid: &str) -> Result<usize> {
    commits
        .iter()
        .position(|c| c.oid == oid)
        .ok_or_else(|| Error::UnknownCommit(oid.to_string()))
}

/// Partition a precise diff's hunks into split groups, each confined to one
/// file: `(path, hunk indices into that file's hunk list)`.
fn partition(diff: &CommitDiff, strategy: SplitStrategy) -> Result<Vec<(String, Vec<usize>)>> {
    let mut groups = Vec::new();
    match strategy {
        SplitStrategy::PerFile => {
            for file in &diff.files {
                let Some(path) = file.path() else { continue };
                if file.hunks.is_empty() {
                    continue;
                }
                groups.push((path.to_string(), (0..file.hunks.len()).collect()));
            }
        }
        SplitStrategy::PerHunk => {
            for file in &diff.files {
                let Some(path) = file.path() else { continue };
                for idx in 0..file.hunks.len() {
                    groups.push((path.to_string(), vec![idx]));
                }
            }
        }
        SplitStrategy::PerCluster => {
            // Cluster the commit's own diff; each column is one piece.
            // Clusters never cross files, and within a file they cover
            // contiguous hunk runs in ascending order.
            let map = cluster::cluster(std::slice::from_ref(diff))?;
            for col in &map.clusters {
                let Some(file) = diff
                    .files
                    .iter()
                    .find(|f| f.path() == Some(col.path.as_str()))
                else {
                    continue;
                };
                let indices: Vec<usize> = file
                    .hunks
                    .iter()
                    .enumerate()
                    .filter(|(_, hunk)| {
                        let start = if hunk.new_lines == 0 {
                            hunk.old_start
                        } else {
                            hunk.new_start
                        };
                        start >= col.start_line && start <= col.end_line
                    })
                    .map(|(idx, _)| idx)
                    .collect();
                if !indices.is_empty() {
                    groups.push((col.path.clone(), indices));
                }
            }
        }
    }
    Ok(groups)
}

/// Tag the subject line with `(k/N)`, preserving the body.
fn numbered_message(message: &str, k: usize, total: usize) -> String {
    match message.split_once('\n') {
        Some((subject, body)) => format!("{subject} ({k}/{total})\n{body}"),
        None => format!("{} ({k}/{total})", message.trim_end()),
    }
}
