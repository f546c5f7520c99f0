//! Plan execution.
//!
//! The executor walks a [`RebasePlan`] step by step against a
//! [`RepoCapability`], building new commits on a detached staging line. The
//! named branch ref moves exactly once, at the very end, and only if every
//! prior step succeeded: on conflict or abort the branch is untouched and
//! the original history remains intact.
//!
//! Conflicts are an expected outcome, reported as
//! [`MutationOutcome::Conflict`]; capability-level failures (I/O, missing
//! objects) surface as [`MutationOutcome::Aborted`] and are safe to retry.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use restitch_git::{ApplyResult, FileDiff, PickResult, RepoCapability};
use serde::Serialize;

use crate::error::Result;
use crate::plan::{PlanStep, RebasePlan};

/// Cooperative cancellation token, checked between steps.
///
/// Mid-step cancellation is not supported: an in-flight capability call runs
/// to completion before the flag is consulted again.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    /// Create a flag in the not-cancelled state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    /// Whether cancellation was requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Terminal result of executing a plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum MutationOutcome {
    /// Every step succeeded and the branch ref was moved.
    Applied {
        /// The branch's new tip commit.
        new_tip: String,
        /// Old commit id to new commit id, for every rewritten commit.
        rewritten: BTreeMap<String, String>,
    },
    /// A step reported a content conflict. The branch ref is untouched;
    /// commits produced before the failure remain reachable through
    /// `partial_new_tip` for inspection.
    Conflict {
        /// Index of the failing step in the plan.
        failed_step: usize,
        /// Paths the capability reported as conflicting.
        conflicting_paths: Vec<String>,
        /// Tip of the partially rewritten line, if any step completed.
        partial_new_tip: Option<String>,
    },
    /// A capability-level failure or cancellation. No ref was touched.
    Aborted {
        /// Human-readable cause.
        reason: String,
    },
}

/// Executes plans against a repository capability.
pub struct Executor<'a, R: RepoCapability + ?Sized> {
    capability: &'a R,
    cancel: Option<CancelFlag>,
}

impl<'a, R: RepoCapability + ?Sized> Executor<'a, R> {
    /// Create an executor over a capability.
    pub fn new(capability: &'a R) -> Self {
        Self {
            capability,
            cancel: None,
        }
    }

    /// Attach a cancellation flag, checked between steps.
    #[must_use]
    pub fn with_cancel(mut self, flag: CancelFlag) -> Self {
        self.cancel = Some(flag);
        self
    }

    /// Run the plan to a terminal outcome.
    ///
    /// Re-running the same plan from the same starting state is safe and
    /// yields the same outcome.
    pub fn run(&self, plan: &RebasePlan) -> MutationOutcome {
        match self.try_run(plan) {
            Ok(outcome) => outcome,
            Err(e) => MutationOutcome::Aborted {
                reason: e.to_string(),
            },
        }
    }

    fn try_run(&self, plan: &RebasePlan) -> Result<MutationOutcome> {
        let mut tip = plan.base.clone();
        let mut rewritten: BTreeMap<String, String> = BTreeMap::new();
        // Original commits whose rewrite is the current tip; squash and
        // reword remap all of them at once.
        let mut tip_sources: Vec<String> = Vec::new();

        for (idx, step) in plan.steps.iter().enumerate() {
            if self.cancel.as_ref().is_some_and(CancelFlag::is_cancelled) {
                return Ok(MutationOutcome::Aborted {
                    reason: "cancelled before step".to_string(),
                });
            }
            tracing::debug!(index = idx, step = ?step, onto = %tip, "executing plan step");

            match step {
                PlanStep::CherryPick { commit } => {
                    match self.capability.cherry_pick(commit, &tip)? {
                        PickResult::Picked(new_oid) => {
                            rewritten.insert(commit.clone(), new_oid.clone());
                            tip_sources = vec![commit.clone()];
                            tip = new_oid;
                        }
                        PickResult::Conflict(report) => {
                            return Ok(conflict(idx, report.path_names(), &tip, &plan.base));
                        }
                    }
                }
                PlanStep::Squash { commit, message } => {
                    match self.capability.cherry_pick(commit, &tip)? {
                        PickResult::Picked(picked) => {
                            // Replace the tip with a single folded commit:
                            // the picked tree on the tip's own parents.
                            let tree = self.capability.commit_tree(&picked)?;
                            let parents = self.capability.commit_parents(&tip)?;
                            let folded = self.capability.create_commit(&tree, &parents, message)?;
                            for source in &tip_sources {
                                rewritten.insert(source.clone(), folded.clone());
                            }
                            rewritten.insert(commit.clone(), folded.clone());
                            tip_sources.push(commit.clone());
                            tip = folded;
                        }
                        PickResult::Conflict(report) => {
                            return Ok(conflict(idx, report.path_names(), &tip, &plan.base));
                        }
                    }
                }
                PlanStep::Reword { message } => {
                    let tree = self.capability.commit_tree(&tip)?;
                    let parents = self.capability.commit_parents(&tip)?;
                    let reworded = self.capability.create_commit(&tree, &parents, message)?;
                    for source in &tip_sources {
                        rewritten.insert(source.clone(), reworded.clone());
                    }
                    tip = reworded;
                }
                PlanStep::DropLines {
                    commit,
                    file,
                    hunk_indices,
                    message,
                } => {
                    let diff = self.capability.commit_diff_precise(commit)?;
                    let Some(full) = diff.files.iter().find(|f| f.path() == Some(file.as_str()))
                    else {
                        return Ok(MutationOutcome::Aborted {
                            reason: format!("commit {commit} does not touch {file}"),
                        });
                    };
                    let Some(piece) = retained_hunks(full, hunk_indices) else {
                        return Ok(MutationOutcome::Aborted {
                            reason: format!(
                                "hunk positions in {file} of commit {commit} shift before the start of the file"
                            ),
                        });
                    };
                    match self.capability.apply_files(&tip, &[piece])? {
                        ApplyResult::Applied(tree) => {
                            let new_oid = self.capability.create_commit(
                                &tree,
                                std::slice::from_ref(&tip),
                                message,
                            )?;
                            // Later pieces overwrite; the mapping ends up
                            // pointing at the last piece of the split.
                            rewritten.insert(commit.clone(), new_oid.clone());
                            tip_sources = vec![commit.clone()];
                            tip = new_oid;
                        }
                        ApplyResult::Conflict(report) => {
                            return Ok(conflict(idx, report.path_names(), &tip, &plan.base));
                        }
                    }
                }
                PlanStep::UpdateRef { name } => {
                    self.capability.update_ref(name, &tip)?;
                    tracing::info!(branch = %name, tip = %tip, "branch ref updated");
                }
            }
        }

        Ok(MutationOutcome::Applied {
            new_tip: tip,
            rewritten,
        })
    }
}

/// Execute a plan against a capability. Convenience for
/// [`Executor::new`] + [`Executor::run`].
pub fn execute<R: RepoCapability + ?Sized>(plan: &RebasePlan, capability: &R) -> MutationOutcome {
    Executor::new(capability).run(plan)
}

fn conflict(
    failed_step: usize,
    conflicting_paths: Vec<String>,
    tip: &str,
    base: &str,
) -> MutationOutcome {
    MutationOutcome::Conflict {
        failed_step,
        conflicting_paths,
        partial_new_tip: (tip != base).then(|| tip.to_string()),
    }
}

/// Build the file diff for one split piece: keep only the named hunks and
/// shift their pre-image positions past the hunks earlier steps applied.
///
/// Relies on the planner's emission order: for any file, hunks below the
/// retained run were applied by earlier steps of the same plan, so their
/// line deltas are already present in the tree the piece applies to.
///
/// Returns `None` when a shifted position would fall before the start of
/// the file; that only happens with a malformed diff and must not be
/// applied at a fabricated position.
fn retained_hunks(file: &FileDiff, indices: &[usize]) -> Option<FileDiff> {
    let mut indices = indices.to_vec();
    indices.sort_unstable();

    let shift: i64 = indices.first().map_or(0, |&first| {
        file.hunks[..first.min(file.hunks.len())]
            .iter()
            .map(|h| i64::from(h.new_lines) - i64::from(h.old_lines))
            .sum()
    });

    let mut hunks = Vec::with_capacity(indices.len());
    for &idx in &indices {
        let Some(hunk) = file.hunks.get(idx) else {
            continue;
        };
        let mut hunk = hunk.clone();
        hunk.old_start = u32::try_from(i64::from(hunk.old_start) + shift).ok()?;
        hunks.push(hunk);
    }

    Some(FileDiff {
        old_path: file.old_path.clone(),
        new_path: file.new_path.clone(),
        hunks,
    })
}
