//! `restitch split` command - break one commit into several.

use anyhow::{bail, Result};
use clap::ValueEnum;
use restitch_core::{plan_split, PlanStep, SplitStrategy};
use restitch_git::RepoCapability;

use super::utils;
use crate::output;

/// Grouping key for split pieces.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum SplitBy {
    /// One commit per touched file.
    File,
    /// One commit per hunk.
    Hunk,
    /// One commit per span cluster.
    Cluster,
}

impl From<SplitBy> for SplitStrategy {
    fn from(by: SplitBy) -> Self {
        match by {
            SplitBy::File => Self::PerFile,
            SplitBy::Hunk => Self::PerHunk,
            SplitBy::Cluster => Self::PerCluster,
        }
    }
}

/// Run the split command.
pub fn run(commit: &str, by: SplitBy, base: Option<&str>, dry_run: bool, yes: bool) -> Result<()> {
    let (repo, config) = utils::open_repo_and_config()?;
    let slice = utils::branch_slice(&repo, base, &config)?;

    let target = utils::resolve_on_slice(&slice.commits, commit)?.oid.clone();
    let diff = repo.commit_diff_precise(&target)?;

    let plan = plan_split(
        &target,
        by.into(),
        &diff,
        &slice.commits,
        &slice.base,
        &slice.branch,
    )?;

    let pieces = plan
        .steps
        .iter()
        .filter(|s| matches!(s, PlanStep::DropLines { .. }))
        .count();
    if !dry_run && !yes && pieces > config.general.confirm_large_splits {
        bail!("split would produce {pieces} commits - re-run with --yes to confirm");
    }

    if dry_run {
        utils::print_plan(&plan, &slice.commits);
        return Ok(());
    }

    repo.require_clean()?;
    output::info(&format!(
        "splitting {} into {pieces} commit(s)",
        &target[..target.len().min(8)]
    ));
    utils::run_plan(&plan, &repo, false)
}
