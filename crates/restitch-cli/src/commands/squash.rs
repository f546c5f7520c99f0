//! `restitch squash` command - fold one commit into an earlier one.

use anyhow::Result;
use restitch_core::{plan_squash, RelationshipKind};
use restitch_git::RepoCapability;

use super::utils;
use crate::output;

/// Run the squash command.
pub fn run(source: &str, target: &str, base: Option<&str>, dry_run: bool) -> Result<()> {
    let (repo, config) = utils::open_repo_and_config()?;
    let slice = utils::branch_slice(&repo, base, &config)?;

    let source_idx = utils::resolve_index(&slice.commits, source)?;
    let target_idx = utils::resolve_index(&slice.commits, target)?;

    // Advisory check before touching anything: a predicted conflict often
    // means the cherry-pick will stop midway.
    let diffs = slice
        .commits
        .iter()
        .map(|c| repo.commit_diff_precise(&c.oid))
        .collect::<restitch_git::Result<Vec<_>>>()?;
    let map = restitch_core::cluster(&diffs)?;
    if map.relationship(target_idx, source_idx) == RelationshipKind::Conflicting {
        output::warn("these commits edit overlapping lines; the squash may conflict");
    }

    let plan = plan_squash(
        &slice.commits[source_idx].oid,
        &slice.commits[target_idx].oid,
        &slice.commits,
        &slice.base,
        &slice.branch,
    )?;

    if dry_run {
        utils::print_plan(&plan, &slice.commits);
        return Ok(());
    }

    repo.require_clean()?;
    utils::run_plan(&plan, &repo, false)
}
