//! `restitch reorder` command - replay the branch in a new order.

use anyhow::{bail, Result};
use restitch_core::plan_reorder;

use super::utils;
use crate::output;

/// Run the reorder command.
pub fn run(order: &[String], base: Option<&str>, dry_run: bool, json: bool) -> Result<()> {
    let (repo, config) = utils::open_repo_and_config()?;
    let slice = utils::branch_slice(&repo, base, &config)?;

    if order.len() != slice.commits.len() {
        bail!(
            "the new order must name all {} commit(s) on this branch, got {}",
            slice.commits.len(),
            order.len()
        );
    }
    let new_order = order
        .iter()
        .map(|spec| utils::resolve_index(&slice.commits, spec))
        .collect::<Result<Vec<_>>>()?;

    let plan = plan_reorder(&slice.commits, &new_order, &slice.base, &slice.branch)?;

    if dry_run {
        if json {
            output::essential(&serde_json::to_string_pretty(&plan)?);
        } else {
            utils::print_plan(&plan, &slice.commits);
        }
        return Ok(());
    }

    repo.require_clean()?;
    utils::run_plan(&plan, &repo, json)
}
