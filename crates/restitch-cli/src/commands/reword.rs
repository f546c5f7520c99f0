//! `restitch reword` command - rewrite a commit's message.

use anyhow::Result;
use restitch_core::plan_reword;

use super::utils;

/// Run the reword command.
pub fn run(commit: &str, message: &str, base: Option<&str>) -> Result<()> {
    let (repo, config) = utils::open_repo_and_config()?;
    let slice = utils::branch_slice(&repo, base, &config)?;

    let target = utils::resolve_on_slice(&slice.commits, commit)?.oid.clone();
    let plan = plan_reword(&target, message, &slice.commits, &slice.base, &slice.branch)?;

    repo.require_clean()?;
    utils::run_plan(&plan, &repo, false)
}
