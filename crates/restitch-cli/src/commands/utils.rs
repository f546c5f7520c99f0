//! Shared helpers for command implementations.

use anyhow::{bail, Context, Result};
use restitch_core::{Config, MutationOutcome, PlanStep, RebasePlan};
use restitch_git::{Commit, RepoCapability, Repository};

use crate::output;

/// Open the surrounding repository and its configuration.
pub fn open_repo_and_config() -> Result<(Repository, Config)> {
    let repo = Repository::open_current()?;
    let config = Config::load(repo.git_dir().join("restitch").join("config.toml"))?;
    Ok((repo, config))
}

/// The working slice of the current branch.
pub struct BranchSlice {
    /// Reference point (merge base with the base branch), excluded from
    /// listings and rewrites.
    pub base: String,
    /// Name of the checked-out branch.
    pub branch: String,
    /// Commits between the reference point and HEAD, oldest first.
    pub commits: Vec<Commit>,
}

/// Resolve the branch slice against the requested or configured base.
pub fn branch_slice(
    repo: &Repository,
    base_ref: Option<&str>,
    config: &Config,
) -> Result<BranchSlice> {
    let target = base_ref.unwrap_or(&config.general.default_base);
    let base = repo
        .find_reference_point(target)
        .with_context(|| format!("cannot find a reference point against '{target}'"))?;
    let branch = repo.current_branch()?;
    let head = repo.head_oid()?;
    let commits = repo.list_commits(&head, &base)?;
    if commits.is_empty() {
        bail!("no commits between '{target}' and HEAD");
    }
    Ok(BranchSlice {
        base,
        branch,
        commits,
    })
}

/// Resolve a hash or unique prefix to a commit on the slice.
pub fn resolve_on_slice<'a>(commits: &'a [Commit], spec: &str) -> Result<&'a Commit> {
    let mut matches = commits.iter().filter(|c| c.oid.starts_with(spec));
    match (matches.next(), matches.next()) {
        (Some(commit), None) => Ok(commit),
        (Some(_), Some(_)) => bail!("commit '{spec}' is ambiguous on this branch"),
        (None, _) => bail!("commit '{spec}' is not on this branch"),
    }
}

/// Like [`resolve_on_slice`], returning the commit's row index.
pub fn resolve_index(commits: &[Commit], spec: &str) -> Result<usize> {
    let oid = resolve_on_slice(commits, spec)?.oid.clone();
    Ok(commits
        .iter()
        .position(|c| c.oid == oid)
        .unwrap_or_default())
}

/// Print a plan in human-readable form.
pub fn print_plan(plan: &RebasePlan, commits: &[Commit]) {
    output::info(&format!("plan with {} step(s):", plan.steps.len()));
    for (idx, step) in plan.steps.iter().enumerate() {
        output::detail(&format!("  {idx}: {}", describe_step(step, commits)));
    }
}

fn describe_step(step: &PlanStep, commits: &[Commit]) -> String {
    let summary_of = |oid: &str| {
        commits
            .iter()
            .find(|c| c.oid == oid)
            .map_or_else(String::new, |c| c.summary.clone())
    };
    match step {
        PlanStep::CherryPick { commit } => {
            format!("pick    {} {}", short(commit), summary_of(commit))
        }
        PlanStep::Squash { commit, .. } => {
            format!("squash  {} {} (into previous)", short(commit), summary_of(commit))
        }
        PlanStep::Reword { message } => {
            let subject = message.lines().next().unwrap_or("");
            format!("reword  previous as \"{subject}\"")
        }
        PlanStep::DropLines {
            commit,
            file,
            hunk_indices,
            message,
        } => {
            let subject = message.lines().next().unwrap_or("");
            format!(
                "piece   {} {} (hunks {:?}) \"{subject}\"",
                short(commit),
                file,
                hunk_indices
            )
        }
        PlanStep::UpdateRef { name } => format!("update  refs/heads/{name}"),
    }
}

fn short(oid: &str) -> &str {
    &oid[..oid.len().min(8)]
}

/// Execute a plan and report the outcome. Conflicts and aborts become
/// errors so the process exits non-zero.
pub fn run_plan(plan: &RebasePlan, repo: &Repository, json: bool) -> Result<()> {
    let outcome = restitch_core::execute(plan, repo);
    if json {
        output::essential(&serde_json::to_string_pretty(&outcome)?);
    }

    match outcome {
        MutationOutcome::Applied { new_tip, rewritten } => {
            if !json {
                output::success(&format!("rewrote {} commit(s)", rewritten.len()));
                output::essential(&new_tip);
            }
            Ok(())
        }
        MutationOutcome::Conflict {
            failed_step,
            conflicting_paths,
            partial_new_tip,
        } => {
            if !json {
                for path in &conflicting_paths {
                    output::warn(&format!("conflict in {path}"));
                }
                if let Some(tip) = &partial_new_tip {
                    output::info(&format!("partial result left at {} for inspection", short(tip)));
                }
            }
            bail!(
                "step {failed_step} conflicted in {} file(s) - branch ref unchanged",
                conflicting_paths.len()
            )
        }
        MutationOutcome::Aborted { reason } => bail!("aborted: {reason}"),
    }
}
