//! `restitch map` command - render the commit x cluster matrix.

use anyhow::Result;
use restitch_core::FragMap;
use restitch_git::RepoCapability;

use super::utils;
use crate::output;

/// Run the map command.
pub fn run(base: Option<&str>, json: bool) -> Result<()> {
    let (repo, config) = utils::open_repo_and_config()?;
    let slice = utils::branch_slice(&repo, base, &config)?;

    let diffs = slice
        .commits
        .iter()
        .map(|c| repo.commit_diff_precise(&c.oid))
        .collect::<restitch_git::Result<Vec<_>>>()?;
    let map = restitch_core::cluster(&diffs)?;

    if json {
        output::essential(&serde_json::to_string_pretty(&map)?);
        return Ok(());
    }
    print_map(&map);
    Ok(())
}

fn print_map(map: &FragMap) {
    if map.clusters.is_empty() {
        output::info("no overlapping changes between these commits");
    }

    for (row, commit) in map.commits.iter().enumerate() {
        let cells = map.touch[row]
            .iter()
            .map(|&t| output::touch_indicator(t))
            .collect::<Vec<_>>()
            .join(" ");
        output::detail(&format!(
            "{:<10} {cells}  {}",
            commit.short_oid(),
            commit.summary
        ));
    }

    if !map.clusters.is_empty() {
        output::detail("");
        for (col, cluster) in map.clusters.iter().enumerate() {
            output::detail(&format!(
                "  [{col}] {}:{}-{}",
                cluster.path, cluster.start_line, cluster.end_line
            ));
        }
    }

    let mut any_related = false;
    for a in 0..map.commits.len() {
        for b in (a + 1)..map.commits.len() {
            if map.relates(a, b) {
                if !any_related {
                    output::detail("");
                    output::info("predicted relationships (advisory, not a guarantee):");
                    any_related = true;
                }
                output::detail(&format!(
                    "  {} ~ {}: {}",
                    map.commits[a].short_oid(),
                    map.commits[b].short_oid(),
                    output::relationship_label(map.relationship(a, b))
                ));
            }
        }
    }
}
