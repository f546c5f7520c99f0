//! Command-line interface definition and command implementations.

use clap::{Parser, Subcommand};

pub mod map;
pub mod reorder;
pub mod reword;
pub mod split;
pub mod squash;
pub mod utils;

pub use split::SplitBy;

/// Inspect and rewrite feature branch history.
#[derive(Parser)]
#[command(name = "restitch", version, about)]
pub struct Cli {
    /// Suppress informational output.
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands.
#[derive(Subcommand)]
pub enum Commands {
    /// Show the commit x cluster map of the current branch.
    Map {
        /// Branch to compute the reference point against.
        #[arg(long)]
        base: Option<String>,

        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Replay the branch's commits in a new order.
    Reorder {
        /// The full new order, as commit hashes or unique prefixes.
        #[arg(required = true)]
        order: Vec<String>,

        /// Branch to compute the reference point against.
        #[arg(long)]
        base: Option<String>,

        /// Print the plan without executing it.
        #[arg(long)]
        dry_run: bool,

        /// Output the plan or outcome as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Fold one commit into an earlier one.
    Squash {
        /// Commit whose changes are folded (the later one).
        source: String,

        /// Commit to fold into (the earlier one).
        target: String,

        /// Branch to compute the reference point against.
        #[arg(long)]
        base: Option<String>,

        /// Print the plan without executing it.
        #[arg(long)]
        dry_run: bool,
    },

    /// Split one commit into several.
    Split {
        /// Commit to split.
        commit: String,

        /// How to partition the commit's changes.
        #[arg(long, value_enum)]
        by: SplitBy,

        /// Branch to compute the reference point against.
        #[arg(long)]
        base: Option<String>,

        /// Print the plan without executing it.
        #[arg(long)]
        dry_run: bool,

        /// Skip the confirmation for large splits.
        #[arg(short, long)]
        yes: bool,
    },

    /// Rewrite a commit's message.
    Reword {
        /// Commit to reword.
        commit: String,

        /// The replacement message.
        #[arg(short, long)]
        message: String,

        /// Branch to compute the reference point against.
        #[arg(long)]
        base: Option<String>,
    },
}
