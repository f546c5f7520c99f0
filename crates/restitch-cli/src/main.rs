//! Restitch CLI - inspect and rewrite feature branch history.

use clap::Parser;
use tracing_subscriber::EnvFilter;

mod commands;
mod output;

use commands::{Cli, Commands};

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    output::set_quiet(cli.quiet);

    let result = match cli.command {
        Commands::Map { base, json } => commands::map::run(base.as_deref(), json),
        Commands::Reorder {
            order,
            base,
            dry_run,
            json,
        } => commands::reorder::run(&order, base.as_deref(), dry_run, json),
        Commands::Squash {
            source,
            target,
            base,
            dry_run,
        } => commands::squash::run(&source, &target, base.as_deref(), dry_run),
        Commands::Split {
            commit,
            by,
            base,
            dry_run,
            yes,
        } => commands::split::run(&commit, by, base.as_deref(), dry_run, yes),
        Commands::Reword {
            commit,
            message,
            base,
        } => commands::reword::run(&commit, &message, base.as_deref()),
    };

    if let Err(e) = result {
        output::error(&e.to_string());
        std::process::exit(1);
    }
}
