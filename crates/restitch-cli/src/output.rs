//! Terminal output formatting utilities.

use std::sync::atomic::{AtomicBool, Ordering};

use colored::Colorize;
use restitch_core::{RelationshipKind, TouchKind};

static QUIET_MODE: AtomicBool = AtomicBool::new(false);

/// Set quiet mode globally. Call once at startup.
pub fn set_quiet(quiet: bool) {
    QUIET_MODE.store(quiet, Ordering::Relaxed);
}

fn is_quiet() -> bool {
    QUIET_MODE.load(Ordering::Relaxed)
}

/// Print a success message (suppressed in quiet mode).
pub fn success(msg: &str) {
    if !is_quiet() {
        println!("{} {}", "✓".green(), msg);
    }
}

/// Print an error message (always prints to stderr).
pub fn error(msg: &str) {
    eprintln!("{} {}", "✗".red(), msg);
}

/// Print a warning message (always prints to stderr).
pub fn warn(msg: &str) {
    eprintln!("{} {}", "!".yellow(), msg);
}

/// Print an info message (suppressed in quiet mode).
pub fn info(msg: &str) {
    if !is_quiet() {
        println!("{} {}", "→".blue(), msg);
    }
}

/// Print a detail line without prefix (suppressed in quiet mode).
pub fn detail(msg: &str) {
    if !is_quiet() {
        println!("{msg}");
    }
}

/// Print essential machine-readable output (always prints).
///
/// Use for results that should be available for piping, like new tip ids.
pub fn essential(msg: &str) {
    println!("{msg}");
}

/// Matrix cell glyph for a touch kind.
#[must_use]
pub fn touch_indicator(touch: TouchKind) -> String {
    match touch {
        TouchKind::Added => "A".green().to_string(),
        TouchKind::Modified => "M".yellow().to_string(),
        TouchKind::Deleted => "D".red().to_string(),
        TouchKind::None => "·".dimmed().to_string(),
    }
}

/// Short label for a predicted relationship.
#[must_use]
pub fn relationship_label(kind: RelationshipKind) -> String {
    match kind {
        RelationshipKind::Squashable => "squashable".green().to_string(),
        RelationshipKind::Conflicting => "conflicting".red().to_string(),
        RelationshipKind::Unrelated => "unrelated".dimmed().to_string(),
    }
}
