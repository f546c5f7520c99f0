//! # restitch-git
//!
//! Git object-store adapter for restitch, built on git2-rs.
//!
//! Exposes the pure diff model ([`Commit`], [`CommitDiff`], [`FileDiff`],
//! [`Hunk`]), the [`RepoCapability`] trait the engine consumes, and the
//! concrete [`Repository`] backend. Everything above this crate works with
//! plain owned values and string OIDs; git2 types never leak upward.

mod diff;
mod error;
mod repository;
mod traits;

pub use diff::{Commit, CommitDiff, DiffLine, DiffLineKind, FileDiff, Hunk};
pub use error::{Error, Result};
pub use repository::Repository;
pub use traits::{
    ApplyResult, ConflictPath, ConflictReport, ConflictSides, PickResult, RepoCapability,
};
