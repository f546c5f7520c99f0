//! Core library for Restitch.
//!
//! The engine behind feature-branch history inspection and rewriting:
//!
//! - [`cluster`] turns per-commit diffs into a commit x cluster matrix (the
//!   fragmap) showing which commits touch overlapping regions of code.
//! - [`plan`] computes rebase plans (reorder, squash, split, reword) as pure
//!   values, without touching any repository.
//! - [`execute`] walks a plan against a [`restitch_git::RepoCapability`],
//!   detecting conflicts and updating the branch ref only on full success.
//!
//! All repository access goes through the capability trait; the core never
//! talks to on-disk git internals directly.

pub mod cluster;
pub mod config;
pub mod error;
pub mod execute;
pub mod plan;

pub use cluster::{cluster, FileSpan, FragMap, RelationshipKind, SpanCluster, TouchKind};
pub use config::Config;
pub use error::{Error, Result};
pub use execute::{execute, CancelFlag, Executor, MutationOutcome};
pub use plan::{
    plan_reorder, plan_reword, plan_split, plan_squash, PlanStep, RebasePlan, SplitStrategy,
};
