//! Planning module for reconciliation.
//!
//! This module compares desired and observed entity sets, builds the
//! ordered reconciliation plan and applies it through a [`Backend`].

mod backend;
mod diff;
mod executor;
mod plan;

pub use backend::{Backend, NetworkInfo, NetworkSpec};
pub use diff::{DiffEngine, DiffNode, DiffReport};
pub use executor::{ActionOutcome, ExecutionReport, Executor};
pub use plan::{ActionKind, Planner, ReconciliationAction, ReconciliationPlan, TargetFilter};

#[cfg(test)]
pub(crate) use backend::mock;
