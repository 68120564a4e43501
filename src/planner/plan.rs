//! Reconciliation plan types and construction.
//!
//! The planner compares the desired entity set with the observed one and
//! sorts every name into exactly one bucket: delete, create, update or
//! unchanged.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::debug;

use crate::canonical::{Entity, EntitySet};
use crate::config::SpecHasher;
use crate::error::DiffError;

use super::backend::NetworkSpec;
use super::diff::{DiffEngine, DiffReport};

/// Kinds of planned actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionKind {
    /// Create a missing entity.
    Create,
    /// Update an entity whose spec changed.
    Update,
    /// Delete an entity that is no longer declared.
    Delete,
    /// Nothing to do.
    Unchanged,
}

/// A single planned action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconciliationAction {
    /// Entity is declared but not deployed.
    Create(Entity),
    /// Entity is deployed with a different spec.
    Update {
        /// Observed entity, carrying its remote id and version.
        current: Entity,
        /// Declared entity.
        desired: Entity,
        /// Leaf-level comparison of the two specs.
        diff: DiffReport,
    },
    /// Entity is deployed but no longer declared.
    Delete(Entity),
    /// Entity is deployed exactly as declared.
    Unchanged(Entity),
}

/// Set of fully-qualified names to restrict a plan to.
///
/// An empty filter admits every name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TargetFilter {
    names: BTreeSet<String>,
}

/// A complete reconciliation plan.
#[derive(Debug, Clone)]
pub struct ReconciliationPlan {
    /// Scope (stack name) the plan applies to.
    pub scope: String,
    /// When the plan was created.
    pub created_at: DateTime<Utc>,
    /// Fingerprint of the desired entity set.
    pub fingerprint: String,
    /// Actions in execution order: deletes, creates, updates, unchanged.
    pub actions: Vec<ReconciliationAction>,
    /// Shared networks that must exist before entities are created or updated.
    pub networks: Vec<NetworkSpec>,
}

/// Builds reconciliation plans for one scope.
#[derive(Debug, Clone)]
pub struct Planner {
    /// Scope name.
    scope: String,
    /// Diff engine.
    engine: DiffEngine,
    /// Fingerprint hasher.
    hasher: SpecHasher,
}

impl TargetFilter {
    /// A filter that admits every name.
    #[must_use]
    pub const fn all() -> Self {
        Self {
            names: BTreeSet::new(),
        }
    }

    /// A filter admitting only the given names.
    #[must_use]
    pub fn new<S: Into<String>>(names: impl IntoIterator<Item = S>) -> Self {
        Self {
            names: names.into_iter().map(Into::into).collect(),
        }
    }

    /// Returns true if `name` passes the filter.
    #[must_use]
    pub fn admits(&self, name: &str) -> bool {
        self.names.is_empty() || self.names.contains(name)
    }

    /// Returns true if the filter admits everything.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

impl Planner {
    /// Creates a planner for `scope`.
    #[must_use]
    pub fn new(scope: impl Into<String>) -> Self {
        Self {
            scope: scope.into(),
            engine: DiffEngine::new(),
            hasher: SpecHasher::new(),
        }
    }

    /// Computes the plan that converges `observed` onto `desired`.
    ///
    /// # Errors
    ///
    /// Returns [`DiffError::ShapeMismatch`] if a desired and an observed spec
    /// cannot be compared.
    pub fn plan(
        &self,
        desired: &EntitySet,
        observed: &EntitySet,
        filter: &TargetFilter,
    ) -> Result<ReconciliationPlan, DiffError> {
        let mut creates = Vec::new();
        let mut updates = Vec::new();
        let mut unchanged = Vec::new();
        let mut deletes = Vec::new();

        for entity in desired.iter().filter(|e| filter.admits(&e.name)) {
            let Some(current) = observed.get(&entity.name) else {
                debug!("Entity {} needs to be created", entity.name);
                creates.push(ReconciliationAction::Create(entity.clone()));
                continue;
            };

            let diff = self.engine.diff(&current.spec, &entity.spec)?;
            if diff.any_changed() {
                debug!(
                    "Entity {} needs update ({} fields changed)",
                    entity.name,
                    diff.changed().count()
                );
                updates.push(ReconciliationAction::Update {
                    current: current.clone(),
                    desired: entity.clone(),
                    diff,
                });
            } else {
                debug!("Entity {} is up to date", entity.name);
                unchanged.push(ReconciliationAction::Unchanged(entity.clone()));
            }
        }

        for current in observed
            .iter()
            .filter(|e| filter.admits(&e.name) && !desired.contains(&e.name))
        {
            debug!("Found orphaned entity: {}", current.name);
            deletes.push(ReconciliationAction::Delete(current.clone()));
        }

        let mut actions = deletes;
        actions.extend(creates);
        actions.extend(updates);
        actions.extend(unchanged);

        Ok(ReconciliationPlan {
            scope: self.scope.clone(),
            created_at: Utc::now(),
            fingerprint: self.hasher.hash_set(desired),
            actions,
            networks: Vec::new(),
        })
    }
}

impl ReconciliationAction {
    /// The action's kind.
    #[must_use]
    pub const fn kind(&self) -> ActionKind {
        match self {
            Self::Create(_) => ActionKind::Create,
            Self::Update { .. } => ActionKind::Update,
            Self::Delete(_) => ActionKind::Delete,
            Self::Unchanged(_) => ActionKind::Unchanged,
        }
    }

    /// Name of the entity the action concerns.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Create(e) | Self::Delete(e) | Self::Unchanged(e) => &e.name,
            Self::Update { desired, .. } => &desired.name,
        }
    }
}

impl ReconciliationPlan {
    /// Attaches the scope's prerequisite networks.
    #[must_use]
    pub fn with_networks(mut self, networks: Vec<NetworkSpec>) -> Self {
        self.networks = networks;
        self
    }

    /// Returns true if no action changes anything.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.actions
            .iter()
            .all(|a| a.kind() == ActionKind::Unchanged)
    }

    /// Number of actions of the given kind.
    #[must_use]
    pub fn count(&self, kind: ActionKind) -> usize {
        self.actions.iter().filter(|a| a.kind() == kind).count()
    }

    /// Actions that will call the backend.
    pub fn changes(&self) -> impl Iterator<Item = &ReconciliationAction> {
        self.actions
            .iter()
            .filter(|a| a.kind() != ActionKind::Unchanged)
    }

    /// Returns true if any action creates or updates an entity.
    #[must_use]
    pub fn needs_networks(&self) -> bool {
        self.actions
            .iter()
            .any(|a| matches!(a.kind(), ActionKind::Create | ActionKind::Update))
    }
}

impl std::fmt::Display for ActionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
            Self::Unchanged => "unchanged",
        };
        write!(f, "{s}")
    }
}

impl std::fmt::Display for ReconciliationAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.kind(), self.name())
    }
}

impl std::fmt::Display for ReconciliationPlan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_empty() {
            return write!(f, "No changes required");
        }

        writeln!(f, "Plan for {} ({} changes):", self.scope, self.changes().count())?;
        for (i, action) in self.changes().enumerate() {
            writeln!(f, "  {}. {action}", i + 1)?;
        }
        Ok(())
    }
}
