//! Plan executor for applying reconciliation plans.
//!
//! This module provisions the scope's shared networks and then issues one
//! backend call per planned action, in plan order. A failing action does not
//! stop the run; every failure is collected into the report.

use std::collections::HashSet;
use tracing::{debug, error, info};

use crate::error::{BackendError, ExecutionError, ReconcileError, Result};

use super::backend::Backend;
use super::plan::{ActionKind, ReconciliationAction, ReconciliationPlan};

/// Executor for reconciliation plans.
#[derive(Debug)]
pub struct Executor<'a, B: Backend> {
    /// Control plane.
    backend: &'a B,
}

/// Result of a single action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionOutcome {
    /// Entity name.
    pub name: String,
    /// Action that was executed.
    pub action: ActionKind,
    /// Whether the action succeeded.
    pub success: bool,
    /// Remote id of the entity, when known.
    pub remote_id: Option<String>,
}

/// Result of executing the entire plan.
#[derive(Debug, Default)]
pub struct ExecutionReport {
    /// Networks created before any entity action.
    pub networks_created: Vec<String>,
    /// One outcome per planned action, in plan order.
    pub outcomes: Vec<ActionOutcome>,
    /// Every failed action.
    pub errors: Vec<ExecutionError>,
}

impl<'a, B: Backend> Executor<'a, B> {
    /// Creates a new executor.
    #[must_use]
    pub const fn new(backend: &'a B) -> Self {
        Self { backend }
    }

    /// Executes a reconciliation plan.
    ///
    /// # Errors
    ///
    /// Returns an error only if the prerequisite networks cannot be listed or
    /// created; no entity action is issued in that case. Failures of entity
    /// actions are reported in [`ExecutionReport::errors`].
    pub async fn execute(&self, plan: &ReconciliationPlan) -> Result<ExecutionReport> {
        info!(
            "Executing plan for {} with {} changes",
            plan.scope,
            plan.changes().count()
        );

        let mut report = ExecutionReport::default();

        if plan.needs_networks() {
            report.networks_created = self.ensure_networks(plan).await?;
        }

        for action in &plan.actions {
            let outcome = match self.execute_action(action).await {
                Ok(remote_id) => ActionOutcome {
                    name: action.name().to_string(),
                    action: action.kind(),
                    success: true,
                    remote_id,
                },
                Err(source) => {
                    error!("Failed to {} {}: {}", action.kind(), action.name(), source);
                    report.errors.push(ExecutionError {
                        name: action.name().to_string(),
                        action: action.kind(),
                        source,
                    });
                    ActionOutcome {
                        name: action.name().to_string(),
                        action: action.kind(),
                        success: false,
                        remote_id: None,
                    }
                }
            };
            report.outcomes.push(outcome);
        }

        info!("{report}");
        Ok(report)
    }

    /// Creates every planned network the scope does not have yet.
    async fn ensure_networks(&self, plan: &ReconciliationPlan) -> Result<Vec<String>> {
        if plan.networks.is_empty() {
            return Ok(Vec::new());
        }

        let existing: HashSet<String> = self
            .backend
            .list_networks(&plan.scope)
            .await?
            .into_iter()
            .map(|n| n.name)
            .collect();

        let mut created = Vec::new();
        for network in plan.networks.iter().filter(|n| !existing.contains(&n.name)) {
            info!("Creating network {}", network.name);
            let id = self.backend.create_network(network).await.map_err(|source| {
                ReconcileError::NetworkProvisioningFailed {
                    network: network.name.clone(),
                    source,
                }
            })?;
            debug!("Created network {} (ID: {id})", network.name);
            created.push(network.name.clone());
        }

        Ok(created)
    }

    /// Executes a single action, returning the entity's remote id.
    async fn execute_action(
        &self,
        action: &ReconciliationAction,
    ) -> std::result::Result<Option<String>, BackendError> {
        match action {
            ReconciliationAction::Create(entity) => {
                info!("Creating service {}", entity.name);
                let id = self.backend.create_service(entity).await?;
                info!("Created service: {} (ID: {id})", entity.name);
                Ok(Some(id))
            }
            ReconciliationAction::Update {
                current, desired, ..
            } => {
                let (Some(id), Some(version)) = (&current.remote_id, &current.remote_version)
                else {
                    return Err(BackendError::MissingRemoteIdentity {
                        name: current.name.clone(),
                    });
                };
                info!("Updating service {} (version {version})", desired.name);
                self.backend.update_service(id, version, desired).await?;
                Ok(Some(id.clone()))
            }
            ReconciliationAction::Delete(entity) => {
                let id = entity.remote_id.as_deref().unwrap_or(&entity.name);
                info!("Removing service {}", entity.name);
                match self.backend.delete_service(id).await {
                    Ok(()) => Ok(Some(id.to_string())),
                    Err(BackendError::NotFound { .. }) => {
                        info!("Service {} was already removed", entity.name);
                        Ok(Some(id.to_string()))
                    }
                    Err(e) => Err(e),
                }
            }
            ReconciliationAction::Unchanged(entity) => Ok(entity.remote_id.clone()),
        }
    }
}

impl ExecutionReport {
    /// Returns true if every action succeeded.
    #[must_use]
    pub fn all_successful(&self) -> bool {
        self.errors.is_empty()
    }

    /// Number of successful actions of a kind.
    #[must_use]
    pub fn succeeded(&self, kind: ActionKind) -> usize {
        self.outcomes
            .iter()
            .filter(|o| o.success && o.action == kind)
            .count()
    }

    /// Returns true if any failure may go away by planning again.
    #[must_use]
    pub fn has_retryable_failures(&self) -> bool {
        self.errors.iter().any(|e| e.source.is_retryable())
    }
}

impl std::fmt::Display for ExecutionReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Executed {} actions: {} created, {} updated, {} removed, {} failed",
            self.outcomes
                .iter()
                .filter(|o| o.action != ActionKind::Unchanged)
                .count(),
            self.succeeded(ActionKind::Create),
            self.succeeded(ActionKind::Update),
            self.succeeded(ActionKind::Delete),
            self.errors.len()
        )
    }
}
