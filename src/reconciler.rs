//! Reconciler for converging a stack on its bundle.
//!
//! This module wires the pieces of one reconciliation cycle together:
//! observe the stack through a [`Backend`], translate the bundle into desired
//! entities, plan, and hand the plan to the executor.

use tracing::{debug, info};

use crate::canonical::EntitySet;
use crate::config::Stack;
use crate::error::{ReconcileError, Result};
use crate::planner::{Backend, ExecutionReport, Executor, Planner, ReconciliationPlan, TargetFilter};
use crate::translate::StackTranslator;

/// Reconciler for one stack.
pub struct Reconciler<'a, B: Backend> {
    /// Stack and its bundle.
    stack: &'a Stack,
    /// Control plane.
    backend: &'a B,
    /// Bundle translator.
    translator: StackTranslator,
    /// Planner.
    planner: Planner,
}

impl<'a, B: Backend> Reconciler<'a, B> {
    /// Creates a new reconciler.
    #[must_use]
    pub fn new(stack: &'a Stack, backend: &'a B) -> Self {
        Self {
            stack,
            backend,
            translator: StackTranslator::new(&stack.name),
            planner: Planner::new(&stack.name),
        }
    }

    /// Computes the plan that converges the stack on its bundle.
    ///
    /// Nothing on the control plane is modified.
    ///
    /// # Errors
    ///
    /// Returns an error if the stack cannot be observed or a live service
    /// cannot be compared with its declaration.
    pub async fn plan(&self, filter: &TargetFilter) -> Result<ReconciliationPlan> {
        info!("Planning stack {}", self.stack.name);

        let existing = self.backend.list_networks(&self.stack.name).await?;
        let desired = self.translator.translate(&self.stack.bundle, &existing);
        let observed = self.backend.list_services(&self.stack.name).await?;
        debug!(
            "{} services declared, {} deployed",
            desired.services.len(),
            observed.len()
        );

        let plan = self
            .planner
            .plan(&desired.services, &observed, filter)?
            .with_networks(desired.networks);
        info!("{}", plan.to_string().trim_end());
        Ok(plan)
    }

    /// Applies a plan.
    ///
    /// # Errors
    ///
    /// Returns an error if the plan was computed for another stack or
    /// prerequisite networks cannot be provisioned. Failed entity actions are
    /// reported in the returned report.
    pub async fn apply(&self, plan: &ReconciliationPlan) -> Result<ExecutionReport> {
        if plan.scope != self.stack.name {
            return Err(ReconcileError::Aborted {
                reason: format!(
                    "plan targets stack '{}', not '{}'",
                    plan.scope, self.stack.name
                ),
            }
            .into());
        }
        Executor::new(self.backend).execute(plan).await
    }

    /// Computes a plan that removes the bundle's services from the stack.
    ///
    /// Services of the stack that the bundle does not declare are left alone.
    ///
    /// # Errors
    ///
    /// Returns an error if the stack cannot be observed.
    pub async fn destroy_plan(&self) -> Result<ReconciliationPlan> {
        info!("Planning removal of stack {}", self.stack.name);

        let names = self.stack.service_names();
        if names.is_empty() {
            return Ok(self
                .planner
                .plan(&EntitySet::new(), &EntitySet::new(), &TargetFilter::all())?);
        }

        let observed = self.backend.list_services(&self.stack.name).await?;
        Ok(self
            .planner
            .plan(&EntitySet::new(), &observed, &TargetFilter::new(names))?)
    }
}
