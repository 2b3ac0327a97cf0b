//! Deployer driving one reconciliation cycle.
//!
//! This module ties the repository scan, the live workspace listing, the diff
//! and the plan executor together, and owns the plan lifecycle: a plan is
//! computed, may be inspected any number of times, and is consumed by a run.

use tracing::{debug, info};

use crate::config::{ContentHasher, DeployConfig};
use crate::error::{PlanError, Result};
use crate::fabric::{WorkspaceApi, WorkspaceObserver};
use crate::items::{Item, ItemCatalog};
use crate::planner::{DeploymentPlan, DiffEngine, ExecutionReport, IdentityMapping, PlanExecutor};

/// Deployer for one source/target workspace pair.
#[derive(Debug)]
pub struct Deployer<'a, A: WorkspaceApi + ?Sized> {
    /// Configuration.
    config: &'a DeployConfig,
    /// Remote API.
    api: &'a A,
    /// Repository scanner.
    catalog: ItemCatalog,
    /// Diff engine.
    diff_engine: DiffEngine,
    /// Content hasher.
    hasher: ContentHasher,
    /// Declared items from the last scan.
    declared: Vec<Item>,
    /// Last computed plan.
    plan: Option<DeploymentPlan>,
    /// Identity mapping for the pair.
    mapping: IdentityMapping,
}

impl<'a, A: WorkspaceApi + ?Sized> Deployer<'a, A> {
    /// Creates a new deployer with no plan.
    #[must_use]
    pub fn new(config: &'a DeployConfig, api: &'a A) -> Self {
        Self {
            config,
            api,
            catalog: ItemCatalog::new(&config.repo_local_path),
            diff_engine: DiffEngine::new(),
            hasher: ContentHasher::new(),
            declared: Vec::new(),
            plan: None,
            mapping: IdentityMapping::new(config.source_workspace_id(), config.target_workspace_id()),
        }
    }

    /// Scans the repository and checks the declared state.
    ///
    /// Performs no remote calls.
    ///
    /// # Errors
    ///
    /// Returns an error if the scan or the source checks fail.
    pub fn scan(&mut self) -> Result<&[Item]> {
        let declared = self.catalog.scan()?;
        self.diff_engine.run_source_checks(&declared)?;
        self.declared = declared;
        Ok(&self.declared)
    }

    /// Computes a fresh plan against the current target state.
    ///
    /// Source checks run before any remote call. The identity mapping is
    /// reset, so a refresh is required before notebooks can be deployed.
    ///
    /// # Errors
    ///
    /// Returns an error if the scan, the source checks or the listing fail.
    pub async fn compute_plan(&mut self) -> Result<&DeploymentPlan> {
        let config = self.config;
        self.plan = None;
        self.scan()?;

        let target = config.target_workspace_id();
        let live = WorkspaceObserver::new(self.api).list_items(target).await?;

        let diff = self.diff_engine.diff(&self.declared, &live);
        let state_hash = self.hasher.hash_items(&self.declared);
        debug!("Declared state hash: {}", self.hasher.short_hash(&state_hash));

        let plan = DeploymentPlan::from_diff(diff, config.source_workspace_id(), target, state_hash);
        info!(
            "Computed plan {}: {} creates, {} deletes, {} skipped",
            plan.id,
            plan.create_count(),
            plan.delete_count(),
            plan.skipped_count()
        );

        self.mapping = IdentityMapping::new(config.source_workspace_id(), target);
        Ok(&*self.plan.insert(plan))
    }

    /// Returns the current plan.
    ///
    /// # Errors
    ///
    /// Returns an error if no plan was computed or it was already run.
    pub fn plan(&self) -> Result<&DeploymentPlan> {
        self.plan
            .as_ref()
            .filter(|p| p.is_current())
            .ok_or_else(|| PlanError::PlanNotCurrent.into())
    }

    /// Runs the current plan.
    ///
    /// The plan is consumed even if the run fails part way.
    ///
    /// # Errors
    ///
    /// Returns an error if there is no current plan or execution fails.
    pub async fn run(&mut self) -> Result<ExecutionReport> {
        let plan = self.plan.as_mut().ok_or(PlanError::PlanNotCurrent)?;
        PlanExecutor::new(self.api, &self.declared)
            .execute(plan, &mut self.mapping)
            .await
    }

    /// Declared items from the last scan.
    #[must_use]
    pub fn declared_items(&self) -> &[Item] {
        &self.declared
    }

    /// Current identity mapping.
    #[must_use]
    pub const fn mapping(&self) -> &IdentityMapping {
        &self.mapping
    }
}
