//! Deployment plan types and construction.
//!
//! This module wraps a diff result into a plan with a lifecycle, and lists the
//! actions it implies in execution order.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::error::{PlanError, Result};
use crate::items::DEFAULT_LAKEHOUSE;

use super::diff::DiffResult;

/// Lifecycle of a plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PlanStatus {
    /// Computed against current remote state and not yet run.
    Computed,
    /// Already run; must be recomputed before another run.
    Executed,
}

/// A complete deployment plan.
#[derive(Debug, Clone, Serialize)]
pub struct DeploymentPlan {
    /// Plan identifier.
    pub id: Uuid,
    /// When the plan was created.
    pub created_at: DateTime<Utc>,
    /// Source workspace id.
    pub source_workspace_id: String,
    /// Target workspace id.
    pub target_workspace_id: String,
    /// Fingerprint of the declared state this plan is based on.
    pub state_hash: String,
    /// Per-kind partitions.
    pub diff: DiffResult,
    /// Lifecycle status.
    pub status: PlanStatus,
}

/// A single planned action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlannedAction {
    /// Action type.
    pub action_type: ActionType,
    /// Resource name.
    pub resource_name: String,
    /// Reason for this action.
    pub reason: String,
}

/// Types of actions in a plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    /// Create a lakehouse from its declared metadata.
    CreateLakehouse,
    /// Delete a lakehouse that is not declared.
    DeleteLakehouse,
    /// Re-resolve the default lakehouse in both workspaces.
    RefreshMapping,
    /// Create a notebook with rewritten content.
    CreateNotebook,
    /// Notebook exists in both; updates are not supported.
    SkipNotebookUpdate,
    /// Notebook exists only in the target; deletes are not supported.
    SkipNotebookDelete,
}

impl DeploymentPlan {
    /// Creates a new plan from a diff result.
    #[must_use]
    pub fn from_diff(
        diff: DiffResult,
        source_workspace_id: impl Into<String>,
        target_workspace_id: impl Into<String>,
        state_hash: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            source_workspace_id: source_workspace_id.into(),
            target_workspace_id: target_workspace_id.into(),
            state_hash: state_hash.into(),
            diff,
            status: PlanStatus::Computed,
        }
    }

    /// Returns true if the plan can still be run.
    #[must_use]
    pub fn is_current(&self) -> bool {
        self.status == PlanStatus::Computed
    }

    /// Marks the plan as executed.
    ///
    /// # Errors
    ///
    /// Returns an error if the plan was already executed.
    pub fn mark_executed(&mut self) -> Result<()> {
        if !self.is_current() {
            return Err(PlanError::PlanNotCurrent.into());
        }
        self.status = PlanStatus::Executed;
        Ok(())
    }

    /// Returns every action in execution order.
    ///
    /// The mapping refresh is always present, even for an empty diff.
    #[must_use]
    pub fn actions(&self) -> Vec<PlannedAction> {
        let lakehouse = &self.diff.lakehouse;
        let notebook = &self.diff.notebook;

        let mut actions: Vec<PlannedAction> = lakehouse
            .new
            .iter()
            .map(|n| PlannedAction::new(ActionType::CreateLakehouse, n, "Declared in repository"))
            .collect();

        actions.extend(
            lakehouse
                .dangling
                .iter()
                .map(|n| PlannedAction::new(ActionType::DeleteLakehouse, n, "Not declared in repository")),
        );

        actions.push(PlannedAction::new(
            ActionType::RefreshMapping,
            DEFAULT_LAKEHOUSE,
            "Resolve lakehouse ids for notebook content",
        ));

        actions.extend(
            notebook
                .new
                .iter()
                .map(|n| PlannedAction::new(ActionType::CreateNotebook, n, "Declared in repository")),
        );
        actions.extend(
            notebook
                .update
                .iter()
                .map(|n| PlannedAction::new(ActionType::SkipNotebookUpdate, n, "Update not supported")),
        );
        actions.extend(
            notebook
                .dangling
                .iter()
                .map(|n| PlannedAction::new(ActionType::SkipNotebookDelete, n, "Delete not supported")),
        );

        actions
    }

    /// Returns true if nothing would be created or deleted.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.diff.is_converged()
    }

    /// Returns the number of create actions.
    #[must_use]
    pub fn create_count(&self) -> usize {
        self.diff.lakehouse.new.len() + self.diff.notebook.new.len()
    }

    /// Returns the number of delete actions.
    #[must_use]
    pub fn delete_count(&self) -> usize {
        self.diff.lakehouse.dangling.len()
    }

    /// Returns the number of notebook operations that will be skipped.
    #[must_use]
    pub fn skipped_count(&self) -> usize {
        self.diff.notebook.update.len() + self.diff.notebook.dangling.len()
    }
}

impl PlannedAction {
    /// Creates a new action.
    #[must_use]
    pub fn new(action_type: ActionType, resource_name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            action_type,
            resource_name: resource_name.into(),
            reason: reason.into(),
        }
    }

    /// Returns true if the action mutates the target workspace.
    #[must_use]
    pub const fn is_mutation(&self) -> bool {
        matches!(
            self.action_type,
            ActionType::CreateLakehouse | ActionType::DeleteLakehouse | ActionType::CreateNotebook
        )
    }

    /// Returns a human-readable description of the action.
    #[must_use]
    pub fn description(&self) -> String {
        match self.action_type {
            ActionType::CreateLakehouse => format!("Create lakehouse '{}'", self.resource_name),
            ActionType::DeleteLakehouse => format!("Delete lakehouse '{}'", self.resource_name),
            ActionType::RefreshMapping => String::from("Refresh default lakehouse mapping"),
            ActionType::CreateNotebook => format!("Create notebook '{}'", self.resource_name),
            ActionType::SkipNotebookUpdate => format!("Skip update of notebook '{}'", self.resource_name),
            ActionType::SkipNotebookDelete => format!("Skip delete of notebook '{}'", self.resource_name),
        }
    }
}

impl std::fmt::Display for ActionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::CreateLakehouse => "create-lakehouse",
            Self::DeleteLakehouse => "delete-lakehouse",
            Self::RefreshMapping => "refresh-mapping",
            Self::CreateNotebook => "create-notebook",
            Self::SkipNotebookUpdate => "skip-notebook-update",
            Self::SkipNotebookDelete => "skip-notebook-delete",
        };
        write!(f, "{s}")
    }
}

impl std::fmt::Display for PlannedAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.action_type, self.resource_name)?;
        if !self.reason.is_empty() {
            write!(f, " ({})", self.reason)?;
        }
        Ok(())
    }
}

impl std::fmt::Display for DeploymentPlan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_empty() && self.skipped_count() == 0 {
            return write!(f, "No changes required");
        }

        let actions = self.actions();
        writeln!(f, "Deployment Plan ({} actions):", actions.len())?;
        for (i, action) in actions.iter().enumerate() {
            writeln!(f, "  {i}. {action}")?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FabricDeployError;

    fn plan_with(lh_new: &[&str], lh_dangling: &[&str], nb_new: &[&str], nb_update: &[&str]) -> DeploymentPlan {
        let mut diff = DiffResult::default();
        diff.lakehouse.new = lh_new.iter().map(|s| (*s).to_string()).collect();
        diff.lakehouse.dangling = lh_dangling.iter().map(|s| (*s).to_string()).collect();
        diff.notebook.new = nb_new.iter().map(|s| (*s).to_string()).collect();
        diff.notebook.update = nb_update.iter().map(|s| (*s).to_string()).collect();
        DeploymentPlan::from_diff(diff, "src", "tgt", "hash")
    }

    #[test]
    fn test_actions_follow_dependency_order() {
        let plan = plan_with(&["A"], &["B"], &["N"], &["M"]);

        let kinds: Vec<ActionType> = plan.actions().iter().map(|a| a.action_type).collect();
        assert_eq!(
            kinds,
            vec![
                ActionType::CreateLakehouse,
                ActionType::DeleteLakehouse,
                ActionType::RefreshMapping,
                ActionType::CreateNotebook,
                ActionType::SkipNotebookUpdate,
            ]
        );
        assert_eq!(plan.create_count(), 2);
        assert_eq!(plan.delete_count(), 1);
        assert_eq!(plan.skipped_count(), 1);
    }

    #[test]
    fn test_empty_plan_still_refreshes() {
        let plan = plan_with(&[], &[], &[], &[]);

        assert!(plan.is_empty());
        let actions = plan.actions();
        assert_eq!(actions.len(), 1);
        assert_eq!(actions[0].action_type, ActionType::RefreshMapping);
        assert!(!actions[0].is_mutation());
        assert_eq!(plan.to_string(), "No changes required");
    }

    #[test]
    fn test_plan_lifecycle() {
        let mut plan = plan_with(&["A"], &[], &[], &[]);
        assert!(plan.is_current());

        plan.mark_executed().expect("First run should be accepted");
        assert!(!plan.is_current());

        assert!(matches!(
            plan.mark_executed(),
            Err(FabricDeployError::Plan(PlanError::PlanNotCurrent))
        ));
    }
}
