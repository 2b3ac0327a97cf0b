//! Plan executor for applying deployment plans.
//!
//! Phases run strictly in dependency order: lakehouse creates, lakehouse
//! deletes, mapping refresh, notebook creates. The first failing remote call
//! aborts the run; nothing is rolled back.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{FabricError, PlanError, Result};
use crate::fabric::{CreateNotebookRequest, WorkspaceApi, WorkspaceObserver};
use crate::items::{Item, ItemKind, NOTEBOOK_CONTENT_FILE};

use super::mapping::{apply_substitutions, IdentityMapper, IdentityMapping};
use super::plan::{ActionType, DeploymentPlan, PlannedAction};

/// Executor for deployment plans.
#[derive(Debug)]
pub struct PlanExecutor<'a, A: WorkspaceApi + ?Sized> {
    /// Remote API.
    api: &'a A,
    /// Declared items the plan was computed from.
    declared: &'a [Item],
}

/// An action that completed.
#[derive(Debug, Clone, Serialize)]
pub struct ExecutedStep {
    /// The planned action.
    pub action: PlannedAction,
    /// Id of the affected lakehouse, if known.
    pub resource_id: Option<String>,
    /// When it completed.
    pub completed_at: DateTime<Utc>,
}

/// Result of executing the entire plan.
#[derive(Debug, Clone, Serialize)]
pub struct ExecutionReport {
    /// Plan that was run.
    pub plan_id: Uuid,
    /// When execution started.
    pub started_at: DateTime<Utc>,
    /// When execution finished.
    pub finished_at: DateTime<Utc>,
    /// Completed actions in order.
    pub steps: Vec<ExecutedStep>,
    /// Notebook operations that were reported but not performed.
    pub skipped: Vec<PlannedAction>,
}

impl<'a, A: WorkspaceApi + ?Sized> PlanExecutor<'a, A> {
    /// Creates a new plan executor.
    #[must_use]
    pub const fn new(api: &'a A, declared: &'a [Item]) -> Self {
        Self { api, declared }
    }

    /// Executes a deployment plan against its target workspace.
    ///
    /// The plan is marked executed before the first mutation, so it cannot be
    /// run again even if execution fails part way.
    ///
    /// # Errors
    ///
    /// Returns an error if the mapping is for other workspaces than the plan,
    /// the plan is not current, or any step fails.
    pub async fn execute(&self, plan: &mut DeploymentPlan, mapping: &mut IdentityMapping) -> Result<ExecutionReport> {
        if plan.source_workspace_id != mapping.source_workspace_id()
            || plan.target_workspace_id != mapping.target_workspace_id()
        {
            return Err(PlanError::WorkspaceMismatch {
                plan_source: plan.source_workspace_id.clone(),
                plan_target: plan.target_workspace_id.clone(),
                mapping_source: mapping.source_workspace_id().to_string(),
                mapping_target: mapping.target_workspace_id().to_string(),
            }
            .into());
        }

        plan.mark_executed()?;

        let started_at = Utc::now();
        let target = plan.target_workspace_id.clone();
        let mut steps = Vec::new();
        let mut skipped = Vec::new();

        info!("Executing plan {} against workspace {target}", plan.id);

        for action in plan.actions() {
            let resource_id = match action.action_type {
                ActionType::CreateLakehouse => {
                    let id = self.create_lakehouse(&target, &action.resource_name).await?;
                    mapping.invalidate();
                    Some(id)
                }
                ActionType::DeleteLakehouse => {
                    let id = self.delete_lakehouse(&target, &action.resource_name).await?;
                    mapping.invalidate();
                    Some(id)
                }
                ActionType::RefreshMapping => {
                    IdentityMapper::new(self.api)
                        .refresh_default_lakehouse_mapping(mapping)
                        .await?;
                    None
                }
                ActionType::CreateNotebook => {
                    let item = self.find_declared(ItemKind::Notebook, &action.resource_name)?;
                    self.deploy_notebook(item, mapping).await?;
                    None
                }
                ActionType::SkipNotebookUpdate | ActionType::SkipNotebookDelete => {
                    warn!("{}: not supported, skipping", action.description());
                    skipped.push(action);
                    continue;
                }
            };

            steps.push(ExecutedStep {
                action,
                resource_id,
                completed_at: Utc::now(),
            });
        }

        info!("Plan {} completed: {} steps, {} skipped", plan.id, steps.len(), skipped.len());

        Ok(ExecutionReport {
            plan_id: plan.id,
            started_at,
            finished_at: Utc::now(),
            steps,
            skipped,
        })
    }

    /// Deploys one notebook into the mapping's target workspace.
    ///
    /// Workspace ids and then lakehouse ids in the notebook content are
    /// rewritten before submission.
    ///
    /// # Errors
    ///
    /// Returns an error if the mapping is not fresh (checked before any file
    /// or remote access), the content cannot be read, or the create fails.
    pub async fn deploy_notebook(&self, item: &Item, mapping: &IdentityMapping) -> Result<()> {
        let rules = mapping.substitution_rules()?;

        let folder = item
            .source
            .as_ref()
            .map(|s| s.folder.clone())
            .ok_or_else(|| PlanError::MissingDefinition {
                kind: ItemKind::Notebook.to_string(),
                name: item.display_name.clone(),
            })?;

        let content = tokio::fs::read_to_string(folder.join(NOTEBOOK_CONTENT_FILE)).await?;
        let rewritten = apply_substitutions(&content, &rules);
        debug!(
            "Notebook '{}': applied {} substitution rules",
            item.display_name,
            rules.len()
        );

        let request = CreateNotebookRequest::from_content(&item.display_name, &rewritten);
        self.api
            .create_notebook(mapping.target_workspace_id(), &request)
            .await?;

        info!("Created notebook '{}'", item.display_name);
        Ok(())
    }

    /// Creates a lakehouse from its declared metadata.
    async fn create_lakehouse(&self, workspace_id: &str, name: &str) -> Result<String> {
        let item = self.find_declared(ItemKind::Lakehouse, name)?;
        let definition = item
            .source
            .as_ref()
            .map(|s| s.metadata.clone())
            .ok_or_else(|| PlanError::MissingDefinition {
                kind: ItemKind::Lakehouse.to_string(),
                name: name.to_string(),
            })?;

        let id = self.api.create_lakehouse(workspace_id, &definition).await?;
        info!("Created lakehouse '{name}' ({id})");
        Ok(id)
    }

    /// Deletes a lakehouse, resolving its current id by name first.
    async fn delete_lakehouse(&self, workspace_id: &str, name: &str) -> Result<String> {
        let id = WorkspaceObserver::new(self.api)
            .find_lakehouse_id(workspace_id, name)
            .await?
            .ok_or_else(|| FabricError::LakehouseNotFound {
                workspace_id: workspace_id.to_string(),
                display_name: name.to_string(),
            })?;

        self.api.delete_lakehouse(workspace_id, &id).await?;
        info!("Deleted lakehouse '{name}' ({id})");
        Ok(id)
    }

    /// Looks up a declared item by kind and name.
    fn find_declared(&self, kind: ItemKind, name: &str) -> Result<&'a Item> {
        self.declared
            .iter()
            .find(|i| i.is(kind) && i.display_name == name)
            .ok_or_else(|| {
                PlanError::MissingDefinition {
                    kind: kind.to_string(),
                    name: name.to_string(),
                }
                .into()
            })
    }
}

impl ExecutionReport {
    /// Number of mutations performed.
    #[must_use]
    pub fn mutation_count(&self) -> usize {
        self.steps.iter().filter(|s| s.action.is_mutation()).count()
    }

    /// Duration of the run.
    #[must_use]
    pub fn duration(&self) -> chrono::Duration {
        self.finished_at - self.started_at
    }
}

impl std::fmt::Display for ExecutionReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(
            f,
            "Executed plan {}: {} steps ({} mutations), {} skipped",
            self.plan_id,
            self.steps.len(),
            self.mutation_count(),
            self.skipped.len()
        )?;
        for step in &self.steps {
            write!(f, "  + {}", step.action.description())?;
            if let Some(id) = &step.resource_id {
                write!(f, " [{id}]")?;
            }
            writeln!(f)?;
        }
        for action in &self.skipped {
            writeln!(f, "  ! {} ({})", action.description(), action.reason)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FabricDeployError;
    use crate::fabric::{MockWorkspaceApi, WorkspaceItem};
    use crate::items::DEFAULT_LAKEHOUSE;
    use crate::planner::{DiffEngine, MappingState};
    use mockall::Sequence;
    use std::path::Path;
    use tempfile::TempDir;

    const W1: &str = "11111111-1111-1111-1111-111111111111";
    const W2: &str = "22222222-2222-2222-2222-222222222222";
    const C1: &str = "cccccccc-0000-0000-0000-000000000001";
    const C2: &str = "cccccccc-0000-0000-0000-000000000002";

    fn lakehouse_item(id: &str, name: &str) -> WorkspaceItem {
        WorkspaceItem {
            id: id.to_string(),
            item_type: String::from("Lakehouse"),
            display_name: name.to_string(),
            description: None,
            workspace_id: None,
        }
    }

    fn declared_lakehouse(root: &Path, name: &str) -> Item {
        Item::declared(ItemKind::Lakehouse, name).with_source(
            root.join(format!("{name}.Lakehouse")),
            serde_json::json!({"type": "Lakehouse", "displayName": name}),
        )
    }

    fn declared_notebook(root: &Path, name: &str, content: &str) -> Item {
        let folder = root.join(format!("{name}.Notebook"));
        std::fs::create_dir_all(&folder).expect("Failed to create notebook dir");
        std::fs::write(folder.join(NOTEBOOK_CONTENT_FILE), content).expect("Failed to write notebook");
        Item::declared(ItemKind::Notebook, name).with_source(
            folder,
            serde_json::json!({"type": "Notebook", "displayName": name}),
        )
    }

    fn notebook_source() -> String {
        format!("# META \"default_lakehouse\": \"{C1}\",\n# META \"default_lakehouse_workspace_id\": \"{W1}\"\n")
    }

    #[tokio::test]
    async fn test_end_to_end_order_and_substitution() {
        let temp = TempDir::new().expect("Failed to create temp dir");
        let declared = vec![
            declared_lakehouse(temp.path(), "A"),
            declared_lakehouse(temp.path(), DEFAULT_LAKEHOUSE),
            declared_notebook(temp.path(), "N", &notebook_source()),
        ];
        let live = vec![
            Item::observed(C2, "Lakehouse", DEFAULT_LAKEHOUSE),
            Item::observed("b-id", "Lakehouse", "B"),
        ];

        let diff = DiffEngine::new().diff(&declared, &live);
        let mut plan = DeploymentPlan::from_diff(diff, W1, W2, "hash");
        let mut mapping = IdentityMapping::new(W1, W2);

        let mut seq = Sequence::new();
        let mut api = MockWorkspaceApi::new();

        api.expect_create_lakehouse()
            .withf(|ws, def| ws == W2 && def["displayName"] == "A")
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok(String::from("a-id")));
        api.expect_delete_lakehouse()
            .withf(|ws, id| ws == W2 && id == "b-id")
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok(()));
        api.expect_list_lakehouses()
            .withf(|ws| ws == W2)
            .times(2)
            .returning(|_| {
                Ok(vec![
                    lakehouse_item(C2, DEFAULT_LAKEHOUSE),
                    lakehouse_item("a-id", "A"),
                    lakehouse_item("b-id", "B"),
                ])
            });
        api.expect_list_lakehouses()
            .withf(|ws| ws == W1)
            .times(1)
            .returning(|_| Ok(vec![lakehouse_item(C1, DEFAULT_LAKEHOUSE)]));
        api.expect_create_notebook()
            .withf(|ws, request| {
                let content = request.decoded_content().unwrap_or_default();
                ws == W2
                    && request.display_name == "N"
                    && content.contains(W2)
                    && content.contains(C2)
                    && !content.contains(W1)
                    && !content.contains(C1)
            })
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok(()));

        let report = PlanExecutor::new(&api, &declared)
            .execute(&mut plan, &mut mapping)
            .await
            .expect("Execution failed");

        let order: Vec<ActionType> = report.steps.iter().map(|s| s.action.action_type).collect();
        assert_eq!(
            order,
            vec![
                ActionType::CreateLakehouse,
                ActionType::DeleteLakehouse,
                ActionType::RefreshMapping,
                ActionType::CreateNotebook,
            ]
        );
        assert_eq!(report.mutation_count(), 3);
        assert_eq!(report.steps[0].resource_id.as_deref(), Some("a-id"));
        assert_eq!(report.steps[1].resource_id.as_deref(), Some("b-id"));
        assert!(report.skipped.is_empty());
        assert_eq!(mapping.state(), MappingState::Fresh);
        assert!(!plan.is_current());
    }

    #[tokio::test]
    async fn test_stale_mapping_blocks_notebook_deploy() {
        let temp = TempDir::new().expect("Failed to create temp dir");
        let notebook = declared_notebook(temp.path(), "N", &notebook_source());

        let mut api = MockWorkspaceApi::new();
        api.expect_create_notebook().times(0);

        let mut mapping = IdentityMapping::new(W1, W2);
        mapping.set_lakehouse_mapping(C1, C2);
        mapping.invalidate();

        let result = PlanExecutor::new(&api, &[]).deploy_notebook(&notebook, &mapping).await;
        assert!(matches!(
            result,
            Err(FabricDeployError::Plan(PlanError::MappingStale {
                state: MappingState::Stale
            }))
        ));
    }

    #[tokio::test]
    async fn test_failed_create_halts_run() {
        let temp = TempDir::new().expect("Failed to create temp dir");
        let declared = vec![
            declared_lakehouse(temp.path(), "A"),
            declared_lakehouse(temp.path(), DEFAULT_LAKEHOUSE),
        ];
        let live = vec![
            Item::observed(C2, "Lakehouse", DEFAULT_LAKEHOUSE),
            Item::observed("b-id", "Lakehouse", "B"),
        ];

        let diff = DiffEngine::new().diff(&declared, &live);
        let mut plan = DeploymentPlan::from_diff(diff, W1, W2, "hash");
        let mut mapping = IdentityMapping::new(W1, W2);

        let mut api = MockWorkspaceApi::new();
        api.expect_create_lakehouse().times(1).returning(|_, _| {
            Err(FabricError::unexpected_status("create lakehouse", 409, "conflict").into())
        });
        api.expect_list_lakehouses().times(0);
        api.expect_delete_lakehouse().times(0);

        let result = PlanExecutor::new(&api, &declared).execute(&mut plan, &mut mapping).await;

        assert!(matches!(
            result,
            Err(FabricDeployError::Fabric(FabricError::UnexpectedStatus { status: 409, .. }))
        ));
        assert!(!plan.is_current());
    }

    #[tokio::test]
    async fn test_dangling_lakehouse_gone_before_delete() {
        let declared = vec![Item::declared(ItemKind::Lakehouse, DEFAULT_LAKEHOUSE)];
        let live = vec![
            Item::observed(C2, "Lakehouse", DEFAULT_LAKEHOUSE),
            Item::observed("b-id", "Lakehouse", "B"),
        ];

        let diff = DiffEngine::new().diff(&declared, &live);
        let mut plan = DeploymentPlan::from_diff(diff, W1, W2, "hash");
        let mut mapping = IdentityMapping::new(W1, W2);

        let mut api = MockWorkspaceApi::new();
        api.expect_list_lakehouses()
            .returning(|_| Ok(vec![lakehouse_item(C2, DEFAULT_LAKEHOUSE)]));
        api.expect_delete_lakehouse().times(0);

        let result = PlanExecutor::new(&api, &declared).execute(&mut plan, &mut mapping).await;

        assert!(matches!(
            result,
            Err(FabricDeployError::Fabric(FabricError::LakehouseNotFound { .. }))
        ));
    }

    #[tokio::test]
    async fn test_mapping_for_other_target_is_rejected() {
        let temp = TempDir::new().expect("Failed to create temp dir");
        let declared = vec![
            declared_lakehouse(temp.path(), DEFAULT_LAKEHOUSE),
            declared_notebook(temp.path(), "N", &notebook_source()),
        ];
        let live = vec![Item::observed(C2, "Lakehouse", DEFAULT_LAKEHOUSE)];

        let diff = DiffEngine::new().diff(&declared, &live);
        let mut plan = DeploymentPlan::from_diff(diff, W1, W2, "hash");
        let mut mapping = IdentityMapping::new(W1, "33333333-3333-3333-3333-333333333333");

        let mut api = MockWorkspaceApi::new();
        api.expect_list_lakehouses().times(0);
        api.expect_create_notebook().times(0);

        let result = PlanExecutor::new(&api, &declared).execute(&mut plan, &mut mapping).await;

        assert!(matches!(
            result,
            Err(FabricDeployError::Plan(PlanError::WorkspaceMismatch { .. }))
        ));
        assert!(plan.is_current());
    }

    #[tokio::test]
    async fn test_executed_plan_is_rejected() {
        let declared = vec![Item::declared(ItemKind::Lakehouse, DEFAULT_LAKEHOUSE)];
        let mut plan = DeploymentPlan::from_diff(DiffEngine::new().diff(&declared, &[]), W1, W2, "hash");
        plan.mark_executed().expect("First mark should succeed");

        let api = MockWorkspaceApi::new();
        let mut mapping = IdentityMapping::new(W1, W2);

        let result = PlanExecutor::new(&api, &declared).execute(&mut plan, &mut mapping).await;
        assert!(matches!(
            result,
            Err(FabricDeployError::Plan(PlanError::PlanNotCurrent))
        ));
    }

    #[tokio::test]
    async fn test_notebook_updates_are_skipped() {
        let temp = TempDir::new().expect("Failed to create temp dir");
        let declared = vec![
            declared_lakehouse(temp.path(), DEFAULT_LAKEHOUSE),
            declared_notebook(temp.path(), "N", "x = 1\n"),
        ];
        let live = vec![
            Item::observed(C2, "Lakehouse", DEFAULT_LAKEHOUSE),
            Item::observed("n-id", "Notebook", "N"),
            Item::observed("m-id", "Notebook", "M"),
        ];

        let diff = DiffEngine::new().diff(&declared, &live);
        let mut plan = DeploymentPlan::from_diff(diff, W1, W2, "hash");
        let mut mapping = IdentityMapping::new(W1, W2);

        let mut api = MockWorkspaceApi::new();
        api.expect_list_lakehouses()
            .withf(|ws| ws == W1)
            .returning(|_| Ok(vec![lakehouse_item(C1, DEFAULT_LAKEHOUSE)]));
        api.expect_list_lakehouses()
            .withf(|ws| ws == W2)
            .returning(|_| Ok(vec![lakehouse_item(C2, DEFAULT_LAKEHOUSE)]));
        api.expect_create_notebook().times(0);

        let report = PlanExecutor::new(&api, &declared)
            .execute(&mut plan, &mut mapping)
            .await
            .expect("Execution failed");

        assert_eq!(report.mutation_count(), 0);
        let skipped: Vec<ActionType> = report.skipped.iter().map(|a| a.action_type).collect();
        assert_eq!(skipped, vec![ActionType::SkipNotebookUpdate, ActionType::SkipNotebookDelete]);
    }
}
