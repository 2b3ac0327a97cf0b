//! Output formatting for CLI commands.
//!
//! This module provides formatting utilities for displaying
//! information to the user in various formats.

use colored::Colorize;
use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt::Write;
use tabled::{Table, Tabled};

use crate::config::ContentHasher;
use crate::items::Item;
use crate::planner::{ActionType, DeploymentPlan, ExecutionReport};

use super::commands::OutputFormat;

/// Output formatter for CLI.
#[derive(Debug)]
pub struct OutputFormatter {
    /// Output format.
    format: OutputFormat,
}

/// Workspace item row for table display.
#[derive(Tabled)]
struct WorkspaceItemRow {
    #[tabled(rename = "Type")]
    item_type: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "ID")]
    id: String,
}

/// Declared item row for table display.
#[derive(Tabled)]
struct DeclaredItemRow {
    #[tabled(rename = "Type")]
    item_type: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Fingerprint")]
    fingerprint: String,
    #[tabled(rename = "Folder")]
    folder: String,
}

/// Plan action row for table display.
#[derive(Tabled)]
struct PlanActionRow {
    #[tabled(rename = "#")]
    index: usize,
    #[tabled(rename = "Action")]
    action: String,
    #[tabled(rename = "Resource")]
    resource: String,
    #[tabled(rename = "Reason")]
    reason: String,
}

impl OutputFormatter {
    /// Creates a new output formatter.
    #[must_use]
    pub const fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Formats a deployment plan for display.
    #[must_use]
    pub fn format_plan(&self, plan: &DeploymentPlan, detailed: bool) -> String {
        match self.format {
            OutputFormat::Json => serde_json::to_string_pretty(&PlanJson::from(plan)).unwrap_or_default(),
            OutputFormat::Text => Self::format_plan_text(plan, detailed),
        }
    }

    /// Formats a plan as a tree of partitions.
    fn format_plan_text(plan: &DeploymentPlan, detailed: bool) -> String {
        let mut output = String::new();

        let _ = writeln!(output, "\nDeployment Plan {}", plan.id.to_string().dimmed());
        let _ = writeln!(
            output,
            "   {} -> {}",
            plan.source_workspace_id, plan.target_workspace_id
        );
        let _ = writeln!(output, "   State hash: {}\n", ContentHasher::new().short_hash(&plan.state_hash));

        let lakehouse = &plan.diff.lakehouse;
        let _ = writeln!(output, "{}", "Lakehouses".bold());
        Self::write_branch(&mut output, "├──", &"New".green().to_string(), &lakehouse.new);
        Self::write_branch(&mut output, "├──", &"Ignore".dimmed().to_string(), &lakehouse.ignore);
        Self::write_branch(&mut output, "└──", &"Delete".red().to_string(), &lakehouse.dangling);

        let notebook = &plan.diff.notebook;
        let _ = writeln!(output, "{}", "Notebooks".bold());
        Self::write_branch(&mut output, "├──", &"New".green().to_string(), &notebook.new);
        Self::write_branch(
            &mut output,
            "├──",
            &"Update - not supported".yellow().to_string(),
            &notebook.update,
        );
        Self::write_branch(
            &mut output,
            "└──",
            &"Delete - not supported".yellow().to_string(),
            &notebook.dangling,
        );

        if detailed {
            let rows: Vec<PlanActionRow> = plan
                .actions()
                .into_iter()
                .enumerate()
                .map(|(i, a)| PlanActionRow {
                    index: i + 1,
                    action: Self::format_action_type(a.action_type),
                    resource: a.resource_name,
                    reason: Self::truncate(&a.reason, 40),
                })
                .collect();

            output.push('\n');
            output.push_str(&Table::new(rows).to_string());
            output.push('\n');
        }

        if plan.is_empty() {
            let _ = writeln!(output, "\n{} No changes required - target workspace is up to date.", "✓".green());
        } else {
            let _ = writeln!(
                output,
                "\nPlan: {} to create, {} to destroy, {} not supported",
                plan.create_count().to_string().green(),
                plan.delete_count().to_string().red(),
                plan.skipped_count().to_string().yellow()
            );
        }

        output
    }

    /// Writes one partition of the tree.
    fn write_branch(output: &mut String, connector: &str, label: &str, names: &BTreeSet<String>) {
        let listed = if names.is_empty() {
            "-".dimmed().to_string()
        } else {
            names.iter().cloned().collect::<Vec<_>>().join(", ")
        };
        let _ = writeln!(output, "{connector} {label}: {listed}");
    }

    /// Formats an execution report.
    #[must_use]
    pub fn format_report(&self, report: &ExecutionReport) -> String {
        match self.format {
            OutputFormat::Json => serde_json::to_string_pretty(report).unwrap_or_default(),
            OutputFormat::Text => {
                let mut output = format!("{} Plan applied\n\n", "✓".green());

                for step in &report.steps {
                    let _ = write!(
                        output,
                        "   {} {}",
                        Self::format_action_type(step.action.action_type),
                        step.action.resource_name
                    );
                    if let Some(id) = &step.resource_id {
                        let _ = write!(output, " ({})", id.dimmed());
                    }
                    output.push('\n');
                }

                if !report.skipped.is_empty() {
                    let _ = write!(output, "\n{} Not performed:\n", "⚠".yellow());
                    for action in &report.skipped {
                        let _ = writeln!(output, "   - {}", action.description());
                    }
                }

                let _ = writeln!(
                    output,
                    "\n{} mutations in {}ms",
                    report.mutation_count(),
                    report.duration().num_milliseconds()
                );

                output
            }
        }
    }

    /// Formats the items observed in a workspace.
    #[must_use]
    pub fn format_workspace_items(&self, workspace_id: &str, items: &[Item]) -> String {
        match self.format {
            OutputFormat::Json => serde_json::to_string_pretty(&WorkspaceJson {
                workspace_id,
                items,
            })
            .unwrap_or_default(),
            OutputFormat::Text => {
                let mut output = format!("\nWorkspace: {workspace_id}\n\n");

                if items.is_empty() {
                    output.push_str("   No items.\n");
                    return output;
                }

                let rows: Vec<WorkspaceItemRow> = items
                    .iter()
                    .map(|i| WorkspaceItemRow {
                        item_type: Self::format_item_type(i),
                        name: i.display_name.clone(),
                        id: i.id.clone().unwrap_or_default(),
                    })
                    .collect();

                output.push_str(&Table::new(rows).to_string());
                output.push('\n');
                output
            }
        }
    }

    /// Formats the items declared in the repository.
    #[must_use]
    pub fn format_declared_items(&self, items: &[Item]) -> String {
        match self.format {
            OutputFormat::Json => serde_json::to_string_pretty(items).unwrap_or_default(),
            OutputFormat::Text => {
                if items.is_empty() {
                    return String::from("No items declared.\n");
                }

                let hasher = ContentHasher::new();
                let rows: Vec<DeclaredItemRow> = items
                    .iter()
                    .map(|i| DeclaredItemRow {
                        item_type: Self::format_item_type(i),
                        name: i.display_name.clone(),
                        fingerprint: i
                            .content_fingerprint
                            .as_deref()
                            .map(|f| hasher.short_hash(f))
                            .unwrap_or_default(),
                        folder: i
                            .source
                            .as_ref()
                            .and_then(|s| s.folder.file_name())
                            .map(|n| n.to_string_lossy().to_string())
                            .unwrap_or_default(),
                    })
                    .collect();

                let mut output = Table::new(rows).to_string();
                output.push('\n');
                output
            }
        }
    }

    /// Formats an action type with color.
    fn format_action_type(action_type: ActionType) -> String {
        match action_type {
            ActionType::CreateLakehouse | ActionType::CreateNotebook => {
                format!("+{action_type}").green().to_string()
            }
            ActionType::DeleteLakehouse => format!("-{action_type}").red().to_string(),
            ActionType::RefreshMapping => action_type.to_string().cyan().to_string(),
            ActionType::SkipNotebookUpdate | ActionType::SkipNotebookDelete => {
                action_type.to_string().yellow().to_string()
            }
        }
    }

    /// Formats an item type, dimming unmanaged types.
    fn format_item_type(item: &Item) -> String {
        if item.kind().is_some() {
            item.item_type.clone()
        } else {
            item.item_type.dimmed().to_string()
        }
    }

    /// Truncates a string to a maximum length.
    fn truncate(s: &str, max_len: usize) -> String {
        if s.chars().count() <= max_len {
            s.to_string()
        } else {
            let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
            format!("{kept}...")
        }
    }

    /// Formats a success message.
    #[must_use]
    pub fn success(&self, message: &str) -> String {
        self.message("success", &"✓".green().to_string(), message)
    }

    /// Formats an error message.
    #[must_use]
    pub fn error(&self, message: &str) -> String {
        self.message("error", &"✗".red().to_string(), message)
    }

    /// Formats a warning message.
    #[must_use]
    pub fn warning(&self, message: &str) -> String {
        self.message("warning", &"⚠".yellow().to_string(), message)
    }

    fn message(&self, status: &str, symbol: &str, message: &str) -> String {
        match self.format {
            OutputFormat::Json => {
                let json = serde_json::json!({ "status": status, "message": message });
                serde_json::to_string_pretty(&json).unwrap_or_default()
            }
            OutputFormat::Text => format!("{symbol} {message}"),
        }
    }
}

// JSON serialization helpers

#[derive(Serialize)]
struct PlanJson<'a> {
    plan: &'a DeploymentPlan,
    creates: usize,
    deletes: usize,
    skipped: usize,
    actions: Vec<crate::planner::PlannedAction>,
}

impl<'a> From<&'a DeploymentPlan> for PlanJson<'a> {
    fn from(plan: &'a DeploymentPlan) -> Self {
        Self {
            plan,
            creates: plan.create_count(),
            deletes: plan.delete_count(),
            skipped: plan.skipped_count(),
            actions: plan.actions(),
        }
    }
}

#[derive(Serialize)]
struct WorkspaceJson<'a> {
    workspace_id: &'a str,
    items: &'a [Item],
}
