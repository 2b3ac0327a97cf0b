//! Cross-workspace identity mapping.
//!
//! Notebook definitions embed the ids of the workspace and the default
//! lakehouse they were authored against. Deploying into another workspace
//! rewrites those ids with their target counterparts, using rules produced by
//! an [`IdentityMapping`]. Lakehouse rules are only valid while the mapping is
//! [`MappingState::Fresh`]; any lakehouse mutation makes it stale.

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use tracing::{debug, info};

use crate::error::{PlanError, Result};
use crate::fabric::{WorkspaceApi, WorkspaceObserver};
use crate::items::DEFAULT_LAKEHOUSE;

/// Freshness of the lakehouse mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MappingState {
    /// Never resolved.
    Unresolved,
    /// Resolved after the last lakehouse mutation.
    Fresh,
    /// A lakehouse was created or deleted since the last refresh.
    Stale,
}

impl fmt::Display for MappingState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unresolved => write!(f, "unresolved"),
            Self::Fresh => write!(f, "fresh"),
            Self::Stale => write!(f, "stale"),
        }
    }
}

/// Category of a substitution rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MappingCategory {
    /// Workspace ids.
    Workspace,
    /// Lakehouse ids.
    Lakehouse,
}

/// A literal `pattern -> replacement` rewrite.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubstitutionRule {
    /// What kind of id is rewritten.
    pub category: MappingCategory,
    /// Source id.
    pub pattern: String,
    /// Target id.
    pub replacement: String,
}

/// Source to target id correspondences.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IdentityMapping {
    /// Source workspace id.
    source_workspace_id: String,
    /// Target workspace id.
    target_workspace_id: String,
    /// Workspace id mapping, fixed at construction.
    workspace: BTreeMap<String, String>,
    /// Lakehouse id mapping, replaced on every refresh.
    lakehouse: BTreeMap<String, String>,
    /// Freshness of the lakehouse mapping.
    state: MappingState,
}

impl IdentityMapping {
    /// Creates a mapping for a source/target pair without any remote call.
    #[must_use]
    pub fn new(source_workspace_id: impl Into<String>, target_workspace_id: impl Into<String>) -> Self {
        let source_workspace_id = source_workspace_id.into();
        let target_workspace_id = target_workspace_id.into();

        let mut workspace = BTreeMap::new();
        workspace.insert(source_workspace_id.clone(), target_workspace_id.clone());

        Self {
            source_workspace_id,
            target_workspace_id,
            workspace,
            lakehouse: BTreeMap::new(),
            state: MappingState::Unresolved,
        }
    }

    /// Source workspace id.
    #[must_use]
    pub fn source_workspace_id(&self) -> &str {
        &self.source_workspace_id
    }

    /// Target workspace id.
    #[must_use]
    pub fn target_workspace_id(&self) -> &str {
        &self.target_workspace_id
    }

    /// Workspace id mapping.
    #[must_use]
    pub const fn workspace(&self) -> &BTreeMap<String, String> {
        &self.workspace
    }

    /// Lakehouse id mapping.
    #[must_use]
    pub const fn lakehouse(&self) -> &BTreeMap<String, String> {
        &self.lakehouse
    }

    /// Current freshness.
    #[must_use]
    pub const fn state(&self) -> MappingState {
        self.state
    }

    /// Returns true if substitution rules can be produced.
    #[must_use]
    pub fn is_fresh(&self) -> bool {
        self.state == MappingState::Fresh
    }

    /// Replaces the lakehouse mapping and marks it fresh.
    pub fn set_lakehouse_mapping(&mut self, source_id: impl Into<String>, target_id: impl Into<String>) {
        self.lakehouse.clear();
        self.lakehouse.insert(source_id.into(), target_id.into());
        self.state = MappingState::Fresh;
    }

    /// Marks a fresh mapping stale after a lakehouse mutation.
    pub fn invalidate(&mut self) {
        if self.state == MappingState::Fresh {
            debug!("Lakehouse mapping is now stale");
            self.state = MappingState::Stale;
        }
    }

    /// Returns the ordered rewrite rules: workspace rules, then lakehouse rules.
    ///
    /// # Errors
    ///
    /// Returns an error unless the mapping is fresh.
    pub fn substitution_rules(&self) -> Result<Vec<SubstitutionRule>> {
        if !self.is_fresh() {
            return Err(PlanError::MappingStale { state: self.state }.into());
        }

        let rules = |category: MappingCategory, map: &BTreeMap<String, String>| {
            map.iter()
                .map(|(pattern, replacement)| SubstitutionRule {
                    category,
                    pattern: pattern.clone(),
                    replacement: replacement.clone(),
                })
                .collect::<Vec<_>>()
        };

        let mut all = rules(MappingCategory::Workspace, &self.workspace);
        all.extend(rules(MappingCategory::Lakehouse, &self.lakehouse));
        Ok(all)
    }
}

/// Applies rules in order as literal substring replacements.
///
/// Rules with an empty pattern are skipped.
#[must_use]
pub fn apply_substitutions(text: &str, rules: &[SubstitutionRule]) -> String {
    rules
        .iter()
        .filter(|r| !r.pattern.is_empty())
        .fold(text.to_string(), |acc, r| acc.replace(&r.pattern, &r.replacement))
}

/// Resolves lakehouse ids against the remote workspaces.
#[derive(Debug)]
pub struct IdentityMapper<'a, A: WorkspaceApi + ?Sized> {
    /// Observer used for lookups.
    observer: WorkspaceObserver<'a, A>,
}

impl<'a, A: WorkspaceApi + ?Sized> IdentityMapper<'a, A> {
    /// Creates a new mapper.
    #[must_use]
    pub const fn new(api: &'a A) -> Self {
        Self {
            observer: WorkspaceObserver::new(api),
        }
    }

    /// Resolves the default lakehouse in both workspaces and refreshes the
    /// lakehouse mapping.
    ///
    /// # Errors
    ///
    /// Returns an error if a listing fails or the default lakehouse is missing
    /// in either workspace. The mapping is left untouched on error.
    pub async fn refresh_default_lakehouse_mapping(&self, mapping: &mut IdentityMapping) -> Result<()> {
        info!("Refreshing default lakehouse mapping");

        let source_id = self.resolve(mapping.source_workspace_id()).await?;
        let target_id = self.resolve(mapping.target_workspace_id()).await?;

        debug!("Default lakehouse: {source_id} -> {target_id}");
        mapping.set_lakehouse_mapping(source_id, target_id);
        Ok(())
    }

    /// Looks up the default lakehouse id in one workspace.
    async fn resolve(&self, workspace_id: &str) -> Result<String> {
        self.observer
            .find_lakehouse_id(workspace_id, DEFAULT_LAKEHOUSE)
            .await?
            .ok_or_else(|| {
                PlanError::SentinelNotFound {
                    name: String::from(DEFAULT_LAKEHOUSE),
                    workspace_id: workspace_id.to_string(),
                }
                .into()
            })
    }
}
