//! Planning module for deployment operations.
//!
//! This module handles the comparison between declared and live states,
//! the identity mapping used to rewrite notebook content, and the ordered
//! execution of the resulting plan.

mod diff;
mod executor;
mod mapping;
mod plan;

pub use diff::{DiffEngine, DiffResult, LakehouseDiff, NotebookDiff};
pub use executor::{ExecutedStep, ExecutionReport, PlanExecutor};
pub use mapping::{
    apply_substitutions, IdentityMapper, IdentityMapping, MappingCategory, MappingState, SubstitutionRule,
};
pub use plan::{ActionType, DeploymentPlan, PlanStatus, PlannedAction};
