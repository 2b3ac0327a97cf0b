// ============================================================================
// Strict linting - Dangerous or non-idiomatic practices are forbidden
// ============================================================================

#![deny(warnings)]                    // All warnings are treated as errors
#![deny(unsafe_code)]                 // Unsafe code is forbidden
#![deny(missing_docs)]                // All public items must be documented
#![deny(dead_code)]                   // Unused code is forbidden
#![deny(non_camel_case_types)]        // Types must follow CamelCase convention

// Additional strictness - Leave nothing unchecked
#![deny(unused_imports)]              // Unused imports are forbidden
#![deny(unused_variables)]            // Unused variables are forbidden
#![deny(unused_must_use)]             // Must handle Result and Option explicitly
#![deny(non_snake_case)]              // Variables and functions must be snake_case
#![deny(non_upper_case_globals)]      // Constants must be UPPER_CASE
#![deny(nonstandard_style)]           // Non-standard code style is forbidden
#![forbid(unsafe_op_in_unsafe_fn)]    // Unsafe ops in unsafe fns are forbidden

// Clippy lints (warnings only)
#![warn(clippy::all)]                 // All standard Clippy lints
#![warn(clippy::pedantic)]            // Very strict Clippy lints
#![warn(clippy::nursery)]             // Experimental lints
#![warn(clippy::unwrap_used)]         // unwrap() warning
#![warn(clippy::expect_used)]         // expect() warning
#![warn(clippy::panic)]               // panic!() warning
#![warn(clippy::print_stdout)]        // println!() warning
#![warn(clippy::todo)]                // TODO warning
#![warn(clippy::unimplemented)]       // unimplemented!() warning
#![warn(clippy::missing_const_for_fn)] // Force const when possible
#![warn(clippy::unwrap_in_result)]    // unwrap() in Result warning
#![warn(clippy::module_inception)]    // Module with same name as crate warning
#![warn(clippy::redundant_clone)]     // Useless clones warning
#![warn(clippy::shadow_unrelated)]    // Shadowing unrelated variables warning
#![warn(clippy::too_many_arguments)]  // Limit function arguments
#![warn(clippy::cognitive_complexity)] // Limit cognitive complexity

// Safety and robustness lints
#![deny(overflowing_literals)]        // Overflowing literals are forbidden
#![deny(arithmetic_overflow)]         // Arithmetic overflow is forbidden

// ============================================================================
// Crate Documentation
// ============================================================================

//! # fabric-deploy
//!
//! A declarative, source-of-truth-wins deployment tool for Microsoft Fabric
//! Lakehouses and Notebooks.
//!
//! ## Overview
//!
//! A Git-exported workspace repository describes the desired items. The
//! deployer compares it with a live target workspace and applies the minimal
//! set of creates and deletes needed to converge:
//!
//! - Lakehouses are created and deleted
//! - Notebooks are created; updates and deletes are reported, never performed
//! - Workspace and default lakehouse ids inside notebook content are rewritten
//!   for the target workspace before deployment
//!
//! ## Architecture
//!
//! 1. **Declared state**: scanned from the repository by [`items::ItemCatalog`]
//! 2. **Live state**: listed from the Fabric REST API by [`fabric::WorkspaceObserver`]
//! 3. **Diff**: per-kind partitions computed by [`planner::DiffEngine`]
//! 4. **Execution**: dependency-ordered phases run by [`planner::PlanExecutor`],
//!    with [`planner::IdentityMapping`] guarding notebook content rewrites
//!
//! ## Modules
//!
//! - [`config`]: Configuration parsing, validation and access tokens
//! - [`items`]: Repository scanning
//! - [`fabric`]: Fabric API client and observer
//! - [`planner`]: Diff, identity mapping, plans and execution
//! - [`deployer`]: One reconciliation cycle and the plan lifecycle
//! - [`state`]: Local run lock
//! - [`cli`]: Command-line interface
//!
//! ## Example
//!
//! ```yaml
//! source:
//!   workspace_id: 11111111-1111-1111-1111-111111111111
//! target:
//!   workspace_id: 22222222-2222-2222-2222-222222222222
//! repo_local_path: ./workspace-repo
//! ```

// ============================================================================
// Modules
// ============================================================================

pub mod cli;
pub mod config;
pub mod deployer;
pub mod error;
pub mod fabric;
pub mod items;
pub mod planner;
pub mod state;

// ============================================================================
// Re-exports
// ============================================================================

pub use cli::{Cli, Commands, OutputFormatter};
pub use config::{ConfigParser, ConfigValidator, ContentHasher, DeployConfig};
pub use deployer::Deployer;
pub use error::{FabricDeployError, Result};
pub use fabric::{FabricClient, WorkspaceApi, WorkspaceObserver};
pub use items::{Item, ItemCatalog, ItemKind};
pub use planner::{DeploymentPlan, DiffEngine, IdentityMapping, PlanExecutor};
pub use state::RunLock;
