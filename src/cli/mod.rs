//! CLI module for the fabric-deploy tool.
//!
//! This module provides the command-line interface for deploying
//! Lakehouses and Notebooks into Fabric workspaces.

mod commands;
mod output;

pub use commands::{Cli, Commands, OutputFormat};
pub use output::OutputFormatter;
