//! fabric-deploy CLI entrypoint.
//!
//! This is the main entrypoint for the fabric-deploy command-line tool.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use fabric_deploy::cli::{Cli, Commands, OutputFormatter};
use fabric_deploy::config::{find_config_file, ConfigParser, ConfigValidator, DeployConfig, TokenProvider};
use fabric_deploy::deployer::Deployer;
use fabric_deploy::error::Result;
use fabric_deploy::fabric::{FabricClient, WorkspaceObserver};
use fabric_deploy::items::ItemCatalog;
use fabric_deploy::planner::DiffEngine;
use fabric_deploy::state::{generate_holder_id, RunLock};

use clap::Parser;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

/// Main entrypoint.
fn main() -> ExitCode {
    let cli = Cli::parse();

    init_logging(cli.verbose);
    let formatter = OutputFormatter::new(cli.output);

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Failed to create async runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(run(cli, &formatter)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", formatter.error(&e.to_string()));
            ExitCode::FAILURE
        }
    }
}

/// Initializes the logging system.
fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Main async entry point.
async fn run(cli: Cli, formatter: &OutputFormatter) -> Result<()> {
    let config_path = cli.config.as_ref();

    match cli.command {
        Commands::Validate { warnings } => cmd_validate(config_path, warnings, formatter),
        Commands::Plan { detailed } => cmd_plan(config_path, cli.use_cached_token, detailed, formatter).await,
        Commands::Apply { yes } => cmd_apply(config_path, cli.use_cached_token, yes, formatter).await,
        Commands::Status => cmd_status(config_path, cli.use_cached_token, formatter).await,
        Commands::Items => cmd_items(config_path, formatter),
    }
}

/// Validate configuration and repository.
fn cmd_validate(config_path: Option<&PathBuf>, show_warnings: bool, formatter: &OutputFormatter) -> Result<()> {
    let (config, config_file) = load_config(config_path)?;
    info!("Validating configuration: {}", config_file.display());

    let result = ConfigValidator::new().validate(&config)?;

    let items = ItemCatalog::new(&config.repo_local_path).scan()?;
    DiffEngine::new().run_source_checks(&items)?;

    eprintln!("{}", formatter.success("Configuration and repository are valid"));
    if show_warnings && !result.warnings.is_empty() {
        eprintln!("\nWarnings:");
        for warning in &result.warnings {
            eprintln!("  {}", formatter.warning(warning));
        }
    }

    eprintln!("\nConfiguration summary:");
    eprintln!("  Source workspace: {}", config.source_workspace_id());
    eprintln!("  Target workspace: {}", config.target_workspace_id());
    eprintln!("  Repository: {}", config.repo_local_path.display());
    eprintln!("  Declared items: {}", items.len());

    Ok(())
}

/// Show deployment plan.
async fn cmd_plan(
    config_path: Option<&PathBuf>,
    use_cached_token: bool,
    detailed: bool,
    formatter: &OutputFormatter,
) -> Result<()> {
    let (config, _) = load_validated_config(config_path)?;
    let client = create_fabric_client(&config, use_cached_token)?;

    let mut deployer = Deployer::new(&config, &client);
    let plan = deployer.compute_plan().await?;

    eprintln!("{}", formatter.format_plan(plan, detailed));
    Ok(())
}

/// Apply deployment plan.
async fn cmd_apply(
    config_path: Option<&PathBuf>,
    use_cached_token: bool,
    auto_approve: bool,
    formatter: &OutputFormatter,
) -> Result<()> {
    let (config, config_file) = load_validated_config(config_path)?;
    let client = create_fabric_client(&config, use_cached_token)?;

    let lock = RunLock::new(config_dir(&config_file), config.target_workspace_id());
    let lock_info = lock.acquire(&generate_holder_id()).await?;

    let result = apply_locked(&config, &client, auto_approve, formatter).await;

    if let Err(e) = lock.release(&lock_info.lock_id).await {
        warn!("Failed to release run lock: {e}");
    }

    result
}

/// Computes, confirms and runs the plan while the run lock is held.
async fn apply_locked(
    config: &DeployConfig,
    client: &FabricClient,
    auto_approve: bool,
    formatter: &OutputFormatter,
) -> Result<()> {
    let mut deployer = Deployer::new(config, client);
    let plan = deployer.compute_plan().await?;

    eprintln!("{}", formatter.format_plan(plan, false));

    if plan.is_empty() {
        debug!("Nothing to create or delete, refreshing mapping only");
    }

    if !auto_approve {
        eprint!("Do you want to apply this plan? [y/N]: ");
        std::io::stderr().flush()?;

        let mut input = String::new();
        std::io::stdin().read_line(&mut input)?;

        if !input.trim().eq_ignore_ascii_case("y") {
            eprintln!("Apply cancelled.");
            return Ok(());
        }
    }

    let report = deployer.run().await?;
    eprintln!("\n{}", formatter.format_report(&report));

    Ok(())
}

/// Show target workspace items.
async fn cmd_status(config_path: Option<&PathBuf>, use_cached_token: bool, formatter: &OutputFormatter) -> Result<()> {
    let (config, _) = load_validated_config(config_path)?;
    let client = create_fabric_client(&config, use_cached_token)?;

    let target = config.target_workspace_id();
    let items = WorkspaceObserver::new(&client).list_items(target).await?;

    eprintln!("{}", formatter.format_workspace_items(target, &items));
    Ok(())
}

/// Show declared repository items.
fn cmd_items(config_path: Option<&PathBuf>, formatter: &OutputFormatter) -> Result<()> {
    let (config, _) = load_config(config_path)?;
    let items = ItemCatalog::new(&config.repo_local_path).scan()?;

    eprintln!("{}", formatter.format_declared_items(&items));
    Ok(())
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Resolves the configuration file path.
fn resolve_config_path(config_path: Option<&PathBuf>) -> Result<PathBuf> {
    config_path.map_or_else(|| find_config_file("."), |path| Ok(path.clone()))
}

/// Directory holding the configuration file.
fn config_dir(config_file: &Path) -> &Path {
    config_file.parent().unwrap_or_else(|| Path::new("."))
}

/// Loads configuration with `.env` and environment overrides applied.
fn load_config(config_path: Option<&PathBuf>) -> Result<(DeployConfig, PathBuf)> {
    let config_file = resolve_config_path(config_path)?;
    debug!("Loading configuration from: {}", config_file.display());

    let parser = ConfigParser::new().with_base_path(config_dir(&config_file));
    parser.load_dotenv()?;

    let config = parser.load_with_env(&config_file)?;
    Ok((config, config_file))
}

/// Loads configuration and rejects invalid values.
fn load_validated_config(config_path: Option<&PathBuf>) -> Result<(DeployConfig, PathBuf)> {
    let (config, config_file) = load_config(config_path)?;

    let result = ConfigValidator::new().validate(&config)?;
    for warning in &result.warnings {
        warn!("{warning}");
    }

    Ok((config, config_file))
}

/// Creates a Fabric API client.
fn create_fabric_client(config: &DeployConfig, use_cached_token: bool) -> Result<FabricClient> {
    let token = TokenProvider::new().resolve(use_cached_token)?;
    FabricClient::with_base_url(&token, &config.api_base_url, config.request_timeout_secs)
}
