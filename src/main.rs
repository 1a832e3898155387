//! apigw CLI entrypoint.
//!
//! This is the main entrypoint for the apigw command-line tool.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use apigw_reconcile::cli::{Cli, Commands, OutputFormatter};
use apigw_reconcile::config::{Manifest, ManifestParser, ManifestValidator, find_manifest_file};
use apigw_reconcile::error::{ApigwError, Result};
use apigw_reconcile::gateway::SdkGateway;
use apigw_reconcile::planner::TaskExecutor;
use apigw_reconcile::resources::list_vpc_links;

use clap::Parser;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

/// Main entrypoint.
fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize logging
    init_logging(cli.verbose);

    // Run async runtime
    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Failed to create async runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(run(cli)) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

/// Initializes the logging system. `RUST_LOG` takes precedence.
fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Main async entry point. Returns whether every task succeeded.
async fn run(cli: Cli) -> Result<bool> {
    let formatter = OutputFormatter::new(cli.output);

    match cli.command {
        Commands::Init { path, force } => cmd_init(&path, force).map(|()| true),
        Commands::Validate { warnings } => cmd_validate(cli.manifest.as_ref(), warnings, &formatter),
        Commands::Plan => cmd_plan(cli.manifest.as_ref(), &formatter).await,
        Commands::Apply { yes, continue_on_error } => {
            cmd_apply(cli.manifest.as_ref(), yes, continue_on_error, &formatter).await
        }
        Commands::VpcLinks => cmd_vpc_links(cli.manifest.as_ref(), &formatter).await.map(|()| true),
    }
}

/// Write a starter manifest.
fn cmd_init(path: &Path, force: bool) -> Result<()> {
    info!("Initializing apigw manifest in: {}", path.display());

    let manifest_path = path.join("apigw.yaml");
    let env_path = path.join(".env.example");
    let gitignore_path = path.join(".gitignore");

    if !force && manifest_path.exists() {
        eprintln!("Manifest already exists: {}", manifest_path.display());
        eprintln!("Use --force to overwrite.");
        return Ok(());
    }

    if !path.exists() {
        std::fs::create_dir_all(path)?;
    }

    std::fs::write(&manifest_path, include_str!("../templates/apigw.yaml"))?;
    eprintln!("Created: {}", manifest_path.display());

    std::fs::write(&env_path, include_str!("../templates/.env.example"))?;
    eprintln!("Created: {}", env_path.display());

    if gitignore_path.exists() {
        let existing = std::fs::read_to_string(&gitignore_path)?;
        if !existing.lines().any(|line| line.trim() == ".env") {
            let mut file = std::fs::OpenOptions::new().append(true).open(&gitignore_path)?;
            writeln!(file, "\n# apigw\n.env")?;
            eprintln!("Updated: {}", gitignore_path.display());
        }
    } else {
        std::fs::write(&gitignore_path, ".env\n")?;
        eprintln!("Created: {}", gitignore_path.display());
    }

    eprintln!("\nManifest initialized successfully!");
    eprintln!("Next steps:");
    eprintln!("  1. Edit apigw.yaml with your API Gateway resources");
    eprintln!("  2. Run 'apigw validate' to check the manifest");
    eprintln!("  3. Run 'apigw plan' to see what would change");
    eprintln!("  4. Run 'apigw apply' to converge API Gateway");

    Ok(())
}

/// Validate the manifest.
fn cmd_validate(manifest_path: Option<&PathBuf>, show_warnings: bool, formatter: &OutputFormatter) -> Result<bool> {
    let manifest_file = resolve_manifest_path(manifest_path)?;
    info!("Validating manifest: {}", manifest_file.display());

    let parser = ManifestParser::new().with_base_path(manifest_dir(&manifest_file));
    parser.load_dotenv()?;
    let manifest = parser.load_file(&manifest_file)?;

    let result = ManifestValidator::new().check(&manifest);
    print_out(&formatter.format_validation(&result, show_warnings))?;

    if result.is_valid() {
        eprintln!("\nManifest summary:");
        eprintln!("  Tasks: {}", manifest.tasks.len());
        if let Some(region) = &manifest.aws.region {
            eprintln!("  Region: {region}");
        }
    }

    Ok(result.is_valid())
}

/// Show what applying the manifest would change.
async fn cmd_plan(manifest_path: Option<&PathBuf>, formatter: &OutputFormatter) -> Result<bool> {
    let manifest = load_manifest(manifest_path)?;
    let gateway = SdkGateway::connect(&manifest.aws).await?;

    let result = TaskExecutor::new(&gateway)
        .with_check_mode(true)
        .with_continue_on_error(true)
        .execute(&manifest.tasks)
        .await;

    print_out(&formatter.format_plan(&result))?;
    Ok(result.success)
}

/// Apply the manifest.
async fn cmd_apply(
    manifest_path: Option<&PathBuf>,
    auto_approve: bool,
    continue_on_error: bool,
    formatter: &OutputFormatter,
) -> Result<bool> {
    let manifest = load_manifest(manifest_path)?;
    let gateway = SdkGateway::connect(&manifest.aws).await?;

    // Plan first
    let plan = TaskExecutor::new(&gateway)
        .with_check_mode(true)
        .with_continue_on_error(true)
        .execute(&manifest.tasks)
        .await;

    if plan.failed == 0 && plan.changed == 0 {
        eprintln!("No changes to apply.");
        return Ok(true);
    }

    eprintln!("{}", formatter.format_plan(&plan));
    if plan.failed > 0 {
        warn!("{} tasks failed during planning", plan.failed);
    }

    // Confirm
    if !auto_approve {
        eprint!("Do you want to apply these changes? [y/N]: ");
        std::io::stderr().flush()?;

        let mut input = String::new();
        std::io::stdin().read_line(&mut input)?;

        if !input.trim().eq_ignore_ascii_case("y") {
            eprintln!("Apply cancelled.");
            return Ok(true);
        }
    }

    let result = TaskExecutor::new(&gateway)
        .with_continue_on_error(continue_on_error)
        .execute(&manifest.tasks)
        .await;

    print_out(&formatter.format_apply(&result))?;
    eprintln!("\n{result}");

    Ok(result.success)
}

/// List the VPC links of the account.
async fn cmd_vpc_links(manifest_path: Option<&PathBuf>, formatter: &OutputFormatter) -> Result<()> {
    let settings = match resolve_manifest_path(manifest_path) {
        Ok(_) => load_manifest(manifest_path)?.aws,
        Err(ApigwError::Config(_)) if manifest_path.is_none() => {
            debug!("No manifest found, using the default AWS settings");
            let mut manifest = Manifest::default();
            ManifestParser::apply_env_overrides(&mut manifest, |name| std::env::var(name).ok());
            manifest.aws
        }
        Err(e) => return Err(e),
    };
    let gateway = SdkGateway::connect(&settings).await?;

    let links = list_vpc_links(&gateway).await?;
    print_out(&formatter.format_vpc_links(&links))
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Resolves the manifest file path.
fn resolve_manifest_path(manifest_path: Option<&PathBuf>) -> Result<PathBuf> {
    manifest_path.map_or_else(|| find_manifest_file("."), |path| Ok(path.clone()))
}

/// Directory holding the manifest, used to find the `.env` file.
fn manifest_dir(manifest_file: &Path) -> &Path {
    manifest_file.parent().unwrap_or_else(|| Path::new("."))
}

/// Loads, overrides and validates the manifest.
fn load_manifest(manifest_path: Option<&PathBuf>) -> Result<Manifest> {
    let manifest_file = resolve_manifest_path(manifest_path)?;
    debug!("Loading manifest from: {}", manifest_file.display());

    let parser = ManifestParser::new().with_base_path(manifest_dir(&manifest_file));
    parser.load_dotenv()?;

    let manifest = parser.load_with_env(&manifest_file)?;

    let result = ManifestValidator::new().validate(&manifest)?;
    for warning in &result.warnings {
        warn!("{warning}");
    }

    Ok(manifest)
}

/// Writes command output to stdout.
fn print_out(output: &str) -> Result<()> {
    let mut stdout = std::io::stdout().lock();
    stdout.write_all(output.as_bytes())?;
    if !output.ends_with('\n') {
        stdout.write_all(b"\n")?;
    }
    Ok(())
}
