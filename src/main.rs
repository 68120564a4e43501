//! Whaleprint CLI entrypoint.
//!
//! This is the main entrypoint for the whaleprint command-line tool.

use std::io::{IsTerminal, Write};
use std::path::Path;
use std::process::ExitCode;

use whaleprint::cli::{Cli, Commands, OutputFormatter, RenderConfig, StackArgs};
use whaleprint::config::{BundleParser, BundleValidator, Settings, Stack};
use whaleprint::error::{Result, WhaleprintError};
use whaleprint::planner::{ActionKind, TargetFilter};
use whaleprint::reconciler::Reconciler;
use whaleprint::swarm::{SwarmBackend, SwarmClient};
use whaleprint::translate::{export_bundles, write_bundles};

use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

/// Main entrypoint.
fn main() -> ExitCode {
    let cli = Cli::parse_args();

    init_logging(cli.verbose);

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Failed to create async runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(run(cli)) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::from(exit_code(&e))
        }
    }
}

/// Initializes the logging system on stderr.
fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Maps an error to the process exit code.
const fn exit_code(error: &WhaleprintError) -> u8 {
    match error {
        WhaleprintError::Config(_) => 2,
        WhaleprintError::Backend(_) | WhaleprintError::Reconcile(_) | WhaleprintError::Diff(_) => 3,
        _ => 1,
    }
}

/// Main async entry point.
async fn run(cli: Cli) -> Result<ExitCode> {
    let detail = matches!(cli.command, Commands::Plan { detail: true, .. });
    let formatter = OutputFormatter::new(
        cli.output,
        RenderConfig {
            color: !cli.no_color && std::io::stdout().is_terminal(),
            detail,
            ..RenderConfig::default()
        },
    );
    let docker_host = cli.docker_host.as_deref();

    match cli.command {
        Commands::Plan { stack, targets, .. } => {
            cmd_plan(&stack, targets, docker_host, &formatter).await
        }
        Commands::Apply { stack, targets, yes } => {
            cmd_apply(&stack, targets, yes, docker_host, &formatter).await
        }
        Commands::Destroy { stack, force } => {
            cmd_destroy(&stack, force, docker_host, &formatter).await
        }
        Commands::Output { stack } => cmd_output(&stack, docker_host, &formatter).await,
        Commands::Export { dir } => cmd_export(&dir, docker_host, &formatter).await,
        Commands::Validate { stack, warnings } => cmd_validate(&stack, warnings, &formatter),
    }
}

/// Show the execution plan.
async fn cmd_plan(
    args: &StackArgs,
    targets: Vec<String>,
    docker_host: Option<&str>,
    formatter: &OutputFormatter,
) -> Result<ExitCode> {
    let stack = load_valid_stack(args)?;
    let backend = create_backend(docker_host)?;

    let plan = Reconciler::new(&stack, &backend)
        .plan(&TargetFilter::new(targets))
        .await?;

    println!("{}", formatter.format_plan(&plan));
    Ok(ExitCode::SUCCESS)
}

/// Apply the execution plan.
async fn cmd_apply(
    args: &StackArgs,
    targets: Vec<String>,
    yes: bool,
    docker_host: Option<&str>,
    formatter: &OutputFormatter,
) -> Result<ExitCode> {
    let stack = load_valid_stack(args)?;
    let backend = create_backend(docker_host)?;
    let reconciler = Reconciler::new(&stack, &backend);

    let plan = reconciler.plan(&TargetFilter::new(targets)).await?;
    if plan.is_empty() {
        eprintln!("{}", formatter.success("No changes to apply."));
        return Ok(ExitCode::SUCCESS);
    }

    println!("{}", formatter.format_plan(&plan));

    if !yes && !confirm("Do you want to apply this plan? [y/N]: ", &["y", "yes"])? {
        eprintln!("Apply cancelled.");
        return Ok(ExitCode::SUCCESS);
    }

    let report = reconciler.apply(&plan).await?;
    println!("{}", formatter.format_report(&report));

    Ok(if report.all_successful() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

/// Remove the bundle's services.
async fn cmd_destroy(
    args: &StackArgs,
    force: bool,
    docker_host: Option<&str>,
    formatter: &OutputFormatter,
) -> Result<ExitCode> {
    let stack = load_stack(args)?;
    let backend = create_backend(docker_host)?;
    let reconciler = Reconciler::new(&stack, &backend);

    let plan = reconciler.destroy_plan().await?;
    if plan.count(ActionKind::Delete) == 0 {
        eprintln!("No services to remove for stack {}.", stack.name);
        return Ok(ExitCode::SUCCESS);
    }

    if !force {
        let names: Vec<&str> = plan.changes().map(|a| a.name()).collect();
        let prompt = format!(
            "Are you sure you want to remove the following services? ({}) yes/no: ",
            names.join(", ")
        );
        if !confirm(&prompt, &["yes"])? {
            eprintln!("Destroy cancelled.");
            return Ok(ExitCode::SUCCESS);
        }
    }

    let report = reconciler.apply(&plan).await?;
    println!("{}", formatter.format_report(&report));

    Ok(if report.all_successful() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

/// List the stack's services and their published ports.
async fn cmd_output(
    args: &StackArgs,
    docker_host: Option<&str>,
    formatter: &OutputFormatter,
) -> Result<ExitCode> {
    let stack = load_stack(args)?;
    let backend = create_backend(docker_host)?;

    let services = backend.observer().stack_services(&stack.name).await?;
    println!("{}", formatter.format_services(&stack.name, &services));
    Ok(ExitCode::SUCCESS)
}

/// Export every live stack as a bundle file.
async fn cmd_export(
    dir: &Path,
    docker_host: Option<&str>,
    formatter: &OutputFormatter,
) -> Result<ExitCode> {
    let backend = create_backend(docker_host)?;

    let services = backend.observer().all_services().await?;
    let bundles = export_bundles(&services);
    info!("Exporting {} stacks to {}", bundles.len(), dir.display());

    let paths = write_bundles(dir, &bundles)?;
    println!("{}", formatter.format_exported(&paths));
    Ok(ExitCode::SUCCESS)
}

/// Validate a bundle without contacting the swarm.
fn cmd_validate(
    args: &StackArgs,
    warnings: bool,
    formatter: &OutputFormatter,
) -> Result<ExitCode> {
    let stack = load_stack(args)?;
    let result = BundleValidator::new().check(&stack);

    println!("{}", formatter.format_validation(&stack.name, &result, warnings));
    Ok(if result.is_valid() {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(2)
    })
}

// Helper functions

/// Resolves and loads the stack named by the command arguments.
fn load_stack(args: &StackArgs) -> Result<Stack> {
    BundleParser::new().load_stack(args.stack.as_deref(), args.file.as_deref())
}

/// Loads a stack and rejects it if the bundle is invalid.
fn load_valid_stack(args: &StackArgs) -> Result<Stack> {
    let stack = load_stack(args)?;
    let result = BundleValidator::new().validate(&stack)?;
    for warning in &result.warnings {
        warn!("{warning}");
    }
    Ok(stack)
}

/// Creates the swarm backend from the environment and `--docker-host`.
fn create_backend(docker_host: Option<&str>) -> Result<SwarmBackend> {
    let mut settings = Settings::from_env()?;
    if let Some(host) = docker_host {
        settings = settings.with_docker_host(host)?;
    }
    debug!("Using Docker API at {} (v{})", settings.base_url, settings.api_version);

    let client = SwarmClient::new(&settings)?;
    Ok(SwarmBackend::new(client))
}

/// Asks for confirmation on stderr; true if the answer is one of `accepted`.
fn confirm(prompt: &str, accepted: &[&str]) -> Result<bool> {
    eprint!("{prompt}");
    std::io::stderr().flush()?;

    let mut input = String::new();
    std::io::stdin().read_line(&mut input)?;

    let answer = input.trim().to_lowercase();
    Ok(accepted.contains(&answer.as_str()))
}
