//! Turbot provider CLI entrypoint.
//!
//! This is the main entrypoint for the turbot command-line tool.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use turbot_provider::api::TurbotClient;
use turbot_provider::cli::{Cli, Commands, OutputFormatter, StateCommands};
use turbot_provider::config::{ConfigParser, ConfigValidator, ProviderConfig, find_config_file};
use turbot_provider::error::{ConfigError, Result, TurbotError};
use turbot_provider::reconciler::Reconciler;
use turbot_provider::resources::ResourceKind;
use turbot_provider::state::{LocalStateStore, StateStore, generate_holder_id};

use clap::Parser;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

/// Configuration written by `turbot init`.
const CONFIG_TEMPLATE: &str = r#"# Turbot workspace resources managed by `turbot apply`.
workspace:
  # Overrides the workspace from the credentials profile.
  # url: https://example.cloud.turbot.com
  profile: default

state:
  path: .turbot/state.json

resources:
  - name: team-notes
    kind: file
    fields:
      parent: tmod:@turbot/turbot#/
      title: Team notes
      description: Shared notes for the platform team
      data: |
        { "owner": "platform" }
      tags:
        team: platform

  # - name: platform-admins
  #   kind: grant
  #   fields:
  #     resource: tmod:@turbot/turbot#/
  #     identity: "<profile id or aka>"
  #     type: tmod:@turbot/turbot-iam#/permission/types/turbot
  #     level: tmod:@turbot/turbot-iam#/permission/levels/admin

  # - name: baseline
  #   kind: smart_folder_attachment
  #   fields:
  #     resource: "<resource id or aka>"
  #     smart_folder: "<smart folder id>"
"#;

/// Environment template written by `turbot init`.
const ENV_TEMPLATE: &str = "# Credentials used instead of ~/.config/turbot/credentials.yml\n\
TURBOT_WORKSPACE=https://example.cloud.turbot.com\n\
TURBOT_ACCESS_KEY=\n\
TURBOT_SECRET_KEY=\n";

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
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

/// Initializes the logging system.
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

/// Main async entry point.
async fn run(cli: Cli) -> Result<()> {
    let formatter = OutputFormatter::new(cli.output);
    let config_path = cli.config.as_ref();

    match cli.command {
        Commands::Init { path, force } => cmd_init(&path, force),
        Commands::Validate { warnings } => cmd_validate(config_path, warnings, &formatter),
        Commands::Plan { detailed, no_refresh } => {
            cmd_plan(config_path, detailed, !no_refresh, &formatter).await
        }
        Commands::Apply {
            yes,
            continue_on_error,
            no_refresh,
        } => cmd_apply(config_path, yes, continue_on_error, !no_refresh, &formatter).await,
        Commands::Refresh => cmd_refresh(config_path, &formatter).await,
        Commands::Import { name, kind, id } => {
            cmd_import(config_path, &name, kind, &id, &formatter).await
        }
        Commands::Destroy { yes } => cmd_destroy(config_path, yes, &formatter).await,
        Commands::Drift => cmd_drift(config_path, &formatter).await,
        Commands::State { command } => cmd_state(config_path, command, &formatter).await,
    }
}

/// Initialize a new project.
fn cmd_init(path: &Path, force: bool) -> Result<()> {
    info!("Initializing Turbot configuration in: {}", path.display());

    let config_path = path.join("turbot.yaml");
    let env_path = path.join(".env.example");
    let gitignore_path = path.join(".gitignore");

    if !force && config_path.exists() {
        eprintln!("Configuration file already exists: {}", config_path.display());
        eprintln!("Use --force to overwrite.");
        return Ok(());
    }

    if !path.exists() {
        std::fs::create_dir_all(path)?;
    }

    std::fs::write(&config_path, CONFIG_TEMPLATE)?;
    eprintln!("Created: {}", config_path.display());

    std::fs::write(&env_path, ENV_TEMPLATE)?;
    eprintln!("Created: {}", env_path.display());

    // State and credentials stay out of version control
    if gitignore_path.exists() {
        let existing = std::fs::read_to_string(&gitignore_path)?;
        let missing: Vec<&str> = [".env", ".turbot/"]
            .into_iter()
            .filter(|entry| !existing.lines().any(|line| line.trim() == *entry))
            .collect();
        if !missing.is_empty() {
            let mut file = std::fs::OpenOptions::new()
                .append(true)
                .open(&gitignore_path)?;
            writeln!(file, "\n# Turbot")?;
            for entry in missing {
                writeln!(file, "{entry}")?;
            }
            eprintln!("Updated: {}", gitignore_path.display());
        }
    } else {
        std::fs::write(&gitignore_path, ".env\n.turbot/\n")?;
        eprintln!("Created: {}", gitignore_path.display());
    }

    eprintln!("\nProject initialized successfully!");
    eprintln!("Next steps:");
    eprintln!("  1. Copy .env.example to .env or configure ~/.config/turbot/credentials.yml");
    eprintln!("  2. Edit turbot.yaml with the resources to manage");
    eprintln!("  3. Run 'turbot validate' to check your configuration");
    eprintln!("  4. Run 'turbot plan' to preview the changes");
    eprintln!("  5. Run 'turbot apply' to apply them");

    Ok(())
}

/// Validate configuration.
fn cmd_validate(config_path: Option<&PathBuf>, show_warnings: bool, formatter: &OutputFormatter) -> Result<()> {
    let config_file = resolve_config_path(config_path)?;
    info!("Validating configuration: {}", config_file.display());

    let parser = parser_for(&config_file);
    parser.load_dotenv()?;
    let config = parser.load_with_env(&config_file)?;

    let result = ConfigValidator::new().check(&config);
    eprintln!("{}", formatter.format_validation(&result, show_warnings));

    if !result.is_valid() {
        return Err(ConfigError::ValidationError {
            message: format!("{} error(s) found", result.error_count()),
            field: None,
        }
        .into());
    }

    eprintln!("Configuration summary:");
    for kind in ResourceKind::ALL {
        let count = config.resources.iter().filter(|r| r.kind == kind).count();
        eprintln!("  {kind}: {count}");
    }
    Ok(())
}

/// Show the execution plan.
async fn cmd_plan(
    config_path: Option<&PathBuf>,
    detailed: bool,
    refresh: bool,
    formatter: &OutputFormatter,
) -> Result<()> {
    let (config, state_store, client) = load_context(config_path)?;

    let reconciler = Reconciler::new(&config, &state_store, &client).with_refresh(refresh);
    let (_diff, plan) = reconciler.plan().await?;

    eprintln!("{}", formatter.format_plan(&plan, detailed));
    Ok(())
}

/// Apply the configuration.
async fn cmd_apply(
    config_path: Option<&PathBuf>,
    auto_approve: bool,
    continue_on_error: bool,
    refresh: bool,
    formatter: &OutputFormatter,
) -> Result<()> {
    let (config, state_store, client) = load_context(config_path)?;
    let reconciler = Reconciler::new(&config, &state_store, &client)
        .with_refresh(refresh)
        .with_continue_on_error(continue_on_error);

    let (_diff, plan) = reconciler.plan().await?;
    if plan.is_empty() {
        eprintln!("No changes to apply.");
        return Ok(());
    }

    eprintln!("{}", formatter.format_plan(&plan, false));

    if !auto_approve && !confirm("Do you want to apply this plan? [y/N]: ", "y")? {
        eprintln!("Apply cancelled.");
        return Ok(());
    }

    let result = reconciler.apply().await?;
    eprintln!("{}", formatter.format_reconciliation(&result));

    if result.success {
        Ok(())
    } else {
        Err(TurbotError::internal(format!(
            "{} action(s) failed",
            result.errors.len()
        )))
    }
}

/// Refresh state from the workspace.
async fn cmd_refresh(config_path: Option<&PathBuf>, formatter: &OutputFormatter) -> Result<()> {
    let (config, state_store, client) = load_context(config_path)?;

    let report = Reconciler::new(&config, &state_store, &client).refresh().await?;
    eprintln!("{}", formatter.format_refresh(&report));
    Ok(())
}

/// Import an existing entity.
async fn cmd_import(
    config_path: Option<&PathBuf>,
    name: &str,
    kind: ResourceKind,
    id: &str,
    formatter: &OutputFormatter,
) -> Result<()> {
    let (config, state_store, client) = load_context(config_path)?;

    let resource = Reconciler::new(&config, &state_store, &client)
        .import(name, kind, id)
        .await?;
    eprintln!("{}", formatter.format_resource(&resource));

    if !config.resources.iter().any(|r| r.name == name) {
        eprintln!("Note: '{name}' is not in the configuration and will be deleted by the next apply.");
    }
    Ok(())
}

/// Destroy every managed resource.
async fn cmd_destroy(config_path: Option<&PathBuf>, auto_approve: bool, formatter: &OutputFormatter) -> Result<()> {
    let (config, state_store, client) = load_context(config_path)?;

    let Some(state) = state_store.load().await?.filter(|s| !s.resources.is_empty()) else {
        eprintln!("No resources to destroy.");
        return Ok(());
    };

    eprintln!("The following resources will be destroyed:");
    for resource in state.resources.values() {
        eprintln!("  - {} {} ({})", resource.kind, resource.name, resource.id());
    }

    if !auto_approve
        && !confirm("\nThis action is IRREVERSIBLE. Type 'destroy' to confirm: ", "destroy")?
    {
        eprintln!("Destruction cancelled.");
        return Ok(());
    }

    let result = Reconciler::new(&config, &state_store, &client).destroy().await?;
    eprintln!("{}", formatter.format_reconciliation(&result));
    Ok(())
}

/// Check for drift.
async fn cmd_drift(config_path: Option<&PathBuf>, formatter: &OutputFormatter) -> Result<()> {
    let (config, state_store, client) = load_context(config_path)?;

    let report = Reconciler::new(&config, &state_store, &client).check_drift().await?;
    eprintln!("{}", formatter.format_drift(&report));
    Ok(())
}

/// State management commands.
async fn cmd_state(
    config_path: Option<&PathBuf>,
    command: StateCommands,
    formatter: &OutputFormatter,
) -> Result<()> {
    let (_config, state_store) = load_config_and_state(config_path)?;

    match command {
        StateCommands::Show => {
            if let Some(state) = state_store.load().await? {
                eprintln!("{}", formatter.format_state(&state));
            } else {
                eprintln!("No state found.");
            }
            if let Some(lock) = state_store.get_lock_info().await?.filter(|l| !l.is_expired()) {
                eprintln!(
                    "Locked by {} for '{}' (lock {}, expires in {}s)",
                    lock.holder,
                    lock.operation,
                    lock.lock_id,
                    lock.remaining_secs()
                );
            }
        }
        StateCommands::List => {
            if let Some(state) = state_store.load().await? {
                eprintln!("{}", formatter.format_resources(&state));
            } else {
                eprintln!("No state found.");
            }
        }
        StateCommands::Rm { name } => {
            let lock = state_store.acquire_lock(&generate_holder_id(), "state rm").await?;
            let removed = remove_from_state(&state_store, &name).await;
            state_store.release_lock(&lock.lock_id).await?;
            if removed? {
                eprintln!("Removed '{name}' from state. The remote entity was left in place.");
            } else {
                eprintln!("'{name}' is not in state.");
            }
        }
        StateCommands::Unlock { lock_id, force } => {
            if force {
                if let Some(lock_info) = state_store.get_lock_info().await? {
                    state_store.release_lock(&lock_info.lock_id).await?;
                    eprintln!("State forcefully unlocked.");
                }
            } else if let Some(id) = lock_id {
                state_store.release_lock(&id).await?;
                eprintln!("State unlocked.");
            } else {
                eprintln!("Please provide --lock-id or use --force");
            }
        }
    }

    Ok(())
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Resolves the configuration file path.
fn resolve_config_path(config_path: Option<&PathBuf>) -> Result<PathBuf> {
    config_path.map_or_else(|| find_config_file("."), |path| Ok(path.clone()))
}

fn parser_for(config_file: &Path) -> ConfigParser {
    ConfigParser::new().with_base_path(config_file.parent().unwrap_or_else(|| Path::new(".")))
}

/// Loads and validates configuration and opens the local state store.
fn load_config_and_state(config_path: Option<&PathBuf>) -> Result<(ProviderConfig, LocalStateStore)> {
    let (config, state_store, _parser) = load_config(config_path)?;
    Ok((config, state_store))
}

fn load_config(config_path: Option<&PathBuf>) -> Result<(ProviderConfig, LocalStateStore, ConfigParser)> {
    let config_file = resolve_config_path(config_path)?;
    debug!("Loading configuration from: {}", config_file.display());

    let parser = parser_for(&config_file);
    parser.load_dotenv()?;
    let config = parser.load_with_env(&config_file)?;

    ConfigValidator::new().validate(&config)?;

    // Relative state paths resolve against the configuration directory
    let state_path = config.state.path_or_default();
    let state_path = if state_path.is_relative() {
        config_file
            .parent()
            .unwrap_or_else(|| Path::new("."))
            .join(state_path)
    } else {
        state_path
    };

    let state_store = LocalStateStore::with_state_path(state_path);
    debug!("Using state file: {}", state_store.state_path().display());

    Ok((config, state_store, parser))
}

/// Loads configuration, state and an authenticated client.
fn load_context(config_path: Option<&PathBuf>) -> Result<(ProviderConfig, LocalStateStore, TurbotClient)> {
    let (config, state_store, parser) = load_config(config_path)?;

    let credentials = parser.resolve_credentials(&config)?;
    debug!("Using workspace {}", credentials.workspace);
    let client = TurbotClient::new(
        &credentials.workspace,
        &credentials.access_key,
        &credentials.secret_key,
    )?;
    debug!("GraphQL endpoint: {}", client.endpoint());

    Ok((config, state_store, client))
}

async fn remove_from_state(state_store: &LocalStateStore, name: &str) -> Result<bool> {
    let Some(mut state) = state_store.load().await? else {
        return Ok(false);
    };
    if state.remove_resource(name).is_none() {
        return Ok(false);
    }
    state_store.save(&state).await?;
    Ok(true)
}

/// Prompts on stderr and compares the answer with `expected`.
fn confirm(prompt: &str, expected: &str) -> Result<bool> {
    eprint!("{prompt}");
    std::io::stderr().flush()?;

    let mut input = String::new();
    std::io::stdin().read_line(&mut input)?;
    Ok(input.trim().eq_ignore_ascii_case(expected))
}
