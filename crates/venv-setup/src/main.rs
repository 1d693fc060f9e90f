//! `venv-setup` CLI entry point.
//!
//! Creates (or adopts) `<workspace>/.venv` from a global Python interpreter,
//! and doubles as the provisioning program the workflow launches.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::{info, warn};
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};
use venv_env::{
    is_global, newest_first_key, EnvironmentCreationWorkflow, FileLog, InterpreterDetails,
    InterpreterProvider, PathType, TokioRunner, WorkflowOutcome,
};
use venv_setup::settings::{
    default_state_path, load_settings, save_settings, settings_path, Settings,
};
use venv_setup::{path_search_dirs, shim, LocalProvider, PromptMode, TerminalHost};

#[derive(Parser)]
#[command(name = "venv-setup", version, about = "Create a Python virtual environment for a workspace")]
struct Cli {
    /// Log level
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or adopt <workspace>/.venv and make it the active interpreter
    Create {
        /// Workspace root (default: current directory)
        #[arg(long)]
        workspace: Option<PathBuf>,
        /// Provisioning entry point run by the chosen interpreter
        #[arg(long)]
        provisioner: Option<PathBuf>,
        /// Answer every prompt with its first choice
        #[arg(long, short)]
        yes: bool,
    },
    /// Build <workspace>/.venv with the given interpreter and report the result
    Provision {
        /// Interpreter the environment is created from
        #[arg(long)]
        python: PathBuf,
        /// Workspace root
        #[arg(long)]
        workspace: PathBuf,
    },
    /// List discovered Python interpreters, newest first
    Interpreters {
        /// Output in JSON format
        #[arg(long)]
        json: bool,
        /// Workspace whose .venv is included in the listing
        #[arg(long)]
        workspace: Option<PathBuf>,
    },
    /// Show or change settings
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Print the current settings
    Show,
    /// Change one setting (an empty value clears it)
    Set { key: String, value: String },
    /// Print the settings file location
    Path,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct InterpreterEntry {
    path: PathBuf,
    version: String,
    kind: String,
    global: bool,
}

#[derive(Tabled)]
struct InterpreterTableRow {
    #[tabled(rename = "VERSION")]
    version: String,
    #[tabled(rename = "KIND")]
    kind: String,
    #[tabled(rename = "GLOBAL")]
    global: String,
    #[tabled(rename = "PATH")]
    path: String,
}

impl From<&InterpreterEntry> for InterpreterTableRow {
    fn from(entry: &InterpreterEntry) -> Self {
        InterpreterTableRow {
            version: entry.version.clone(),
            kind: entry.kind.clone(),
            global: if entry.global { "yes" } else { "no" }.to_string(),
            path: shorten_path(&entry.path),
        }
    }
}

/// Shorten a path for display by replacing home directory with ~
fn shorten_path(path: &Path) -> String {
    if let Some(home) = dirs::home_dir() {
        if let Ok(relative) = path.strip_prefix(&home) {
            return format!("~/{}", relative.display());
        }
    }
    path.display().to_string()
}

fn resolve_workspace(workspace: Option<PathBuf>) -> Result<PathBuf> {
    let workspace = match workspace {
        Some(path) => path,
        None => std::env::current_dir().context("Failed to read the current directory")?,
    };
    workspace
        .canonicalize()
        .with_context(|| format!("Workspace {} does not exist", workspace.display()))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(&cli.log_level))
        .init();

    let settings = load_settings();

    match cli.command {
        Commands::Create {
            workspace,
            provisioner,
            yes,
        } => {
            let code = create(&settings, workspace, provisioner, yes).await?;
            if code != 0 {
                std::process::exit(code);
            }
        }
        Commands::Provision { python, workspace } => provision(&python, &workspace).await?,
        Commands::Interpreters { json, workspace } => {
            list_interpreters(&settings, workspace, json).await?
        }
        Commands::Config { command } => config(settings, command)?,
    }

    Ok(())
}

async fn create(
    settings: &Settings,
    workspace: Option<PathBuf>,
    provisioner: Option<PathBuf>,
    yes: bool,
) -> Result<i32> {
    let workspace = resolve_workspace(workspace)?;
    let host = Arc::new(TerminalHost::new(
        vec![workspace.clone()],
        PromptMode::detect(yes),
    ));

    let provider = match LocalProvider::connect(
        path_search_dirs(&settings.extra_search_paths),
        default_state_path(),
        Some(workspace),
    )
    .await
    {
        Ok(provider) => Arc::new(provider),
        Err(e) => {
            warn!("[provider] {e:#}");
            let outcome = EnvironmentCreationWorkflow::report_provider_unavailable(host.as_ref()).await;
            return Ok(outcome.exit_code());
        }
    };

    let entry = match provisioner.or_else(|| settings.provisioner_entry.clone()) {
        Some(entry) => entry,
        None => {
            let program = std::env::current_exe().context("Failed to locate venv-setup")?;
            shim::write_shim(&shim::default_shim_dir(), &program)?
        }
    };
    info!("Provisioning entry point: {:?}", entry);

    let log = Arc::new(FileLog::new(settings.log_path()));
    let workflow =
        EnvironmentCreationWorkflow::new(provider, host, log, Arc::new(TokioRunner), entry);

    let outcome = workflow.run().await;
    match &outcome {
        WorkflowOutcome::Created(result) => {
            println!("Created {}", result.executable.display());
            if let Some(requirements) = &result.requirements_file {
                println!("Installed {}", requirements.display());
            }
        }
        WorkflowOutcome::Adopted(executable) => println!("Using {}", executable.display()),
        WorkflowOutcome::Cancelled => eprintln!("Cancelled"),
        WorkflowOutcome::Failed(_) => eprintln!("Log: {}", settings.log_path().display()),
    }
    Ok(outcome.exit_code())
}

async fn provision(python: &Path, workspace: &Path) -> Result<()> {
    let result = venv_env::provision::provision(python, workspace).await?;
    println!("{}", result.to_tagged_block()?);
    Ok(())
}

async fn list_interpreters(settings: &Settings, workspace: Option<PathBuf>, json: bool) -> Result<()> {
    let workspace = workspace.map(|w| resolve_workspace(Some(w))).transpose()?;
    let provider = LocalProvider::new(
        path_search_dirs(&settings.extra_search_paths),
        default_state_path(),
        workspace,
    );

    let mut found: Vec<InterpreterDetails> = Vec::new();
    for location in provider.environment_paths().await.unwrap_or_default() {
        if location.path_type != PathType::InterpreterPath {
            continue;
        }
        if let Some(details) = provider.environment_details(&location.path).await {
            found.push(details);
        }
    }
    found.sort_by_cached_key(newest_first_key);

    let entries: Vec<InterpreterEntry> = found
        .iter()
        .map(|details| InterpreterEntry {
            path: details.interpreter_path.clone(),
            version: details.version_label(),
            kind: details
                .kinds
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", "),
            global: is_global(Some(details)),
        })
        .collect();

    if json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
    } else if entries.is_empty() {
        println!("No Python interpreters found.");
    } else {
        let rows: Vec<InterpreterTableRow> = entries.iter().map(InterpreterTableRow::from).collect();
        let table = Table::new(rows).with(Style::rounded()).to_string();
        println!("{}", table);
    }
    Ok(())
}

fn config(mut settings: Settings, command: ConfigCommands) -> Result<()> {
    match command {
        ConfigCommands::Show => println!("{}", serde_json::to_string_pretty(&settings)?),
        ConfigCommands::Set { key, value } => {
            settings.set(&key, &value)?;
            save_settings(&settings)?;
            println!("Saved {}", settings_path().display());
        }
        ConfigCommands::Path => println!("{}", settings_path().display()),
    }
    Ok(())
}
