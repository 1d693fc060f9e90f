//! Progress reporting for the environment creation workflow.
//!
//! Provides [`WorkflowPhase`] events covering every step of a run
//! (workspace lookup, `.venv` check, interpreter resolution, provisioning,
//! registration) and a [`ProgressHandler`] trait that consumers implement to
//! route events to their UI layer.

use serde::{Deserialize, Serialize};

/// Phases of a single workflow run.
///
/// Serializable for transport over IPC or to an editor front end.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum WorkflowPhase {
    /// A run has started.
    Starting { run_id: String },
    /// Looking up the workspace root.
    LocatingWorkspace,
    /// Looking for a `.venv` under the workspace root.
    CheckingExistingVenv { workspace: String },
    /// Resolving the interpreter the environment will be built from.
    ResolvingInterpreter,
    /// The provisioning process is running.
    CreatingVenv { interpreter: String },
    /// Reading the result block out of the provisioning output.
    ParsingOutput,
    /// Registering the new interpreter as the active one.
    SettingInterpreter { executable: String },
    /// The workspace has a usable environment.
    Ready { executable: String },
}

impl WorkflowPhase {
    /// Short human-readable label shown while the phase runs.
    pub fn label(&self) -> String {
        match self {
            WorkflowPhase::Starting { .. } => "Starting".to_string(),
            WorkflowPhase::LocatingWorkspace => "Getting workspace".to_string(),
            WorkflowPhase::CheckingExistingVenv { .. } => {
                "Checking for virtual environment".to_string()
            }
            WorkflowPhase::ResolvingInterpreter => "Getting Python interpreter".to_string(),
            WorkflowPhase::CreatingVenv { .. } => "Creating virtual environment".to_string(),
            WorkflowPhase::ParsingOutput => "Parsing output".to_string(),
            WorkflowPhase::SettingInterpreter { .. } => "Setting interpreter".to_string(),
            WorkflowPhase::Ready { executable } => format!("Ready: {executable}"),
        }
    }
}

/// Trait for receiving workflow progress events.
pub trait ProgressHandler: Send + Sync {
    /// Called before each workflow step executes.
    fn on_progress(&self, phase: WorkflowPhase);
}

/// Log-only progress handler.
///
/// Writes progress phases to the `log` crate at info level.
pub struct LogHandler;

impl ProgressHandler for LogHandler {
    fn on_progress(&self, phase: WorkflowPhase) {
        match &phase {
            WorkflowPhase::Starting { run_id } => {
                log::info!("[workflow] Starting run {run_id}");
            }
            WorkflowPhase::LocatingWorkspace | WorkflowPhase::ResolvingInterpreter => {
                log::info!("[workflow] {}", phase.label());
            }
            WorkflowPhase::CheckingExistingVenv { workspace } => {
                log::info!("[workflow] Checking for .venv in {workspace}");
            }
            WorkflowPhase::CreatingVenv { interpreter } => {
                log::info!("[workflow] Creating virtual environment with {interpreter}");
            }
            WorkflowPhase::ParsingOutput => {
                log::debug!("[workflow] Parsing provisioning output");
            }
            WorkflowPhase::SettingInterpreter { executable } => {
                log::info!("[workflow] Setting active interpreter to {executable}");
            }
            WorkflowPhase::Ready { executable } => {
                log::info!("[workflow] Ready: {executable}");
            }
        }
    }
}
