//! The environment creation workflow.
//!
//! A run is a linear sequence with early exit:
//!
//! 1. find the workspace root (first open folder)
//! 2. inspect `<root>/.venv`, offering to adopt a usable one
//! 3. resolve a global interpreter
//! 4. run the provisioning process
//! 5. parse its tagged result block
//! 6. register the new interpreter as active
//!
//! Each step reports a [`WorkflowPhase`] before it executes. Failures are
//! reported to the host as a single error message; nothing escapes
//! [`EnvironmentCreationWorkflow::run`] as an `Err`.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::{error, info, warn};
use uuid::Uuid;

use crate::diagnostics::DiagnosticLog;
use crate::error::WorkflowError;
use crate::host::{Host, Severity};
use crate::output::{parse_output, ProvisioningResult};
use crate::progress::WorkflowPhase;
use crate::provider::InterpreterProvider;
use crate::resolver::{InterpreterResolver, Resolution, CANCEL};
use crate::runner::{ProcessRunner, ProcessSpec};
use crate::venv::{inspect_workspace, ExistingVenv};

pub const USE_EXISTING: &str = "Use existing";

/// How a run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkflowOutcome {
    /// A new environment was provisioned and registered.
    Created(ProvisioningResult),
    /// An existing `.venv` was registered instead.
    Adopted(PathBuf),
    /// The user backed out; nothing changed.
    Cancelled,
    /// The run failed and the user was told why.
    Failed(WorkflowError),
}

impl WorkflowOutcome {
    /// Process exit code for command-line front ends.
    pub fn exit_code(&self) -> i32 {
        match self {
            WorkflowOutcome::Created(_) | WorkflowOutcome::Adopted(_) => 0,
            WorkflowOutcome::Cancelled => 130,
            WorkflowOutcome::Failed(_) => 1,
        }
    }
}

/// Creates a virtual environment for the host's workspace.
pub struct EnvironmentCreationWorkflow {
    provider: Arc<dyn InterpreterProvider>,
    host: Arc<dyn Host>,
    log: Arc<dyn DiagnosticLog>,
    runner: Arc<dyn ProcessRunner>,
    provisioner_entry: PathBuf,
}

impl EnvironmentCreationWorkflow {
    pub fn new(
        provider: Arc<dyn InterpreterProvider>,
        host: Arc<dyn Host>,
        log: Arc<dyn DiagnosticLog>,
        runner: Arc<dyn ProcessRunner>,
        provisioner_entry: impl Into<PathBuf>,
    ) -> Self {
        Self {
            provider,
            host,
            log,
            runner,
            provisioner_entry: provisioner_entry.into(),
        }
    }

    /// Report that no provider could be reached.
    ///
    /// Used by front ends that fail to construct an [`InterpreterProvider`]
    /// before a workflow can exist.
    pub async fn report_provider_unavailable(host: &dyn Host) -> WorkflowOutcome {
        let err = WorkflowError::ProviderUnavailable;
        error!("[workflow] {}", err);
        host.show_message(Severity::Error, &err.to_string(), &[])
            .await;
        WorkflowOutcome::Failed(err)
    }

    /// Execute one run. Never fails; the outcome is informational.
    pub async fn run(&self) -> WorkflowOutcome {
        let run_id = Uuid::new_v4().to_string();
        self.host.on_progress(WorkflowPhase::Starting {
            run_id: run_id.clone(),
        });

        match self.execute(&run_id).await {
            Ok(outcome) => outcome,
            Err(WorkflowError::UserCancelled) => {
                info!("[workflow {run_id}] Cancelled");
                WorkflowOutcome::Cancelled
            }
            Err(err) => {
                error!("[workflow {run_id}] {err}");
                if err.shows_log() {
                    self.log.show();
                }
                self.host
                    .show_message(Severity::Error, &err.to_string(), &[])
                    .await;
                WorkflowOutcome::Failed(err)
            }
        }
    }

    async fn execute(&self, run_id: &str) -> Result<WorkflowOutcome, WorkflowError> {
        self.host.on_progress(WorkflowPhase::LocatingWorkspace);
        let workspace = self
            .host
            .workspace_folders()
            .into_iter()
            .next()
            .ok_or(WorkflowError::NoWorkspace)?;
        info!("[workflow {run_id}] Workspace {:?}", workspace);

        self.host.on_progress(WorkflowPhase::CheckingExistingVenv {
            workspace: workspace.to_string_lossy().to_string(),
        });
        match inspect_workspace(&workspace) {
            ExistingVenv::Missing => {}
            ExistingVenv::Usable { python_path } => {
                return self.offer_existing(&workspace, python_path).await;
            }
            ExistingVenv::Conflicting { venv_path } => {
                return Err(WorkflowError::ConflictingVenvExists(venv_path));
            }
        }

        self.host.on_progress(WorkflowPhase::ResolvingInterpreter);
        let resolver = InterpreterResolver::new(self.provider.as_ref(), self.host.as_ref());
        let interpreter = match resolver.resolve(Some(&workspace)).await? {
            Resolution::Interpreter(path) => path,
            Resolution::Cancelled => return Err(WorkflowError::UserCancelled),
        };

        self.host.on_progress(WorkflowPhase::CreatingVenv {
            interpreter: interpreter.to_string_lossy().to_string(),
        });
        let spec = ProcessSpec::provisioning(&interpreter, &self.provisioner_entry, &workspace);
        info!(
            "[workflow {run_id}] Running {:?} {:?}",
            spec.program, spec.args
        );
        let output = self
            .runner
            .run(&spec)
            .await
            .map_err(|e| WorkflowError::launch_failed(&spec.program, &e))?;
        self.log.append(&output.combined);
        if !output.success() {
            return Err(WorkflowError::SubprocessNonzeroExit { code: output.code });
        }

        self.host.on_progress(WorkflowPhase::ParsingOutput);
        let result = parse_output(&output.stdout).ok_or(WorkflowError::MissingStructuredOutput)?;

        self.host.on_progress(WorkflowPhase::SettingInterpreter {
            executable: result.executable.to_string_lossy().to_string(),
        });
        self.register(&result.executable, &workspace).await?;

        let active = self
            .provider
            .active_environment_path(Some(&workspace))
            .await
            .map(|location| location.path.to_string_lossy().to_string())
            .unwrap_or_else(|| "<none>".to_string());
        self.log.append(&format!(
            "Created virtual environment at {}; active interpreter is now {}\n",
            result.executable.display(),
            active
        ));

        self.host.on_progress(WorkflowPhase::Ready {
            executable: result.executable.to_string_lossy().to_string(),
        });
        Ok(WorkflowOutcome::Created(result))
    }

    async fn offer_existing(
        &self,
        workspace: &Path,
        python_path: PathBuf,
    ) -> Result<WorkflowOutcome, WorkflowError> {
        let message = format!(
            "A virtual environment already exists at {}. Use it?",
            python_path.display()
        );
        let choice = self
            .host
            .show_message(Severity::Warning, &message, &[USE_EXISTING, CANCEL])
            .await;

        if choice.as_deref() != Some(USE_EXISTING) {
            return Err(WorkflowError::UserCancelled);
        }

        self.host.on_progress(WorkflowPhase::SettingInterpreter {
            executable: python_path.to_string_lossy().to_string(),
        });
        self.register(&python_path, workspace).await?;
        self.log.append(&format!(
            "Using existing virtual environment at {}\n",
            python_path.display()
        ));
        self.host.on_progress(WorkflowPhase::Ready {
            executable: python_path.to_string_lossy().to_string(),
        });
        Ok(WorkflowOutcome::Adopted(python_path))
    }

    async fn register(&self, executable: &Path, workspace: &Path) -> Result<(), WorkflowError> {
        self.provider
            .set_active_environment(executable, Some(workspace))
            .await
            .map_err(|e| {
                warn!("[workflow] Failed to set active interpreter: {e:#}");
                WorkflowError::ProviderUnavailable
            })
    }
}
