//! Failure kinds of the environment creation workflow.

use std::io;
use std::path::PathBuf;

/// Every way a workflow run can end other than success.
///
/// `UserCancelled` is included so the resolver can short-circuit through
/// `?`; the workflow turns it into a quiet termination rather than an error
/// message.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WorkflowError {
    #[error("No workspace folder is open")]
    NoWorkspace,

    #[error("The Python interpreter provider is unavailable")]
    ProviderUnavailable,

    #[error("No Python interpreter is selected")]
    NoInterpreterSelected,

    #[error("The selected environment is not a global interpreter: {}", .0.display())]
    NonGlobalInterpreter(PathBuf),

    #[error("No global Python interpreters found")]
    NoInterpretersFound,

    #[error("{} already exists but does not contain a Python executable", .0.display())]
    ConflictingVenvExists(PathBuf),

    #[error("Failed to launch {}: {message} ({kind:?})", .program.display())]
    SubprocessLaunchFailed {
        program: PathBuf,
        kind: io::ErrorKind,
        message: String,
    },

    #[error("Creating the virtual environment failed ({})", exit_description(.code))]
    SubprocessNonzeroExit { code: Option<i32> },

    #[error("Creating the virtual environment did not report where the interpreter is")]
    MissingStructuredOutput,

    #[error("Cancelled")]
    UserCancelled,
}

impl WorkflowError {
    /// Wrap a spawn error for the given program.
    pub fn launch_failed(program: impl Into<PathBuf>, err: &io::Error) -> Self {
        WorkflowError::SubprocessLaunchFailed {
            program: program.into(),
            kind: err.kind(),
            message: err.to_string(),
        }
    }

    /// Whether the diagnostic log should be brought into view alongside the
    /// error message.
    pub fn shows_log(&self) -> bool {
        matches!(
            self,
            WorkflowError::SubprocessNonzeroExit { .. } | WorkflowError::MissingStructuredOutput
        )
    }
}

fn exit_description(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("exit code {code}"),
        None => "terminated by signal".to_string(),
    }
}
