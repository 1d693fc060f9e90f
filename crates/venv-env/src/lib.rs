//! Workspace virtual environment creation with progress reporting.
//!
//! This crate provides the decision procedure that turns "no interpreter
//! selected", "a virtual environment is selected" or "a `.venv` already
//! exists" into either a freshly provisioned environment or a well-defined
//! failure. It includes:
//!
//! - Interpreter data types and the small utilities the workflow relies on
//!   (version ordering, path-type filtering, global classification)
//! - A parser for the tagged JSON block printed by the provisioning process
//! - An interpreter resolver modelled as an explicit state machine
//! - The environment creation workflow itself
//! - A native provisioner implementing the other side of the output protocol
//!
//! # Collaborators
//!
//! The workflow never talks to an editor or to an interpreter registry
//! directly. Instead it is handed an [`InterpreterProvider`], a [`Host`], a
//! [`DiagnosticLog`] and a [`ProcessRunner`]. Consumers implement these traits
//! to route prompts and progress to their UI layer; tests substitute fakes.
//!
//! ```ignore
//! use std::sync::Arc;
//! use venv_env::{EnvironmentCreationWorkflow, TokioRunner};
//!
//! let workflow = EnvironmentCreationWorkflow::new(provider, host, log, Arc::new(TokioRunner), entry);
//! let outcome = workflow.run().await;
//! ```

pub mod diagnostics;
pub mod error;
pub mod host;
pub mod interpreter;
pub mod output;
pub mod progress;
pub mod provider;
pub mod provision;
pub mod resolver;
pub mod runner;
pub mod venv;
pub mod workflow;

// Re-export key types
pub use diagnostics::{DiagnosticLog, FileLog};
pub use error::WorkflowError;
pub use host::{Host, PickItem, Severity};
pub use interpreter::{
    compare_descending, filter_by_path_type, is_global, newest_first_key, EnvironmentKind,
    InterpreterDetails, InterpreterLocation, PathType,
};
pub use output::{parse_output, ProvisioningResult};
pub use progress::{LogHandler, ProgressHandler, WorkflowPhase};
pub use provider::InterpreterProvider;
pub use resolver::{InterpreterResolver, Resolution, ResolverState};
pub use runner::{ProcessOutput, ProcessRunner, ProcessSpec, TokioRunner};
pub use venv::{inspect_workspace, venv_executable, venv_executable_for, ExistingVenv};
pub use workflow::{EnvironmentCreationWorkflow, WorkflowOutcome};
