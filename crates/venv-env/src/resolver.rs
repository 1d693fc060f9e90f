//! Resolving the global interpreter a new environment is built from.
//!
//! Resolution is a small state machine. [`InterpreterResolver::step`] is the
//! transition function; [`InterpreterResolver::resolve`] drives it until a
//! terminal state is reached.
//!
//! ```text
//! Start ──no selection──────────▶ NoSelection ─┐
//!   │  ──folder-only selection──▶ NonGlobalSelection ◀─┐
//!   └──interpreter path──▶ Candidate ──not global──────┘
//!                              │ global
//!                              ▼
//!                  GlobalSelectionConfirmed
//!
//! NoSelection / NonGlobalSelection prompt:
//!   newest ─▶ GlobalSelectionConfirmed (or NoInterpretersFound)
//!   select ─▶ GlobalSelectionConfirmed | UserCancelled
//!   cancel ─▶ UserCancelled
//! ```
//!
//! There is no retry limit: a run ends only when the user cancels or a
//! global interpreter is confirmed.

use std::path::{Path, PathBuf};

use log::{debug, info};

use crate::error::WorkflowError;
use crate::host::{Host, PickItem, Severity};
use crate::interpreter::{
    filter_by_path_type, is_global, newest_first_key, InterpreterDetails, PathType,
};
use crate::provider::InterpreterProvider;

pub const USE_NEWEST: &str = "Use newest global interpreter";
pub const SELECT_INTERPRETER: &str = "Select interpreter";
pub const CANCEL: &str = "Cancel";

const PICK_PLACEHOLDER: &str = "Select a global Python interpreter";

/// States of the resolution state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolverState {
    /// The active selection has not been looked at yet.
    Start,
    /// No interpreter is selected; the user must be prompted.
    NoSelection,
    /// The selection is a virtual environment or identified only by its
    /// folder; the user must be prompted.
    NonGlobalSelection { path: PathBuf },
    /// An interpreter path awaiting classification.
    Candidate { path: PathBuf },
    /// Terminal: a global interpreter was chosen.
    GlobalSelectionConfirmed { path: PathBuf },
    /// Terminal: the user backed out.
    UserCancelled,
}

impl ResolverState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ResolverState::GlobalSelectionConfirmed { .. } | ResolverState::UserCancelled
        )
    }
}

/// Result of a completed resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Interpreter(PathBuf),
    Cancelled,
}

/// Drives interpreter resolution against a provider and a host.
pub struct InterpreterResolver<'a> {
    provider: &'a dyn InterpreterProvider,
    host: &'a dyn Host,
}

impl<'a> InterpreterResolver<'a> {
    pub fn new(provider: &'a dyn InterpreterProvider, host: &'a dyn Host) -> Self {
        Self { provider, host }
    }

    /// Run the state machine to completion.
    ///
    /// `resource` scopes the active-selection lookup to a workspace.
    pub async fn resolve(&self, resource: Option<&Path>) -> Result<Resolution, WorkflowError> {
        let mut state = ResolverState::Start;
        loop {
            let next = self.step(state, resource).await?;
            debug!("[resolver] -> {:?}", next);
            match next {
                ResolverState::GlobalSelectionConfirmed { path } => {
                    info!("[resolver] Using {:?}", path);
                    return Ok(Resolution::Interpreter(path));
                }
                ResolverState::UserCancelled => {
                    info!("[resolver] Cancelled by user");
                    return Ok(Resolution::Cancelled);
                }
                other => state = other,
            }
        }
    }

    /// Transition function: compute the state following `state`.
    ///
    /// Terminal states map to themselves.
    pub async fn step(
        &self,
        state: ResolverState,
        resource: Option<&Path>,
    ) -> Result<ResolverState, WorkflowError> {
        match state {
            ResolverState::Start => {
                let next = match self.provider.active_environment_path(resource).await {
                    None => ResolverState::NoSelection,
                    Some(location) => match location.path_type {
                        PathType::InterpreterPath => ResolverState::Candidate {
                            path: location.path,
                        },
                        PathType::EnvFolderPath => ResolverState::NonGlobalSelection {
                            path: location.path,
                        },
                    },
                };
                Ok(next)
            }
            ResolverState::NoSelection => {
                self.prompt(&WorkflowError::NoInterpreterSelected.to_string())
                    .await
            }
            ResolverState::NonGlobalSelection { path } => {
                self.prompt(&WorkflowError::NonGlobalInterpreter(path).to_string())
                    .await
            }
            ResolverState::Candidate { path } => {
                let details = self.provider.environment_details(&path).await;
                if is_global(details.as_ref()) {
                    Ok(ResolverState::GlobalSelectionConfirmed { path })
                } else {
                    Ok(ResolverState::NonGlobalSelection { path })
                }
            }
            terminal => Ok(terminal),
        }
    }

    /// Every global interpreter the provider knows, newest first.
    pub async fn global_interpreters(&self) -> Vec<(PathBuf, InterpreterDetails)> {
        let locations = self.provider.environment_paths().await.unwrap_or_default();

        let mut globals = Vec::new();
        for path in filter_by_path_type(&locations) {
            let details = self.provider.environment_details(&path).await;
            match details {
                Some(details) if is_global(Some(&details)) => globals.push((path, details)),
                _ => debug!("[resolver] Skipping non-global {:?}", path),
            }
        }

        globals.sort_by_cached_key(|(_, details)| newest_first_key(details));
        globals
    }

    async fn prompt(&self, message: &str) -> Result<ResolverState, WorkflowError> {
        let choice = self
            .host
            .show_message(
                Severity::Warning,
                message,
                &[USE_NEWEST, SELECT_INTERPRETER, CANCEL],
            )
            .await;

        match choice.as_deref() {
            Some(USE_NEWEST) => {
                let (path, details) = self
                    .global_interpreters()
                    .await
                    .into_iter()
                    .next()
                    .ok_or(WorkflowError::NoInterpretersFound)?;
                info!(
                    "[resolver] Newest global interpreter is {} at {:?}",
                    details.version_label(),
                    path
                );
                Ok(ResolverState::GlobalSelectionConfirmed { path })
            }
            Some(SELECT_INTERPRETER) => self.pick().await,
            _ => Ok(ResolverState::UserCancelled),
        }
    }

    async fn pick(&self) -> Result<ResolverState, WorkflowError> {
        let globals = self.global_interpreters().await;
        if globals.is_empty() {
            return Err(WorkflowError::NoInterpretersFound);
        }

        let items = globals
            .iter()
            .map(|(path, details)| PickItem {
                label: details.version_label(),
                description: path.to_string_lossy().to_string(),
            })
            .collect();

        let Some(picked) = self.host.pick_one(PICK_PLACEHOLDER, items).await else {
            return Ok(ResolverState::UserCancelled);
        };

        let chosen = globals
            .into_iter()
            .find(|(path, _)| path.to_string_lossy() == picked.description);
        match chosen {
            Some((path, _)) => Ok(ResolverState::GlobalSelectionConfirmed { path }),
            None => Ok(ResolverState::UserCancelled),
        }
    }
}
