//! Interpreter provider collaborator.
//!
//! The provider owns interpreter discovery and the per-workspace active
//! selection. The workflow only consumes it through this trait.

use async_trait::async_trait;
use std::path::Path;

use crate::interpreter::{InterpreterDetails, InterpreterLocation};

/// Source of interpreter information and owner of the active selection.
///
/// Lookups return `None` for ordinary not-found conditions rather than
/// failing.
#[async_trait]
pub trait InterpreterProvider: Send + Sync {
    /// The interpreter currently selected for `resource` (or the whole
    /// workspace when `None`).
    async fn active_environment_path(&self, resource: Option<&Path>)
        -> Option<InterpreterLocation>;

    /// Details for an interpreter binary or environment folder.
    async fn environment_details(&self, path: &Path) -> Option<InterpreterDetails>;

    /// Every environment the provider currently knows about.
    async fn environment_paths(&self) -> Option<Vec<InterpreterLocation>>;

    /// Make `path` the active interpreter for `resource`.
    async fn set_active_environment(
        &self,
        path: &Path,
        resource: Option<&Path>,
    ) -> anyhow::Result<()>;
}
