//! Host UI collaborator: prompts, pickers and the workspace folder list.

use async_trait::async_trait;
use std::path::PathBuf;

use crate::progress::ProgressHandler;

/// How prominently a message should be presented.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Warning,
    Error,
}

/// One entry of a single-select list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PickItem {
    pub label: String,
    pub description: String,
}

/// The editor (or terminal) the workflow runs inside.
///
/// Progress is reported through the [`ProgressHandler`] supertrait.
#[async_trait]
pub trait Host: ProgressHandler {
    /// Open workspace roots, in the host's order.
    fn workspace_folders(&self) -> Vec<PathBuf>;

    /// Show a message with a fixed set of buttons.
    ///
    /// Returns the label of the chosen button, or `None` when dismissed.
    /// With no buttons the message is purely informational.
    async fn show_message(
        &self,
        severity: Severity,
        message: &str,
        buttons: &[&str],
    ) -> Option<String>;

    /// Let the user pick one item. `None` means nothing was picked.
    async fn pick_one(&self, placeholder: &str, items: Vec<PickItem>) -> Option<PickItem>;
}
