//! Terminal host: prompts on stderr, answers from the keyboard.

use std::io::IsTerminal;
use std::path::PathBuf;

use async_trait::async_trait;
use dialoguer::{theme::ColorfulTheme, Select};
use log::warn;
use venv_env::{Host, LogHandler, PickItem, ProgressHandler, Severity, WorkflowPhase};

/// How prompts are answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptMode {
    /// Ask on the terminal.
    Interactive,
    /// Take the first choice of every prompt without asking.
    AcceptFirst,
    /// Dismiss every prompt.
    Dismiss,
}

impl PromptMode {
    /// `AcceptFirst` when requested, otherwise interactive only if stdin is
    /// a terminal.
    pub fn detect(accept_first: bool) -> Self {
        if accept_first {
            PromptMode::AcceptFirst
        } else if std::io::stdin().is_terminal() {
            PromptMode::Interactive
        } else {
            PromptMode::Dismiss
        }
    }
}

/// [`Host`] that runs in a terminal.
///
/// The workspace is a single directory given on the command line.
pub struct TerminalHost {
    folders: Vec<PathBuf>,
    mode: PromptMode,
}

impl TerminalHost {
    pub fn new(folders: Vec<PathBuf>, mode: PromptMode) -> Self {
        Self { folders, mode }
    }

    async fn select(&self, prompt: &str, items: Vec<String>) -> Option<usize> {
        match self.mode {
            PromptMode::AcceptFirst => return (!items.is_empty()).then_some(0),
            PromptMode::Dismiss => return None,
            PromptMode::Interactive => {}
        }

        let prompt = prompt.to_string();
        let answer = tokio::task::spawn_blocking(move || {
            let theme = ColorfulTheme::default();
            Select::with_theme(&theme)
                .with_prompt(prompt)
                .items(&items[..])
                .default(0)
                .interact_opt()
        })
        .await;

        match answer {
            Ok(Ok(choice)) => choice,
            Ok(Err(e)) => {
                warn!("[terminal] Prompt failed: {}", e);
                None
            }
            Err(e) => {
                warn!("[terminal] Prompt task failed: {}", e);
                None
            }
        }
    }
}

impl ProgressHandler for TerminalHost {
    fn on_progress(&self, phase: WorkflowPhase) {
        LogHandler.on_progress(phase);
    }
}

#[async_trait]
impl Host for TerminalHost {
    fn workspace_folders(&self) -> Vec<PathBuf> {
        self.folders.clone()
    }

    async fn show_message(
        &self,
        severity: Severity,
        message: &str,
        buttons: &[&str],
    ) -> Option<String> {
        let prefix = match severity {
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Error => "error",
        };
        eprintln!("{prefix}: {message}");

        if buttons.is_empty() {
            return None;
        }
        let items = buttons.iter().map(|b| b.to_string()).collect();
        let index = self.select("Choose an action", items).await?;
        buttons.get(index).map(|b| b.to_string())
    }

    async fn pick_one(&self, placeholder: &str, items: Vec<PickItem>) -> Option<PickItem> {
        let labels = items
            .iter()
            .map(|item| format!("{}  {}", item.label, item.description))
            .collect();
        let index = self.select(placeholder, labels).await?;
        items.into_iter().nth(index)
    }
}
