//! Command-line front end for workspace virtual environment creation.
//!
//! Supplies the collaborators [`venv_env::EnvironmentCreationWorkflow`]
//! needs when running outside an editor: a terminal host, an interpreter
//! provider that scans `PATH`, persisted settings and the provisioning shim.

pub mod provider;
pub mod settings;
pub mod shim;
pub mod terminal;

pub use provider::{is_interpreter_name, path_search_dirs, LocalProvider};
pub use settings::{load_settings, save_settings, Settings};
pub use terminal::{PromptMode, TerminalHost};
