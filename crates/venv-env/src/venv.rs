//! `.venv` layout conventions.

use std::path::{Path, PathBuf};

/// Directory name of the workspace virtual environment.
pub const VENV_DIR: &str = ".venv";

/// Interpreter location inside a virtual environment directory.
pub fn venv_executable(venv_path: &Path) -> PathBuf {
    venv_executable_for(venv_path, cfg!(windows))
}

/// Interpreter location inside a virtual environment laid out for Windows
/// (`Scripts/python.exe`) or for any other platform (`bin/python`).
pub fn venv_executable_for(venv_path: &Path, windows: bool) -> PathBuf {
    if windows {
        venv_path.join("Scripts").join("python.exe")
    } else {
        venv_path.join("bin").join("python")
    }
}

/// State of `<workspace>/.venv`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExistingVenv {
    /// Nothing there yet.
    Missing,
    /// A `.venv` with an interpreter at the expected location.
    Usable { python_path: PathBuf },
    /// Something named `.venv` exists but has no interpreter.
    Conflicting { venv_path: PathBuf },
}

/// Look at the workspace's `.venv` without modifying anything.
pub fn inspect_workspace(workspace: &Path) -> ExistingVenv {
    let venv_path = workspace.join(VENV_DIR);
    if !venv_path.exists() {
        return ExistingVenv::Missing;
    }

    let python_path = venv_executable(&venv_path);
    if python_path.is_file() {
        ExistingVenv::Usable { python_path }
    } else {
        ExistingVenv::Conflicting { venv_path }
    }
}
