//! Native provisioner: the process side of the tagged-output protocol.
//!
//! Creates `<workspace>/.venv` with the given interpreter's `venv` module,
//! installs the most appropriate requirements file and reports the result as
//! a [`ProvisioningResult`].

use std::io;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use log::info;

use crate::output::ProvisioningResult;
use crate::venv::{venv_executable, VENV_DIR};

/// Errors from the native provisioner.
#[derive(Debug, thiserror::Error)]
pub enum ProvisionError {
    #[error("Failed to run {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("{step} failed ({status}): {stderr}")]
    CommandFailed {
        step: &'static str,
        status: String,
        stderr: String,
    },

    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Create `<workspace>/.venv` unless it already exists.
///
/// The environment prompt is the workspace directory name. Returns the
/// interpreter path inside the environment either way.
pub async fn create(python: &Path, workspace: &Path) -> Result<PathBuf, ProvisionError> {
    let venv_path = workspace.join(VENV_DIR);
    let python_path = venv_executable(&venv_path);

    if venv_path.exists() {
        info!("[provision] Reusing existing {:?}", venv_path);
        return Ok(python_path);
    }

    let prompt = workspace
        .file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_else(|| VENV_DIR.to_string());

    info!("[provision] Creating {:?} with {:?}", venv_path, python);
    let mut cmd = tokio::process::Command::new(python);
    cmd.arg("-m")
        .arg("venv")
        .arg("--prompt")
        .arg(&prompt)
        .arg(&venv_path);
    run_step("venv creation", python, cmd).await?;

    Ok(python_path)
}

/// Pick the requirements file to install from a directory listing.
///
/// A `.txt` file whose name mentions both "requirements" and "dev" wins
/// over a plain `requirements.txt`.
pub fn requirements_filename<I, S>(names: I) -> Option<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut names: Vec<String> = names.into_iter().map(|n| n.as_ref().to_string()).collect();
    names.sort();

    let dev = names
        .iter()
        .find(|name| name.ends_with(".txt") && name.contains("requirements") && name.contains("dev"));
    if let Some(dev) = dev {
        return Some(dev.clone());
    }

    names.into_iter().find(|name| name == "requirements.txt")
}

/// Install the workspace's requirements file into the environment, if it
/// has one. Returns the file that was installed.
pub async fn install_requirements(
    python_path: &Path,
    workspace: &Path,
) -> Result<Option<PathBuf>, ProvisionError> {
    let mut names = Vec::new();
    let mut entries = tokio::fs::read_dir(workspace).await?;
    while let Some(entry) = entries.next_entry().await? {
        if entry.file_type().await?.is_file() {
            names.push(entry.file_name().to_string_lossy().to_string());
        }
    }

    let Some(filename) = requirements_filename(&names) else {
        info!("[provision] No requirements file in {:?}", workspace);
        return Ok(None);
    };

    let requirements = workspace.join(&filename);
    info!("[provision] Installing {:?}", requirements);
    let mut cmd = tokio::process::Command::new(python_path);
    cmd.arg("-m")
        .arg("pip")
        .arg("install")
        .arg("-r")
        .arg(&requirements);
    run_step("pip install", python_path, cmd).await?;

    Ok(Some(requirements))
}

/// Create the environment and install requirements.
pub async fn provision(python: &Path, workspace: &Path) -> Result<ProvisioningResult, ProvisionError> {
    let executable = create(python, workspace).await?;
    let requirements_file = install_requirements(&executable, workspace).await?;
    Ok(ProvisioningResult {
        executable,
        requirements_file,
    })
}

async fn run_step(
    step: &'static str,
    program: &Path,
    mut cmd: tokio::process::Command,
) -> Result<(), ProvisionError> {
    let output = cmd
        .env("PYTHONUTF8", "1")
        .stdin(Stdio::null())
        .stdout(Stdio::inherit())
        .stderr(Stdio::piped())
        .output()
        .await
        .map_err(|source| ProvisionError::Spawn {
            program: program.to_string_lossy().to_string(),
            source,
        })?;

    if !output.status.success() {
        return Err(ProvisionError::CommandFailed {
            step,
            status: output.status.to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        });
    }
    Ok(())
}
