//! Python entry point that hands provisioning back to this binary.
//!
//! The workflow always launches `<interpreter> <entry> --workspace <root>`.
//! When no external entry point is configured, the entry is a generated
//! script that re-invokes `venv-setup provision` with the interpreter it was
//! started by, so the chosen interpreter still builds the environment.

use std::path::{Path, PathBuf};

use anyhow::Result;
use log::debug;

pub const SHIM_FILE_NAME: &str = "provision_venv.py";

/// Directory the shim is written to.
pub fn default_shim_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from("/tmp"))
        .join("venv-setup")
}

/// Source of a shim that runs `program provision`.
pub fn shim_source(program: &Path) -> Result<String> {
    // A JSON string literal is also a valid Python string literal.
    let literal = serde_json::to_string(&program.to_string_lossy())?;
    Ok(format!(
        r#"# Generated by venv-setup; rewritten on every run.
import subprocess
import sys

VENV_SETUP = {literal}

sys.exit(subprocess.call([VENV_SETUP, "provision", "--python", sys.executable, *sys.argv[1:]]))
"#
    ))
}

/// Write the shim for `program` into `dir`, returning its path.
///
/// The file is only rewritten when its contents changed.
pub fn write_shim(dir: &Path, program: &Path) -> Result<PathBuf> {
    let path = dir.join(SHIM_FILE_NAME);
    let source = shim_source(program)?;

    if std::fs::read_to_string(&path).ok().as_deref() == Some(source.as_str()) {
        debug!("[shim] Up to date at {:?}", path);
        return Ok(path);
    }

    std::fs::create_dir_all(dir)?;
    std::fs::write(&path, source)?;
    debug!("[shim] Wrote {:?}", path);
    Ok(path)
}
