//! Interpreter provider backed by the local filesystem.
//!
//! Interpreters are discovered by scanning `PATH` (plus any configured
//! extra directories) and probed by running them. The active selection is
//! remembered per workspace in a small JSON state file.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::{Component, Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use anyhow::{bail, Result};
use async_trait::async_trait;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use venv_env::venv::VENV_DIR;
use venv_env::{
    venv_executable, EnvironmentKind, InterpreterDetails, InterpreterLocation,
    InterpreterProvider,
};

/// Upper bound on how long a single interpreter probe may take.
const PROBE_TIMEOUT: Duration = Duration::from_secs(10);

/// State file key for selections made outside any workspace.
const GLOBAL_KEY: &str = "*";

const PROBE_SCRIPT: &str = r#"import json, sys
print(json.dumps({
    "version": [str(part) for part in sys.version_info[:3]],
    "prefix": sys.prefix,
    "base_prefix": getattr(sys, "base_prefix", sys.prefix),
}))"#;

/// What the probe script reports about an interpreter.
#[derive(Debug, Clone, Deserialize)]
struct ProbeReport {
    version: Vec<String>,
    prefix: PathBuf,
    base_prefix: PathBuf,
}

/// Persisted active selections, keyed by workspace root.
#[derive(Debug, Default, Serialize, Deserialize)]
struct ActiveSelections {
    #[serde(default)]
    selections: BTreeMap<String, PathBuf>,
}

/// Whether a file name looks like a CPython launcher we can probe:
/// `python`, `python3` or `python3.N`, plus the `py` launcher on Windows.
pub fn is_interpreter_name(name: &str) -> bool {
    interpreter_name_matches(name, cfg!(windows))
}

/// Name matching for either platform. Windows names need the `.exe`
/// extension and compare case-insensitively.
fn interpreter_name_matches(name: &str, windows: bool) -> bool {
    let stem = if windows {
        let lower = name.to_ascii_lowercase();
        match lower.strip_suffix(".exe") {
            Some("py") => return true,
            Some(stem) => stem.to_string(),
            None => return false,
        }
    } else {
        name.to_string()
    };

    match stem.as_str() {
        "python" | "python3" => true,
        _ => stem
            .strip_prefix("python3.")
            .is_some_and(|minor| !minor.is_empty() && minor.chars().all(|c| c.is_ascii_digit())),
    }
}

/// Directories to search: every `PATH` entry followed by `extra`.
pub fn path_search_dirs(extra: &[PathBuf]) -> Vec<PathBuf> {
    let mut dirs: Vec<PathBuf> = std::env::var_os("PATH")
        .map(|path| std::env::split_paths(&path).collect())
        .unwrap_or_default();
    dirs.extend(extra.iter().cloned());
    dirs
}

fn classify(interpreter: &Path, report: &ProbeReport) -> EnvironmentKind {
    if report.prefix != report.base_prefix {
        return EnvironmentKind::Venv;
    }

    let has_component = |needle: &str| {
        interpreter
            .components()
            .any(|c| matches!(c, Component::Normal(part) if part == needle))
    };
    if has_component(".pyenv") {
        EnvironmentKind::Pyenv
    } else if has_component("WindowsApps") {
        EnvironmentKind::WindowsStore
    } else {
        EnvironmentKind::System
    }
}

fn selection_key(resource: Option<&Path>) -> String {
    resource
        .map(|path| path.to_string_lossy().to_string())
        .unwrap_or_else(|| GLOBAL_KEY.to_string())
}

/// [`InterpreterProvider`] for the command-line front end.
pub struct LocalProvider {
    search_dirs: Vec<PathBuf>,
    state_path: PathBuf,
    workspace: Option<PathBuf>,
    probed: Mutex<HashMap<PathBuf, Option<InterpreterDetails>>>,
}

impl LocalProvider {
    pub fn new(search_dirs: Vec<PathBuf>, state_path: PathBuf, workspace: Option<PathBuf>) -> Self {
        Self {
            search_dirs,
            state_path,
            workspace,
            probed: Mutex::new(HashMap::new()),
        }
    }

    /// Create a provider, failing when not a single interpreter can be
    /// probed in the search directories.
    pub async fn connect(
        search_dirs: Vec<PathBuf>,
        state_path: PathBuf,
        workspace: Option<PathBuf>,
    ) -> Result<Self> {
        let provider = Self::new(search_dirs, state_path, workspace);
        for candidate in provider.discover().await {
            if provider.environment_details(&candidate).await.is_some() {
                info!("[provider] Connected; first usable interpreter {:?}", candidate);
                return Ok(provider);
            }
        }
        bail!(
            "No working Python interpreter found in {} search directories",
            provider.search_dirs.len()
        )
    }

    /// Interpreter binaries in the search directories, in search order.
    ///
    /// Directories reached through different symlinked paths are scanned
    /// once. Names in one directory that resolve to the same file (such as
    /// `python3 -> python3.12`) are reported once, under the first name in
    /// sorted order. The same file linked from another directory is kept.
    pub async fn discover(&self) -> Vec<PathBuf> {
        let mut seen_dirs = HashSet::new();
        let mut found = Vec::new();

        for dir in &self.search_dirs {
            let Ok(canonical) = tokio::fs::canonicalize(dir).await else {
                continue;
            };
            if !seen_dirs.insert(canonical) {
                continue;
            }
            let Ok(mut entries) = tokio::fs::read_dir(dir).await else {
                continue;
            };

            let mut names = Vec::new();
            while let Ok(Some(entry)) = entries.next_entry().await {
                let name = entry.file_name().to_string_lossy().to_string();
                if !is_interpreter_name(&name) {
                    continue;
                }
                // Follows symlinks, so dangling links are skipped.
                if tokio::fs::metadata(entry.path())
                    .await
                    .is_ok_and(|meta| meta.is_file())
                {
                    names.push(name);
                }
            }
            names.sort();

            let mut seen_files = HashSet::new();
            for name in names {
                let path = dir.join(&name);
                let target = tokio::fs::canonicalize(&path).await.unwrap_or_else(|_| path.clone());
                if seen_files.insert(target) {
                    found.push(path);
                } else {
                    debug!("[provider] Skipping {:?}, an alias of an earlier name", path);
                }
            }
        }

        debug!("[provider] Discovered {} interpreters", found.len());
        found
    }

    async fn probe(&self, interpreter: &Path) -> Option<InterpreterDetails> {
        let mut cmd = tokio::process::Command::new(interpreter);
        cmd.arg("-c")
            .arg(PROBE_SCRIPT)
            .env("PYTHONUTF8", "1")
            .stdin(Stdio::null())
            .kill_on_drop(true);

        let output = match tokio::time::timeout(PROBE_TIMEOUT, cmd.output()).await {
            Ok(Ok(output)) if output.status.success() => output,
            Ok(Ok(output)) => {
                debug!(
                    "[provider] Probe of {:?} exited with {}",
                    interpreter, output.status
                );
                return None;
            }
            Ok(Err(e)) => {
                debug!("[provider] Could not run {:?}: {}", interpreter, e);
                return None;
            }
            Err(_) => {
                warn!("[provider] Probe of {:?} timed out", interpreter);
                return None;
            }
        };

        let stdout = String::from_utf8_lossy(&output.stdout);
        let report: ProbeReport = match serde_json::from_str(stdout.trim()) {
            Ok(report) => report,
            Err(e) => {
                debug!("[provider] Unexpected probe output from {:?}: {}", interpreter, e);
                return None;
            }
        };

        let kind = classify(interpreter, &report);
        let mut metadata = serde_json::Map::new();
        metadata.insert(
            "sysPrefix".to_string(),
            serde_json::Value::String(report.prefix.to_string_lossy().to_string()),
        );

        Some(InterpreterDetails {
            interpreter_path: interpreter.to_path_buf(),
            env_folder_path: (kind == EnvironmentKind::Venv).then(|| report.prefix.clone()),
            version: report.version,
            kinds: vec![kind],
            metadata,
        })
    }

    async fn load_selections(&self) -> ActiveSelections {
        match tokio::fs::read_to_string(&self.state_path).await {
            Ok(contents) => serde_json::from_str(&contents).unwrap_or_else(|e| {
                warn!("[provider] Ignoring invalid {:?}: {}", self.state_path, e);
                ActiveSelections::default()
            }),
            Err(_) => ActiveSelections::default(),
        }
    }
}

#[async_trait]
impl InterpreterProvider for LocalProvider {
    async fn active_environment_path(&self, resource: Option<&Path>) -> Option<InterpreterLocation> {
        let selections = self.load_selections().await;
        let path = selections
            .selections
            .get(&selection_key(resource))
            .or_else(|| selections.selections.get(GLOBAL_KEY))?
            .clone();

        if path.is_dir() {
            Some(InterpreterLocation::folder(path))
        } else {
            Some(InterpreterLocation::interpreter(path))
        }
    }

    async fn environment_details(&self, path: &Path) -> Option<InterpreterDetails> {
        if let Some(cached) = self.probed.lock().await.get(path) {
            return cached.clone();
        }
        let details = self.probe(path).await;
        self.probed
            .lock()
            .await
            .insert(path.to_path_buf(), details.clone());
        details
    }

    async fn environment_paths(&self) -> Option<Vec<InterpreterLocation>> {
        let mut locations: Vec<InterpreterLocation> = self
            .discover()
            .await
            .into_iter()
            .map(InterpreterLocation::interpreter)
            .collect();

        if let Some(workspace) = &self.workspace {
            let venv_path = workspace.join(VENV_DIR);
            let python_path = venv_executable(&venv_path);
            if python_path.is_file() {
                if !locations.iter().any(|l| l.path == python_path) {
                    locations.push(InterpreterLocation::interpreter(python_path));
                }
            } else if venv_path.is_dir() {
                locations.push(InterpreterLocation::folder(venv_path));
            }
        }

        Some(locations)
    }

    async fn set_active_environment(&self, path: &Path, resource: Option<&Path>) -> Result<()> {
        let mut selections = self.load_selections().await;
        selections
            .selections
            .insert(selection_key(resource), path.to_path_buf());

        if let Some(parent) = self.state_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&self.state_path, serde_json::to_string_pretty(&selections)?).await?;
        info!(
            "[provider] Active interpreter for {} is now {:?}",
            selection_key(resource),
            path
        );
        Ok(())
    }
}
