//! Interpreter records as reported by an interpreter provider.
//!
//! Also hosts the three pure helpers the resolver builds on: filtering
//! locations down to interpreter paths, classifying an interpreter as a
//! usable global base, and ordering interpreters newest-first.

use serde::{Deserialize, Serialize};
use std::cmp::{Ordering, Reverse};
use std::path::PathBuf;

/// Number of leading version components that take part in ordering.
const COMPARED_VERSION_COMPONENTS: usize = 4;

/// How an [`InterpreterLocation`] identifies its environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PathType {
    /// Path to the environment folder (virtual environments lacking an interpreter).
    #[serde(rename = "envFolderPath")]
    EnvFolderPath,
    /// Path to the interpreter binary itself.
    #[serde(rename = "interpreterPath")]
    InterpreterPath,
}

/// A path that uniquely identifies an environment known to the provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterpreterLocation {
    pub path: PathBuf,
    #[serde(rename = "pathType")]
    pub path_type: PathType,
}

impl InterpreterLocation {
    pub fn interpreter(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            path_type: PathType::InterpreterPath,
        }
    }

    pub fn folder(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            path_type: PathType::EnvFolderPath,
        }
    }
}

/// Kind tag attached to an interpreter by the provider.
///
/// Tags fall into a "global" family (installs that can seed new
/// environments) and a "virtual" family (environments derived from one).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EnvironmentKind {
    #[serde(rename = "unknown")]
    Unknown,
    #[serde(rename = "global-system")]
    System,
    #[serde(rename = "global-mac-default")]
    MacDefault,
    #[serde(rename = "global-windows-store")]
    WindowsStore,
    #[serde(rename = "global-pyenv")]
    Pyenv,
    #[serde(rename = "global-conda-base")]
    CondaBase,
    #[serde(rename = "global-poetry")]
    Poetry,
    #[serde(rename = "global-custom")]
    Custom,
    #[serde(rename = "global-other")]
    OtherGlobal,
    #[serde(rename = "virt-venv")]
    Venv,
    #[serde(rename = "virt-virtualenv")]
    VirtualEnv,
    #[serde(rename = "virt-virtualenvwrapper")]
    VirtualEnvWrapper,
    #[serde(rename = "virt-pipenv")]
    Pipenv,
    #[serde(rename = "virt-conda")]
    Conda,
    #[serde(rename = "virt-other")]
    OtherVirtual,
}

impl EnvironmentKind {
    /// Every kind the provider can report, in declaration order.
    pub const ALL: [EnvironmentKind; 15] = [
        EnvironmentKind::Unknown,
        EnvironmentKind::System,
        EnvironmentKind::MacDefault,
        EnvironmentKind::WindowsStore,
        EnvironmentKind::Pyenv,
        EnvironmentKind::CondaBase,
        EnvironmentKind::Poetry,
        EnvironmentKind::Custom,
        EnvironmentKind::OtherGlobal,
        EnvironmentKind::Venv,
        EnvironmentKind::VirtualEnv,
        EnvironmentKind::VirtualEnvWrapper,
        EnvironmentKind::Pipenv,
        EnvironmentKind::Conda,
        EnvironmentKind::OtherVirtual,
    ];

    /// Whether an interpreter of this kind may serve as the base for a new
    /// virtual environment.
    ///
    /// The macOS default install, conda's base environment and poetry's
    /// interpreters carry `global-*` tags but are not accepted.
    pub fn is_usable_global(self) -> bool {
        matches!(
            self,
            EnvironmentKind::System
                | EnvironmentKind::WindowsStore
                | EnvironmentKind::Pyenv
                | EnvironmentKind::Custom
                | EnvironmentKind::OtherGlobal
        )
    }
}

impl std::fmt::Display for EnvironmentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            EnvironmentKind::Unknown => "unknown",
            EnvironmentKind::System => "global-system",
            EnvironmentKind::MacDefault => "global-mac-default",
            EnvironmentKind::WindowsStore => "global-windows-store",
            EnvironmentKind::Pyenv => "global-pyenv",
            EnvironmentKind::CondaBase => "global-conda-base",
            EnvironmentKind::Poetry => "global-poetry",
            EnvironmentKind::Custom => "global-custom",
            EnvironmentKind::OtherGlobal => "global-other",
            EnvironmentKind::Venv => "virt-venv",
            EnvironmentKind::VirtualEnv => "virt-virtualenv",
            EnvironmentKind::VirtualEnvWrapper => "virt-virtualenvwrapper",
            EnvironmentKind::Pipenv => "virt-pipenv",
            EnvironmentKind::Conda => "virt-conda",
            EnvironmentKind::OtherVirtual => "virt-other",
        };
        f.write_str(name)
    }
}

/// Snapshot of one discovered interpreter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InterpreterDetails {
    pub interpreter_path: PathBuf,
    #[serde(default)]
    pub env_folder_path: Option<PathBuf>,
    /// Version components as reported, e.g. `["3", "10", "2"]`.
    #[serde(default)]
    pub version: Vec<String>,
    #[serde(default, rename = "environmentType")]
    pub kinds: Vec<EnvironmentKind>,
    #[serde(default)]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

impl InterpreterDetails {
    pub fn new(
        interpreter_path: impl Into<PathBuf>,
        version: &str,
        kinds: Vec<EnvironmentKind>,
    ) -> Self {
        Self {
            interpreter_path: interpreter_path.into(),
            env_folder_path: None,
            version: version.split('.').map(str::to_string).collect(),
            kinds,
            metadata: serde_json::Map::new(),
        }
    }

    /// `major.minor.patch` label used when listing interpreters.
    pub fn version_label(&self) -> String {
        let label = self
            .version
            .iter()
            .take(3)
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(".");
        if label.is_empty() {
            "unknown".to_string()
        } else {
            label
        }
    }
}

/// Keep only the locations that name an interpreter binary directly.
pub fn filter_by_path_type(locations: &[InterpreterLocation]) -> Vec<PathBuf> {
    locations
        .iter()
        .filter(|location| location.path_type == PathType::InterpreterPath)
        .map(|location| location.path.clone())
        .collect()
}

/// Whether the interpreter is a global install suitable for seeding a venv.
///
/// Missing details always classify as not global.
pub fn is_global(details: Option<&InterpreterDetails>) -> bool {
    details.is_some_and(|details| details.kinds.iter().any(|kind| kind.is_usable_global()))
}

/// Pairwise comparison placing the newer interpreter first.
///
/// Compares the first four version components numerically. A position
/// where either side is missing or not a number compares equal, so the
/// resulting "equal" is not transitive (`3.11` ties with both `3.11.2` and
/// `3.11.4`). Sort with [`newest_first_key`] instead of passing this to
/// `sort_by`.
pub fn compare_descending(a: &InterpreterDetails, b: &InterpreterDetails) -> Ordering {
    for index in 0..COMPARED_VERSION_COMPONENTS {
        let a_part = version_component(a, index);
        let b_part = version_component(b, index);
        if let (Some(a_part), Some(b_part)) = (a_part, b_part) {
            match b_part.cmp(&a_part) {
                Ordering::Equal => continue,
                decided => return decided,
            }
        }
    }
    Ordering::Equal
}

/// Total sort key placing the newest interpreter first.
///
/// Agrees with [`compare_descending`] whenever both versions have numeric
/// components in the compared positions. A missing or non-numeric
/// component sorts below any number, so `3.11.4` precedes `3.11`.
pub fn newest_first_key(
    details: &InterpreterDetails,
) -> Reverse<[Option<u64>; COMPARED_VERSION_COMPONENTS]> {
    Reverse(std::array::from_fn(|index| version_component(details, index)))
}

fn version_component(details: &InterpreterDetails, index: usize) -> Option<u64> {
    details.version.get(index)?.trim().parse().ok()
}
