//! In-memory collaborators for driving the workflow in tests.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use venv_env::{
    DiagnosticLog, EnvironmentKind, Host, InterpreterDetails, InterpreterLocation,
    InterpreterProvider, PickItem, ProcessOutput, ProcessRunner, ProcessSpec, ProgressHandler,
    Severity, WorkflowPhase,
};

/// Provider backed by maps, recording every mutation.
#[derive(Default)]
pub struct FakeProvider {
    pub active: Mutex<Option<InterpreterLocation>>,
    pub details: Mutex<HashMap<PathBuf, InterpreterDetails>>,
    pub paths: Mutex<Option<Vec<InterpreterLocation>>>,
    pub set_calls: Mutex<Vec<(PathBuf, Option<PathBuf>)>>,
    pub fail_set: AtomicBool,
}

impl FakeProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an interpreter that shows up in `environment_paths`.
    pub fn with_interpreter(self, path: &str, version: &str, kind: EnvironmentKind) -> Self {
        let details = InterpreterDetails::new(path, version, vec![kind]);
        self.details
            .lock()
            .unwrap()
            .insert(PathBuf::from(path), details);
        self.paths
            .lock()
            .unwrap()
            .get_or_insert_with(Vec::new)
            .push(InterpreterLocation::interpreter(path));
        self
    }

    pub fn with_folder(self, path: &str) -> Self {
        self.paths
            .lock()
            .unwrap()
            .get_or_insert_with(Vec::new)
            .push(InterpreterLocation::folder(path));
        self
    }

    pub fn with_active(self, location: InterpreterLocation) -> Self {
        *self.active.lock().unwrap() = Some(location);
        self
    }

    pub fn set_calls(&self) -> Vec<(PathBuf, Option<PathBuf>)> {
        self.set_calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl InterpreterProvider for FakeProvider {
    async fn active_environment_path(
        &self,
        _resource: Option<&Path>,
    ) -> Option<InterpreterLocation> {
        self.active.lock().unwrap().clone()
    }

    async fn environment_details(&self, path: &Path) -> Option<InterpreterDetails> {
        self.details.lock().unwrap().get(path).cloned()
    }

    async fn environment_paths(&self) -> Option<Vec<InterpreterLocation>> {
        self.paths.lock().unwrap().clone()
    }

    async fn set_active_environment(
        &self,
        path: &Path,
        resource: Option<&Path>,
    ) -> anyhow::Result<()> {
        if self.fail_set.load(Ordering::SeqCst) {
            anyhow::bail!("provider went away");
        }
        self.set_calls
            .lock()
            .unwrap()
            .push((path.to_path_buf(), resource.map(Path::to_path_buf)));
        *self.active.lock().unwrap() = Some(InterpreterLocation::interpreter(path));
        Ok(())
    }
}

/// Host that replays scripted answers and records what it was shown.
#[derive(Default)]
pub struct ScriptedHost {
    pub folders: Vec<PathBuf>,
    pub button_answers: Mutex<VecDeque<Option<String>>>,
    pub pick_answers: Mutex<VecDeque<Option<usize>>>,
    pub messages: Mutex<Vec<(Severity, String, Vec<String>)>>,
    pub picks_offered: Mutex<Vec<Vec<PickItem>>>,
    pub phases: Mutex<Vec<WorkflowPhase>>,
}

impl ScriptedHost {
    pub fn new(folders: Vec<PathBuf>) -> Self {
        Self {
            folders,
            ..Default::default()
        }
    }

    /// Queue the label of the next button press (`None` dismisses).
    pub fn answer(self, button: Option<&str>) -> Self {
        self.button_answers
            .lock()
            .unwrap()
            .push_back(button.map(str::to_string));
        self
    }

    /// Queue the index of the next list pick (`None` dismisses).
    pub fn pick(self, index: Option<usize>) -> Self {
        self.pick_answers.lock().unwrap().push_back(index);
        self
    }

    pub fn messages(&self) -> Vec<(Severity, String, Vec<String>)> {
        self.messages.lock().unwrap().clone()
    }

    pub fn errors(&self) -> Vec<String> {
        self.messages()
            .into_iter()
            .filter(|(severity, _, _)| *severity == Severity::Error)
            .map(|(_, message, _)| message)
            .collect()
    }

    pub fn labels(&self) -> Vec<String> {
        self.phases
            .lock()
            .unwrap()
            .iter()
            .map(WorkflowPhase::label)
            .collect()
    }
}

impl ProgressHandler for ScriptedHost {
    fn on_progress(&self, phase: WorkflowPhase) {
        self.phases.lock().unwrap().push(phase);
    }
}

#[async_trait]
impl Host for ScriptedHost {
    fn workspace_folders(&self) -> Vec<PathBuf> {
        self.folders.clone()
    }

    async fn show_message(
        &self,
        severity: Severity,
        message: &str,
        buttons: &[&str],
    ) -> Option<String> {
        self.messages.lock().unwrap().push((
            severity,
            message.to_string(),
            buttons.iter().map(|b| b.to_string()).collect(),
        ));
        if buttons.is_empty() {
            return None;
        }
        self.button_answers.lock().unwrap().pop_front().flatten()
    }

    async fn pick_one(&self, _placeholder: &str, items: Vec<PickItem>) -> Option<PickItem> {
        self.picks_offered.lock().unwrap().push(items.clone());
        let index = self.pick_answers.lock().unwrap().pop_front().flatten()?;
        items.get(index).cloned()
    }
}

/// Diagnostic log kept in memory.
#[derive(Default)]
pub struct MemoryLog {
    pub text: Mutex<String>,
    pub shown: AtomicBool,
}

impl MemoryLog {
    pub fn text(&self) -> String {
        self.text.lock().unwrap().clone()
    }

    pub fn was_shown(&self) -> bool {
        self.shown.load(Ordering::SeqCst)
    }
}

impl DiagnosticLog for MemoryLog {
    fn append(&self, text: &str) {
        self.text.lock().unwrap().push_str(text);
    }

    fn show(&self) {
        self.shown.store(true, Ordering::SeqCst);
    }
}

/// Runner returning a canned result and recording each invocation.
pub struct FakeRunner {
    pub result: Mutex<Option<io::Result<ProcessOutput>>>,
    pub calls: Mutex<Vec<ProcessSpec>>,
}

impl FakeRunner {
    pub fn succeeding(stdout: &str) -> Self {
        Self::with_result(Ok(ProcessOutput {
            code: Some(0),
            stdout: stdout.to_string(),
            stderr: String::new(),
            combined: stdout.to_string(),
        }))
    }

    pub fn exiting(code: i32, stdout: &str, stderr: &str) -> Self {
        Self::with_result(Ok(ProcessOutput {
            code: Some(code),
            stdout: stdout.to_string(),
            stderr: stderr.to_string(),
            combined: format!("{stdout}{stderr}"),
        }))
    }

    pub fn with_result(result: io::Result<ProcessOutput>) -> Self {
        Self {
            result: Mutex::new(Some(result)),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<ProcessSpec> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ProcessRunner for FakeRunner {
    async fn run(&self, spec: &ProcessSpec) -> io::Result<ProcessOutput> {
        self.calls.lock().unwrap().push(spec.clone());
        self.result
            .lock()
            .unwrap()
            .take()
            .unwrap_or_else(|| Err(io::Error::other("runner already used")))
    }
}
