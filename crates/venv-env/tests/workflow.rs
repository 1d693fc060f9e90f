//! End-to-end runs of the environment creation workflow against fakes.

mod common;

use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::Ordering;
use std::sync::Arc;

use common::{FakeProvider, FakeRunner, MemoryLog, ScriptedHost};
use venv_env::resolver::{CANCEL, USE_NEWEST};
use venv_env::venv::VENV_DIR;
use venv_env::workflow::USE_EXISTING;
use venv_env::{
    venv_executable, EnvironmentCreationWorkflow, EnvironmentKind, InterpreterLocation,
    ProcessOutput, ProvisioningResult, Severity, WorkflowError, WorkflowOutcome,
};

const ENTRY: &str = "/opt/provisioner/__main__.py";
const SYSTEM_PYTHON: &str = "/usr/bin/python3";

struct Harness {
    provider: Arc<FakeProvider>,
    host: Arc<ScriptedHost>,
    log: Arc<MemoryLog>,
    runner: Arc<FakeRunner>,
}

impl Harness {
    fn new(provider: FakeProvider, host: ScriptedHost, runner: FakeRunner) -> Self {
        Self {
            provider: Arc::new(provider),
            host: Arc::new(host),
            log: Arc::new(MemoryLog::default()),
            runner: Arc::new(runner),
        }
    }

    async fn run(&self) -> WorkflowOutcome {
        let workflow = EnvironmentCreationWorkflow::new(
            self.provider.clone(),
            self.host.clone(),
            self.log.clone(),
            self.runner.clone(),
            ENTRY,
        );
        workflow.run().await
    }
}

fn global_provider() -> FakeProvider {
    FakeProvider::new()
        .with_interpreter(SYSTEM_PYTHON, "3.11.4", EnvironmentKind::System)
        .with_active(InterpreterLocation::interpreter(SYSTEM_PYTHON))
}

fn created_result(workspace: &Path) -> ProvisioningResult {
    ProvisioningResult {
        executable: venv_executable(&workspace.join(VENV_DIR)),
        requirements_file: None,
    }
}

fn success_output(result: &ProvisioningResult) -> String {
    format!(
        "Creating virtual environment...\n{}Finished\n",
        result.to_tagged_block().unwrap()
    )
}

fn make_usable_venv(workspace: &Path) -> PathBuf {
    let python_path = venv_executable(&workspace.join(VENV_DIR));
    std::fs::create_dir_all(python_path.parent().unwrap()).unwrap();
    std::fs::write(&python_path, "").unwrap();
    python_path
}

#[tokio::test]
async fn test_creates_environment_with_global_active_interpreter() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().to_path_buf();
    let expected = created_result(&root);

    let harness = Harness::new(
        global_provider(),
        ScriptedHost::new(vec![root.clone()]),
        FakeRunner::succeeding(&success_output(&expected)),
    );

    let outcome = harness.run().await;
    assert_eq!(outcome, WorkflowOutcome::Created(expected.clone()));
    assert_eq!(outcome.exit_code(), 0);

    let calls = harness.runner.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].program, PathBuf::from(SYSTEM_PYTHON));
    assert_eq!(
        calls[0].args,
        vec![
            OsString::from(ENTRY),
            OsString::from("--workspace"),
            root.clone().into_os_string()
        ]
    );
    assert!(calls[0]
        .env
        .contains(&("PYTHONUTF8".to_string(), "1".to_string())));

    assert_eq!(
        harness.provider.set_calls(),
        vec![(expected.executable.clone(), Some(root.clone()))]
    );

    let log = harness.log.text();
    assert!(log.contains("Creating virtual environment..."));
    assert!(log.contains("<JSON>"));
    assert!(log.contains(&format!(
        "active interpreter is now {}",
        expected.executable.display()
    )));
    assert!(!harness.log.was_shown());
    assert!(harness.host.errors().is_empty());
}

#[tokio::test]
async fn test_progress_labels_follow_steps() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().to_path_buf();
    let expected = created_result(&root);

    let harness = Harness::new(
        global_provider(),
        ScriptedHost::new(vec![root.clone()]),
        FakeRunner::succeeding(&success_output(&expected)),
    );
    harness.run().await;

    let labels = harness.host.labels();
    assert_eq!(
        &labels[..7],
        &[
            "Starting",
            "Getting workspace",
            "Checking for virtual environment",
            "Getting Python interpreter",
            "Creating virtual environment",
            "Parsing output",
            "Setting interpreter",
        ]
    );
    assert!(labels[7].starts_with("Ready: "));
}

#[tokio::test]
async fn test_uses_first_workspace_folder() {
    let first = tempfile::tempdir().unwrap();
    let second = tempfile::tempdir().unwrap();
    let expected = created_result(first.path());

    let harness = Harness::new(
        global_provider(),
        ScriptedHost::new(vec![first.path().to_path_buf(), second.path().to_path_buf()]),
        FakeRunner::succeeding(&success_output(&expected)),
    );
    harness.run().await;

    let calls = harness.runner.calls();
    assert_eq!(calls[0].args[2], first.path().as_os_str());
}

#[tokio::test]
async fn test_adopts_existing_venv() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().to_path_buf();
    let python_path = make_usable_venv(&root);

    let harness = Harness::new(
        global_provider(),
        ScriptedHost::new(vec![root.clone()]).answer(Some(USE_EXISTING)),
        FakeRunner::succeeding(""),
    );

    let outcome = harness.run().await;
    assert_eq!(outcome, WorkflowOutcome::Adopted(python_path.clone()));

    let messages = harness.host.messages();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].0, Severity::Warning);
    assert_eq!(messages[0].2, vec![USE_EXISTING, CANCEL]);

    assert_eq!(
        harness.provider.set_calls(),
        vec![(python_path, Some(root))]
    );
    assert!(harness.runner.calls().is_empty());
}

#[tokio::test]
async fn test_declining_existing_venv_changes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().to_path_buf();
    make_usable_venv(&root);

    let harness = Harness::new(
        global_provider(),
        ScriptedHost::new(vec![root]).answer(Some(CANCEL)),
        FakeRunner::succeeding(""),
    );

    assert_eq!(harness.run().await, WorkflowOutcome::Cancelled);
    assert!(harness.provider.set_calls().is_empty());
    assert!(harness.runner.calls().is_empty());
    assert!(harness.host.errors().is_empty());
}

#[tokio::test]
async fn test_conflicting_venv_fails_without_offer() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().to_path_buf();
    std::fs::create_dir_all(root.join(VENV_DIR).join("lib")).unwrap();

    let harness = Harness::new(
        global_provider(),
        ScriptedHost::new(vec![root.clone()]),
        FakeRunner::succeeding(""),
    );

    let outcome = harness.run().await;
    assert_eq!(
        outcome,
        WorkflowOutcome::Failed(WorkflowError::ConflictingVenvExists(root.join(VENV_DIR)))
    );

    let messages = harness.host.messages();
    assert_eq!(messages.len(), 1, "only the error is shown");
    assert_eq!(messages[0].0, Severity::Error);
    assert!(harness.runner.calls().is_empty());
    assert!(harness.provider.set_calls().is_empty());
}

#[tokio::test]
async fn test_no_workspace() {
    let harness = Harness::new(
        global_provider(),
        ScriptedHost::new(vec![]),
        FakeRunner::succeeding(""),
    );

    let outcome = harness.run().await;
    assert_eq!(outcome, WorkflowOutcome::Failed(WorkflowError::NoWorkspace));
    assert_eq!(outcome.exit_code(), 1);
    assert_eq!(harness.host.errors(), vec!["No workspace folder is open"]);
}

#[tokio::test]
async fn test_cancel_when_no_interpreter_selected() {
    let dir = tempfile::tempdir().unwrap();

    let harness = Harness::new(
        FakeProvider::new().with_interpreter(SYSTEM_PYTHON, "3.11.4", EnvironmentKind::System),
        ScriptedHost::new(vec![dir.path().to_path_buf()]).answer(Some(CANCEL)),
        FakeRunner::succeeding(""),
    );

    let outcome = harness.run().await;
    assert_eq!(outcome, WorkflowOutcome::Cancelled);
    assert!(harness.provider.set_calls().is_empty());
    assert!(harness.runner.calls().is_empty());
    assert!(harness.host.errors().is_empty());

    let messages = harness.host.messages();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].1, "No Python interpreter is selected");
}

#[tokio::test]
async fn test_newest_global_interpreter_is_used() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().to_path_buf();
    let expected = created_result(&root);

    let provider = FakeProvider::new()
        .with_interpreter("/usr/bin/python3.10", "3.10.12", EnvironmentKind::System)
        .with_interpreter("/home/u/.pyenv/bin/python3.12", "3.12.1", EnvironmentKind::Pyenv)
        .with_interpreter("/home/u/other/.venv/bin/python", "3.13.0", EnvironmentKind::Venv)
        .with_folder("/home/u/broken-env");

    let harness = Harness::new(
        provider,
        ScriptedHost::new(vec![root.clone()]).answer(Some(USE_NEWEST)),
        FakeRunner::succeeding(&success_output(&expected)),
    );

    assert_eq!(harness.run().await, WorkflowOutcome::Created(expected));
    assert_eq!(
        harness.runner.calls()[0].program,
        PathBuf::from("/home/u/.pyenv/bin/python3.12")
    );
}

#[tokio::test]
async fn test_no_global_interpreters_found() {
    let dir = tempfile::tempdir().unwrap();

    let provider = FakeProvider::new().with_interpreter(
        "/home/u/other/.venv/bin/python",
        "3.13.0",
        EnvironmentKind::Venv,
    );
    let harness = Harness::new(
        provider,
        ScriptedHost::new(vec![dir.path().to_path_buf()]).answer(Some(USE_NEWEST)),
        FakeRunner::succeeding(""),
    );

    assert_eq!(
        harness.run().await,
        WorkflowOutcome::Failed(WorkflowError::NoInterpretersFound)
    );
    assert_eq!(harness.host.errors().len(), 1);
    assert!(harness.runner.calls().is_empty());
}

#[tokio::test]
async fn test_nonzero_exit_shows_log() {
    let dir = tempfile::tempdir().unwrap();

    let harness = Harness::new(
        global_provider(),
        ScriptedHost::new(vec![dir.path().to_path_buf()]),
        FakeRunner::exiting(1, "partial output\n", "Error: ensurepip is not available\n"),
    );

    let outcome = harness.run().await;
    assert_eq!(
        outcome,
        WorkflowOutcome::Failed(WorkflowError::SubprocessNonzeroExit { code: Some(1) })
    );
    assert!(harness.log.was_shown());
    assert!(harness.log.text().contains("ensurepip is not available"));
    assert!(harness.log.text().contains("partial output"));
    assert_eq!(harness.host.errors().len(), 1);
    assert!(harness.provider.set_calls().is_empty());
}

#[tokio::test]
async fn test_log_keeps_interleaved_output_order() {
    let dir = tempfile::tempdir().unwrap();
    let interleaved = "Creating venv\nWARNING: pip is outdated\nInstalling requirements\nERROR: no matching distribution\n";

    let harness = Harness::new(
        global_provider(),
        ScriptedHost::new(vec![dir.path().to_path_buf()]),
        FakeRunner::with_result(Ok(ProcessOutput {
            code: Some(1),
            stdout: "Creating venv\nInstalling requirements\n".to_string(),
            stderr: "WARNING: pip is outdated\nERROR: no matching distribution\n".to_string(),
            combined: interleaved.to_string(),
        })),
    );

    let outcome = harness.run().await;
    assert_eq!(
        outcome,
        WorkflowOutcome::Failed(WorkflowError::SubprocessNonzeroExit { code: Some(1) })
    );
    assert!(harness.log.was_shown());
    assert!(harness.log.text().contains(interleaved));
}

#[tokio::test]
async fn test_nonzero_exit_ignores_valid_output() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().to_path_buf();
    let output = success_output(&created_result(&root));

    let harness = Harness::new(
        global_provider(),
        ScriptedHost::new(vec![root]),
        FakeRunner::exiting(2, &output, ""),
    );

    assert_eq!(
        harness.run().await,
        WorkflowOutcome::Failed(WorkflowError::SubprocessNonzeroExit { code: Some(2) })
    );
    assert!(harness.provider.set_calls().is_empty());
}

#[tokio::test]
async fn test_missing_structured_output_shows_log() {
    let dir = tempfile::tempdir().unwrap();

    let harness = Harness::new(
        global_provider(),
        ScriptedHost::new(vec![dir.path().to_path_buf()]),
        FakeRunner::succeeding("all done, no block here\n"),
    );

    assert_eq!(
        harness.run().await,
        WorkflowOutcome::Failed(WorkflowError::MissingStructuredOutput)
    );
    assert!(harness.log.was_shown());
    assert_eq!(harness.host.errors().len(), 1);
    assert!(harness.provider.set_calls().is_empty());
}

#[tokio::test]
async fn test_launch_failure_reports_category() {
    let dir = tempfile::tempdir().unwrap();

    let harness = Harness::new(
        global_provider(),
        ScriptedHost::new(vec![dir.path().to_path_buf()]),
        FakeRunner::with_result(Err(io::Error::new(
            io::ErrorKind::PermissionDenied,
            "permission denied",
        ))),
    );

    let (program, kind) = match harness.run().await {
        WorkflowOutcome::Failed(WorkflowError::SubprocessLaunchFailed { program, kind, .. }) => {
            (program, kind)
        }
        other => panic!("expected a launch failure, got {other:?}"),
    };
    assert_eq!(program, PathBuf::from(SYSTEM_PYTHON));
    assert_eq!(kind, io::ErrorKind::PermissionDenied);

    let errors = harness.host.errors();
    assert_eq!(errors.len(), 1);
    assert!(errors[0].contains("permission denied"));
    assert!(!harness.log.was_shown());
}

#[tokio::test]
async fn test_registration_failure() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().to_path_buf();
    let expected = created_result(&root);

    let provider = global_provider();
    provider.fail_set.store(true, Ordering::SeqCst);
    let harness = Harness::new(
        provider,
        ScriptedHost::new(vec![root]),
        FakeRunner::succeeding(&success_output(&expected)),
    );

    assert_eq!(
        harness.run().await,
        WorkflowOutcome::Failed(WorkflowError::ProviderUnavailable)
    );
    assert_eq!(harness.host.errors().len(), 1);
}

#[tokio::test]
async fn test_report_provider_unavailable() {
    let host = ScriptedHost::new(vec![]);

    let outcome = EnvironmentCreationWorkflow::report_provider_unavailable(&host).await;
    assert_eq!(
        outcome,
        WorkflowOutcome::Failed(WorkflowError::ProviderUnavailable)
    );
    assert_eq!(
        host.errors(),
        vec!["The Python interpreter provider is unavailable"]
    );
}
