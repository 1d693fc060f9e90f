//! Launching the provisioning process.

use async_trait::async_trait;
use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, BufReader};

/// Flag that introduces the workspace root on the provisioning command line.
pub const WORKSPACE_FLAG: &str = "--workspace";

/// A fully described child process invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessSpec {
    pub program: PathBuf,
    pub args: Vec<OsString>,
    pub env: Vec<(String, String)>,
}

impl ProcessSpec {
    /// `<interpreter> <entry> --workspace <root>` with UTF-8 mode forced on.
    pub fn provisioning(interpreter: &Path, entry: &Path, workspace: &Path) -> Self {
        Self {
            program: interpreter.to_path_buf(),
            args: vec![
                entry.as_os_str().to_os_string(),
                OsString::from(WORKSPACE_FLAG),
                workspace.as_os_str().to_os_string(),
            ],
            env: vec![("PYTHONUTF8".to_string(), "1".to_string())],
        }
    }
}

/// Captured result of a finished process.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessOutput {
    /// Exit code, `None` when terminated by a signal.
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
    /// Both streams interleaved line by line in the order the lines arrived.
    pub combined: String,
}

impl ProcessOutput {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

/// Runs a process to completion.
///
/// An `Err` means the process could not be launched at all; a process that
/// ran and failed is reported through [`ProcessOutput::code`].
#[async_trait]
pub trait ProcessRunner: Send + Sync {
    async fn run(&self, spec: &ProcessSpec) -> io::Result<ProcessOutput>;
}

/// Runs processes with `tokio::process`.
///
/// There is no timeout; the caller waits until the child exits.
pub struct TokioRunner;

#[async_trait]
impl ProcessRunner for TokioRunner {
    async fn run(&self, spec: &ProcessSpec) -> io::Result<ProcessOutput> {
        let mut child = tokio::process::Command::new(&spec.program)
            .args(&spec.args)
            .envs(spec.env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| io::Error::other("child stdout was not captured"))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| io::Error::other("child stderr was not captured"))?;
        let mut stdout = BufReader::new(stdout);
        let mut stderr = BufReader::new(stderr);

        let mut captured = CapturedStreams::default();
        let mut out_line = Vec::new();
        let mut err_line = Vec::new();
        let mut out_open = true;
        let mut err_open = true;

        // Partial lines stay in their buffer until the newline (or EOF)
        // arrives, so a line is never split across the other stream.
        while out_open || err_open {
            tokio::select! {
                read = stdout.read_until(b'\n', &mut out_line), if out_open => {
                    if read? == 0 {
                        out_open = false;
                    } else {
                        captured.push_stdout(&out_line);
                        out_line.clear();
                    }
                }
                read = stderr.read_until(b'\n', &mut err_line), if err_open => {
                    if read? == 0 {
                        err_open = false;
                    } else {
                        captured.push_stderr(&err_line);
                        err_line.clear();
                    }
                }
            }
        }

        let status = child.wait().await?;
        Ok(captured.finish(status.code()))
    }
}

#[derive(Default)]
struct CapturedStreams {
    stdout: Vec<u8>,
    stderr: Vec<u8>,
    combined: Vec<u8>,
}

impl CapturedStreams {
    fn push_stdout(&mut self, line: &[u8]) {
        self.stdout.extend_from_slice(line);
        self.combined.extend_from_slice(line);
    }

    fn push_stderr(&mut self, line: &[u8]) {
        self.stderr.extend_from_slice(line);
        self.combined.extend_from_slice(line);
    }

    fn finish(self, code: Option<i32>) -> ProcessOutput {
        ProcessOutput {
            code,
            stdout: String::from_utf8_lossy(&self.stdout).to_string(),
            stderr: String::from_utf8_lossy(&self.stderr).to_string(),
            combined: String::from_utf8_lossy(&self.combined).to_string(),
        }
    }
}
