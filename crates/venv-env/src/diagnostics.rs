//! Append-only diagnostic log shared by every workflow run in a process.
//!
//! Raw provisioning output lands here so users can see why a run failed.
//! The log is created once at process start and handed to each workflow as
//! an `Arc<dyn DiagnosticLog>`; concurrent runs append without ordering
//! guarantees between each other.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, OnceLock};

/// Sink for human-readable diagnostics.
pub trait DiagnosticLog: Send + Sync {
    /// Append text verbatim.
    fn append(&self, text: &str);

    /// Bring the log into view.
    fn show(&self);
}

/// Diagnostic log backed by a file.
///
/// The file is opened lazily on the first append and kept open for the
/// lifetime of the value. Everything appended by this process is also kept
/// in memory so [`DiagnosticLog::show`] can print it.
pub struct FileLog {
    path: PathBuf,
    file: OnceLock<Option<Mutex<File>>>,
    session: Mutex<String>,
}

impl FileLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            file: OnceLock::new(),
            session: Mutex::new(String::new()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Everything appended through this handle so far.
    pub fn contents(&self) -> String {
        match self.session.lock() {
            Ok(session) => session.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    fn file(&self) -> Option<&Mutex<File>> {
        self.file
            .get_or_init(|| match open_log_file(&self.path) {
                Ok(file) => {
                    log::debug!("[diagnostics] Writing log to {:?}", self.path);
                    Some(Mutex::new(file))
                }
                Err(e) => {
                    log::warn!(
                        "[diagnostics] Could not open log file {:?}: {}",
                        self.path,
                        e
                    );
                    None
                }
            })
            .as_ref()
    }
}

fn open_log_file(path: &Path) -> std::io::Result<File> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    writeln!(
        file,
        "--- session started {} ---",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    )?;
    Ok(file)
}

impl DiagnosticLog for FileLog {
    fn append(&self, text: &str) {
        if text.is_empty() {
            return;
        }

        match self.session.lock() {
            Ok(mut session) => session.push_str(text),
            Err(poisoned) => poisoned.into_inner().push_str(text),
        }

        if let Some(file) = self.file() {
            let mut file = match file.lock() {
                Ok(file) => file,
                Err(poisoned) => poisoned.into_inner(),
            };
            if let Err(e) = file.write_all(text.as_bytes()) {
                log::warn!("[diagnostics] Failed to write log: {}", e);
            }
        }
    }

    fn show(&self) {
        eprintln!("----- output ({}) -----", self.path.display());
        eprint!("{}", self.contents());
        eprintln!("-----");
    }
}
