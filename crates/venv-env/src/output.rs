//! Result block exchanged with the provisioning process.
//!
//! The provisioning process may print arbitrary diagnostics. The one thing
//! the workflow reads back is a JSON object framed by `<JSON>` and `</JSON>`
//! lines:
//!
//! ```text
//! Creating .venv ...
//! <JSON>
//! {"executable": "/work/.venv/bin/python", "requirementsFile": null}
//! </JSON>
//! ```

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub const JSON_START_TAG: &str = "<JSON>";
pub const JSON_END_TAG: &str = "</JSON>";

/// What the provisioning process reports on success.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProvisioningResult {
    /// Interpreter inside the newly created environment.
    pub executable: PathBuf,
    /// Requirements file that was installed, if any.
    pub requirements_file: Option<PathBuf>,
}

impl ProvisioningResult {
    /// Render the result as the tagged block the workflow parses.
    pub fn to_tagged_block(&self) -> Result<String, serde_json::Error> {
        let json = serde_json::to_string(self)?;
        Ok(format!("{JSON_START_TAG}\n{json}\n{JSON_END_TAG}\n"))
    }
}

/// Extract the [`ProvisioningResult`] embedded in process output.
///
/// Returns `None` when the tags are missing, the end tag never follows the
/// start tag, or the enclosed text is not a valid result object. Text
/// outside the block is ignored.
pub fn parse_output(output: &str) -> Option<ProvisioningResult> {
    let mut lines = output.lines().map(|line| line.trim_end_matches('\r'));

    lines.by_ref().find(|line| *line == JSON_START_TAG)?;

    let mut body = Vec::new();
    for line in lines {
        if line == JSON_END_TAG {
            return match serde_json::from_str(&body.join("\n")) {
                Ok(result) => Some(result),
                Err(e) => {
                    log::debug!("[output] Tagged block is not a provisioning result: {e}");
                    None
                }
            };
        }
        body.push(line);
    }

    log::debug!("[output] No {JSON_END_TAG} after {JSON_START_TAG}");
    None
}
