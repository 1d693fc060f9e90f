//! Persisted settings for the `venv-setup` command.
//!
//! Settings are stored in a JSON file in the user's config directory:
//! - macOS: ~/Library/Application Support/venv-setup/settings.json
//! - Linux: ~/.config/venv-setup/settings.json
//! - Windows: C:\Users\<User>\AppData\Roaming\venv-setup\settings.json

use anyhow::{bail, Result};
use serde::{Deserialize, Deserializer, Serialize};
use std::path::{Path, PathBuf};

const APP_DIR: &str = "venv-setup";

/// User settings. Command-line flags take precedence over these.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// Provisioning entry point handed to the interpreter. When unset the
    /// built-in provisioner is used.
    #[serde(default)]
    pub provisioner_entry: Option<PathBuf>,

    /// Directories searched for interpreters in addition to `PATH`
    #[serde(default, deserialize_with = "deserialize_path_list")]
    pub extra_search_paths: Vec<PathBuf>,

    /// Diagnostic log file (defaults to [`default_log_path`])
    #[serde(default)]
    pub log_path: Option<PathBuf>,
}

impl Settings {
    /// Keys accepted by [`Settings::set`].
    pub const KEYS: [&'static str; 3] = ["provisioner_entry", "extra_search_paths", "log_path"];

    /// Update one setting from its command-line string form.
    ///
    /// An empty value clears the setting. `extra_search_paths` takes a
    /// comma-separated list.
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let value = value.trim();
        let optional_path = || (!value.is_empty()).then(|| PathBuf::from(value));
        match key {
            "provisioner_entry" => self.provisioner_entry = optional_path(),
            "log_path" => self.log_path = optional_path(),
            "extra_search_paths" => self.extra_search_paths = split_path_list(value),
            other => bail!(
                "Unknown setting '{}' (expected one of: {})",
                other,
                Self::KEYS.join(", ")
            ),
        }
        Ok(())
    }

    /// The diagnostic log file to use.
    pub fn log_path(&self) -> PathBuf {
        self.log_path.clone().unwrap_or_else(default_log_path)
    }
}

fn split_path_list(value: &str) -> Vec<PathBuf> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(PathBuf::from)
        .collect()
}

/// Deserialize a path list that accepts both:
/// - `"/opt/python/bin, ~/.local/bin"` (comma-separated string)
/// - `["/opt/python/bin", "~/.local/bin"]` (JSON array)
fn deserialize_path_list<'de, D>(deserializer: D) -> std::result::Result<Vec<PathBuf>, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de;

    struct PathListVisitor;

    impl<'de> de::Visitor<'de> for PathListVisitor {
        type Value = Vec<PathBuf>;

        fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
            formatter.write_str("a string or array of strings")
        }

        fn visit_str<E: de::Error>(self, v: &str) -> std::result::Result<Vec<PathBuf>, E> {
            Ok(split_path_list(v))
        }

        fn visit_seq<A: de::SeqAccess<'de>>(
            self,
            mut seq: A,
        ) -> std::result::Result<Vec<PathBuf>, A::Error> {
            let mut items = Vec::new();
            while let Some(item) = seq.next_element::<String>()? {
                let trimmed = item.trim();
                if !trimmed.is_empty() {
                    items.push(PathBuf::from(trimmed));
                }
            }
            Ok(items)
        }
    }

    deserializer.deserialize_any(PathListVisitor)
}

fn config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
}

/// Get the path to the settings file
pub fn settings_path() -> PathBuf {
    config_dir().join("settings.json")
}

/// Where active interpreter selections are remembered, per workspace.
pub fn default_state_path() -> PathBuf {
    config_dir().join("active-interpreters.json")
}

/// Default diagnostic log file.
pub fn default_log_path() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from("/tmp"))
        .join(APP_DIR)
        .join("output.log")
}

/// Load settings from disk, returning defaults if file doesn't exist
pub fn load_settings() -> Settings {
    load_settings_from(&settings_path())
}

/// Load settings from a specific file. Unreadable or invalid files yield
/// defaults.
pub fn load_settings_from(path: &Path) -> Settings {
    if path.exists() {
        std::fs::read_to_string(path)
            .ok()
            .and_then(|s| match serde_json::from_str(&s) {
                Ok(settings) => Some(settings),
                Err(e) => {
                    log::warn!("[settings] Ignoring invalid {:?}: {}", path, e);
                    None
                }
            })
            .unwrap_or_default()
    } else {
        Settings::default()
    }
}

/// Save settings to disk
pub fn save_settings(settings: &Settings) -> Result<()> {
    save_settings_to(settings, &settings_path())
}

pub fn save_settings_to(settings: &Settings, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, serde_json::to_string_pretty(settings)?)?;
    Ok(())
}
