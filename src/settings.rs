//! Optional settings file living next to the command store

use std::path::{Path, PathBuf};

use log::{debug, info};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::executor::{Executor, MultiPolicy};

/// Settings file names, searched in order
const FILENAMES: [&str; 3] = ["settings.yaml", "settings.yml", "settings.json"];

const DEFAULT_STORE_FILE: &str = "commands.json";

/// Errors that can occur while loading settings
#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("Unable to read settings file {path}: {source}")]
    Io {
        source: std::io::Error,
        path: PathBuf,
    },
    #[error("Unable to parse YAML settings file {path}: {source}")]
    Yaml {
        source: serde_yaml::Error,
        path: PathBuf,
    },
    #[error("Unable to parse JSON settings file {path}: {source}")]
    Json {
        source: serde_json::Error,
        path: PathBuf,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// Shell used for single and multi commands
    pub shell: String,
    pub multi_policy: MultiPolicy,
    /// Store file, relative to the settings directory unless absolute
    pub store_file: PathBuf,
    /// Directory commands run in, relative to the settings directory unless absolute.
    /// Relative script paths are looked up here too.
    pub working_dir: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            shell: "sh".to_string(),
            multi_policy: MultiPolicy::default(),
            store_file: PathBuf::from(DEFAULT_STORE_FILE),
            working_dir: None,
        }
    }
}

impl Settings {
    /// Load settings from `dir`, falling back to defaults when no settings file exists.
    ///
    /// # Errors
    ///
    /// Returns `SettingsError` if a settings file exists but cannot be read or parsed.
    pub fn load(dir: &Path) -> Result<Settings, SettingsError> {
        match Self::find(dir) {
            Some(path) => Self::from_file(&path),
            None => {
                debug!("No settings file in {}, using defaults", dir.display());
                Ok(Settings::default())
            }
        }
    }

    /// Returns the first settings file present in `dir`.
    #[must_use]
    pub fn find(dir: &Path) -> Option<PathBuf> {
        FILENAMES
            .iter()
            .map(|name| dir.join(name))
            .find(|path| path.is_file())
    }

    /// Parse a settings file, choosing the format from its extension.
    ///
    /// # Errors
    ///
    /// Returns `SettingsError::Io` if the file cannot be read, or
    /// `SettingsError::Yaml`/`SettingsError::Json` if parsing fails.
    pub fn from_file(file: &Path) -> Result<Settings, SettingsError> {
        let contents = std::fs::read_to_string(file).map_err(|e| SettingsError::Io {
            source: e,
            path: file.to_path_buf(),
        })?;
        let settings = if file.extension().is_some_and(|ext| ext == "json") {
            serde_json::from_str(&contents).map_err(|e| SettingsError::Json {
                source: e,
                path: file.to_path_buf(),
            })?
        } else if contents.trim().is_empty() {
            Settings::default()
        } else {
            serde_yaml::from_str(&contents).map_err(|e| SettingsError::Yaml {
                source: e,
                path: file.to_path_buf(),
            })?
        };
        info!("Loaded settings from {}", file.display());
        Ok(settings)
    }

    /// Resolve the store file against the directory the settings were loaded from.
    #[must_use]
    pub fn store_path(&self, dir: &Path) -> PathBuf {
        if self.store_file.is_absolute() {
            self.store_file.clone()
        } else {
            dir.join(&self.store_file)
        }
    }

    /// Build the executor these settings describe, resolving `working_dir` against `dir`.
    #[must_use]
    pub fn executor(&self, dir: &Path) -> Executor {
        let executor = Executor::new(self.shell.clone()).with_policy(self.multi_policy);
        match self.working_dir {
            Some(ref wd) if wd.is_absolute() => executor.with_cwd(wd),
            Some(ref wd) => executor.with_cwd(dir.join(wd)),
            None => executor,
        }
    }
}
