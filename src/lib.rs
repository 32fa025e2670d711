//! Core implementation of the bashrunner command launcher
//!
//! bashrunner keeps an ordered list of named shell invocations (a single command line, a
//! sequence of lines run in order, or an executable script) in a file, and runs them on
//! demand, reporting the exit status and captured output. Callers such as the CLI and the
//! MCP server own the [`store::Store`] they build here and go through its operations for
//! every change.

use std::path::{Path, PathBuf};

use log::debug;

use crate::settings::{Settings, SettingsError};
use crate::store::Store;

pub mod commands;
pub mod executor;
pub mod logger;
pub mod mcp;
pub mod report;
pub mod settings;
pub mod store;
pub mod store_file;

const APP_DIR: &str = "bashrunner";

/// Default directory for the store and settings files.
///
/// This is the platform config directory (`~/.config/bashrunner` on Linux,
/// `~/Library/Application Support/bashrunner` on macOS, `%APPDATA%\bashrunner` on Windows),
/// or `./bashrunner` if the platform has none.
#[must_use]
pub fn default_store_dir() -> PathBuf {
    dirs::config_dir().map_or_else(|| PathBuf::from(APP_DIR), |dir| dir.join(APP_DIR))
}

/// Load settings from `dir` and open the store they point at.
///
/// `store_file` overrides the store file named in the settings. Relative paths are resolved
/// against `dir`.
///
/// # Errors
///
/// Returns `SettingsError` if a settings file exists but cannot be parsed. A broken store
/// file is not an error; see [`Store::load`].
pub fn open_store(
    dir: &Path,
    store_file: Option<&Path>,
) -> Result<(Store, Settings), SettingsError> {
    let mut settings = Settings::load(dir)?;
    if let Some(file) = store_file {
        settings.store_file = file.to_path_buf();
    }
    let path = settings.store_path(dir);
    debug!(
        "Opening store {} (shell: {}, multi policy: {:?})",
        path.display(),
        settings.shell,
        settings.multi_policy
    );
    let store = Store::load(path).with_executor(settings.executor(dir));
    Ok((store, settings))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::MultiPolicy;

    #[test]
    fn test_open_store_applies_settings() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("settings.yaml"),
            "shell: sh\nmulti_policy: continue\nstore_file: runner.yaml\n",
        )
        .unwrap();
        let (store, settings) = open_store(dir.path(), None).unwrap();
        assert_eq!(store.path(), dir.path().join("runner.yaml"));
        assert_eq!(store.executor().policy(), MultiPolicy::Continue);
        assert_eq!(settings.multi_policy, MultiPolicy::Continue);
    }

    #[test]
    fn test_open_store_file_override() {
        let dir = tempfile::tempdir().unwrap();
        let (store, _) = open_store(dir.path(), Some(Path::new("other.json"))).unwrap();
        assert_eq!(store.path(), dir.path().join("other.json"));
        assert!(store.is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn test_open_store_runs_relative_script_in_working_dir() {
        use std::os::unix::fs::PermissionsExt;

        use crate::commands::{Command, CommandKind};

        let dir = tempfile::tempdir().unwrap();
        let project = dir.path().join("project");
        std::fs::create_dir(&project).unwrap();
        let script = project.join("deploy");
        std::fs::write(&script, "#!/bin/sh\npwd\n").unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();
        std::fs::write(dir.path().join("settings.yaml"), "working_dir: project\n").unwrap();

        let (mut store, _) = open_store(dir.path(), None).unwrap();
        store
            .add(Command::new("deploy", CommandKind::Script, "deploy"))
            .unwrap();
        let result = store.execute(0).unwrap();
        assert!(result.succeeded, "{:?}", result.failure);
        assert_eq!(result.stdout.trim_end(), project.to_string_lossy());
    }

    #[test]
    fn test_default_store_dir_ends_with_app_name() {
        assert!(default_store_dir().ends_with(APP_DIR));
    }
}
