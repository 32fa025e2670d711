//! On-disk representation of the command store

use std::io::Write;
use std::path::{Path, PathBuf};

use log::debug;
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use thiserror::Error;

use crate::commands::Command;

/// Errors that can occur while reading or writing the store file
#[derive(Error, Debug)]
pub enum StoreFileError {
    #[error("Unable to access store file {path}: {source}")]
    Io {
        source: std::io::Error,
        path: PathBuf,
    },
    #[error("Unable to parse YAML store file {path}: {source}")]
    Yaml {
        source: serde_yaml::Error,
        path: PathBuf,
    },
    #[error("Unable to parse JSON store file {path}: {source}")]
    Json {
        source: serde_json::Error,
        path: PathBuf,
    },
}

/// Serialization format, picked from the file extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Json,
    Yaml,
}

impl Format {
    #[must_use]
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("yaml" | "yml") => Format::Yaml,
            _ => Format::Json,
        }
    }
}

/// Root structure of the store file
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct StoreFile {
    #[serde(default)]
    pub commands: Vec<Command>,
}

impl StoreFile {
    /// Parse store file contents in the given format.
    ///
    /// # Errors
    ///
    /// Returns `StoreFileError::Json`/`StoreFileError::Yaml` if the contents do not match
    /// the schema. `path` is only used for the error message.
    pub fn parse(contents: &str, format: Format, path: &Path) -> Result<Self, StoreFileError> {
        match format {
            Format::Json => serde_json::from_str(contents).map_err(|e| StoreFileError::Json {
                source: e,
                path: path.to_path_buf(),
            }),
            // An empty YAML document deserializes to unit, not a mapping
            Format::Yaml if contents.trim().is_empty() => Ok(StoreFile::default()),
            Format::Yaml => serde_yaml::from_str(contents).map_err(|e| StoreFileError::Yaml {
                source: e,
                path: path.to_path_buf(),
            }),
        }
    }

    /// Render the file contents in the given format.
    ///
    /// # Errors
    ///
    /// Returns `StoreFileError::Json`/`StoreFileError::Yaml` if serialization fails.
    pub fn render(&self, format: Format, path: &Path) -> Result<String, StoreFileError> {
        match format {
            Format::Json => serde_json::to_string_pretty(self)
                .map(|mut s| {
                    s.push('\n');
                    s
                })
                .map_err(|e| StoreFileError::Json {
                    source: e,
                    path: path.to_path_buf(),
                }),
            Format::Yaml => serde_yaml::to_string(self).map_err(|e| StoreFileError::Yaml {
                source: e,
                path: path.to_path_buf(),
            }),
        }
    }
}

/// Read the store file at `path`.
///
/// Returns `Ok(None)` if the file does not exist.
///
/// # Errors
///
/// Returns `StoreFileError::Io` if the file exists but cannot be read, or a parse error if its
/// contents do not match the schema.
pub fn read(path: &Path) -> Result<Option<StoreFile>, StoreFileError> {
    let contents = match std::fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => {
            return Err(StoreFileError::Io {
                source: e,
                path: path.to_path_buf(),
            });
        }
    };
    StoreFile::parse(&contents, Format::from_path(path), path).map(Some)
}

/// Replace the store file at `path` with `commands`.
///
/// The data is written to a temporary file next to `path`, synced and renamed over the
/// target, so the old contents stay in place until the new ones are complete.
///
/// # Errors
///
/// Returns `StoreFileError::Io` if the directory cannot be created or the file cannot be
/// written, or a serialization error.
pub fn write(path: &Path, commands: &[Command]) -> Result<(), StoreFileError> {
    let io_err = |source: std::io::Error| StoreFileError::Io {
        source,
        path: path.to_path_buf(),
    };

    let file = StoreFile {
        commands: commands.to_vec(),
    };
    let contents = file.render(Format::from_path(path), path)?;

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir).map_err(io_err)?;

    let mut tmp = NamedTempFile::new_in(dir).map_err(io_err)?;
    tmp.write_all(contents.as_bytes()).map_err(io_err)?;
    tmp.as_file().sync_all().map_err(io_err)?;
    tmp.persist(path).map_err(|e| io_err(e.error))?;

    debug!("Wrote {} commands to {}", commands.len(), path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::CommandKind;

    #[test]
    fn test_read_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(read(&dir.path().join("commands.json")).unwrap().is_none());
    }

    #[test]
    fn test_read_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("commands.json");
        std::fs::write(
            &path,
            r#"{
                "commands": [
                    {"name": "hello", "type": "single", "content": "echo hello", "description": ""}
                ]
            }"#,
        )
        .unwrap();
        let file = read(&path).unwrap().unwrap();
        assert_eq!(file.commands.len(), 1);
        assert_eq!(file.commands[0].kind, CommandKind::Single);
    }

    #[test]
    fn test_read_yaml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("commands.yaml");
        std::fs::write(
            &path,
            "commands:\n  - name: build\n    type: multi\n    content: |\n      cargo fmt\n      cargo build\n",
        )
        .unwrap();
        let file = read(&path).unwrap().unwrap();
        assert_eq!(file.commands[0].steps(), vec!["cargo fmt", "cargo build"]);
    }

    #[test]
    fn test_missing_commands_key_is_empty() {
        let file = StoreFile::parse("{}", Format::Json, Path::new("commands.json")).unwrap();
        assert!(file.commands.is_empty());
    }

    #[test]
    fn test_parse_error_preserves_path() {
        let result = StoreFile::parse(
            "invalid json{",
            Format::Json,
            Path::new("/x/commands.json"),
        );
        match result {
            Err(StoreFileError::Json { path, .. }) => {
                assert_eq!(path, PathBuf::from("/x/commands.json"));
            }
            other => panic!("Expected StoreFileError::Json, got: {other:?}"),
        }
    }

    #[test]
    fn test_write_replaces_and_leaves_no_temp_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("commands.json");
        write(&path, &[Command::new("a", CommandKind::Single, "echo a")]).unwrap();
        write(&path, &[Command::new("b", CommandKind::Single, "echo b")]).unwrap();

        let file = read(&path).unwrap().unwrap();
        assert_eq!(file.commands.len(), 1);
        assert_eq!(file.commands[0].name, "b");

        let entries = std::fs::read_dir(path.parent().unwrap()).unwrap().count();
        assert_eq!(entries, 1);
    }

    #[test]
    fn test_json_layout() {
        let file = StoreFile {
            commands: vec![
                Command::new("Update", CommandKind::Multi, "git pull\nnpm install")
                    .with_description("sync repo"),
            ],
        };
        let rendered = file.render(Format::Json, Path::new("commands.json")).unwrap();
        insta::assert_snapshot!(rendered.trim_end(), @r#"
        {
          "commands": [
            {
              "name": "Update",
              "type": "multi",
              "content": "git pull\nnpm install",
              "description": "sync repo"
            }
          ]
        }
        "#);
    }
}
