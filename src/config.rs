//! JSON configuration files — user-wide and per-project mount declarations.

use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::mount::MountSpec;

/// File name of both the user-wide (`~/.vibecon.json`) and per-project
/// (`<project>/.vibecon.json`) config files.
pub const CONFIG_FILE_NAME: &str = ".vibecon.json";

/// Merged tool configuration.
#[derive(Debug, Default)]
pub struct Config {
    /// Extra mounts in declaration order: user-wide first, then project.
    pub mounts: Vec<MountSpec>,
}

/// Raw file shape; mounts are kept as JSON values so each one can be
/// validated individually with a diagnostic naming the offending entry.
#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    mounts: Vec<serde_json::Value>,
}

/// Load a single config file. A missing file is an empty config; malformed
/// JSON or a malformed mount entry is fatal.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read, is not valid
/// JSON, or contains an invalid mount spec.
pub fn load(path: &Path) -> Result<Config> {
    if !path.exists() {
        return Ok(Config::default());
    }
    let data = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config file {}", path.display()))?;
    let file: ConfigFile = serde_json::from_str(&data)
        .with_context(|| format!("invalid JSON in {}", path.display()))?;

    let mut mounts = Vec::with_capacity(file.mounts.len());
    for (index, value) in file.mounts.iter().enumerate() {
        let spec = MountSpec::parse(value)
            .with_context(|| format!("{}: mounts[{index}]", path.display()))?;
        mounts.push(spec);
    }
    Ok(Config { mounts })
}

/// Load and merge the user-wide and project configs. Mount lists are
/// concatenated, never deduplicated or reordered; duplicate targets are the
/// engine's to arbitrate.
///
/// # Errors
///
/// Returns an error if either config file is malformed.
pub fn merged(project_root: &Path) -> Result<Config> {
    let mut mounts = Vec::new();
    if let Some(home) = dirs::home_dir() {
        mounts.extend(load(&home.join(CONFIG_FILE_NAME))?.mounts);
    }
    mounts.extend(load(&project_root.join(CONFIG_FILE_NAME))?.mounts);
    Ok(Config { mounts })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_config(dir: &TempDir, contents: &str) -> std::path::PathBuf {
        let path = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(&path, contents).expect("write config");
        path
    }

    #[test]
    fn test_load_missing_file_returns_empty_config() {
        let dir = TempDir::new().expect("tempdir");
        let config = load(&dir.path().join(CONFIG_FILE_NAME)).expect("load");
        assert!(config.mounts.is_empty());
    }

    #[test]
    fn test_load_parses_mounts_in_order() {
        let dir = TempDir::new().expect("tempdir");
        let path = write_config(
            &dir,
            r#"{
                "mounts": [
                    {"type": "volume", "source": "cache", "target": "/cache"},
                    {"type": "anonymous", "target": "/scratch"}
                ]
            }"#,
        );
        let config = load(&path).expect("load");
        assert_eq!(config.mounts.len(), 2);
        assert_eq!(config.mounts[0].target(), "/cache");
        assert_eq!(config.mounts[1].target(), "/scratch");
    }

    #[test]
    fn test_load_empty_object_is_valid() {
        let dir = TempDir::new().expect("tempdir");
        let path = write_config(&dir, "{}");
        let config = load(&path).expect("load");
        assert!(config.mounts.is_empty());
    }

    #[test]
    fn test_load_malformed_json_is_fatal() {
        let dir = TempDir::new().expect("tempdir");
        let path = write_config(&dir, "{not json");
        let err = load(&path).expect_err("malformed JSON must fail");
        assert!(err.to_string().contains("invalid JSON"), "error: {err:#}");
    }

    #[test]
    fn test_load_invalid_mount_names_offending_entry() {
        let dir = TempDir::new().expect("tempdir");
        let path = write_config(
            &dir,
            r#"{"mounts": [{"type": "volume", "source": "a", "target": "/a"}, "/bad:/entry"]}"#,
        );
        let err = load(&path).expect_err("bare-string mount must fail");
        assert!(format!("{err:#}").contains("mounts[1]"), "error: {err:#}");
    }

    #[test]
    fn test_merged_project_mounts_follow_global_mounts() {
        // Only the project side is exercised here; the user-wide file lives
        // in the real home directory and is not touched by this test.
        let dir = TempDir::new().expect("tempdir");
        write_config(
            &dir,
            r#"{"mounts": [{"type": "anonymous", "target": "/project-scratch"}]}"#,
        );
        let config = merged(dir.path()).expect("merged");
        let last = config.mounts.last().expect("at least the project mount");
        assert_eq!(last.target(), "/project-scratch");
    }
}
