//! One-way projection of host Claude configuration into the container.
//!
//! Sync is authoritative and best-effort: what exists on the host is
//! copied in, what is absent on the host is removed from the container,
//! and every individual engine failure is a warning, never an abort.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde_json::{Map, Value};

use crate::engine::Engine;
use crate::mount::expand_tilde;
use crate::output::OutputContext;

/// Container-side directory owned by the in-container `node` account.
const CONTAINER_CLAUDE_DIR: &str = "/home/node/.claude";

/// A file queued for the batch archive transfer.
struct StagedFile {
    /// Basename inside the container-side config directory.
    name: String,
    contents: Vec<u8>,
    executable: bool,
}

/// Sync the host's Claude settings slice into the container.
///
/// # Errors
///
/// Returns an error only when the host home directory cannot be determined;
/// all engine-side failures degrade to warnings.
pub async fn sync_claude_config<E: Engine>(
    engine: &E,
    ctx: &OutputContext,
    container: &str,
) -> Result<()> {
    let home =
        dirs::home_dir().ok_or_else(|| anyhow::anyhow!("cannot determine home directory"))?;
    let claude_dir = home.join(".claude");

    let mut staged: Vec<StagedFile> = Vec::new();

    // Project the statusLine section of settings.json, plus the command
    // file it references.
    if let Some(status_line) = read_status_line(&claude_dir.join("settings.json")) {
        if let Some(command) = status_line.get("command").and_then(Value::as_str) {
            let command_path = expand_tilde(command);
            if command_path.exists() {
                stage_host_file(&mut staged, &command_path);
            }
        }
        let settings = serde_json::json!({ "statusLine": status_line });
        if let Ok(contents) = serde_json::to_vec_pretty(&settings) {
            staged.push(StagedFile {
                name: "settings.json".to_string(),
                contents,
                executable: false,
            });
        }
    }

    let _ = engine
        .exec(container, &["mkdir", "-p", CONTAINER_CLAUDE_DIR])
        .await;

    // CLAUDE.md: present on the host means present in the container,
    // absent means absent.
    let claude_md = claude_dir.join("CLAUDE.md");
    if claude_md.exists() {
        stage_host_file(&mut staged, &claude_md);
    } else {
        let _ = engine
            .exec(
                container,
                &["rm", "-f", &format!("{CONTAINER_CLAUDE_DIR}/CLAUDE.md")],
            )
            .await;
    }

    sync_commands_dir(engine, ctx, container, &claude_dir.join("commands")).await;

    if !staged.is_empty() {
        match archive_staged(&staged) {
            Ok(archive) => {
                if let Err(err) =
                    extract_archive(engine, container, CONTAINER_CLAUDE_DIR, &archive).await
                {
                    ctx.warn(&format!("Failed to copy files: {err:#}"));
                }
            }
            Err(err) => ctx.warn(&format!("Failed to archive files: {err:#}")),
        }
    }

    // Files injected from the host carry host-side ownership metadata.
    let _ = engine
        .exec_as(
            container,
            "root",
            &["chown", "-R", "node:node", CONTAINER_CLAUDE_DIR],
        )
        .await;

    Ok(())
}

/// Replace the container's commands directory with the host's, or remove it
/// when the host has none. Clean replace, not merge: stale files from a
/// previously differently-shaped directory must not survive.
async fn sync_commands_dir<E: Engine>(
    engine: &E,
    ctx: &OutputContext,
    container: &str,
    commands_dir: &Path,
) {
    let target = format!("{CONTAINER_CLAUDE_DIR}/commands");
    let Some(source) = resolve_commands_dir(commands_dir) else {
        let _ = engine.exec(container, &["rm", "-rf", &target]).await;
        return;
    };

    let _ = engine.exec(container, &["rm", "-rf", &target]).await;
    let _ = engine.exec(container, &["mkdir", "-p", &target]).await;

    match archive_dir(&source) {
        Ok(archive) => {
            if let Err(err) = extract_archive(engine, container, &target, &archive).await {
                ctx.warn(&format!("Failed to copy commands directory: {err:#}"));
            }
        }
        Err(err) => ctx.warn(&format!("Failed to archive commands directory: {err:#}")),
    }
}

/// Resolve the host commands directory, following at most one level of
/// symlink. Returns `None` when it is absent or not a directory.
fn resolve_commands_dir(path: &Path) -> Option<PathBuf> {
    let meta = std::fs::symlink_metadata(path).ok()?;
    if meta.file_type().is_symlink() {
        let target = std::fs::canonicalize(path).ok()?;
        return target.is_dir().then_some(target);
    }
    meta.is_dir().then(|| path.to_path_buf())
}

/// Extract the `statusLine` object from a host settings file. Any read or
/// parse failure yields `None` — sync never fails on host-side noise.
fn read_status_line(settings_path: &Path) -> Option<Map<String, Value>> {
    let data = std::fs::read_to_string(settings_path).ok()?;
    let settings: Value = serde_json::from_str(&data).ok()?;
    settings.get("statusLine")?.as_object().cloned()
}

fn stage_host_file(staged: &mut Vec<StagedFile>, path: &Path) {
    let Ok(contents) = std::fs::read(path) else {
        return;
    };
    let executable = is_executable(path);
    let name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    if !name.is_empty() {
        staged.push(StagedFile {
            name,
            contents,
            executable,
        });
    }
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    std::fs::metadata(path)
        .map(|meta| meta.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(_path: &Path) -> bool {
    false
}

/// Build one tar archive holding all staged files under their basenames,
/// preserving the executable bit via the entry mode.
fn archive_staged(staged: &[StagedFile]) -> Result<Vec<u8>> {
    let mut builder = tar::Builder::new(Vec::new());
    for file in staged {
        let mut header = tar::Header::new_gnu();
        header.set_size(file.contents.len() as u64);
        header.set_mode(if file.executable { 0o755 } else { 0o644 });
        header.set_cksum();
        builder
            .append_data(&mut header, &file.name, file.contents.as_slice())
            .with_context(|| format!("archiving {}", file.name))?;
    }
    builder.into_inner().context("finalizing archive")
}

/// Archive a directory tree, preserving file modes.
fn archive_dir(dir: &Path) -> Result<Vec<u8>> {
    let mut builder = tar::Builder::new(Vec::new());
    builder
        .append_dir_all(".", dir)
        .with_context(|| format!("archiving {}", dir.display()))?;
    builder.into_inner().context("finalizing archive")
}

/// Stream an archive into the container and unpack it at `dest`.
async fn extract_archive<E: Engine>(
    engine: &E,
    container: &str,
    dest: &str,
    archive: &[u8],
) -> Result<()> {
    let output = engine
        .exec_with_stdin(container, &["tar", "-xf", "-", "-C", dest], archive)
        .await?;
    if !output.status.success() {
        anyhow::bail!(
            "failed to extract archive: {}",
            String::from_utf8_lossy(&output.stderr).trim()
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    // ── read_status_line ─────────────────────────────────────────────────────

    #[test]
    fn test_read_status_line_extracts_section() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("settings.json");
        std::fs::write(
            &path,
            r#"{"statusLine": {"type": "command", "command": "~/.claude/statusline.sh"}, "model": "opus"}"#,
        )
        .expect("write settings");
        let status_line = read_status_line(&path).expect("statusLine present");
        assert_eq!(
            status_line.get("command").and_then(Value::as_str),
            Some("~/.claude/statusline.sh")
        );
        assert!(!status_line.contains_key("model"));
    }

    #[test]
    fn test_read_status_line_missing_section_is_none() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("settings.json");
        std::fs::write(&path, r#"{"model": "opus"}"#).expect("write settings");
        assert!(read_status_line(&path).is_none());
    }

    #[test]
    fn test_read_status_line_missing_file_is_none() {
        let dir = TempDir::new().expect("tempdir");
        assert!(read_status_line(&dir.path().join("absent.json")).is_none());
    }

    #[test]
    fn test_read_status_line_malformed_json_is_none() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("settings.json");
        std::fs::write(&path, "{broken").expect("write settings");
        assert!(read_status_line(&path).is_none());
    }

    // ── resolve_commands_dir ─────────────────────────────────────────────────

    #[test]
    fn test_resolve_commands_dir_plain_directory() {
        let dir = TempDir::new().expect("tempdir");
        let commands = dir.path().join("commands");
        std::fs::create_dir(&commands).expect("create dir");
        assert_eq!(resolve_commands_dir(&commands), Some(commands));
    }

    #[test]
    fn test_resolve_commands_dir_missing_is_none() {
        let dir = TempDir::new().expect("tempdir");
        assert_eq!(resolve_commands_dir(&dir.path().join("commands")), None);
    }

    #[test]
    fn test_resolve_commands_dir_regular_file_is_none() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("commands");
        std::fs::write(&path, "not a dir").expect("write file");
        assert_eq!(resolve_commands_dir(&path), None);
    }

    #[cfg(unix)]
    #[test]
    fn test_resolve_commands_dir_follows_symlink_to_directory() {
        let dir = TempDir::new().expect("tempdir");
        let real = dir.path().join("real-commands");
        std::fs::create_dir(&real).expect("create dir");
        let link = dir.path().join("commands");
        std::os::unix::fs::symlink(&real, &link).expect("symlink");
        let resolved = resolve_commands_dir(&link).expect("resolves");
        assert_eq!(
            resolved,
            std::fs::canonicalize(&real).expect("canonicalize")
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_resolve_commands_dir_dangling_symlink_is_none() {
        let dir = TempDir::new().expect("tempdir");
        let link = dir.path().join("commands");
        std::os::unix::fs::symlink(dir.path().join("gone"), &link).expect("symlink");
        assert_eq!(resolve_commands_dir(&link), None);
    }

    // ── archives ─────────────────────────────────────────────────────────────

    #[test]
    fn test_archive_staged_preserves_names_and_modes() {
        let staged = vec![
            StagedFile {
                name: "CLAUDE.md".to_string(),
                contents: b"# notes\n".to_vec(),
                executable: false,
            },
            StagedFile {
                name: "statusline.sh".to_string(),
                contents: b"#!/bin/sh\n".to_vec(),
                executable: true,
            },
        ];
        let archive = archive_staged(&staged).expect("archive");

        let mut reader = tar::Archive::new(archive.as_slice());
        let entries: Vec<(String, u32)> = reader
            .entries()
            .expect("entries")
            .map(|entry| {
                let entry = entry.expect("entry");
                let name = entry.path().expect("path").to_string_lossy().into_owned();
                let mode = entry.header().mode().expect("mode");
                (name, mode)
            })
            .collect();
        assert_eq!(
            entries,
            vec![
                ("CLAUDE.md".to_string(), 0o644),
                ("statusline.sh".to_string(), 0o755),
            ]
        );
    }

    #[test]
    fn test_archive_dir_includes_nested_files() {
        let dir = TempDir::new().expect("tempdir");
        std::fs::create_dir(dir.path().join("sub")).expect("mkdir");
        std::fs::write(dir.path().join("a.md"), "a").expect("write");
        std::fs::write(dir.path().join("sub/b.md"), "b").expect("write");

        let archive = archive_dir(dir.path()).expect("archive");
        let mut reader = tar::Archive::new(archive.as_slice());
        let names: Vec<String> = reader
            .entries()
            .expect("entries")
            .map(|entry| {
                entry
                    .expect("entry")
                    .path()
                    .expect("path")
                    .to_string_lossy()
                    .into_owned()
            })
            .collect();
        assert!(names.iter().any(|n| n.ends_with("a.md")), "names: {names:?}");
        assert!(
            names.iter().any(|n| n.ends_with("sub/b.md")),
            "names: {names:?}"
        );
    }
}
