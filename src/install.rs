//! Launcher installation — symlink into `~/.local/bin` — and discovery of
//! the build root next to the resolved executable.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::output::OutputContext;

const LAUNCHER_NAME: &str = "vibecon";

/// Locate the directory holding the Dockerfile, next to the resolved
/// executable.
///
/// # Errors
///
/// Returns an error if the executable path cannot be resolved or no
/// Dockerfile sits beside it.
pub fn build_root() -> Result<PathBuf> {
    let exe = resolved_executable()?;
    let dir = exe
        .parent()
        .ok_or_else(|| anyhow::anyhow!("executable has no parent directory"))?
        .to_path_buf();
    anyhow::ensure!(
        dir.join("Dockerfile").exists(),
        "could not find Dockerfile next to the vibecon executable ({})",
        dir.display()
    );
    Ok(dir)
}

fn resolved_executable() -> Result<PathBuf> {
    let exe = std::env::current_exe().context("failed to get executable path")?;
    std::fs::canonicalize(&exe)
        .with_context(|| format!("failed to resolve symlinks for {}", exe.display()))
}

/// Install a symlink to this executable at `~/.local/bin/vibecon`.
/// Idempotent when the link already points at the same target; a link
/// pointing elsewhere is replaced.
///
/// # Errors
///
/// Returns an error if the home directory is unknown, the install
/// directory cannot be created, or the symlink cannot be written.
pub fn install_symlink(ctx: &OutputContext, simulate_path_missing: bool) -> Result<()> {
    let target = resolved_executable()?;
    let home =
        dirs::home_dir().ok_or_else(|| anyhow::anyhow!("cannot determine home directory"))?;
    let install_dir = home.join(".local").join("bin");
    let link = install_dir.join(LAUNCHER_NAME);

    std::fs::create_dir_all(&install_dir)
        .with_context(|| format!("failed to create {}", install_dir.display()))?;

    let already_installed = std::fs::canonicalize(&link)
        .map(|resolved| resolved == target)
        .unwrap_or(false);
    if already_installed {
        ctx.success(&format!(
            "Already installed: {} -> {}",
            link.display(),
            target.display()
        ));
    } else {
        // Replace a link that exists but points elsewhere.
        let _ = std::fs::remove_file(&link);
        make_symlink(&target, &link)?;
        ctx.success(&format!(
            "Installed: {} -> {}",
            link.display(),
            target.display()
        ));
    }

    if simulate_path_missing || !dir_in_path(&install_dir) {
        print_path_warning(ctx, &install_dir, &home);
    } else {
        ctx.success("You can now use vibecon by its name: vibecon");
    }
    Ok(())
}

/// Remove the launcher symlink, if present.
///
/// # Errors
///
/// Returns an error if the home directory is unknown or the link exists
/// but cannot be removed.
pub fn uninstall_symlink(ctx: &OutputContext) -> Result<()> {
    let home =
        dirs::home_dir().ok_or_else(|| anyhow::anyhow!("cannot determine home directory"))?;
    let link = home.join(".local").join("bin").join(LAUNCHER_NAME);

    if std::fs::symlink_metadata(&link).is_ok() {
        std::fs::remove_file(&link)
            .with_context(|| format!("failed to remove symlink {}", link.display()))?;
        ctx.success(&format!("Uninstalled: {}", link.display()));
    } else {
        ctx.info(&format!("Symlink not found: {}", link.display()));
    }
    Ok(())
}

#[cfg(unix)]
fn make_symlink(target: &Path, link: &Path) -> Result<()> {
    std::os::unix::fs::symlink(target, link)
        .with_context(|| format!("failed to create symlink {}", link.display()))
}

#[cfg(not(unix))]
fn make_symlink(_target: &Path, _link: &Path) -> Result<()> {
    anyhow::bail!("launcher install is only supported on unix hosts")
}

fn dir_in_path(dir: &Path) -> bool {
    std::env::var_os("PATH")
        .map(|path| std::env::split_paths(&path).any(|entry| entry == dir))
        .unwrap_or(false)
}

fn print_path_warning(ctx: &OutputContext, install_dir: &Path, home: &Path) {
    let display_dir = display_with_home(install_dir, home);
    let shell = std::env::var("SHELL")
        .ok()
        .and_then(|path| {
            Path::new(&path)
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
        })
        .unwrap_or_else(|| "unknown".to_string());
    let (profile, export_cmd) = shell_profile(&shell, &display_dir);

    ctx.warn(&format!("{display_dir} is not in your PATH"));
    ctx.info("You must add it to your PATH to use 'vibecon' by name.");
    ctx.kv("Detected shell:", &shell);
    ctx.info("Add to PATH permanently:");
    ctx.info(&format!("  echo '{export_cmd}' >> {profile}"));
    ctx.info(&format!("  source {profile}"));
}

/// Substitute a literal `$HOME` for the home prefix in display output.
fn display_with_home(path: &Path, home: &Path) -> String {
    path.strip_prefix(home)
        .map(|rest| format!("$HOME/{}", rest.display()))
        .unwrap_or_else(|_| path.display().to_string())
}

/// Per-shell profile file and PATH export line.
fn shell_profile(shell: &str, install_dir: &str) -> (&'static str, String) {
    match shell {
        "zsh" => ("~/.zshrc", format!(r#"export PATH="{install_dir}:$PATH""#)),
        "bash" => ("~/.bashrc", format!(r#"export PATH="{install_dir}:$PATH""#)),
        "fish" => (
            "~/.config/fish/config.fish",
            format!(r#"set -gx PATH "{install_dir}" $PATH"#),
        ),
        "tcsh" | "csh" => ("~/.cshrc", format!(r#"setenv PATH "{install_dir}:$PATH""#)),
        _ => ("~/.profile", format!(r#"export PATH="{install_dir}:$PATH""#)),
    }
}
