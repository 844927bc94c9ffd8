//! CLI argument parsing with clap derive

use anyhow::{Context, Result};
use clap::Parser;

use crate::commands;
use crate::engine::DockerCli;
use crate::output::OutputContext;

/// Runtime configuration threaded explicitly from the CLI layer; nothing
/// below this reads ambient process-wide state.
pub struct Settings {
    /// Primary image name, e.g. `vibecon:latest`.
    pub image: String,
    /// Command exec'd when none is given on the command line.
    pub default_command: Vec<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            image: "vibecon:latest".to_string(),
            default_command: vec![
                "claude".to_string(),
                "--dangerously-skip-permissions".to_string(),
            ],
        }
    }
}

const EXAMPLES: &str = "\
Examples:
  vibecon                    # Start claude in container
  vibecon zsh                # Run zsh in container
  vibecon claude             # Run Claude Code in container
  vibecon gemini             # Run Gemini CLI in container
  vibecon codex              # Run OpenAI Codex in container
  vibecon -b                 # Check versions and rebuild if updated
  vibecon -B                 # Force rebuild regardless of versions
  vibecon -k                 # Stop container (can be restarted)
  vibecon -K                 # Destroy container permanently";

/// Per-workspace persistent Docker containers for AI coding agents
#[derive(Parser)]
#[command(name = "vibecon", version, about, after_help = EXAMPLES)]
pub struct Cli {
    /// Install symlink to ~/.local/bin/vibecon
    #[arg(short = 'i', long)]
    pub install: bool,

    #[arg(short = 'I', hide = true)]
    pub install_test: bool,

    /// Uninstall symlink from ~/.local/bin/vibecon
    #[arg(short = 'u', long)]
    pub uninstall: bool,

    /// Stop the container for the current workspace (can be restarted)
    #[arg(short = 'k', long)]
    pub stop: bool,

    /// Destroy and remove the container permanently
    #[arg(short = 'K', long)]
    pub destroy: bool,

    /// Rebuild the Docker image (skips if versions unchanged)
    #[arg(short = 'b', long)]
    pub build: bool,

    /// Force rebuild even if the image exists
    #[arg(short = 'B', long)]
    pub force_build: bool,

    /// Suppress non-error output
    #[arg(short, long)]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, env = "NO_COLOR")]
    pub no_color: bool,

    /// Command to execute in the container (default: claude --dangerously-skip-permissions)
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub command: Vec<String>,
}

impl Cli {
    /// Execute the CLI. The returned code becomes the process exit code:
    /// the exec'd command's code on the default path, 0/1 for management
    /// flags.
    ///
    /// # Errors
    ///
    /// Returns an error when a management step or the reconciliation path
    /// fails fatally.
    pub async fn run(self) -> Result<i32> {
        let ctx = OutputContext::new(self.no_color, self.quiet);
        let settings = Settings::default();

        if self.install || self.install_test {
            crate::install::install_symlink(&ctx, self.install_test)?;
            return Ok(0);
        }
        if self.uninstall {
            crate::install::uninstall_symlink(&ctx)?;
            return Ok(0);
        }

        let workspace =
            std::env::current_dir().context("failed to get current directory")?;
        let container_name = crate::workspace::container_name_for(&workspace);
        let engine = DockerCli;

        if self.build || self.force_build {
            let build_root = crate::install::build_root()?;
            commands::build::run(&engine, &ctx, &settings, &build_root, self.force_build)
                .await?;
            return Ok(0);
        }
        if self.stop {
            commands::stop::run(&engine, &ctx, &container_name).await?;
            return Ok(0);
        }
        if self.destroy {
            commands::destroy::run(&engine, &ctx, &container_name).await?;
            return Ok(0);
        }

        let command = if self.command.is_empty() {
            settings.default_command.clone()
        } else {
            self.command.clone()
        };
        commands::run::run(&engine, &ctx, &settings, &workspace, &container_name, &command).await
    }
}
