//! Docker CLI abstraction — enables test doubles for all `docker` commands.

use std::path::Path;
use std::process::{Output, Stdio};

use anyhow::{Context, Result};

/// Parameters for `docker run -d`. Struct-based to avoid breaking
/// test doubles on future parameter additions.
pub struct RunSpec<'a> {
    /// Container name, e.g. `"vibecon-home-u-proj-4fafce67"`.
    pub name: &'a str,
    /// In-container hostname.
    pub hostname: &'a str,
    /// Environment variables injected at creation.
    pub env: &'a [(String, String)],
    /// Pre-compiled mount arguments (`-v a:b`, `--mount type=…`) flattened
    /// in declaration order.
    pub mount_args: &'a [String],
    /// Image to run.
    pub image: &'a str,
}

/// Abstraction over the docker CLI, enabling test doubles.
///
/// The production implementation delegates to the `docker` binary via
/// [`tokio::process::Command`].
#[allow(async_fn_in_trait)]
pub trait Engine {
    /// Whether the named container is currently running. `false` when the
    /// container does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine cannot be reached at all.
    async fn container_running(&self, name: &str) -> Result<bool>;

    /// Whether the named container exists in any state.
    async fn container_exists(&self, name: &str) -> bool;

    /// Start a stopped container.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine cannot be reached or reports failure.
    async fn start_container(&self, name: &str) -> Result<()>;

    /// Stop a running container.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine cannot be reached or reports failure
    /// (including "not running").
    async fn stop_container(&self, name: &str) -> Result<()>;

    /// Force-remove a container. Succeeds even when the container is
    /// already gone.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine cannot be reached.
    async fn remove_container(&self, name: &str) -> Result<()>;

    /// Whether the named image exists locally.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine cannot be reached or reports a
    /// failure other than "no such image".
    async fn image_exists(&self, image: &str) -> Result<bool>;

    /// Build an image with inherited stdio so build progress is visible.
    ///
    /// # Errors
    ///
    /// Returns an error if the build cannot be spawned or exits non-zero.
    async fn build_image(
        &self,
        context_dir: &Path,
        build_args: &[(String, String)],
        tags: &[String],
    ) -> Result<()>;

    /// Create and start a container in detached mode.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine cannot be reached or reports failure.
    async fn run_detached(&self, spec: &RunSpec<'_>) -> Result<()>;

    /// Run a command interactively (`docker exec -it`) with inherited
    /// stdio, returning the command's exit code.
    ///
    /// # Errors
    ///
    /// Returns an error if the command cannot be spawned.
    async fn exec_interactive(
        &self,
        name: &str,
        env: &[(String, String)],
        command: &[String],
    ) -> Result<i32>;

    /// Run a command in the container and capture its output.
    ///
    /// # Errors
    ///
    /// Returns an error if the command cannot be spawned.
    async fn exec(&self, name: &str, command: &[&str]) -> Result<Output>;

    /// Run a command in the container as a specific user.
    ///
    /// # Errors
    ///
    /// Returns an error if the command cannot be spawned.
    async fn exec_as(&self, name: &str, user: &str, command: &[&str]) -> Result<Output>;

    /// Run a command in the container with stdin piped from `input` — the
    /// transport used to stream archives into the container.
    ///
    /// # Errors
    ///
    /// Returns an error if the command cannot be spawned or stdin write fails.
    async fn exec_with_stdin(&self, name: &str, command: &[&str], input: &[u8])
        -> Result<Output>;
}

/// Production implementation — shells out to the `docker` binary.
pub struct DockerCli;

impl DockerCli {
    async fn output(args: &[&str]) -> Result<Output> {
        tokio::process::Command::new("docker")
            .args(args)
            .output()
            .await
            .with_context(|| {
                format!(
                    "failed to run docker {}",
                    args.first().copied().unwrap_or_default()
                )
            })
    }
}

fn stderr_of(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).trim().to_string()
}

impl Engine for DockerCli {
    async fn container_running(&self, name: &str) -> Result<bool> {
        let output = Self::output(&["inspect", "-f", "{{.State.Running}}", name]).await?;
        if !output.status.success() {
            // Container doesn't exist.
            return Ok(false);
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim() == "true")
    }

    async fn container_exists(&self, name: &str) -> bool {
        Self::output(&["inspect", name])
            .await
            .map(|output| output.status.success())
            .unwrap_or(false)
    }

    async fn start_container(&self, name: &str) -> Result<()> {
        let output = Self::output(&["start", name]).await?;
        if !output.status.success() {
            anyhow::bail!("failed to start container: {}", stderr_of(&output));
        }
        Ok(())
    }

    async fn stop_container(&self, name: &str) -> Result<()> {
        let output = Self::output(&["stop", name]).await?;
        if !output.status.success() {
            anyhow::bail!("failed to stop container: {}", stderr_of(&output));
        }
        Ok(())
    }

    async fn remove_container(&self, name: &str) -> Result<()> {
        // rm -f exits non-zero for an already-absent container; that is the
        // desired end state, so only spawn failures surface.
        Self::output(&["rm", "-f", name]).await?;
        Ok(())
    }

    async fn image_exists(&self, image: &str) -> Result<bool> {
        let output = Self::output(&["image", "inspect", image]).await?;
        if output.status.success() {
            return Ok(true);
        }
        let stderr = stderr_of(&output);
        if stderr.to_lowercase().contains("no such image") {
            return Ok(false);
        }
        anyhow::bail!("error checking image: {stderr}");
    }

    async fn build_image(
        &self,
        context_dir: &Path,
        build_args: &[(String, String)],
        tags: &[String],
    ) -> Result<()> {
        let mut cmd = tokio::process::Command::new("docker");
        cmd.arg("build").current_dir(context_dir);
        for (key, value) in build_args {
            cmd.arg("--build-arg").arg(format!("{key}={value}"));
        }
        for tag in tags {
            cmd.arg("-t").arg(tag);
        }
        cmd.arg(".");

        let status = cmd.status().await.context("failed to run docker build")?;
        anyhow::ensure!(status.success(), "failed to build image ({status})");
        Ok(())
    }

    async fn run_detached(&self, spec: &RunSpec<'_>) -> Result<()> {
        let mut cmd = tokio::process::Command::new("docker");
        cmd.args(["run", "-d", "--name", spec.name, "--hostname", spec.hostname]);
        for (key, value) in spec.env {
            cmd.arg("-e").arg(format!("{key}={value}"));
        }
        cmd.args(spec.mount_args);
        cmd.arg(spec.image);

        let output = cmd.output().await.context("failed to run docker run")?;
        if !output.status.success() {
            anyhow::bail!("failed to start container: {}", stderr_of(&output));
        }
        Ok(())
    }

    async fn exec_interactive(
        &self,
        name: &str,
        env: &[(String, String)],
        command: &[String],
    ) -> Result<i32> {
        let mut cmd = tokio::process::Command::new("docker");
        cmd.args(["exec", "-it"]);
        for (key, value) in env {
            cmd.arg("-e").arg(format!("{key}={value}"));
        }
        cmd.arg(name).args(command);
        cmd.stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit());

        let status = cmd.status().await.context("failed to run docker exec")?;
        Ok(status.code().unwrap_or(1))
    }

    async fn exec(&self, name: &str, command: &[&str]) -> Result<Output> {
        let mut args = vec!["exec", name];
        args.extend_from_slice(command);
        Self::output(&args).await
    }

    async fn exec_as(&self, name: &str, user: &str, command: &[&str]) -> Result<Output> {
        let mut args = vec!["exec", "-u", user, name];
        args.extend_from_slice(command);
        Self::output(&args).await
    }

    async fn exec_with_stdin(
        &self,
        name: &str,
        command: &[&str],
        input: &[u8],
    ) -> Result<Output> {
        use tokio::io::AsyncWriteExt;

        let mut args = vec!["exec", "-i", name];
        args.extend_from_slice(command);

        let mut child = tokio::process::Command::new("docker")
            .args(&args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .context("failed to spawn docker exec")?;

        if let Some(mut stdin) = child.stdin.take() {
            let input = input.to_vec();
            tokio::spawn(async move {
                let _ = stdin.write_all(&input).await;
            });
        }

        child
            .wait_with_output()
            .await
            .context("failed to wait for docker exec")
    }
}
