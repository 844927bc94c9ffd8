//! Container lifecycle reconciliation — drive the observed container state
//! to "running" with minimal disruption.
//!
//! Preference order: reuse a running container, restart a stopped one,
//! recreate only when restart fails or nothing exists, and rebuild the
//! image only when it is missing.

use std::path::Path;

use anyhow::{Context, Result};

use crate::config::Config;
use crate::engine::{Engine, RunSpec};
use crate::hostctx;
use crate::output::OutputContext;
use crate::version::{self, VersionSet};
use crate::workspace::{CONTAINER_HOSTNAME, WORKSPACE_MOUNT};

/// Observed container state. Transitions are driven only by the engine;
/// the reconciler observes and requests, never assumes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerState {
    Absent,
    Stopped,
    Running,
}

/// Desired end state for one workspace container.
pub struct EnsureRequest<'a> {
    /// Workspace directory, bind-mounted at [`WORKSPACE_MOUNT`] and used as
    /// the project root for relative bind-mount sources.
    pub workspace: &'a Path,
    pub container_name: &'a str,
    pub image: &'a str,
    /// Directory holding the Dockerfile; consulted only when the image is
    /// missing.
    pub build_root: &'a Path,
    pub config: &'a Config,
}

/// Observe the current container state.
///
/// # Errors
///
/// Returns an error if the engine cannot be reached for the running check.
pub async fn observe<E: Engine>(engine: &E, name: &str) -> Result<ContainerState> {
    if engine.container_running(name).await? {
        return Ok(ContainerState::Running);
    }
    if engine.container_exists(name).await {
        return Ok(ContainerState::Stopped);
    }
    Ok(ContainerState::Absent)
}

/// Ensure the workspace container is running.
///
/// Idempotent: a second call with no external state change takes the
/// Running fast path and issues no further lifecycle operations.
///
/// # Errors
///
/// Returns an error if the engine is unreachable, the image build fails,
/// or the container cannot be created or started.
pub async fn ensure_running<E: Engine>(
    engine: &E,
    ctx: &OutputContext,
    req: &EnsureRequest<'_>,
) -> Result<()> {
    match observe(engine, req.container_name).await? {
        ContainerState::Running => return Ok(()),
        ContainerState::Stopped => {
            ctx.info(&format!(
                "Found stopped container '{}', attempting to restart...",
                req.container_name
            ));
            match engine.start_container(req.container_name).await {
                Ok(()) => {
                    ctx.success(&format!("Container '{}' restarted.", req.container_name));
                    return Ok(());
                }
                Err(err) => {
                    ctx.warn(&format!(
                        "Restart failed ({err:#}), removing container and creating a new one..."
                    ));
                    engine.remove_container(req.container_name).await?;
                }
            }
        }
        ContainerState::Absent => {}
    }

    if !engine.image_exists(req.image).await? {
        ctx.info(&format!("Image '{}' not found, building...", req.image));
        version::build_image(engine, ctx, req.build_root, req.image, &VersionSet::fallback())
            .await
            .context("building image")?;
    }

    create_and_start(engine, ctx, req).await
}

async fn create_and_start<E: Engine>(
    engine: &E,
    ctx: &OutputContext,
    req: &EnsureRequest<'_>,
) -> Result<()> {
    let env = run_env(ctx);
    let mount_args = compile_mounts(ctx, req);

    ctx.info(&format!(
        "Starting container '{}' with {} mounted at {WORKSPACE_MOUNT}...",
        req.container_name,
        req.workspace.display()
    ));

    let spec = RunSpec {
        name: req.container_name,
        hostname: CONTAINER_HOSTNAME,
        env: &env,
        mount_args: &mount_args,
        image: req.image,
    };
    engine.run_detached(&spec).await.context("starting container")
}

/// Environment injected at container creation: terminal type, color
/// support, timezone, and git author identity when configured on the host.
fn run_env(ctx: &OutputContext) -> Vec<(String, String)> {
    let mut env = vec![
        ("TERM".to_string(), hostctx::terminal()),
        ("COLORTERM".to_string(), "truecolor".to_string()),
    ];

    let timezone = hostctx::host_timezone();
    ctx.info(&format!("Configuring timezone: {timezone}"));
    env.push(("TZ".to_string(), timezone));

    let git = hostctx::git_identity();
    if !git.name.is_empty() {
        ctx.info(&format!("Configuring git user: {} <{}>", git.name, git.email));
        env.push(("GIT_USER_NAME".to_string(), git.name));
        env.push(("GIT_USER_EMAIL".to_string(), git.email));
    }

    env
}

/// The workspace bind mount first, then every configured mount in
/// declaration order. Lists are concatenated, never deduplicated; duplicate
/// targets are passed through for the engine to arbitrate.
fn compile_mounts(ctx: &OutputContext, req: &EnsureRequest<'_>) -> Vec<String> {
    let mut args = vec![
        "-v".to_string(),
        format!("{}:{WORKSPACE_MOUNT}", req.workspace.display()),
    ];
    for spec in &req.config.mounts {
        let compiled = spec.compile(req.workspace, req.container_name);
        for warning in &compiled.warnings {
            ctx.warn(warning);
        }
        args.extend(compiled.args);
    }
    args
}
