//! Default path — ensure the workspace container is running, sync host
//! config into it, then exec the requested command interactively.

use std::path::Path;

use anyhow::Result;

use crate::cli::Settings;
use crate::config;
use crate::engine::Engine;
use crate::hostctx;
use crate::lifecycle::{self, EnsureRequest};
use crate::output::OutputContext;
use crate::sync;

/// Run a command in the workspace container, returning its exit code.
///
/// # Errors
///
/// Returns an error if the config is malformed, the container cannot be
/// brought up, or the exec cannot be spawned. Sync failures are warnings.
pub async fn run<E: Engine>(
    engine: &E,
    ctx: &OutputContext,
    settings: &Settings,
    workspace: &Path,
    container_name: &str,
    command: &[String],
) -> Result<i32> {
    let cfg = config::merged(workspace)?;
    let build_root = crate::install::build_root()?;

    lifecycle::ensure_running(
        engine,
        ctx,
        &EnsureRequest {
            workspace,
            container_name,
            image: &settings.image,
            build_root: &build_root,
            config: &cfg,
        },
    )
    .await?;

    // Sync is best-effort and never blocks the exec.
    if let Err(err) = sync::sync_claude_config(engine, ctx, container_name).await {
        ctx.warn(&format!("Failed to sync Claude config: {err:#}"));
    }

    let env = [
        ("TERM".to_string(), hostctx::terminal()),
        ("COLORTERM".to_string(), "truecolor".to_string()),
        ("TZ".to_string(), hostctx::host_timezone()),
    ];
    engine.exec_interactive(container_name, &env, command).await
}
