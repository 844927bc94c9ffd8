//! `vibecon -k` — stop the workspace container, preserving it for restart.

use anyhow::Result;

use crate::engine::Engine;
use crate::output::OutputContext;

/// Stop the container. A container that is not running is not an error.
///
/// # Errors
///
/// Never fails in practice; the signature matches the other commands.
pub async fn run<E: Engine>(engine: &E, ctx: &OutputContext, container_name: &str) -> Result<()> {
    ctx.info(&format!("Stopping container '{container_name}'..."));
    match engine.stop_container(container_name).await {
        Ok(()) => ctx.success("Container stopped."),
        Err(_) => ctx.info("Container was not running."),
    }
    Ok(())
}
