//! `vibecon -K` — permanently remove the workspace container.

use anyhow::Result;

use crate::engine::Engine;
use crate::output::OutputContext;

/// Force-remove the container; the next default invocation recreates it
/// from scratch.
///
/// # Errors
///
/// Returns an error if the engine cannot be reached.
pub async fn run<E: Engine>(engine: &E, ctx: &OutputContext, container_name: &str) -> Result<()> {
    ctx.info(&format!("Destroying container '{container_name}'..."));
    engine.remove_container(container_name).await?;
    ctx.success("Container destroyed.");
    Ok(())
}
