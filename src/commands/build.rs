//! `vibecon -b` / `-B` — rebuild the image when tool versions changed, or
//! unconditionally.

use std::path::Path;

use anyhow::Result;

use crate::cli::Settings;
use crate::engine::Engine;
use crate::output::OutputContext;
use crate::version;

/// Check registry versions and rebuild the image if the composite-tagged
/// image is missing; `force` rebuilds regardless.
///
/// # Errors
///
/// Returns an error if the engine is unreachable or the build fails.
pub async fn run<E: Engine>(
    engine: &E,
    ctx: &OutputContext,
    settings: &Settings,
    build_root: &Path,
    force: bool,
) -> Result<()> {
    let versions = version::discover(ctx).await;
    let versioned = version::versioned_image(&settings.image, &versions.composite_tag());
    let exists = engine.image_exists(&versioned).await?;

    if exists && !force {
        ctx.info(&format!("Image already exists: {versioned}"));
        ctx.info("No rebuild needed - all versions are up to date.");
        ctx.info("Use -B/--force-build to rebuild anyway.");
        return Ok(());
    }

    if force && exists {
        ctx.info("Force rebuild requested...");
    } else {
        ctx.info("New versions detected, building image...");
    }
    version::build_image(engine, ctx, build_root, &settings.image, &versions).await?;

    ctx.success("Build complete! Image tagged as:");
    ctx.info(&format!("  - {}", settings.image));
    ctx.info(&format!("  - {versioned}"));
    Ok(())
}
