//! Tool version discovery and image building.
//!
//! Versions are fetched from external registries and are purely advisory:
//! every query failure degrades that one slot to a sentinel value, never
//! the whole batch.

use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::engine::Engine;
use crate::output::OutputContext;

pub const GEMINI_CLI_PACKAGE: &str = "@google/gemini-cli";
pub const OPENAI_CODEX_PACKAGE: &str = "@openai/codex";

const GO_RELEASES_URL: &str = "https://go.dev/dl/?mode=json";

/// Sentinel for npm tools whose version could not be determined.
const LATEST: &str = "latest";
/// Pinned fallback when go.dev cannot be reached.
const GO_FALLBACK_VERSION: &str = "1.24.2";

/// Versions of the tools bundled into the image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionSet {
    pub gemini: String,
    pub codex: String,
    pub go: String,
}

impl VersionSet {
    /// Sentinel set used when discovery is skipped entirely (e.g. an
    /// implicit build on the ensure-running path).
    #[must_use]
    pub fn fallback() -> Self {
        Self {
            gemini: LATEST.to_string(),
            codex: LATEST.to_string(),
            go: GO_FALLBACK_VERSION.to_string(),
        }
    }

    /// Composite image tag encoding the exact bundled tool versions,
    /// e.g. `g0.4.1_oac0.13.0_go1.24.2`.
    #[must_use]
    pub fn composite_tag(&self) -> String {
        format!("g{}_oac{}_go{}", self.gemini, self.codex, self.go)
    }
}

/// Fetch all tool versions concurrently. The npm queries and the go.dev
/// query are independent; each is joined here and each failure is isolated
/// to its own slot.
pub async fn discover(ctx: &OutputContext) -> VersionSet {
    ctx.info("Checking latest versions...");

    let go_task = tokio::task::spawn_blocking(latest_stable_go);
    let (gemini, codex, go) = tokio::join!(
        npm_package_version(GEMINI_CLI_PACKAGE),
        npm_package_version(OPENAI_CODEX_PACKAGE),
        go_task,
    );
    let go = go.context("Go version task panicked").and_then(|result| result);

    VersionSet {
        gemini: report(ctx, "Gemini CLI", gemini, LATEST),
        codex: report(ctx, "OpenAI Codex", codex, LATEST),
        go: report(ctx, "Go", go, GO_FALLBACK_VERSION),
    }
}

fn report(ctx: &OutputContext, tool: &str, result: Result<String>, sentinel: &str) -> String {
    match result {
        Ok(version) => {
            ctx.info(&format!("  {tool}: {version}"));
            version
        }
        Err(_) => {
            ctx.warn(&format!("{tool}: {sentinel} (failed to fetch)"));
            sentinel.to_string()
        }
    }
}

async fn npm_package_version(package: &str) -> Result<String> {
    let output = tokio::process::Command::new("npm")
        .args(["view", package, "version"])
        .output()
        .await
        .context("failed to run npm view")?;
    anyhow::ensure!(output.status.success(), "npm view {package} failed");
    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

#[derive(Debug, Deserialize)]
struct GoRelease {
    version: String,
    stable: bool,
}

fn latest_stable_go() -> Result<String> {
    let body = ureq::get(GO_RELEASES_URL)
        .call()
        .context("failed to fetch Go releases")?
        .into_string()
        .context("failed to read Go releases response")?;
    let releases: Vec<GoRelease> =
        serde_json::from_str(&body).context("failed to parse Go releases JSON")?;
    first_stable_version(&releases).ok_or_else(|| anyhow::anyhow!("no stable Go release listed"))
}

/// The release list is newest-first; versions are published as `go1.24.2`.
fn first_stable_version(releases: &[GoRelease]) -> Option<String> {
    releases
        .iter()
        .find(|release| release.stable)
        .map(|release| release.version.trim_start_matches("go").to_string())
}

/// Build the image, tagging it with both the primary name and the
/// version-composite tag.
///
/// # Errors
///
/// Returns an error if the engine build fails.
pub async fn build_image<E: Engine>(
    engine: &E,
    ctx: &OutputContext,
    build_root: &Path,
    image: &str,
    versions: &VersionSet,
) -> Result<()> {
    let composite = versions.composite_tag();
    ctx.info(&format!("Building image with composite tag: {composite}"));

    let build_args = [
        ("GEMINI_CLI_VERSION".to_string(), versions.gemini.clone()),
        ("OPENAI_CODEX_VERSION".to_string(), versions.codex.clone()),
        ("GO_VERSION".to_string(), versions.go.clone()),
    ];
    let tags = [image.to_string(), versioned_image(image, &composite)];
    ctx.info(&format!("Tagging as: {} and {}", tags[0], tags[1]));

    engine.build_image(build_root, &build_args, &tags).await
}

/// Combine an image's repository part with the composite tag:
/// `vibecon:latest` + `g…_oac…_go…` → `vibecon:g…_oac…_go…`.
#[must_use]
pub fn versioned_image(image: &str, composite_tag: &str) -> String {
    let repo = image.split(':').next().unwrap_or(image);
    format!("{repo}:{composite_tag}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_composite_tag_format() {
        let versions = VersionSet {
            gemini: "0.4.1".to_string(),
            codex: "0.13.0".to_string(),
            go: "1.24.2".to_string(),
        };
        assert_eq!(versions.composite_tag(), "g0.4.1_oac0.13.0_go1.24.2");
    }

    #[test]
    fn test_fallback_uses_sentinels() {
        let versions = VersionSet::fallback();
        assert_eq!(versions.gemini, "latest");
        assert_eq!(versions.codex, "latest");
        assert_eq!(versions.go, GO_FALLBACK_VERSION);
    }

    #[test]
    fn test_versioned_image_replaces_tag() {
        assert_eq!(
            versioned_image("vibecon:latest", "glatest_oaclatest_go1.24.2"),
            "vibecon:glatest_oaclatest_go1.24.2"
        );
    }

    #[test]
    fn test_versioned_image_without_tag() {
        assert_eq!(versioned_image("vibecon", "gx_oacy_goz"), "vibecon:gx_oacy_goz");
    }

    #[test]
    fn test_first_stable_version_skips_unstable_releases() {
        let releases = vec![
            GoRelease {
                version: "go1.25rc1".to_string(),
                stable: false,
            },
            GoRelease {
                version: "go1.24.2".to_string(),
                stable: true,
            },
            GoRelease {
                version: "go1.23.8".to_string(),
                stable: true,
            },
        ];
        assert_eq!(first_stable_version(&releases).as_deref(), Some("1.24.2"));
    }

    #[test]
    fn test_first_stable_version_empty_list_is_none() {
        assert_eq!(first_stable_version(&[]), None);
    }

    #[test]
    fn test_go_release_list_parses() {
        let body = r#"[
            {"version": "go1.24.2", "stable": true, "files": []},
            {"version": "go1.23.8", "stable": true, "files": []}
        ]"#;
        let releases: Vec<GoRelease> = serde_json::from_str(body).expect("parse");
        assert_eq!(first_stable_version(&releases).as_deref(), Some("1.24.2"));
    }
}
