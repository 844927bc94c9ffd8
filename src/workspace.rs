//! Workspace identity — pure mapping from a host directory to a container name.
//!
//! This module is intentionally free of I/O; all functions take data in and
//! return data out.

use std::path::Path;

use md5::{Digest, Md5};

/// Fixed in-container path where the workspace directory is bind-mounted.
pub const WORKSPACE_MOUNT: &str = "/workspace";

/// Hostname assigned to every workspace container.
pub const CONTAINER_HOSTNAME: &str = "vibecon";

/// Derive the container name for a workspace directory.
///
/// The name is `vibecon-<sanitized>-<hash8>`: the sanitized path is
/// lowercased, stripped of its leading separator, with `/` and `_` replaced
/// by `-`; `hash8` is the first 8 hex characters of the MD5 digest of the
/// raw path string. Deterministic across runs. The mapping is textual —
/// trailing-slash or symlinked spellings of the same directory yield
/// different names — and the 32-bit hash prefix bounds collision resistance,
/// not a guaranteed bijection.
#[must_use]
pub fn container_name_for(workspace: &Path) -> String {
    let raw = workspace.to_string_lossy();
    let digest = hex_encode(Md5::digest(raw.as_bytes()).as_slice());
    let hash8 = &digest[..8];

    let sanitized = raw
        .trim_start_matches('/')
        .replace(['/', '_'], "-")
        .to_lowercase();

    format!("vibecon-{sanitized}-{hash8}")
}

/// Lowercase hex encoding of a byte slice.
#[must_use]
pub fn hex_encode(bytes: &[u8]) -> String {
    use std::fmt::Write as _;
    bytes.iter().fold(
        String::with_capacity(bytes.len() * 2),
        |mut out, byte| {
            let _ = write!(out, "{byte:02x}");
            out
        },
    )
}
