//! Host context — ambient facts injected into the container environment.
//!
//! Every collector here is best-effort: a missing binary, file, or setting
//! degrades to an empty or fallback value, never an error.

use std::path::Path;
use std::process::Command;

/// Git author identity from the host's global git config. Each field is
/// independently optional; missing config yields an empty string.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GitIdentity {
    pub name: String,
    pub email: String,
}

#[must_use]
pub fn git_identity() -> GitIdentity {
    GitIdentity {
        name: git_config_global("user.name"),
        email: git_config_global("user.email"),
    }
}

fn git_config_global(key: &str) -> String {
    Command::new("git")
        .args(["config", "--global", key])
        .output()
        .ok()
        .filter(|output| output.status.success())
        .map(|output| String::from_utf8_lossy(&output.stdout).trim().to_string())
        .unwrap_or_default()
}

/// Host terminal type, defaulting to `xterm-256color` when `TERM` is unset.
#[must_use]
pub fn terminal() -> String {
    std::env::var("TERM")
        .ok()
        .filter(|term| !term.is_empty())
        .unwrap_or_else(|| "xterm-256color".to_string())
}

/// Ordered timezone resolution strategies; the first non-empty result wins.
const TIMEZONE_RESOLVERS: &[fn() -> Option<String>] = &[
    tz_from_env,
    tz_from_etc_timezone,
    tz_from_timedatectl,
    tz_from_localtime_symlink,
];

/// Resolve the host timezone: `TZ` env var, `/etc/timezone`, `timedatectl`,
/// the `/etc/localtime` symlink target, then `"UTC"`.
#[must_use]
pub fn host_timezone() -> String {
    TIMEZONE_RESOLVERS
        .iter()
        .find_map(|resolve| resolve())
        .unwrap_or_else(|| "UTC".to_string())
}

fn tz_from_env() -> Option<String> {
    std::env::var("TZ").ok().filter(|tz| !tz.is_empty())
}

fn tz_from_etc_timezone() -> Option<String> {
    read_timezone_file(Path::new("/etc/timezone"))
}

fn read_timezone_file(path: &Path) -> Option<String> {
    let contents = std::fs::read_to_string(path).ok()?;
    let tz = contents.trim();
    (!tz.is_empty()).then(|| tz.to_string())
}

fn tz_from_timedatectl() -> Option<String> {
    let output = Command::new("timedatectl")
        .args(["show", "-p", "Timezone", "--value"])
        .output()
        .ok()?;
    if !output.status.success() {
        return None;
    }
    let tz = String::from_utf8_lossy(&output.stdout).trim().to_string();
    (!tz.is_empty()).then_some(tz)
}

fn tz_from_localtime_symlink() -> Option<String> {
    let target = std::fs::canonicalize("/etc/localtime").ok()?;
    zone_from_localtime_target(&target)
}

/// Extract the zone name from a resolved localtime target such as
/// `/usr/share/zoneinfo/Europe/Berlin` → `Europe/Berlin`.
fn zone_from_localtime_target(target: &Path) -> Option<String> {
    let parts: Vec<&str> = target.iter().filter_map(|c| c.to_str()).collect();
    let index = parts.iter().position(|part| *part == "zoneinfo")?;
    let zone = parts.get(index + 1..)?.join("/");
    (!zone.is_empty()).then_some(zone)
}
