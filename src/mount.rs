//! Declarative mount specifications and their compilation to engine arguments.
//!
//! A mount is declared as a JSON object with a `type` discriminant and
//! compiles to one of two docker invocation syntaxes: the short `-v` form,
//! or the structured `--mount` form when ownership options are requested
//! (the short form has no channel for uid/gid remapping).

use std::path::{Component, Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

/// Rejection of a mount specification. Raised eagerly, before any engine
/// call is issued, so a bad config never leaves partial engine state.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MountError {
    /// Bare strings are ambiguous between the bind/volume/anonymous
    /// syntaxes and are rejected outright.
    #[error("mount spec must be an object with a 'type' field, got: {0}")]
    NotAnObject(String),

    /// Missing or unknown `type`, missing `source`, or any other structural
    /// mismatch reported by the deserializer.
    #[error("invalid mount spec: {0}")]
    Invalid(String),

    #[error("mount missing required 'target' field")]
    MissingTarget,
}

/// SELinux relabeling option appended to short-form mount strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum SelinuxLabel {
    /// `z` — content shared between containers.
    #[serde(rename = "z")]
    Shared,
    /// `Z` — content private to this container.
    #[serde(rename = "Z")]
    Private,
}

impl SelinuxLabel {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Shared => "z",
            Self::Private => "Z",
        }
    }
}

/// A validated mount declaration.
///
/// `uid`/`gid` are honored for volume and anonymous mounts; for bind mounts
/// they are accepted but dropped with a warning, since the bind primitive
/// has no ownership-remap facility.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum MountSpec {
    Bind {
        source: String,
        target: String,
        #[serde(default)]
        read_only: bool,
        #[serde(default)]
        selinux: Option<SelinuxLabel>,
        #[serde(default)]
        uid: Option<u32>,
        #[serde(default)]
        gid: Option<u32>,
    },
    Volume {
        source: String,
        target: String,
        #[serde(default)]
        read_only: bool,
        #[serde(default)]
        selinux: Option<SelinuxLabel>,
        /// When set, the volume name is used verbatim and shared across
        /// workspaces; otherwise it is namespaced by the container name.
        #[serde(default)]
        global: bool,
        #[serde(default)]
        uid: Option<u32>,
        #[serde(default)]
        gid: Option<u32>,
    },
    Anonymous {
        target: String,
        #[serde(default)]
        read_only: bool,
        #[serde(default)]
        selinux: Option<SelinuxLabel>,
        #[serde(default)]
        uid: Option<u32>,
        #[serde(default)]
        gid: Option<u32>,
    },
}

/// Result of compiling one mount: docker arguments plus non-fatal warnings
/// for the caller to render.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct CompiledMount {
    pub args: Vec<String>,
    pub warnings: Vec<String>,
}

impl MountSpec {
    /// Parse a single mount declaration from its JSON value.
    ///
    /// # Errors
    ///
    /// Returns a [`MountError`] when the value is not an object, the `type`
    /// discriminant is missing or unknown, a required `source` is missing,
    /// or `target` is missing or empty.
    pub fn parse(value: &serde_json::Value) -> Result<Self, MountError> {
        if !value.is_object() {
            return Err(MountError::NotAnObject(value.to_string()));
        }
        let spec: Self = serde_json::from_value(value.clone())
            .map_err(|e| MountError::Invalid(e.to_string()))?;
        if spec.target().is_empty() {
            return Err(MountError::MissingTarget);
        }
        Ok(spec)
    }

    /// The in-container mount point.
    #[must_use]
    pub fn target(&self) -> &str {
        match self {
            Self::Bind { target, .. }
            | Self::Volume { target, .. }
            | Self::Anonymous { target, .. } => target,
        }
    }

    /// Compile this mount into docker run arguments.
    ///
    /// Relative bind sources are resolved against `project_root`; volume
    /// names are namespaced by `container_name` unless declared global.
    /// Infallible: all structural validation happens in [`MountSpec::parse`].
    #[must_use]
    pub fn compile(&self, project_root: &Path, container_name: &str) -> CompiledMount {
        match self {
            Self::Anonymous {
                target,
                read_only,
                uid,
                gid,
                ..
            } => compile_anonymous(target, *read_only, *uid, *gid),
            Self::Bind {
                source,
                target,
                read_only,
                selinux,
                uid,
                gid,
            } => compile_bind(source, target, *read_only, *selinux, *uid, *gid, project_root),
            Self::Volume {
                source,
                target,
                read_only,
                selinux,
                global,
                uid,
                gid,
            } => {
                let volume_name = if *global {
                    source.clone()
                } else {
                    format!("{container_name}_{source}")
                };
                compile_volume(&volume_name, target, *read_only, *selinux, *uid, *gid)
            }
        }
    }
}

fn compile_anonymous(
    target: &str,
    read_only: bool,
    uid: Option<u32>,
    gid: Option<u32>,
) -> CompiledMount {
    if uid.is_none() && gid.is_none() {
        return CompiledMount {
            args: vec!["-v".to_string(), target.to_string()],
            warnings: Vec::new(),
        };
    }
    CompiledMount {
        args: tmpfs_mount_args(None, target, read_only, uid, gid),
        warnings: Vec::new(),
    }
}

fn compile_bind(
    source: &str,
    target: &str,
    read_only: bool,
    selinux: Option<SelinuxLabel>,
    uid: Option<u32>,
    gid: Option<u32>,
    project_root: &Path,
) -> CompiledMount {
    let mut warnings = Vec::new();
    if uid.is_some() || gid.is_some() {
        warnings
            .push("uid/gid options ignored for bind mount (not supported by Docker)".to_string());
    }

    let mut resolved = expand_tilde(source);
    if !resolved.is_absolute() {
        resolved = lexical_clean(&project_root.join(&resolved));
    }
    if !resolved.exists() {
        warnings.push(format!(
            "bind mount source does not exist: {}",
            resolved.display()
        ));
    }

    let arg = short_form(&resolved.display().to_string(), target, read_only, selinux);
    CompiledMount {
        args: vec!["-v".to_string(), arg],
        warnings,
    }
}

fn compile_volume(
    volume_name: &str,
    target: &str,
    read_only: bool,
    selinux: Option<SelinuxLabel>,
    uid: Option<u32>,
    gid: Option<u32>,
) -> CompiledMount {
    let args = if uid.is_some() || gid.is_some() {
        tmpfs_mount_args(Some(volume_name), target, read_only, uid, gid)
    } else {
        vec![
            "-v".to_string(),
            short_form(volume_name, target, read_only, selinux),
        ]
    };
    CompiledMount {
        args,
        warnings: Vec::new(),
    }
}

/// `source:target[:ro[,z]]` — suffix options joined by commas after a single
/// colon, only when any are set.
fn short_form(
    source: &str,
    target: &str,
    read_only: bool,
    selinux: Option<SelinuxLabel>,
) -> String {
    let mut arg = format!("{source}:{target}");
    let mut opts = Vec::new();
    if read_only {
        opts.push("ro");
    }
    if let Some(label) = selinux {
        opts.push(label.as_str());
    }
    if !opts.is_empty() {
        arg.push(':');
        arg.push_str(&opts.join(","));
    }
    arg
}

/// Structured `--mount` form backing the volume with tmpfs so uid/gid can be
/// expressed as driver options. The driver-opt field carries commas, so it
/// is CSV-quoted the way docker's flag parser expects.
fn tmpfs_mount_args(
    source: Option<&str>,
    target: &str,
    read_only: bool,
    uid: Option<u32>,
    gid: Option<u32>,
) -> Vec<String> {
    let mut owner_opts = Vec::new();
    if let Some(uid) = uid {
        owner_opts.push(format!("uid={uid}"));
    }
    if let Some(gid) = gid {
        owner_opts.push(format!("gid={gid}"));
    }

    let mut parts = vec!["type=volume".to_string()];
    if let Some(source) = source {
        parts.push(format!("source={source}"));
    }
    parts.push(format!("target={target}"));
    parts.push("volume-opt=type=tmpfs".to_string());
    parts.push("volume-opt=device=tmpfs".to_string());
    parts.push(format!("\"volume-opt=o={}\"", owner_opts.join(",")));
    if read_only {
        parts.push("readonly".to_string());
    }

    vec!["--mount".to_string(), parts.join(",")]
}

/// Expand a leading `~` to the user's home directory. Returns the path
/// unchanged when no home directory can be determined.
pub(crate) fn expand_tilde(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix('~') {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest.trim_start_matches('/'));
        }
    }
    PathBuf::from(path)
}

/// Lexically resolve `.` and `..` components without touching the
/// filesystem.
fn lexical_clean(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}
