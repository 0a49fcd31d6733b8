//! Utility functions and helpers

use std::path::{Component, Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};

/// Environment variable overriding the node binary
pub const NODE_ENV_VAR: &str = "BUILD_ELECTRON_NODE";

/// Locate the node binary, honouring [`NODE_ENV_VAR`] before `PATH`
pub fn node_binary() -> Result<PathBuf> {
    if let Some(node) = std::env::var_os(NODE_ENV_VAR).filter(|v| !v.is_empty()) {
        return Ok(PathBuf::from(node));
    }
    which::which("node").context("`node` was not found on PATH")
}

/// Clean a path by removing `.` components and folding `..` into the
/// preceding normal component.
///
/// A `..` that has nothing to fold into is kept, so relative paths that
/// climb out of their base survive unchanged.
pub fn clean_path(path: &Path) -> PathBuf {
    let mut parts: Vec<Component<'_>> = Vec::new();

    for component in path.components() {
        match component {
            Component::CurDir => continue,
            Component::ParentDir => match parts.last() {
                Some(Component::Normal(_)) => {
                    parts.pop();
                }
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => parts.push(component),
            },
            _ => parts.push(component),
        }
    }

    if parts.is_empty() {
        return PathBuf::from(".");
    }

    parts.iter().map(|c| c.as_os_str()).collect()
}

/// Format duration as human-readable string
pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs_f64();

    if secs >= 60.0 {
        let mins = (secs / 60.0).floor() as u64;
        let remaining_secs = secs - (mins as f64 * 60.0);
        format!("{}m {:.2}s", mins, remaining_secs)
    } else if secs >= 1.0 {
        format!("{:.2}s", secs)
    } else {
        format!("{:.0}ms", secs * 1000.0)
    }
}
