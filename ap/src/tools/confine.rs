//! Path confinement - keeps every tool operation inside its working root
//!
//! Confinement is purely lexical: `.` and `..` are folded away and the result
//! must have the root as a component-wise prefix. Symlinks inside the root are
//! not resolved, so a link pointing outside the root is followed by the tools.

use std::io;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;
use tracing::debug;

use super::error::{Access, ToolError};

/// A relative path that resolved outside the working root
#[derive(Debug, Error)]
#[error("\"{path}\" is outside the permitted working directory")]
pub struct ConfinementError {
    /// The path exactly as the caller supplied it
    pub path: String,
}

impl ConfinementError {
    /// Attach the attempted access to produce the caller-facing error
    pub fn with_access(self, access: Access) -> ToolError {
        ToolError::OutsideRoot {
            access,
            path: self.path,
        }
    }
}

/// Fold `.` and `..` components without touching the filesystem
///
/// `..` at the filesystem root stays at the root; leading `..` on a relative
/// path is preserved.
pub fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for comp in path.components() {
        match comp {
            Component::CurDir => {}
            Component::ParentDir => match out.components().next_back() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => out.push(comp),
            },
            other => out.push(other),
        }
    }
    out
}

/// Resolve a configured working root to an absolute, normalized path
///
/// A relative root that does not exist under the process working directory is
/// retried under `project_root`, so short names like `calculator` work no matter
/// where the binary is launched from.
pub fn resolve_root(root: &Path, project_root: Option<&Path>) -> io::Result<PathBuf> {
    debug!(?root, ?project_root, "resolve_root: called");
    let mut candidate = root.to_path_buf();

    if root.is_relative() && !root.exists() {
        if let Some(project_root) = project_root {
            let fallback = project_root.join(root);
            if fallback.exists() {
                debug!(?fallback, "resolve_root: using project root fallback");
                candidate = fallback;
            }
        }
    }

    let absolute = std::path::absolute(&candidate)?;
    Ok(normalize(&absolute))
}

/// Join `relative` onto `root` and reject anything that leaves it
///
/// `root` must already be absolute and normalized (see [`resolve_root`]).
pub fn confine(root: &Path, relative: &str) -> Result<PathBuf, ConfinementError> {
    debug!(?root, %relative, "confine: called");
    let target = normalize(&root.join(relative));

    if target.starts_with(root) {
        Ok(target)
    } else {
        debug!(?target, "confine: target escapes root");
        Err(ConfinementError {
            path: relative.to_string(),
        })
    }
}
