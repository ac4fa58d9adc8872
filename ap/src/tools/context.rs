//! ToolContext - execution context for tools

use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

use super::ToolError;
use super::confine::{confine, resolve_root};
use super::error::Access;

/// Default cap on characters returned by a file read
pub const DEFAULT_MAX_CHARS: usize = 10_000;

/// Default wall-clock bound for script execution
pub const DEFAULT_SCRIPT_TIMEOUT: Duration = Duration::from_secs(30);

/// How scripts are recognized and launched
#[derive(Debug, Clone)]
pub struct ScriptSettings {
    /// Interpreter executable, looked up on PATH
    pub interpreter: String,

    /// Required file extension, without the dot
    pub extension: String,

    /// Human-readable script type used in messages ("Python")
    pub label: String,

    /// Hard wall-clock limit; the process is killed when it expires
    pub timeout: Duration,
}

impl Default for ScriptSettings {
    fn default() -> Self {
        Self {
            interpreter: "python3".to_string(),
            extension: "py".to_string(),
            label: "Python".to_string(),
            timeout: DEFAULT_SCRIPT_TIMEOUT,
        }
    }
}

/// Sandbox configuration threaded into the dispatcher at construction
#[derive(Debug, Clone)]
pub struct SandboxSettings {
    /// Working root used when a tool call does not name one
    pub default_root: PathBuf,

    /// Fallback base for relative roots that don't exist under the current directory
    pub project_root: Option<PathBuf>,

    /// Read cap in characters
    pub max_chars: usize,

    /// Script runner settings
    pub script: ScriptSettings,
}

impl SandboxSettings {
    /// Settings rooted at `default_root` with every other value defaulted
    pub fn new(default_root: impl Into<PathBuf>) -> Self {
        Self {
            default_root: default_root.into(),
            project_root: None,
            max_chars: DEFAULT_MAX_CHARS,
            script: ScriptSettings::default(),
        }
    }

    pub fn with_project_root(mut self, project_root: impl Into<PathBuf>) -> Self {
        self.project_root = Some(project_root.into());
        self
    }

    pub fn with_max_chars(mut self, max_chars: usize) -> Self {
        self.max_chars = max_chars;
        self
    }

    pub fn with_script(mut self, script: ScriptSettings) -> Self {
        self.script = script;
        self
    }
}

/// Execution context for a single tool invocation
///
/// Holds the resolved working root. Every path a tool touches goes through
/// [`ToolContext::confine`] first.
#[derive(Debug, Clone)]
pub struct ToolContext {
    root: PathBuf,
}

impl ToolContext {
    /// Resolve a working root and check that it is an existing directory
    ///
    /// The root is never created here, not even for writes.
    pub async fn resolve(root: &Path, project_root: Option<&Path>) -> Result<Self, ToolError> {
        debug!(?root, ?project_root, "ToolContext::resolve: called");
        let resolved = resolve_root(root, project_root).map_err(|e| {
            debug!(%e, "ToolContext::resolve: could not make root absolute");
            ToolError::MissingRoot {
                root: root.to_path_buf(),
            }
        })?;

        match tokio::fs::metadata(&resolved).await {
            Ok(meta) if meta.is_dir() => {
                debug!(?resolved, "ToolContext::resolve: root is a directory");
                Ok(Self { root: resolved })
            }
            _ => {
                debug!(?resolved, "ToolContext::resolve: root missing or not a directory");
                Err(ToolError::MissingRoot { root: resolved })
            }
        }
    }

    /// The absolute, normalized working root
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve `relative` under the root, rejecting escapes
    pub fn confine(&self, relative: &str, access: Access) -> Result<PathBuf, ToolError> {
        confine(&self.root, relative).map_err(|e| e.with_access(access))
    }
}
