//! Tool system for the agent loop
//!
//! Tools provide directory listing, file access and script execution to the
//! model. Every call is resolved against a working root through a
//! `ToolContext` - tools cannot escape the root.

mod confine;
mod context;
mod dispatcher;
mod error;
mod traits;

pub mod builtin;

pub use confine::{ConfinementError, confine, normalize, resolve_root};
pub use context::{DEFAULT_MAX_CHARS, DEFAULT_SCRIPT_TIMEOUT, SandboxSettings, ScriptSettings, ToolContext};
pub use dispatcher::{ToolDispatcher, WORKING_DIRECTORY_KEY};
pub use error::{Access, FailureKind, ToolError};
pub use traits::{Tool, ToolName, ToolResult};
