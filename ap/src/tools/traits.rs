//! Tool trait definition

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use tracing::debug;

use super::context::ToolContext;
use super::error::{FailureKind, ToolError};

/// The closed set of tools the model may call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToolName {
    GetFilesInfo,
    GetFileContent,
    WriteFile,
    RunScriptFile,
}

impl ToolName {
    pub const ALL: [ToolName; 4] = [
        ToolName::GetFilesInfo,
        ToolName::GetFileContent,
        ToolName::WriteFile,
        ToolName::RunScriptFile,
    ];

    /// Wire name (matches LLM tool_use name)
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::GetFilesInfo => "get_files_info",
            Self::GetFileContent => "get_file_content",
            Self::WriteFile => "write_file",
            Self::RunScriptFile => "run_script_file",
        }
    }
}

impl fmt::Display for ToolName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ToolName {
    type Err = ToolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|name| name.as_str() == s)
            .ok_or_else(|| ToolError::UnknownTool { name: s.to_string() })
    }
}

/// A sandboxed operation the model can call
///
/// Arguments arrive as untyped JSON and are deserialized into `Args` by the
/// dispatcher before `run` is called; `input_schema` must describe exactly the
/// fields `Args` accepts.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Typed arguments, minus the working directory
    type Args: DeserializeOwned + Send;

    /// Tool name
    fn name(&self) -> ToolName;

    /// Human-readable description
    fn description(&self) -> String;

    /// JSON Schema for input parameters
    fn input_schema(&self) -> Value;

    /// Execute the tool inside `ctx`
    async fn run(&self, args: Self::Args, ctx: &ToolContext) -> Result<String, ToolError>;
}

/// Result of a tool execution
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolResult {
    Success(String),
    Failure { kind: FailureKind, message: String },
}

impl ToolResult {
    /// Create a successful result
    pub fn success(content: impl Into<String>) -> Self {
        debug!("ToolResult::success: called");
        Self::Success(content.into())
    }

    /// Create an error result
    pub fn failure(kind: FailureKind, message: impl Into<String>) -> Self {
        debug!(?kind, "ToolResult::failure: called");
        Self::Failure {
            kind,
            message: message.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Self::Failure { .. })
    }

    /// The failure classification, if any
    pub fn kind(&self) -> Option<FailureKind> {
        match self {
            Self::Success(_) => None,
            Self::Failure { kind, .. } => Some(*kind),
        }
    }

    /// Success text or failure message
    pub fn content(&self) -> &str {
        match self {
            Self::Success(text) => text,
            Self::Failure { message, .. } => message,
        }
    }

    /// The payload embedded in the conversation: `{"result": ..}` or `{"error": ..}`
    pub fn to_payload(&self) -> Value {
        match self {
            Self::Success(text) => serde_json::json!({ "result": text }),
            Self::Failure { message, .. } => serde_json::json!({ "error": message }),
        }
    }
}

impl From<ToolError> for ToolResult {
    fn from(err: ToolError) -> Self {
        Self::failure(err.kind(), err.to_string())
    }
}

impl From<Result<String, ToolError>> for ToolResult {
    fn from(result: Result<String, ToolError>) -> Self {
        match result {
            Ok(text) => Self::success(text),
            Err(err) => err.into(),
        }
    }
}
