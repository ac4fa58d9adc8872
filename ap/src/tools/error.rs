//! Tool error types

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// The kind of filesystem access a tool is attempting, used in confinement messages
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    List,
    Read,
    Write,
    Execute,
}

impl fmt::Display for Access {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::List => write!(f, "list"),
            Self::Read => write!(f, "read"),
            Self::Write => write!(f, "write"),
            Self::Execute => write!(f, "execute"),
        }
    }
}

/// Classification of a failed tool call, reported alongside the message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    OutsideRoot,
    NotFound,
    NotADirectory,
    IsADirectory,
    WrongFileType,
    InvalidArguments,
    Timeout,
    ExecError,
    IoError,
    UnknownTool,
    InternalError,
}

/// Errors that can occur during tool execution
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("Cannot {access} \"{path}\" as it is outside the permitted working directory")]
    OutsideRoot { access: Access, path: String },

    #[error("Working directory \"{}\" does not exist or is not a directory", root.display())]
    MissingRoot { root: PathBuf },

    #[error("\"{path}\" is not a directory")]
    NotADirectory { path: String },

    #[error("File not found or is not a regular file: \"{path}\"")]
    FileNotFound { path: String },

    #[error("\"{path}\" does not exist or is not a regular file")]
    ScriptNotFound { path: String },

    #[error("\"{path}\" is not a {label} file")]
    WrongScriptType { path: String, label: String },

    #[error("Cannot write to \"{path}\" as it is a directory")]
    IsADirectory { path: String },

    #[error("Could not list \"{path}\": {source}")]
    ListDir {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Could not read file \"{path}\": {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Could not create directories for \"{path}\": {source}")]
    CreateDirs {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Could not write file \"{path}\": {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Executing \"{path}\" timed out after {timeout_ms}ms")]
    Timeout { path: String, timeout_ms: u64 },

    #[error("executing {label} file: {source}")]
    Exec {
        label: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Unknown function: {name}")]
    UnknownTool { name: String },

    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    #[error("Function execution error: {0}")]
    Internal(String),
}

impl ToolError {
    /// Map the error onto the failure taxonomy reported to the model
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::OutsideRoot { .. } => FailureKind::OutsideRoot,
            Self::MissingRoot { .. } | Self::NotADirectory { .. } => FailureKind::NotADirectory,
            Self::FileNotFound { .. } | Self::ScriptNotFound { .. } => FailureKind::NotFound,
            Self::WrongScriptType { .. } => FailureKind::WrongFileType,
            Self::IsADirectory { .. } => FailureKind::IsADirectory,
            Self::ListDir { .. } | Self::Read { .. } | Self::CreateDirs { .. } | Self::Write { .. } => {
                FailureKind::IoError
            }
            Self::Timeout { .. } => FailureKind::Timeout,
            Self::Exec { .. } => FailureKind::ExecError,
            Self::UnknownTool { .. } => FailureKind::UnknownTool,
            Self::InvalidArguments(_) => FailureKind::InvalidArguments,
            Self::Internal(_) => FailureKind::InternalError,
        }
    }
}
