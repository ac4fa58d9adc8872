//! write_file tool - write content to a file

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::tools::{Access, Tool, ToolContext, ToolError, ToolName};

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WriteFileArgs {
    pub file_path: String,
    pub content: String,
}

/// Write content to a file, replacing whatever was there
pub struct WriteFileTool;

#[async_trait]
impl Tool for WriteFileTool {
    type Args = WriteFileArgs;

    fn name(&self) -> ToolName {
        ToolName::WriteFile
    }

    fn description(&self) -> String {
        "Writes content to a specified file relative to the working directory, creating directories as needed"
            .to_string()
    }

    fn input_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "file_path": {
                    "type": "string",
                    "description": "File path to write content to, relative to the working directory"
                },
                "content": {
                    "type": "string",
                    "description": "Content to write to the file"
                }
            },
            "required": ["file_path", "content"]
        })
    }

    async fn run(&self, args: WriteFileArgs, ctx: &ToolContext) -> Result<String, ToolError> {
        debug!(file_path = %args.file_path, content_len = %args.content.len(), "WriteFileTool::run: called");
        let target = ctx.confine(&args.file_path, Access::Write)?;

        let is_dir = tokio::fs::metadata(&target).await.map(|m| m.is_dir()).unwrap_or(false);
        if is_dir {
            debug!(?target, "WriteFileTool::run: target is a directory");
            return Err(ToolError::IsADirectory { path: args.file_path });
        }

        // Create parent directories
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|source| ToolError::CreateDirs {
                    path: args.file_path.clone(),
                    source,
                })?;
        }

        tokio::fs::write(&target, &args.content)
            .await
            .map_err(|source| ToolError::Write {
                path: args.file_path.clone(),
                source,
            })?;

        let written = args.content.chars().count();
        debug!(%written, "WriteFileTool::run: file written successfully");
        Ok(format!(
            "Successfully wrote to \"{}\" ({} characters written)",
            args.file_path, written
        ))
    }
}
