//! get_files_info tool - list a directory with sizes

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use tokio::fs::DirEntry;
use tracing::{debug, warn};

use crate::tools::{Access, Tool, ToolContext, ToolError, ToolName};

fn default_directory() -> String {
    ".".to_string()
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ListDirectoryArgs {
    #[serde(default = "default_directory")]
    pub directory: String,
}

/// List the direct entries of a directory with size and type
pub struct ListDirectoryTool;

#[async_trait]
impl Tool for ListDirectoryTool {
    type Args = ListDirectoryArgs;

    fn name(&self) -> ToolName {
        ToolName::GetFilesInfo
    }

    fn description(&self) -> String {
        "Lists files in the specified directory along with their sizes, constrained to the working directory."
            .to_string()
    }

    fn input_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "directory": {
                    "type": "string",
                    "description": "The directory to list files from, relative to the working directory. If not provided, lists files in the working directory itself."
                }
            }
        })
    }

    async fn run(&self, args: ListDirectoryArgs, ctx: &ToolContext) -> Result<String, ToolError> {
        debug!(?args, "ListDirectoryTool::run: called");
        let target = ctx.confine(&args.directory, Access::List)?;

        let is_dir = tokio::fs::metadata(&target).await.map(|m| m.is_dir()).unwrap_or(false);
        if !is_dir {
            debug!(?target, "ListDirectoryTool::run: not a directory");
            return Err(ToolError::NotADirectory { path: args.directory });
        }

        let mut dir = tokio::fs::read_dir(&target).await.map_err(|source| ToolError::ListDir {
            path: args.directory.clone(),
            source,
        })?;

        let mut lines = Vec::new();
        loop {
            match dir.next_entry().await {
                Ok(Some(entry)) => lines.push(describe_entry(&entry).await),
                Ok(None) => break,
                Err(e) => {
                    warn!(error = %e, directory = %args.directory, "Directory enumeration stopped early");
                    lines.push(format!("Error: could not read remaining entries: {}", e));
                    break;
                }
            }
        }

        debug!(entries_count = %lines.len(), "ListDirectoryTool::run: entries collected");
        Ok(lines.join("\n"))
    }
}

/// Format one entry, following symlinks like a plain `stat`
async fn describe_entry(entry: &DirEntry) -> String {
    let name = entry.file_name().to_string_lossy().into_owned();
    match tokio::fs::metadata(entry.path()).await {
        Ok(meta) => format!("- {}: file_size={} bytes, is_dir={}", name, meta.len(), meta.is_dir()),
        Err(e) => {
            debug!(%name, %e, "describe_entry: failed to get metadata");
            format!("Error: {}: could not retrieve info", name)
        }
    }
}
