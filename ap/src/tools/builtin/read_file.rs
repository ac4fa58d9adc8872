//! get_file_content tool - read a file up to a character cap

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::io;
use tokio::io::AsyncReadExt;
use tracing::debug;

use crate::tools::{Access, Tool, ToolContext, ToolError, ToolName};

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReadFileArgs {
    pub file_path: String,
}

/// Read a file's contents, truncated at `max_chars` characters
pub struct ReadFileTool {
    max_chars: usize,
}

impl ReadFileTool {
    pub fn new(max_chars: usize) -> Self {
        Self { max_chars }
    }
}

#[async_trait]
impl Tool for ReadFileTool {
    type Args = ReadFileArgs;

    fn name(&self) -> ToolName {
        ToolName::GetFileContent
    }

    fn description(&self) -> String {
        format!(
            "Gets the content of a specified file relative to the working directory, limited to the first {} characters",
            self.max_chars
        )
    }

    fn input_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "file_path": {
                    "type": "string",
                    "description": "File path to get content from, relative to the working directory"
                }
            },
            "required": ["file_path"]
        })
    }

    async fn run(&self, args: ReadFileArgs, ctx: &ToolContext) -> Result<String, ToolError> {
        debug!(?args, "ReadFileTool::run: called");
        let target = ctx.confine(&args.file_path, Access::Read)?;

        let is_file = tokio::fs::metadata(&target).await.map(|m| m.is_file()).unwrap_or(false);
        if !is_file {
            debug!(?target, "ReadFileTool::run: not a regular file");
            return Err(ToolError::FileNotFound { path: args.file_path });
        }

        let read_err = |source: io::Error| ToolError::Read {
            path: args.file_path.clone(),
            source,
        };

        let limit = read_limit(self.max_chars);
        let file = tokio::fs::File::open(&target).await.map_err(read_err)?;
        let mut bytes = Vec::new();
        file.take(limit).read_to_end(&mut bytes).await.map_err(read_err)?;

        let hit_limit = bytes.len() as u64 == limit;
        debug!(bytes = bytes.len(), hit_limit, "ReadFileTool::run: prefix read");
        let text = decode_prefix(bytes, hit_limit).map_err(read_err)?;

        Ok(truncate_chars(text, self.max_chars, &args.file_path))
    }
}

/// Bytes to read so the prefix holds more than `max_chars` characters whenever
/// the file is longer than the cap; every char is at most 4 bytes
fn read_limit(max_chars: usize) -> u64 {
    (max_chars as u64).saturating_add(1).saturating_mul(4)
}

/// Decode UTF-8, dropping a multi-byte char split by the read limit
fn decode_prefix(bytes: Vec<u8>, hit_limit: bool) -> io::Result<String> {
    match String::from_utf8(bytes) {
        Ok(text) => Ok(text),
        Err(e) => {
            let utf8 = e.utf8_error();
            if hit_limit && utf8.error_len().is_none() {
                let mut bytes = e.into_bytes();
                bytes.truncate(utf8.valid_up_to());
                String::from_utf8(bytes).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
            } else {
                Err(io::Error::new(io::ErrorKind::InvalidData, utf8))
            }
        }
    }
}

fn truncate_chars(text: String, max_chars: usize, file_path: &str) -> String {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => format!(
            "{}[...File \"{}\" truncated at {} characters]",
            &text[..cut],
            file_path,
            max_chars
        ),
        None => text,
    }
}
