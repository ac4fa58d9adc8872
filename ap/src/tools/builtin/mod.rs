//! Built-in sandboxed tools

mod list_directory;
mod read_file;
mod run_script;
mod write_file;

pub use list_directory::{ListDirectoryArgs, ListDirectoryTool};
pub use read_file::{ReadFileArgs, ReadFileTool};
pub use run_script::{RunScriptArgs, RunScriptTool, SubprocessOutcome};
pub use write_file::{WriteFileArgs, WriteFileTool};
