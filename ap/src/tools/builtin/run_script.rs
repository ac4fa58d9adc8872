//! run_script_file tool - execute a script under the working root with a timeout

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::io;
use std::path::Path;
use std::process::{ExitStatus, Stdio};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, ChildStderr, ChildStdout, Command};
use tracing::{debug, warn};

use crate::tools::{Access, ScriptSettings, Tool, ToolContext, ToolError, ToolName};

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RunScriptArgs {
    pub file_path: String,
    #[serde(default)]
    pub args: Option<Vec<String>>,
}

/// Exit code and captured output of a finished script
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubprocessOutcome {
    /// Exit code; death by signal is reported as the negated signal number
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl SubprocessOutcome {
    fn new(status: ExitStatus, stdout: &[u8], stderr: &[u8]) -> Self {
        Self {
            exit_code: exit_code(status),
            stdout: String::from_utf8_lossy(stdout).into_owned(),
            stderr: String::from_utf8_lossy(stderr).into_owned(),
        }
    }

    /// Text handed back to the model
    ///
    /// A failing script is still a successful tool call: the model gets to
    /// see the exit code and react to it.
    pub fn describe(&self) -> String {
        if self.exit_code != 0 {
            format!("Process exited with code {}", self.exit_code)
        } else if self.stdout.is_empty() && self.stderr.is_empty() {
            "No output produced".to_string()
        } else {
            format!("STDOUT:\n{}\nSTDERR:\n{}", self.stdout, self.stderr)
        }
    }
}

fn exit_code(status: ExitStatus) -> i32 {
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return -signal;
        }
    }
    status.code().unwrap_or(-1)
}

/// Execute a script file with the configured interpreter
pub struct RunScriptTool {
    settings: ScriptSettings,
}

impl RunScriptTool {
    pub fn new(settings: ScriptSettings) -> Self {
        Self { settings }
    }

    /// Spawn the interpreter and wait for it, killing it when the timeout expires
    async fn execute(
        &self,
        target: &Path,
        args: &[String],
        ctx: &ToolContext,
        file_path: &str,
    ) -> Result<SubprocessOutcome, ToolError> {
        debug!(?target, ?args, "RunScriptTool::execute: called");
        let exec_err = |source: io::Error| ToolError::Exec {
            label: self.settings.label.clone(),
            source,
        };

        let mut command = Command::new(&self.settings.interpreter);
        command
            .arg(target)
            .args(args)
            .current_dir(ctx.root())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        // Lead a fresh process group so a timeout can take down anything the script started
        #[cfg(unix)]
        {
            command.process_group(0);
        }

        let mut child = command.spawn().map_err(exec_err)?;
        debug!(pid = ?child.id(), "RunScriptTool::execute: spawned");
        let mut group = ProcessGroupGuard::new(child.id());

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| exec_err(io::Error::other("missing stdout pipe")))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| exec_err(io::Error::other("missing stderr pipe")))?;

        let waited = tokio::time::timeout(self.settings.timeout, collect(&mut child, stdout, stderr)).await;
        match waited {
            Ok(Ok(outcome)) => {
                debug!(exit_code = outcome.exit_code, "RunScriptTool::execute: process finished");
                group.disarm();
                Ok(outcome)
            }
            Ok(Err(e)) => {
                debug!(%e, "RunScriptTool::execute: failed while waiting for process");
                terminate(&mut child, &mut group).await;
                Err(exec_err(e))
            }
            Err(_) => {
                warn!(%file_path, timeout = ?self.settings.timeout, "Script timed out, killing it");
                terminate(&mut child, &mut group).await;
                Err(ToolError::Timeout {
                    path: file_path.to_string(),
                    timeout_ms: self.settings.timeout.as_millis() as u64,
                })
            }
        }
    }
}

async fn collect(child: &mut Child, stdout: ChildStdout, stderr: ChildStderr) -> io::Result<SubprocessOutcome> {
    let (status, stdout, stderr) = tokio::try_join!(child.wait(), read_all(stdout), read_all(stderr))?;
    Ok(SubprocessOutcome::new(status, &stdout, &stderr))
}

async fn read_all<R: AsyncRead + Unpin>(mut reader: R) -> io::Result<Vec<u8>> {
    let mut buf = Vec::new();
    reader.read_to_end(&mut buf).await?;
    Ok(buf)
}

/// Kills the script's process group when dropped, unless disarmed
///
/// `kill_on_drop` only reaches the direct child. The guard also reaches
/// anything the script started, so cancelling the run future leaves nothing behind.
struct ProcessGroupGuard {
    pgid: Option<u32>,
}

impl ProcessGroupGuard {
    fn new(pgid: Option<u32>) -> Self {
        Self { pgid }
    }

    /// The script exited on its own; leave the group alone
    fn disarm(&mut self) {
        self.pgid = None;
    }

    fn kill(&mut self) {
        if let Some(pgid) = self.pgid.take() {
            kill_group(pgid);
        }
    }
}

impl Drop for ProcessGroupGuard {
    fn drop(&mut self) {
        if self.pgid.is_some() {
            debug!(pgid = ?self.pgid, "ProcessGroupGuard::drop: run cancelled, killing process group");
        }
        self.kill();
    }
}

#[cfg(unix)]
fn kill_group(pgid: u32) {
    use nix::sys::signal::{Signal, killpg};
    use nix::unistd::Pid;

    debug!(pgid, "kill_group: sending SIGKILL to process group");
    if let Err(e) = killpg(Pid::from_raw(pgid as i32), Signal::SIGKILL) {
        debug!(%e, "kill_group: process group already gone");
    }
}

#[cfg(not(unix))]
fn kill_group(_pgid: u32) {}

/// Kill the script's process group and the child itself, then reap it
async fn terminate(child: &mut Child, group: &mut ProcessGroupGuard) {
    group.kill();

    if let Err(e) = child.kill().await {
        debug!(%e, "terminate: kill failed, process already gone");
    }
}

#[async_trait]
impl Tool for RunScriptTool {
    type Args = RunScriptArgs;

    fn name(&self) -> ToolName {
        ToolName::RunScriptFile
    }

    fn description(&self) -> String {
        format!(
            "Executes a {} file (.{}) relative to the working directory with optional arguments and returns its output",
            self.settings.label, self.settings.extension
        )
    }

    fn input_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "file_path": {
                    "type": "string",
                    "description": format!("Path to the {} file to execute, relative to the working directory", self.settings.label)
                },
                "args": {
                    "type": "array",
                    "items": { "type": "string" },
                    "description": "Optional command-line arguments passed to the script"
                }
            },
            "required": ["file_path"]
        })
    }

    async fn run(&self, args: RunScriptArgs, ctx: &ToolContext) -> Result<String, ToolError> {
        debug!(?args, "RunScriptTool::run: called");
        let target = ctx.confine(&args.file_path, Access::Execute)?;

        let is_file = tokio::fs::metadata(&target).await.map(|m| m.is_file()).unwrap_or(false);
        if !is_file {
            debug!(?target, "RunScriptTool::run: not a regular file");
            return Err(ToolError::ScriptNotFound { path: args.file_path });
        }

        let matches_type = target.extension().and_then(|e| e.to_str()) == Some(self.settings.extension.as_str());
        if !matches_type {
            debug!(?target, "RunScriptTool::run: wrong script type");
            return Err(ToolError::WrongScriptType {
                path: args.file_path,
                label: self.settings.label.clone(),
            });
        }

        let script_args = args.args.unwrap_or_default();
        let outcome = self.execute(&target, &script_args, ctx, &args.file_path).await?;
        Ok(outcome.describe())
    }
}
