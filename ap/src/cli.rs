//! CLI definition and help helpers

use clap::Parser;
use std::path::PathBuf;
use tracing::debug;

/// agentpen - an LLM agent confined to one directory
#[derive(Debug, Parser)]
#[command(
    name = "ap",
    about = "Ask an LLM agent to inspect, edit and run code inside a sandbox directory",
    version
)]
pub struct Cli {
    /// What to ask the agent
    #[arg(value_name = "PROMPT")]
    pub prompt: String,

    /// Print token usage per turn and full tool call arguments
    #[arg(short, long)]
    pub verbose: bool,

    /// Path to config file
    #[arg(short, long, help = "Path to config file")]
    pub config: Option<PathBuf>,

    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    #[arg(short = 'l', long = "log-level", help = "Log level (TRACE, DEBUG, INFO, WARN, ERROR)")]
    pub log_level: Option<String>,

    /// Sandbox root, overriding the config file
    #[arg(short, long, value_name = "DIR")]
    pub root: Option<PathBuf>,
}

/// Result of checking a required tool
pub struct ToolCheck {
    pub name: String,
    pub available: bool,
    pub version: Option<String>,
}

impl ToolCheck {
    /// Check if a tool is available and get its version
    pub fn check(name: &str, version_args: &[&str]) -> Self {
        debug!(name, ?version_args, "ToolCheck::check: called");
        let result = std::process::Command::new(name).args(version_args).output();

        match result {
            Ok(output) if output.status.success() => {
                // Older Pythons print their version on stderr
                let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
                text.push_str(&String::from_utf8_lossy(&output.stderr));
                Self {
                    name: name.to_string(),
                    available: true,
                    version: Some(parse_version(&text)),
                }
            }
            _ => {
                debug!(name, "ToolCheck::check: tool not available");
                Self {
                    name: name.to_string(),
                    available: false,
                    version: None,
                }
            }
        }
    }
}

/// Parse version from command output (extracts first version-like string)
fn parse_version(output: &str) -> String {
    for word in output.split_whitespace() {
        let word = word.trim_start_matches('v');
        if word.chars().next().is_some_and(|c| c.is_ascii_digit()) {
            let version: String = word.chars().take_while(|c| c.is_ascii_digit() || *c == '.').collect();
            if !version.is_empty() {
                return version;
            }
        }
    }
    "unknown".to_string()
}

/// Location of the log file written by `ap`
pub fn get_log_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("agentpen")
        .join("logs")
        .join("agentpen.log")
}

/// Generate the after_help text with the interpreter check and log location
pub fn generate_after_help(interpreter: &str) -> String {
    debug!(interpreter, "generate_after_help: called");
    let check = ToolCheck::check(interpreter, &["--version"]);

    let mut help = String::new();
    help.push_str("Default script interpreter (sandbox.script.interpreter in the config file):\n");
    let icon = if check.available { "\u{2705}" } else { "\u{274C}" };
    let version = check.version.as_deref().unwrap_or("not found");
    help.push_str(&format!("  {} {:<10} {}\n", icon, check.name, version));

    help.push('\n');
    help.push_str(&format!("Logs are written to: {}\n", get_log_path().display()));
    help
}
