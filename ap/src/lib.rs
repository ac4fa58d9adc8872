//! agentpen - an LLM agent confined to one directory
//!
//! The model answers a prompt by calling four tools: list a directory, read a
//! file, write a file and run a script. Every path the model names is resolved
//! against a working root and rejected if it would land outside it.
//!
//! # Modules
//!
//! - [`tools`] - Sandboxed tools and the dispatcher that routes calls to them
//! - [`llm`] - LLM client trait and Anthropic implementation
//! - [`agent`] - The model/tool turn loop
//! - [`config`] - Configuration types and loading
//! - [`cli`] - Command-line interface

pub mod agent;
pub mod cli;
pub mod config;
pub mod llm;
pub mod prompts;
pub mod tools;

pub use agent::{Agent, AgentError, AgentEvent, AgentOutcome};
pub use config::Config;
pub use llm::{LlmClient, LlmError};
pub use tools::{FailureKind, SandboxSettings, ToolDispatcher, ToolResult};
