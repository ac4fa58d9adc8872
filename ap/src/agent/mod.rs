//! Agent loop
//!
//! Drives the model turn by turn, dispatching its tool calls through the
//! sandboxed tools until it produces a final answer.

mod engine;
mod events;

pub use engine::{Agent, AgentError, AgentOutcome, DEFAULT_MAX_TOKENS, DEFAULT_MAX_TURNS};
pub use events::AgentEvent;
