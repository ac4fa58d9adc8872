//! Progress events emitted while the agent runs

use serde_json::Value;

use crate::llm::TokenUsage;

/// Something the user may want to see while a run is in progress
#[derive(Debug, Clone, PartialEq)]
pub enum AgentEvent {
    /// A model turn finished
    TurnCompleted { turn: u32, usage: TokenUsage },

    /// A tool call is about to be dispatched
    ToolCalled { name: String, input: Value },
}

impl AgentEvent {
    /// Console line for this event, or `None` when it is only shown in verbose mode
    pub fn render(&self, verbose: bool) -> Option<String> {
        match self {
            AgentEvent::TurnCompleted { turn, usage } if verbose => Some(format!(
                "Turn {turn}: Prompt tokens: {}\nTurn {turn}: Response tokens: {}",
                usage.input_tokens, usage.output_tokens
            )),
            AgentEvent::TurnCompleted { .. } => None,
            AgentEvent::ToolCalled { name, input } if verbose => Some(format!("Calling function: {name}({input})")),
            AgentEvent::ToolCalled { name, .. } => Some(format!(" - Calling function: {name}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_tool_call() {
        let event = AgentEvent::ToolCalled {
            name: "get_files_info".to_string(),
            input: serde_json::json!({"directory": "pkg"}),
        };

        assert_eq!(event.render(false).as_deref(), Some(" - Calling function: get_files_info"));
        assert_eq!(
            event.render(true).as_deref(),
            Some("Calling function: get_files_info({\"directory\":\"pkg\"})")
        );
    }

    #[test]
    fn test_render_usage_only_when_verbose() {
        let event = AgentEvent::TurnCompleted {
            turn: 2,
            usage: TokenUsage {
                input_tokens: 300,
                output_tokens: 42,
            },
        };

        assert_eq!(event.render(false), None);
        assert_eq!(
            event.render(true).as_deref(),
            Some("Turn 2: Prompt tokens: 300\nTurn 2: Response tokens: 42")
        );
    }
}
