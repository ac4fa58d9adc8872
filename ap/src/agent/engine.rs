//! Agent - the model/tool turn loop

use std::sync::Arc;

use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::AgentEvent;
use crate::llm::{
    CompletionRequest, CompletionResponse, ContentBlock, LlmClient, LlmError, Message, StopReason, TokenUsage,
    ToolDefinition,
};
use crate::prompts::SYSTEM_PROMPT;
use crate::tools::{ToolDispatcher, ToolResult};

/// Model turns allowed before a run is abandoned
pub const DEFAULT_MAX_TURNS: u32 = 20;

/// Response token budget per turn
pub const DEFAULT_MAX_TOKENS: u32 = 8192;

/// Why a run ended without an answer
#[derive(Debug, Error)]
pub enum AgentError {
    #[error("Error generating content: {0}")]
    Llm(#[from] LlmError),

    #[error("No final answer after {0} turns")]
    MaxTurns(u32),
}

/// What a finished run produced
#[derive(Debug, Clone)]
pub struct AgentOutcome {
    /// The model's final text; `None` when it stopped with neither text nor tool calls
    pub final_text: Option<String>,

    /// Model turns taken
    pub turns: u32,

    /// Token usage summed over every turn
    pub usage: TokenUsage,

    /// Full transcript, starting with the user prompt
    pub messages: Vec<Message>,
}

/// Runs one prompt to completion against an LLM and the sandboxed tools
pub struct Agent {
    llm: Arc<dyn LlmClient>,
    dispatcher: ToolDispatcher,
    tool_defs: Vec<ToolDefinition>,
    system_prompt: String,
    max_turns: u32,
    max_tokens: u32,
    events: Option<mpsc::UnboundedSender<AgentEvent>>,
}

impl Agent {
    pub fn new(llm: Arc<dyn LlmClient>, dispatcher: ToolDispatcher) -> Self {
        let tool_defs = dispatcher.definitions();
        debug!(tool_count = %tool_defs.len(), "Agent::new: called");
        Self {
            llm,
            dispatcher,
            tool_defs,
            system_prompt: SYSTEM_PROMPT.to_string(),
            max_turns: DEFAULT_MAX_TURNS,
            max_tokens: DEFAULT_MAX_TOKENS,
            events: None,
        }
    }

    pub fn with_system_prompt(mut self, system_prompt: impl Into<String>) -> Self {
        self.system_prompt = system_prompt.into();
        self
    }

    pub fn with_max_turns(mut self, max_turns: u32) -> Self {
        self.max_turns = max_turns;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Send progress events to `tx` as the run proceeds
    pub fn with_events(mut self, tx: mpsc::UnboundedSender<AgentEvent>) -> Self {
        self.events = Some(tx);
        self
    }

    /// Run `prompt` until the model answers, gives up, or the turn limit is hit
    pub async fn run(&self, prompt: &str) -> Result<AgentOutcome, AgentError> {
        debug!(prompt_len = prompt.len(), max_turns = self.max_turns, "Agent::run: called");
        let mut messages = vec![Message::user(prompt)];
        let mut usage = TokenUsage::default();

        for turn in 1..=self.max_turns {
            debug!(turn, "Agent::run: turn start");
            let request = CompletionRequest {
                system_prompt: self.system_prompt.clone(),
                messages: messages.clone(),
                tools: self.tool_defs.clone(),
                max_tokens: self.max_tokens,
            };

            let response = self.llm.complete(request).await.map_err(|e| {
                warn!(turn, error = %e, "Model call failed");
                AgentError::Llm(e)
            })?;
            usage += response.usage;
            if response.stop_reason == StopReason::MaxTokens {
                warn!(turn, max_tokens = self.max_tokens, "Model reply was cut off at the token limit");
            }
            self.emit(AgentEvent::TurnCompleted {
                turn,
                usage: response.usage,
            });

            messages.push(build_assistant_message(&response));

            if response.tool_calls.is_empty() {
                let final_text = response.content.filter(|text| !text.is_empty());
                if final_text.is_none() {
                    info!(turn, "Model returned neither text nor tool calls; stopping");
                } else {
                    debug!(turn, "Agent::run: final answer received");
                }
                return Ok(AgentOutcome {
                    final_text,
                    turns: turn,
                    usage,
                    messages,
                });
            }

            let results = self
                .dispatcher
                .dispatch_all(&response.tool_calls, |call| {
                    self.emit(AgentEvent::ToolCalled {
                        name: call.name.clone(),
                        input: call.input.clone(),
                    })
                })
                .await;
            messages.push(build_tool_result_message(&results));
        }

        warn!(max_turns = self.max_turns, "Turn limit reached without a final answer");
        Err(AgentError::MaxTurns(self.max_turns))
    }

    fn emit(&self, event: AgentEvent) {
        if let Some(tx) = &self.events {
            // Receiver gone means nobody is listening
            let _ = tx.send(event);
        }
    }
}

/// Build assistant message from response
fn build_assistant_message(response: &CompletionResponse) -> Message {
    debug!(has_content = response.content.is_some(), tool_calls = response.tool_calls.len(), "build_assistant_message: called");
    let mut blocks = Vec::new();

    if let Some(text) = &response.content {
        blocks.push(ContentBlock::text(text));
    }

    for call in &response.tool_calls {
        blocks.push(ContentBlock::ToolUse {
            id: call.id.clone(),
            name: call.name.clone(),
            input: call.input.clone(),
        });
    }

    Message::assistant_blocks(blocks)
}

/// Build user message with tool results
fn build_tool_result_message(results: &[(String, ToolResult)]) -> Message {
    debug!(result_count = results.len(), "build_tool_result_message: called");
    let blocks: Vec<ContentBlock> = results
        .iter()
        .map(|(id, result)| ContentBlock::tool_result(id, result.to_payload().to_string(), result.is_error()))
        .collect();

    Message::user_blocks(blocks)
}
