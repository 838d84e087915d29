//! LLM-backed decision function.
//!
//! Wraps rig-core provider clients behind enum dispatch, as the rest of the
//! crate never touches provider-specific types. Each call to
//! [`LlmDecider::decide`] is exactly one completion request carrying the tool
//! definitions; rig-core never executes tools here, the agent loop does.

use anyhow::{Context, Result};
use async_trait::async_trait;
use rig::client::CompletionClient;
use rig::completion::{CompletionModel, ToolDefinition as RigToolDefinition};
use rig::message::{AssistantContent, Message as RigMessage, ToolCall as RigToolCall, ToolFunction};
use rig::providers::{anthropic, openai, openrouter};
use rig::OneOrMany;
use tracing::{debug, warn};

use super::kind::{ModelSelection, ProviderKind};
use super::{Decide, Decision};
use crate::config::Config;
use crate::error::DecisionError;
use crate::tools::ToolDefinition;
use crate::transcript::{ToolCall, Transcript};

/// Internal enum wrapping provider-specific clients.
enum ClientKind {
    Anthropic(anthropic::Client),
    OpenAI(openai::Client),
    OpenRouter(openrouter::Client),
    Aiml(openai::Client),
}

/// Dispatches an operation across provider-specific clients.
///
/// Matches on [`ClientKind`] and executes the same block for each variant,
/// letting the compiler monomorphize per provider.
macro_rules! dispatch {
    ($self:expr, |$client:ident| $body:expr) => {
        match &$self.client {
            ClientKind::Anthropic($client) => $body,
            ClientKind::OpenAI($client) => $body,
            ClientKind::OpenRouter($client) => $body,
            ClientKind::Aiml($client) => $body,
        }
    };
}

/// Decision function that asks a language model for the next tool call.
pub struct LlmDecider {
    client: ClientKind,
    model: String,
    preamble: String,
    tools: Vec<ToolDefinition>,
}

impl LlmDecider {
    /// Creates a decider from the loaded config and a resolved model.
    ///
    /// # Errors
    ///
    /// Returns an error if no API key is found for the selected provider
    /// or if client construction fails.
    pub fn from_config(
        config: &Config,
        selection: &ModelSelection,
        tools: Vec<ToolDefinition>,
    ) -> Result<Self> {
        let name = selection.provider.name();
        let api_key = config.resolve_api_key(name).with_context(|| {
            format!(
                "No API key found for {name}. Set {}_API_KEY or configure it in config.toml",
                name.to_uppercase()
            )
        })?;

        let client = match selection.provider {
            ProviderKind::Anthropic => ClientKind::Anthropic(
                anthropic::Client::new(&api_key).context("Failed to create Anthropic client")?,
            ),
            ProviderKind::OpenAI => ClientKind::OpenAI(
                openai::Client::new(&api_key).context("Failed to create OpenAI client")?,
            ),
            ProviderKind::OpenRouter => ClientKind::OpenRouter(
                openrouter::Client::new(&api_key).context("Failed to create OpenRouter client")?,
            ),
            ProviderKind::Aiml => ClientKind::Aiml(
                openai::Client::builder()
                    .api_key(&api_key)
                    .base_url(config.provider_base_url(name))
                    .build()
                    .context("Failed to create AIML client")?,
            ),
        };

        Ok(Self {
            client,
            model: selection.model.clone(),
            preamble: config.system_prompt(),
            tools,
        })
    }

    fn rig_tools(&self) -> Vec<RigToolDefinition> {
        self.tools
            .iter()
            .map(|t| RigToolDefinition {
                name: t.name.clone(),
                description: t.description.clone(),
                parameters: t.parameters.clone(),
            })
            .collect()
    }
}

/// Opening user message describing the job.
fn task_message(intent: &str) -> String {
    format!(
        "Generate 4 UGC images of the uploaded person with the uploaded product.\n\
Base intent: \"{intent}\"\n\
1. Call generate_prompt_variants once to get 4 prompts.\n\
2. Call generate_ugc_image with index 1, 2, 3 and 4, one call each.\n\
3. Reply with a short summary of which images were generated."
    )
}

/// Converts the transcript into rig-core chat history plus the prompt message.
///
/// Each entry becomes an assistant tool-call message followed by its tool
/// result. The final message is sent as the prompt: the task itself on the
/// first step, the latest tool result afterwards.
fn to_rig_messages(transcript: &Transcript) -> (Vec<RigMessage>, RigMessage) {
    let mut history = vec![RigMessage::user(task_message(transcript.intent()))];
    for entry in transcript.entries() {
        history.push(RigMessage::Assistant {
            id: None,
            content: OneOrMany::one(AssistantContent::ToolCall(RigToolCall::new(
                entry.call.id.clone(),
                ToolFunction::new(entry.call.name.clone(), entry.call.arguments.clone()),
            ))),
        });
        history.push(RigMessage::tool_result(
            entry.call.id.clone(),
            entry.result.render(),
        ));
    }
    // History always holds at least the task message.
    let prompt = history
        .pop()
        .unwrap_or_else(|| RigMessage::user(task_message(transcript.intent())));
    (history, prompt)
}

#[async_trait]
impl Decide for LlmDecider {
    async fn decide(
        &self,
        transcript: &Transcript,
        iterations_used: usize,
    ) -> Result<Decision, DecisionError> {
        let (history, prompt) = to_rig_messages(transcript);
        debug!(iterations_used, history = history.len(), model = %self.model, "asking decision model");

        let choice = dispatch!(self, |client| {
            let model = client.completion_model(self.model.clone());
            let response = model
                .completion_request(prompt)
                .preamble(self.preamble.clone())
                .messages(history)
                .tools(self.rig_tools())
                .max_tokens(crate::constants::MAX_TOKENS)
                .send()
                .await
                .map_err(|e| DecisionError::Unavailable(e.to_string()))?;
            response.choice
        });

        let mut calls = choice.iter().filter_map(|content| match content {
            AssistantContent::ToolCall(tc) => Some(ToolCall::new(
                tc.id.clone(),
                tc.function.name.clone(),
                tc.function.arguments.clone(),
            )),
            _ => None,
        });

        match calls.next() {
            Some(call) => {
                let dropped = calls.count();
                if dropped > 0 {
                    // One call per step keeps results strictly ordered.
                    warn!(dropped, "decision model requested parallel tool calls; using the first");
                }
                Ok(Decision::Call(call))
            }
            None => Ok(Decision::Finish),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transcript::ToolResult;
    use serde_json::json;

    #[test]
    fn test_first_step_prompt_is_task() {
        let transcript = Transcript::new("person on a beach");
        let (history, prompt) = to_rig_messages(&transcript);
        assert!(history.is_empty());
        assert_eq!(prompt, RigMessage::user(task_message("person on a beach")));
    }

    #[test]
    fn test_later_steps_end_with_tool_result() {
        let mut transcript = Transcript::new("beach");
        transcript.push(
            ToolCall::new("call_1", "generate_prompt_variants", json!({})),
            ToolResult::skipped("variants already available"),
            0,
        );
        let (history, prompt) = to_rig_messages(&transcript);
        // task + assistant tool call
        assert_eq!(history.len(), 2);
        assert_eq!(
            prompt,
            RigMessage::tool_result("call_1".to_string(), "variants already available".to_string())
        );
    }
}
