//! The run transcript: an append-only record of tool calls and their results.
//!
//! The transcript is everything the decision function sees. Entries are only
//! ever pushed, never edited or removed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{FailureKind, ToolError};
use crate::image::ImageFormat;
use crate::tools::ToolOutput;

/// A tool invocation requested by the decision function.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolCall {
    /// Identifier used to pair the call with its result.
    pub id: String,
    /// Name of the tool to invoke.
    pub name: String,
    /// JSON arguments to pass to the tool.
    pub arguments: Value,
}

impl ToolCall {
    pub fn new(id: impl Into<String>, name: impl Into<String>, arguments: Value) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            arguments,
        }
    }

    /// The `index` argument of a synthesis call, if present and in range.
    pub fn variant_index(&self) -> Option<u8> {
        self.arguments
            .get("index")
            .and_then(Value::as_u64)
            .filter(|i| (1..=crate::constants::VARIANT_COUNT as u64).contains(i))
            .map(|i| i as u8)
    }
}

/// What a successful call produced, minus the image bytes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ToolPayload {
    Variants { prompts: Vec<String> },
    Image { index: u8, format: ImageFormat, size: usize },
}

/// Outcome of one tool call as recorded in the transcript.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ToolResult {
    Success { payload: ToolPayload },
    Failure { kind: FailureKind, message: String },
    /// Answered by the loop itself without dispatching the tool.
    Skipped { message: String },
}

impl ToolResult {
    pub fn from_output(output: &ToolOutput) -> Self {
        let payload = match output {
            ToolOutput::Variants(prompts) => ToolPayload::Variants {
                prompts: prompts.clone(),
            },
            ToolOutput::Image(image) => ToolPayload::Image {
                index: image.index,
                format: image.format,
                size: image.bytes.len(),
            },
        };
        Self::Success { payload }
    }

    pub fn from_error(err: &ToolError) -> Self {
        Self::Failure {
            kind: err.kind(),
            message: err.to_string(),
        }
    }

    pub fn skipped(message: impl Into<String>) -> Self {
        Self::Skipped {
            message: message.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    /// Text handed back to the decision model as the tool's response.
    pub fn render(&self) -> String {
        match self {
            Self::Success {
                payload: ToolPayload::Variants { prompts },
            } => {
                let mut text = String::from("Generated 4 prompt variants:\n");
                for (i, prompt) in prompts.iter().enumerate() {
                    text.push_str(&format!("{}. {}\n", i + 1, prompt));
                }
                text.push_str(&format!(
                    "NEXT STEP: call {} for indices 1, 2, 3 and 4.",
                    crate::constants::SYNTHESIS_TOOL
                ));
                text
            }
            Self::Success {
                payload: ToolPayload::Image { index, format, size },
            } => format!(
                "Success: image {index} generated ({size} bytes, {}).",
                format.extension()
            ),
            Self::Failure { message, .. } => format!("Error: {message}"),
            Self::Skipped { message } => message.clone(),
        }
    }
}

/// One call/result pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptEntry {
    pub call: ToolCall,
    pub result: ToolResult,
    /// Upstream attempts spent on this call (0 when answered locally).
    pub attempts: u32,
    pub recorded_at: DateTime<Utc>,
}

/// Append-only record of a run, headed by the run's intent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transcript {
    intent: String,
    entries: Vec<TranscriptEntry>,
}

impl Transcript {
    pub fn new(intent: impl Into<String>) -> Self {
        Self {
            intent: intent.into(),
            entries: Vec::new(),
        }
    }

    pub fn intent(&self) -> &str {
        &self.intent
    }

    pub fn push(&mut self, call: ToolCall, result: ToolResult, attempts: u32) {
        self.entries.push(TranscriptEntry {
            call,
            result,
            attempts,
            recorded_at: Utc::now(),
        });
    }

    pub fn entries(&self) -> &[TranscriptEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn last(&self) -> Option<&TranscriptEntry> {
        self.entries.last()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_variant_index_bounds() {
        let call = ToolCall::new("c1", "generate_ugc_image", json!({"index": 4}));
        assert_eq!(call.variant_index(), Some(4));
        let call = ToolCall::new("c2", "generate_ugc_image", json!({"index": 5}));
        assert_eq!(call.variant_index(), None);
        let call = ToolCall::new("c3", "generate_ugc_image", json!({"index": "1"}));
        assert_eq!(call.variant_index(), None);
    }

    #[test]
    fn test_render_variants_points_to_synthesis() {
        let result = ToolResult::Success {
            payload: ToolPayload::Variants {
                prompts: vec!["a".into(), "b".into(), "c".into(), "d".into()],
            },
        };
        let text = result.render();
        assert!(text.contains("4. d"));
        assert!(text.contains("NEXT STEP: call generate_ugc_image"));
    }

    #[test]
    fn test_failure_serializes_with_kind() {
        let result = ToolResult::from_error(&ToolError::Timeout(std::time::Duration::from_secs(3)));
        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(value["status"], "failure");
        assert_eq!(value["kind"], "timeout");
        assert_eq!(result.render(), "Error: request timed out after 3s");
    }

    #[test]
    fn test_transcript_is_append_only_in_order() {
        let mut transcript = Transcript::new("beach");
        assert!(transcript.is_empty());
        transcript.push(
            ToolCall::new("1", "generate_prompt_variants", json!({})),
            ToolResult::skipped("x"),
            0,
        );
        transcript.push(
            ToolCall::new("2", "generate_ugc_image", json!({"index": 1})),
            ToolResult::skipped("y"),
            0,
        );
        assert_eq!(transcript.len(), 2);
        assert_eq!(transcript.entries()[0].call.id, "1");
        assert_eq!(transcript.last().unwrap().call.id, "2");
        assert_eq!(transcript.intent(), "beach");
    }
}
