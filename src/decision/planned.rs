//! Deterministic decider for offline runs: variants once, then each index once.

use async_trait::async_trait;
use serde_json::json;

use super::{Decide, Decision};
use crate::constants::{SYNTHESIS_TOOL, VARIANTS_TOOL, VARIANT_COUNT};
use crate::error::DecisionError;
use crate::transcript::{ToolCall, ToolPayload, ToolResult, Transcript};

/// Follows the fixed plan the LLM decider is asked to follow.
///
/// Reads everything it needs from the transcript, so one instance can serve
/// many runs.
pub struct PlannedDecider {
    /// Dispatches of one step before the plan moves on.
    attempts_per_step: usize,
}

impl PlannedDecider {
    pub fn new(attempts_per_step: usize) -> Self {
        Self {
            attempts_per_step: attempts_per_step.max(1),
        }
    }

    fn next_call(&self, transcript: &Transcript) -> Option<ToolCall> {
        let entries = transcript.entries();
        let id = format!("plan_{}", entries.len() + 1);

        let variants_ready = entries.iter().any(|e| {
            matches!(
                e.result,
                ToolResult::Success {
                    payload: ToolPayload::Variants { .. }
                }
            )
        });
        if !variants_ready {
            let tried = entries
                .iter()
                .filter(|e| e.call.name == VARIANTS_TOOL)
                .count();
            return (tried < self.attempts_per_step)
                .then(|| ToolCall::new(id, VARIANTS_TOOL, json!({})));
        }

        (1..=VARIANT_COUNT as u8)
            .find(|&index| {
                let calls = entries
                    .iter()
                    .filter(|e| e.call.name == SYNTHESIS_TOOL && e.call.variant_index() == Some(index));
                let mut tried = 0;
                for entry in calls {
                    match entry.result {
                        ToolResult::Success { .. } | ToolResult::Skipped { .. } => return false,
                        ToolResult::Failure { .. } => tried += 1,
                    }
                }
                tried < self.attempts_per_step
            })
            .map(|index| ToolCall::new(id, SYNTHESIS_TOOL, json!({ "index": index })))
    }
}

impl Default for PlannedDecider {
    fn default() -> Self {
        Self::new(1)
    }
}

#[async_trait]
impl Decide for PlannedDecider {
    async fn decide(
        &self,
        transcript: &Transcript,
        _iterations_used: usize,
    ) -> Result<Decision, DecisionError> {
        Ok(self
            .next_call(transcript)
            .map(Decision::Call)
            .unwrap_or(Decision::Finish))
    }
}
