//! The decision function: given the transcript so far, pick the next step.
//!
//! The agent loop only sees the [`Decide`] trait. [`LlmDecider`] asks a
//! language model through rig-core; [`PlannedDecider`] follows a fixed plan
//! and needs no model at all.

mod kind;
mod llm;
mod planned;

use async_trait::async_trait;

use crate::error::DecisionError;
use crate::transcript::{ToolCall, Transcript};

pub use kind::resolve_model;
pub use llm::LlmDecider;
pub use planned::PlannedDecider;

/// What the decision function wants to happen next.
#[derive(Debug, Clone, PartialEq)]
pub enum Decision {
    Call(ToolCall),
    Finish,
}

/// A step oracle consulted once per loop iteration.
#[async_trait]
pub trait Decide: Send + Sync {
    async fn decide(
        &self,
        transcript: &Transcript,
        iterations_used: usize,
    ) -> Result<Decision, DecisionError>;
}
