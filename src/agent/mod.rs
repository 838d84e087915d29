//! The decide/execute loop.
//!
//! Each iteration asks the decision function for one step, answers it
//! (locally or by dispatching a tool), appends the result to the transcript
//! and checks the terminal conditions. Deduplication and termination are
//! enforced here, whatever the decision function asks for.

use std::collections::BTreeMap;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::constants::{SYNTHESIS_TOOL, VARIANTS_TOOL, VARIANT_COUNT};
use crate::decision::{Decide, Decision};
use crate::error::{DecisionError, FailureKind, FailureReason, ToolError};
use crate::image::{GeneratedImage, SourceImage};
use crate::tools::{ToolContext, ToolOutput, ToolRegistry};
use crate::transcript::{ToolCall, ToolResult, Transcript};

/// Retry schedule for synthesis timeouts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    /// Extra attempts after the first one times out.
    pub max_retries: u32,
    pub base: Duration,
    pub cap: Duration,
}

impl RetryPolicy {
    /// Delay before retry number `attempt` (0-based): `min(base * 2^attempt, cap)`.
    pub fn delay(&self, attempt: u32) -> Duration {
        let factor = 2u32.checked_pow(attempt).unwrap_or(u32::MAX);
        self.base.checked_mul(factor).unwrap_or(self.cap).min(self.cap)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: crate::constants::DEFAULT_SYNTHESIS_RETRIES,
            base: Duration::from_secs(crate::constants::DEFAULT_BACKOFF_BASE_SECS),
            cap: Duration::from_secs(crate::constants::DEFAULT_BACKOFF_CAP_SECS),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoopPolicy {
    pub max_iterations: usize,
    pub retry: RetryPolicy,
}

impl Default for LoopPolicy {
    fn default() -> Self {
        Self {
            max_iterations: crate::constants::DEFAULT_MAX_ITERATIONS,
            retry: RetryPolicy::default(),
        }
    }
}

/// How the loop ended.
#[derive(Debug, Clone, PartialEq)]
pub enum LoopOutcome {
    Completed,
    Failed(FailureReason),
}

/// Everything a finished loop hands back to the coordinator.
#[derive(Debug)]
pub struct LoopRun {
    pub outcome: LoopOutcome,
    pub transcript: Transcript,
    /// Images keyed by variant index, complete or partial.
    pub images: BTreeMap<u8, GeneratedImage>,
    /// Last synthesis failure for every index that still has no image.
    pub failures: BTreeMap<u8, ToolError>,
    pub iterations_used: usize,
}

/// Mutable per-run state. Owned by a single `run` call.
struct LoopState {
    transcript: Transcript,
    iterations_used: usize,
    variants: Option<Vec<String>>,
    variant_failure: Option<ToolError>,
    images: BTreeMap<u8, GeneratedImage>,
    failures: BTreeMap<u8, ToolError>,
}

impl LoopState {
    fn new(intent: &str) -> Self {
        Self {
            transcript: Transcript::new(intent),
            iterations_used: 0,
            variants: None,
            variant_failure: None,
            images: BTreeMap::new(),
            failures: BTreeMap::new(),
        }
    }

    fn is_complete(&self) -> bool {
        self.images.len() == VARIANT_COUNT
    }

    /// Why a `Finish` with images still missing is a failure.
    fn finish_reason(&self) -> FailureReason {
        if self.variants.is_none() {
            if let Some(err) = &self.variant_failure {
                return FailureReason::UpstreamError(err.to_string());
            }
        }
        let missing_with_failure = (1..=VARIANT_COUNT as u8)
            .filter(|i| !self.images.contains_key(i))
            .any(|i| self.failures.contains_key(&i));
        if missing_with_failure {
            FailureReason::PartialSynthesisFailure
        } else {
            FailureReason::FinishedEarly
        }
    }

    fn into_run(self, outcome: LoopOutcome) -> LoopRun {
        LoopRun {
            outcome,
            transcript: self.transcript,
            images: self.images,
            failures: self.failures,
            iterations_used: self.iterations_used,
        }
    }
}

/// Drives one run against a tool registry.
pub struct AgentLoop<'a> {
    registry: &'a ToolRegistry,
    policy: LoopPolicy,
}

impl<'a> AgentLoop<'a> {
    pub fn new(registry: &'a ToolRegistry, policy: LoopPolicy) -> Self {
        Self { registry, policy }
    }

    /// Runs until completion, `Finish`, budget exhaustion, a decision
    /// failure, or cancellation. Tool failures never end the loop.
    pub async fn run(
        &self,
        intent: &str,
        person: &SourceImage,
        product: &SourceImage,
        decider: &dyn Decide,
        cancel: &CancellationToken,
    ) -> LoopRun {
        let mut state = LoopState::new(intent);

        loop {
            if cancel.is_cancelled() {
                info!(iterations = state.iterations_used, "run cancelled");
                return state.into_run(LoopOutcome::Failed(FailureReason::Cancelled));
            }
            if state.iterations_used >= self.policy.max_iterations {
                warn!(
                    max_iterations = self.policy.max_iterations,
                    images = state.images.len(),
                    "iteration budget exhausted"
                );
                return state
                    .into_run(LoopOutcome::Failed(FailureReason::IterationBudgetExhausted));
            }

            let decision = tokio::select! {
                _ = cancel.cancelled() => None,
                decision = decider.decide(&state.transcript, state.iterations_used) => Some(decision),
            };
            let Some(decision) = decision else {
                info!(iterations = state.iterations_used, "run cancelled while deciding");
                return state.into_run(LoopOutcome::Failed(FailureReason::Cancelled));
            };

            let call = match decision {
                Ok(Decision::Call(call)) => call,
                Ok(Decision::Finish) => {
                    let outcome = if state.is_complete() {
                        LoopOutcome::Completed
                    } else {
                        let reason = state.finish_reason();
                        info!(images = state.images.len(), %reason, "decision function finished early");
                        LoopOutcome::Failed(reason)
                    };
                    return state.into_run(outcome);
                }
                Err(DecisionError::Unavailable(msg)) => {
                    warn!(error = %msg, "decision function failed");
                    return state
                        .into_run(LoopOutcome::Failed(FailureReason::DecisionUnavailable(msg)));
                }
            };

            info!(
                iteration = state.iterations_used + 1,
                tool = %call.name,
                args = %call.arguments,
                "tool call"
            );

            let step = tokio::select! {
                _ = cancel.cancelled() => None,
                step = self.answer(&call, &mut state, person, product, cancel) => step,
            };
            let Some((result, attempts)) = step else {
                info!(tool = %call.name, "run cancelled during tool call");
                return state.into_run(LoopOutcome::Failed(FailureReason::Cancelled));
            };

            debug!(tool = %call.name, attempts, result = %result.render(), "tool result");
            state.transcript.push(call, result, attempts);
            state.iterations_used += 1;

            if state.is_complete() {
                info!(iterations = state.iterations_used, "all images generated");
                return state.into_run(LoopOutcome::Completed);
            }
        }
    }

    /// Produces the result for one call. Returns `None` if cancelled while
    /// backing off. The second element counts upstream attempts.
    async fn answer(
        &self,
        call: &ToolCall,
        state: &mut LoopState,
        person: &SourceImage,
        product: &SourceImage,
        cancel: &CancellationToken,
    ) -> Option<(ToolResult, u32)> {
        match call.name.as_str() {
            VARIANTS_TOOL if state.variants.is_some() => {
                debug!("variants already available, skipping call");
                return Some((
                    ToolResult::skipped(format!(
                        "Variants already available, proceed to image synthesis with {SYNTHESIS_TOOL}."
                    )),
                    0,
                ));
            }
            SYNTHESIS_TOOL if state.variants.is_none() => {
                let err = ToolError::InvalidArguments(format!(
                    "no prompt variants yet; call {VARIANTS_TOOL} first"
                ));
                return Some((ToolResult::from_error(&err), 0));
            }
            SYNTHESIS_TOOL => {
                if let Some(index) = call.variant_index() {
                    if state.images.contains_key(&index) {
                        debug!(index, "image already generated, skipping call");
                        return Some((
                            ToolResult::skipped(format!(
                                "Image {index} already generated, request a different index or finish."
                            )),
                            0,
                        ));
                    }
                }
            }
            _ => {}
        }

        let is_synthesis = call.name == SYNTHESIS_TOOL;
        let mut attempt: u32 = 0;
        let outcome = loop {
            let ctx = ToolContext {
                intent: state.transcript.intent(),
                person,
                product,
                variants: state.variants.as_deref(),
            };
            let outcome = self
                .registry
                .invoke(&call.name, call.arguments.clone(), &ctx)
                .await;
            attempt += 1;

            match outcome {
                Err(ToolError::Timeout(after))
                    if is_synthesis && attempt <= self.policy.retry.max_retries =>
                {
                    let delay = self.policy.retry.delay(attempt - 1);
                    warn!(
                        attempt,
                        timeout_secs = after.as_secs(),
                        backoff_ms = delay.as_millis() as u64,
                        "synthesis timed out, retrying"
                    );
                    tokio::select! {
                        _ = cancel.cancelled() => return None,
                        _ = tokio::time::sleep(delay) => {}
                    }
                }
                other => break other,
            }
        };

        let result = match outcome {
            Ok(ToolOutput::Variants(prompts)) => {
                let result = ToolResult::from_output(&ToolOutput::Variants(prompts.clone()));
                state.variants = Some(prompts);
                state.variant_failure = None;
                result
            }
            Ok(ToolOutput::Image(image)) => {
                let result = ToolResult::from_output(&ToolOutput::Image(image.clone()));
                state.failures.remove(&image.index);
                state.images.insert(image.index, image);
                result
            }
            Err(err) => {
                warn!(tool = %call.name, error = %err, "tool call failed");
                let result = ToolResult::from_error(&err);
                if call.name == VARIANTS_TOOL {
                    // Only a failed upstream call makes the variants unobtainable.
                    if err.kind() == FailureKind::Upstream {
                        state.variant_failure = Some(err);
                    }
                } else if is_synthesis {
                    if let Some(index) = call.variant_index() {
                        state.failures.insert(index, err);
                    }
                }
                result
            }
        };
        Some((result, attempt))
    }
}
