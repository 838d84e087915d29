//! One end-to-end run: validate inputs, drive the loop, persist results.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;
use tracing::{info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::agent::{AgentLoop, LoopOutcome, LoopPolicy};
use crate::constants::VARIANT_COUNT;
use crate::decision::Decide;
use crate::error::{FailureReason, ToolError};
use crate::image::{GeneratedImage, ImageFormat, SourceImage};
use crate::storage::Storage;
use crate::tools::ToolRegistry;
use crate::transcript::Transcript;

/// A photo as supplied by the caller, not yet validated.
#[derive(Debug, Clone)]
pub struct ImageInput {
    pub bytes: Vec<u8>,
    /// Format claimed by the caller (e.g. from a MIME type or file extension).
    pub declared: Option<ImageFormat>,
}

impl ImageInput {
    pub fn new(bytes: Vec<u8>, declared: Option<ImageFormat>) -> Self {
        Self { bytes, declared }
    }
}

#[derive(Debug, Clone)]
pub struct RunRequest {
    pub intent: String,
    pub person: ImageInput,
    pub product: ImageInput,
}

/// Terminal result of a run.
#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    /// Exactly four images, indices 1 through 4.
    Completed { images: Vec<GeneratedImage> },
    Failed {
        reason: FailureReason,
        /// Images produced before the run ended, ordered by index.
        partial: Vec<GeneratedImage>,
        /// Last synthesis error for each index still missing an image.
        failures: BTreeMap<u8, String>,
    },
}

impl RunOutcome {
    pub fn images(&self) -> &[GeneratedImage] {
        match self {
            Self::Completed { images } => images,
            Self::Failed { partial, .. } => partial,
        }
    }
}

/// Coarse classification for reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Completed,
    Partial { completed: usize, failed: usize },
    NoImages,
}

#[derive(Debug)]
pub struct RunReport {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub elapsed: Duration,
    pub outcome: RunOutcome,
    /// Locator of every persisted image, by index.
    pub saved: BTreeMap<u8, String>,
    /// Persistence failures, by index. The bytes remain in `outcome`.
    pub storage_errors: BTreeMap<u8, String>,
    pub iterations_used: usize,
    pub transcript: Transcript,
}

impl RunReport {
    pub fn status(&self) -> RunStatus {
        match &self.outcome {
            RunOutcome::Completed { .. } => RunStatus::Completed,
            RunOutcome::Failed { partial, .. } if partial.is_empty() => RunStatus::NoImages,
            RunOutcome::Failed { partial, .. } => RunStatus::Partial {
                completed: partial.len(),
                failed: VARIANT_COUNT - partial.len(),
            },
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self.outcome, RunOutcome::Completed { .. })
    }
}

/// Shared across runs; holds no per-run state.
pub struct RunCoordinator {
    registry: Arc<ToolRegistry>,
    storage: Arc<dyn Storage>,
    policy: LoopPolicy,
}

impl RunCoordinator {
    pub fn new(registry: Arc<ToolRegistry>, storage: Arc<dyn Storage>, policy: LoopPolicy) -> Self {
        Self {
            registry,
            storage,
            policy,
        }
    }

    pub async fn run(
        &self,
        request: RunRequest,
        decider: &dyn Decide,
        cancel: &CancellationToken,
    ) -> RunReport {
        let run_id = Uuid::new_v4();
        let span = info_span!("run", %run_id);
        self.run_inner(run_id, request, decider, cancel)
            .instrument(span)
            .await
    }

    async fn run_inner(
        &self,
        run_id: Uuid,
        request: RunRequest,
        decider: &dyn Decide,
        cancel: &CancellationToken,
    ) -> RunReport {
        let started_at = Utc::now();
        let clock = Instant::now();

        let (person, product) = match validate(&request) {
            Ok(images) => images,
            Err(detail) => {
                warn!(error = %detail, "rejected run input");
                return RunReport {
                    run_id,
                    started_at,
                    elapsed: clock.elapsed(),
                    outcome: RunOutcome::Failed {
                        reason: FailureReason::InvalidInput(detail),
                        partial: Vec::new(),
                        failures: BTreeMap::new(),
                    },
                    saved: BTreeMap::new(),
                    storage_errors: BTreeMap::new(),
                    iterations_used: 0,
                    transcript: Transcript::new(request.intent),
                };
            }
        };

        info!(intent = %request.intent, max_iterations = self.policy.max_iterations, "starting run");
        let run = AgentLoop::new(&self.registry, self.policy)
            .run(&request.intent, &person, &product, decider, cancel)
            .await;

        let images: Vec<GeneratedImage> = run.images.into_values().collect();
        let (saved, storage_errors) = self.persist(&images).await;

        let outcome = match run.outcome {
            LoopOutcome::Completed => RunOutcome::Completed { images },
            LoopOutcome::Failed(reason) => RunOutcome::Failed {
                reason,
                partial: images,
                failures: run
                    .failures
                    .into_iter()
                    .map(|(index, err)| (index, err.to_string()))
                    .collect(),
            },
        };

        let report = RunReport {
            run_id,
            started_at,
            elapsed: clock.elapsed(),
            outcome,
            saved,
            storage_errors,
            iterations_used: run.iterations_used,
            transcript: run.transcript,
        };
        info!(
            status = ?report.status(),
            iterations = report.iterations_used,
            elapsed_ms = report.elapsed.as_millis() as u64,
            "run finished"
        );
        report
    }

    async fn persist(
        &self,
        images: &[GeneratedImage],
    ) -> (BTreeMap<u8, String>, BTreeMap<u8, String>) {
        let mut saved = BTreeMap::new();
        let mut errors = BTreeMap::new();
        for image in images {
            match self.storage.save(image.index, &image.bytes, image.format).await {
                Ok(locator) => {
                    saved.insert(image.index, locator);
                }
                Err(e) => {
                    warn!(index = image.index, error = %e, "failed to persist image");
                    errors.insert(image.index, e.to_string());
                }
            }
        }
        (saved, errors)
    }
}

/// Checks the intent and both photos before anything touches the network.
fn validate(request: &RunRequest) -> Result<(SourceImage, SourceImage), String> {
    if request.intent.trim().is_empty() {
        return Err("intent is empty".into());
    }
    let detail = |err: ToolError| match err {
        ToolError::InvalidInput(detail) => detail,
        other => other.to_string(),
    };
    let person = SourceImage::decode(
        "person",
        request.person.bytes.clone(),
        request.person.declared,
    )
    .map_err(detail)?;
    let product = SourceImage::decode(
        "product",
        request.product.bytes.clone(),
        request.product.declared,
    )
    .map_err(detail)?;
    Ok((person, product))
}
