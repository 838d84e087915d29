//! In-memory fakes shared by unit tests.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::clients::{ImageSynthesizer, VariantGenerator};
use crate::decision::{Decide, Decision};
use crate::error::{DecisionError, ToolError};
use crate::image::{ImageFormat, SourceImage, SynthesizedImage};
use crate::tools::ToolRegistry;
use crate::transcript::{ToolCall, Transcript};

pub const PNG: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 13];
pub const JPEG: &[u8] = &[0xFF, 0xD8, 0xFF, 0xE0, 0, 16, b'J', b'F', b'I', b'F'];

pub fn person() -> SourceImage {
    SourceImage::decode("person", JPEG.to_vec(), None).unwrap()
}

pub fn product() -> SourceImage {
    SourceImage::decode("product", PNG.to_vec(), None).unwrap()
}

pub fn beach_variants() -> Vec<String> {
    vec![
        "person holding product on a beach, morning light".into(),
        "person holding product on a beach at sunset".into(),
        "person holding product on a beach with waves behind".into(),
        "person holding product on a beach, close-up".into(),
    ]
}

/// Variant generator returning a fixed result and counting calls.
pub struct FakeVariants {
    result: Result<Vec<String>, ToolError>,
    calls: AtomicUsize,
}

impl FakeVariants {
    pub fn ok(prompts: Vec<String>) -> Arc<Self> {
        Arc::new(Self {
            result: Ok(prompts),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn failing(err: ToolError) -> Arc<Self> {
        Arc::new(Self {
            result: Err(err),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl VariantGenerator for FakeVariants {
    async fn generate(&self, intent: &str) -> Result<Vec<String>, ToolError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if intent.trim().is_empty() {
            return Err(ToolError::InvalidInput("intent is empty".into()));
        }
        self.result.clone()
    }
}

/// Synthesizer with per-prompt scripted failures. Unscripted calls succeed
/// with a PNG whose last byte is the call number.
pub struct FakeSynth {
    script: Mutex<HashMap<String, VecDeque<ToolError>>>,
    prompts: Mutex<Vec<String>>,
    calls: AtomicUsize,
}

impl FakeSynth {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(HashMap::new()),
            prompts: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
        })
    }

    /// Queue failures returned (in order) for `prompt` before it succeeds.
    pub fn fail_with(self: &Arc<Self>, prompt: &str, errors: Vec<ToolError>) -> Arc<Self> {
        self.script
            .lock()
            .unwrap()
            .insert(prompt.to_string(), errors.into());
        Arc::clone(self)
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl ImageSynthesizer for FakeSynth {
    async fn synthesize(
        &self,
        prompt: &str,
        _person: &SourceImage,
        _product: &SourceImage,
    ) -> Result<SynthesizedImage, ToolError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        self.prompts.lock().unwrap().push(prompt.to_string());
        if let Some(queue) = self.script.lock().unwrap().get_mut(prompt) {
            if let Some(err) = queue.pop_front() {
                return Err(err);
            }
        }
        let mut bytes = PNG.to_vec();
        bytes.push(n as u8);
        Ok(SynthesizedImage {
            format: ImageFormat::Png,
            bytes,
        })
    }
}

/// Decider that replays a fixed script, then finishes.
pub struct ScriptedDecider {
    script: Mutex<VecDeque<Result<Decision, String>>>,
    seen_iterations: Mutex<Vec<usize>>,
}

impl ScriptedDecider {
    pub fn new(script: Vec<Decision>) -> Self {
        Self {
            script: Mutex::new(script.into_iter().map(Ok).collect()),
            seen_iterations: Mutex::new(Vec::new()),
        }
    }

    /// Fails with a transport error once the script reaches `at`.
    pub fn failing_at(mut script: Vec<Decision>, at: usize) -> Self {
        script.truncate(at);
        let decider = Self::new(script);
        decider
            .script
            .lock()
            .unwrap()
            .push_back(Err("connection reset".into()));
        decider
    }

    pub fn seen_iterations(&self) -> Vec<usize> {
        self.seen_iterations.lock().unwrap().clone()
    }
}

#[async_trait]
impl Decide for ScriptedDecider {
    async fn decide(
        &self,
        _transcript: &Transcript,
        iterations_used: usize,
    ) -> Result<Decision, DecisionError> {
        self.seen_iterations.lock().unwrap().push(iterations_used);
        match self.script.lock().unwrap().pop_front() {
            Some(Ok(decision)) => Ok(decision),
            Some(Err(msg)) => Err(DecisionError::Unavailable(msg)),
            None => Ok(Decision::Finish),
        }
    }
}

pub fn variants_call() -> Decision {
    Decision::Call(ToolCall::new(
        "call_variants",
        crate::constants::VARIANTS_TOOL,
        serde_json::json!({}),
    ))
}

pub fn image_call(index: u8) -> Decision {
    Decision::Call(ToolCall::new(
        format!("call_image_{index}"),
        crate::constants::SYNTHESIS_TOOL,
        serde_json::json!({ "index": index }),
    ))
}

/// The happy path: variants, then images 1-4.
pub fn full_script() -> Vec<Decision> {
    let mut script = vec![variants_call()];
    script.extend((1..=4).map(image_call));
    script
}

pub fn registry(variants: Arc<FakeVariants>, synth: Arc<FakeSynth>) -> ToolRegistry {
    ToolRegistry::with_clients(variants, synth).unwrap()
}

pub fn timeout() -> ToolError {
    ToolError::Timeout(std::time::Duration::from_secs(240))
}
