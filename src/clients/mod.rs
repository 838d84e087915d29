//! Network clients for the two upstream services.
//!
//! Each client wraps exactly one HTTP call and never retries on its own;
//! retry policy belongs to the agent loop. The traits let tests swap in
//! in-memory fakes.

pub mod synthesis;
pub mod variants;

use async_trait::async_trait;

use crate::error::ToolError;
use crate::image::{SourceImage, SynthesizedImage};

pub use synthesis::SynthesisClient;
pub use variants::VariantClient;

/// Turns a base intent into exactly four prompt variants.
#[async_trait]
pub trait VariantGenerator: Send + Sync {
    async fn generate(&self, intent: &str) -> Result<Vec<String>, ToolError>;
}

/// Renders one composite image from a prompt and the two source photos.
#[async_trait]
pub trait ImageSynthesizer: Send + Sync {
    async fn synthesize(
        &self,
        prompt: &str,
        person: &SourceImage,
        product: &SourceImage,
    ) -> Result<SynthesizedImage, ToolError>;
}

/// Maps a reqwest transport error onto the tool error taxonomy.
pub(crate) fn transport_error(err: reqwest::Error, timeout: std::time::Duration) -> ToolError {
    if err.is_timeout() {
        ToolError::Timeout(timeout)
    } else {
        ToolError::upstream(err.status().map(|s| s.as_u16()), err.to_string())
    }
}
