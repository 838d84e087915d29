//! Image synthesis tool: renders the composite for one variant index.

use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

use super::{Tool, ToolContext, ToolOutput};
use crate::clients::ImageSynthesizer;
use crate::constants::{SYNTHESIS_TOOL, VARIANTS_TOOL, VARIANT_COUNT};
use crate::error::ToolError;
use crate::image::GeneratedImage;

pub struct SynthesisTool {
    client: Arc<dyn ImageSynthesizer>,
}

impl SynthesisTool {
    pub fn new(client: Arc<dyn ImageSynthesizer>) -> Self {
        Self { client }
    }
}

#[derive(Deserialize)]
struct SynthesisInput {
    index: u8,
    prompt: Option<String>,
}

#[async_trait::async_trait]
impl Tool for SynthesisTool {
    fn name(&self) -> &str {
        SYNTHESIS_TOOL
    }

    fn description(&self) -> &str {
        "Generate one UGC image of the person with the product for a prompt variant. \
Call once for each index 1 to 4 after the variants exist."
    }

    fn schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "index": {
                    "type": "integer",
                    "minimum": 1,
                    "maximum": VARIANT_COUNT,
                    "description": "1-based index of the prompt variant to render"
                },
                "prompt": {
                    "type": "string",
                    "minLength": 1,
                    "description": "Prompt text. Defaults to the variant at `index`."
                }
            },
            "required": ["index"],
            "additionalProperties": false
        })
    }

    async fn execute(&self, input: Value, ctx: &ToolContext<'_>) -> Result<ToolOutput, ToolError> {
        let input: SynthesisInput = serde_json::from_value(input)
            .map_err(|e| ToolError::InvalidArguments(e.to_string()))?;
        let variants = ctx.variants.ok_or_else(|| {
            ToolError::InvalidArguments(format!(
                "no prompt variants yet; call {VARIANTS_TOOL} first"
            ))
        })?;
        let prompt = match input.prompt {
            Some(prompt) => prompt,
            None => variants
                .get(usize::from(input.index).wrapping_sub(1))
                .cloned()
                .ok_or_else(|| {
                    ToolError::InvalidArguments(format!("no prompt variant at index {}", input.index))
                })?,
        };

        let image = self
            .client
            .synthesize(&prompt, ctx.person, ctx.product)
            .await?;
        Ok(ToolOutput::Image(GeneratedImage::new(input.index, image)))
    }
}
