//! Prompt variation tool: one intent in, four prompts out.

use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

use super::{Tool, ToolContext, ToolOutput};
use crate::clients::VariantGenerator;
use crate::constants::VARIANTS_TOOL;
use crate::error::ToolError;

pub struct VariantsTool {
    client: Arc<dyn VariantGenerator>,
}

impl VariantsTool {
    pub fn new(client: Arc<dyn VariantGenerator>) -> Self {
        Self { client }
    }
}

#[derive(Deserialize)]
struct VariantsInput {
    base_intent: Option<String>,
}

#[async_trait::async_trait]
impl Tool for VariantsTool {
    fn name(&self) -> &str {
        VARIANTS_TOOL
    }

    fn description(&self) -> &str {
        "Generate 4 diverse UGC image prompts from the base intent. Call this exactly once, \
before any image generation."
    }

    fn schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "base_intent": {
                    "type": "string",
                    "description": "Scene to vary. Defaults to the user's request."
                }
            },
            "additionalProperties": false
        })
    }

    async fn execute(&self, input: Value, ctx: &ToolContext<'_>) -> Result<ToolOutput, ToolError> {
        let input: VariantsInput = serde_json::from_value(input)
            .map_err(|e| ToolError::InvalidArguments(e.to_string()))?;
        let intent = input.base_intent.as_deref().unwrap_or(ctx.intent);
        let prompts = self.client.generate(intent).await?;
        Ok(ToolOutput::Variants(prompts))
    }
}
