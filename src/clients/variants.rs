//! Prompt variant generator backed by an OpenAI-compatible chat endpoint.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, info};

use super::{transport_error, VariantGenerator};
use crate::constants::{VARIANTS_INSTRUCTION, VARIANT_COUNT};
use crate::error::ToolError;

/// Connection settings for the variant service.
#[derive(Debug, Clone)]
pub struct VariantSettings {
    /// Base URL up to and including the API version (e.g. `.../v1`).
    pub base_url: String,
    pub api_key: Option<String>,
    pub model: String,
    pub timeout: Duration,
}

/// Client for the prompt variation call.
pub struct VariantClient {
    http: reqwest::Client,
    settings: VariantSettings,
}

impl VariantClient {
    pub fn new(settings: VariantSettings) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(settings.timeout)
            .build()
            .context("Failed to build HTTP client for the variant service")?;
        Ok(Self { http, settings })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/chat/completions",
            self.settings.base_url.trim_end_matches('/')
        )
    }
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

#[async_trait]
impl VariantGenerator for VariantClient {
    async fn generate(&self, intent: &str) -> Result<Vec<String>, ToolError> {
        let intent = intent.trim();
        if intent.is_empty() {
            return Err(ToolError::InvalidInput("intent is empty".into()));
        }

        let payload = json!({
            "model": self.settings.model,
            "messages": [
                {"role": "system", "content": VARIANTS_INSTRUCTION},
                {"role": "user", "content": format!("Base intent: {intent}")}
            ]
        });

        info!(model = %self.settings.model, "requesting prompt variants");
        let mut request = self.http.post(self.endpoint()).json(&payload);
        if let Some(key) = &self.settings.api_key {
            request = request.bearer_auth(key);
        }

        // Timeouts count as upstream failures here; only synthesis retries them.
        let response = request
            .send()
            .await
            .map_err(|e| match transport_error(e, self.settings.timeout) {
                ToolError::Timeout(t) => {
                    ToolError::upstream(None, format!("timed out after {}s", t.as_secs()))
                }
                other => other,
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ToolError::upstream(Some(status.as_u16()), e.to_string()))?;
        if !status.is_success() {
            return Err(ToolError::upstream(Some(status.as_u16()), body));
        }

        let parsed: ChatResponse = serde_json::from_str(&body).map_err(|e| {
            ToolError::upstream(Some(status.as_u16()), format!("malformed response: {e}"))
        })?;
        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| ToolError::upstream(Some(status.as_u16()), "response has no content"))?;

        let variants = parse_variants(&content)?;
        debug!(count = variants.len(), "prompt variants parsed");
        Ok(variants)
    }
}

/// Extracts exactly four prompts from the model's reply.
///
/// Accepts a bare JSON array, an object with a `prompts` array, and either of
/// those wrapped in a Markdown code fence.
pub fn parse_variants(content: &str) -> Result<Vec<String>, ToolError> {
    let body = strip_code_fence(content);
    let value: Value = serde_json::from_str(body)
        .map_err(|e| ToolError::upstream(None, format!("variants are not valid JSON: {e}")))?;

    let items = match &value {
        Value::Array(items) => items,
        Value::Object(map) => map
            .get("prompts")
            .or_else(|| map.get("variants"))
            .and_then(Value::as_array)
            .ok_or_else(|| ToolError::upstream(None, "variants object has no prompts array"))?,
        _ => return Err(ToolError::upstream(None, "variants must be a JSON array")),
    };

    let prompts: Vec<String> = items
        .iter()
        .filter_map(Value::as_str)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();

    if prompts.len() != items.len() || prompts.len() != VARIANT_COUNT {
        return Err(ToolError::upstream(
            None,
            format!(
                "expected exactly {VARIANT_COUNT} non-empty prompt strings, got {}",
                items.len()
            ),
        ));
    }
    Ok(prompts)
}

fn strip_code_fence(content: &str) -> &str {
    let trimmed = content.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the info string (e.g. `json`) on the opening fence line.
    let rest = rest.split_once('\n').map(|(_, body)| body).unwrap_or(rest);
    rest.trim_end().strip_suffix("```").unwrap_or(rest).trim()
}
