//! Environment variable substitution, defaults, and validation.

use anyhow::Result;
use std::path::PathBuf;
use std::time::Duration;

use super::types::{Config, EndpointConfig, ProviderEntry};
use crate::agent::RetryPolicy;
use crate::clients::synthesis::SynthesisSettings;
use crate::clients::variants::VariantSettings;
use crate::constants::{
    AIML_BASE_URL, DEFAULT_BACKOFF_BASE_SECS, DEFAULT_BACKOFF_CAP_SECS, DEFAULT_MAX_ITERATIONS,
    DEFAULT_SYNTHESIS_MODEL, DEFAULT_SYNTHESIS_RETRIES, DEFAULT_SYNTHESIS_TIMEOUT_SECS,
    DEFAULT_SYSTEM_PROMPT, DEFAULT_VARIANTS_MODEL, DEFAULT_VARIANTS_TIMEOUT_SECS,
    MIN_MAX_ITERATIONS,
};

impl Config {
    /// Resolve {env:VAR_NAME} patterns in string fields.
    pub(super) fn resolve_substitutions(&mut self) {
        if let Some(ref mut sp) = self.agent.system_prompt {
            *sp = Self::resolve_str(sp);
        }
        if let Some(ref mut p) = self.agent.provider {
            *p = Self::resolve_str(p);
        }
        if let Some(ref mut m) = self.agent.model {
            *m = Self::resolve_str(m);
        }
        Self::resolve_provider_entry(&mut self.provider.aiml);
        Self::resolve_provider_entry(&mut self.provider.anthropic);
        Self::resolve_provider_entry(&mut self.provider.openai);
        Self::resolve_provider_entry(&mut self.provider.openrouter);
        Self::resolve_endpoint(&mut self.variants);
        Self::resolve_endpoint(&mut self.synthesis.endpoint);
    }

    /// Resolves `{env:VAR}` patterns in a single provider entry.
    fn resolve_provider_entry(entry: &mut Option<ProviderEntry>) {
        if let Some(ref mut e) = entry {
            if let Some(ref mut key) = e.api_key {
                *key = Self::resolve_str(key);
            }
            if let Some(ref mut url) = e.base_url {
                *url = Self::resolve_str(url);
            }
        }
    }

    fn resolve_endpoint(endpoint: &mut EndpointConfig) {
        for field in [&mut endpoint.base_url, &mut endpoint.api_key, &mut endpoint.model] {
            if let Some(ref mut value) = field {
                *value = Self::resolve_str(value);
            }
        }
    }

    /// Replace {env:VAR} with the environment variable value.
    ///
    /// Substituted values are not scanned again.
    pub(super) fn resolve_str(s: &str) -> String {
        let mut result = String::with_capacity(s.len());
        let mut rest = s;
        while let Some(start) = rest.find("{env:") {
            let Some(end) = rest[start..].find('}') else {
                break;
            };
            let var_name = &rest[start + 5..start + end];
            result.push_str(&rest[..start]);
            result.push_str(&std::env::var(var_name).unwrap_or_default());
            rest = &rest[start + end + 1..];
        }
        result.push_str(rest);
        result
    }

    fn provider_entry(&self, provider: &str) -> Option<&ProviderEntry> {
        match provider {
            "aiml" => self.provider.aiml.as_ref(),
            "anthropic" => self.provider.anthropic.as_ref(),
            "openai" => self.provider.openai.as_ref(),
            "openrouter" => self.provider.openrouter.as_ref(),
            _ => None,
        }
    }

    /// Resolve API key for a provider: env var first, then config value.
    pub fn resolve_api_key(&self, provider: &str) -> Option<String> {
        let env_key = format!("{}_API_KEY", provider.to_uppercase());
        if let Ok(val) = std::env::var(&env_key) {
            if !val.is_empty() {
                return Some(val);
            }
        }
        self.provider_entry(provider)
            .and_then(|e| e.api_key.clone())
            .filter(|k| !k.is_empty())
    }

    /// Base URL for a provider's OpenAI-compatible API.
    pub fn provider_base_url(&self, provider: &str) -> String {
        self.provider_entry(provider)
            .and_then(|e| e.base_url.clone())
            .filter(|u| !u.is_empty())
            .unwrap_or_else(|| AIML_BASE_URL.to_string())
    }

    pub fn system_prompt(&self) -> String {
        self.agent
            .system_prompt
            .clone()
            .unwrap_or_else(|| DEFAULT_SYSTEM_PROMPT.to_string())
    }

    pub fn max_iterations(&self) -> usize {
        self.agent.max_iterations.unwrap_or(DEFAULT_MAX_ITERATIONS)
    }

    pub fn output_dir(&self) -> PathBuf {
        self.output.dir.clone().unwrap_or_else(|| PathBuf::from("."))
    }

    /// Endpoint key, falling back to the AIML gateway key.
    fn endpoint_key(&self, endpoint: &EndpointConfig) -> Option<String> {
        endpoint
            .api_key
            .clone()
            .filter(|k| !k.is_empty())
            .or_else(|| self.resolve_api_key("aiml"))
    }

    fn endpoint_url(endpoint: &EndpointConfig) -> String {
        endpoint
            .base_url
            .clone()
            .filter(|u| !u.is_empty())
            .unwrap_or_else(|| AIML_BASE_URL.to_string())
    }

    pub fn variant_settings(&self) -> VariantSettings {
        VariantSettings {
            base_url: Self::endpoint_url(&self.variants),
            api_key: self.endpoint_key(&self.variants),
            model: self
                .variants
                .model
                .clone()
                .unwrap_or_else(|| DEFAULT_VARIANTS_MODEL.to_string()),
            timeout: Duration::from_secs(
                self.variants
                    .timeout_secs
                    .unwrap_or(DEFAULT_VARIANTS_TIMEOUT_SECS),
            ),
        }
    }

    pub fn synthesis_settings(&self) -> SynthesisSettings {
        let endpoint = &self.synthesis.endpoint;
        SynthesisSettings {
            base_url: Self::endpoint_url(endpoint),
            api_key: self.endpoint_key(endpoint),
            model: endpoint
                .model
                .clone()
                .unwrap_or_else(|| DEFAULT_SYNTHESIS_MODEL.to_string()),
            timeout: Duration::from_secs(
                endpoint
                    .timeout_secs
                    .unwrap_or(DEFAULT_SYNTHESIS_TIMEOUT_SECS),
            ),
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.synthesis.retries.unwrap_or(DEFAULT_SYNTHESIS_RETRIES),
            base: Duration::from_secs(
                self.synthesis
                    .backoff_base_secs
                    .unwrap_or(DEFAULT_BACKOFF_BASE_SECS),
            ),
            cap: Duration::from_secs(
                self.synthesis
                    .backoff_cap_secs
                    .unwrap_or(DEFAULT_BACKOFF_CAP_SECS),
            ),
        }
    }

    /// Rejects settings the agent cannot run with.
    pub fn validate(&self) -> Result<()> {
        let max = self.max_iterations();
        anyhow::ensure!(
            max >= MIN_MAX_ITERATIONS,
            "agent.max_iterations must be at least {MIN_MAX_ITERATIONS} (one variant call and one synthesis call), got {max}"
        );
        anyhow::ensure!(
            self.variants.timeout_secs != Some(0),
            "variants.timeout_secs must be greater than zero"
        );
        anyhow::ensure!(
            self.synthesis.endpoint.timeout_secs != Some(0),
            "synthesis.timeout_secs must be greater than zero"
        );
        let retry = self.retry_policy();
        anyhow::ensure!(
            retry.base <= retry.cap,
            "synthesis.backoff_base_secs must not exceed synthesis.backoff_cap_secs"
        );
        Ok(())
    }
}
