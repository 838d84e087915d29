//! Struct definitions and serde defaults for ugc-agent configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration, deserialized from `config.toml`.
///
/// Every field is optional so the agent runs with sensible defaults when no
/// config file exists; accessors in `resolve.rs` apply the defaults.
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct Config {
    /// Agent loop and decision model settings.
    #[serde(default)]
    pub agent: AgentConfig,
    /// Per-provider credentials for the decision model.
    #[serde(default)]
    pub provider: ProviderConfig,
    /// Prompt variant service.
    #[serde(default)]
    pub variants: EndpointConfig,
    /// Image synthesis service and its timeout retry policy.
    #[serde(default)]
    pub synthesis: SynthesisConfig,
    /// Where generated images are written.
    #[serde(default)]
    pub output: OutputConfig,
}

/// Settings for the decide/execute loop.
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct AgentConfig {
    /// Iteration budget for one run (default 7, at least 2).
    pub max_iterations: Option<usize>,
    /// Decision model provider (`aiml`, `anthropic`, `openai`, `openrouter`).
    pub provider: Option<String>,
    /// Decision model identifier.
    pub model: Option<String>,
    /// Preamble given to the decision model.
    pub system_prompt: Option<String>,
}

/// Provider-specific configuration map.
///
/// Each field corresponds to a supported LLM provider. Only providers
/// the user has configured will be `Some`.
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct ProviderConfig {
    pub aiml: Option<ProviderEntry>,
    pub anthropic: Option<ProviderEntry>,
    pub openai: Option<ProviderEntry>,
    pub openrouter: Option<ProviderEntry>,
}

/// Connection details for a single LLM provider.
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct ProviderEntry {
    /// API key for authentication. Can also be set via environment variables.
    pub api_key: Option<String>,
    /// Custom base URL for the provider's API (useful for proxies).
    pub base_url: Option<String>,
}

/// An upstream HTTP service.
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct EndpointConfig {
    /// Base URL including the API version, e.g. `https://api.aimlapi.com/v1`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    /// Bearer token. Falls back to the AIML key when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

/// The image-edit service plus retry policy for its timeouts.
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct SynthesisConfig {
    #[serde(flatten)]
    pub endpoint: EndpointConfig,
    /// Extra attempts after a timeout (default 2).
    pub retries: Option<u32>,
    /// First backoff delay in seconds (default 2).
    pub backoff_base_secs: Option<u64>,
    /// Backoff ceiling in seconds (default 30).
    pub backoff_cap_secs: Option<u64>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct OutputConfig {
    /// Directory for `generated_ugc_image_{n}.{ext}` files (default `.`).
    pub dir: Option<PathBuf>,
}
