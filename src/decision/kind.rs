//! Provider kind enumeration, default models and model resolution.
//!
//! Defines [`ProviderKind`] which identifies which LLM backend drives the
//! decision function, and [`resolve_model`] which picks provider and model
//! from CLI flags, config, and defaults.

use anyhow::{anyhow, Result};

use crate::config::Config;
use crate::constants::DEFAULT_PROVIDER;

/// Identifies which LLM provider to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    /// AIML gateway (OpenAI-compatible, the default).
    Aiml,
    /// Anthropic (Claude models).
    Anthropic,
    /// OpenAI (GPT models).
    OpenAI,
    /// OpenRouter (multi-provider gateway).
    OpenRouter,
}

impl ProviderKind {
    /// Parses a provider name string into a [`ProviderKind`].
    ///
    /// Matching is case-insensitive. Returns an error for unknown providers.
    pub fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "aiml" | "aimlapi" => Ok(Self::Aiml),
            "anthropic" => Ok(Self::Anthropic),
            "openai" => Ok(Self::OpenAI),
            "openrouter" => Ok(Self::OpenRouter),
            other => Err(anyhow!(
                "Unknown provider: {other}. Supported: aiml, anthropic, openai, openrouter"
            )),
        }
    }

    /// Config/env name of the provider (`AIML_API_KEY`, `[provider.aiml]`).
    pub fn name(&self) -> &'static str {
        match self {
            Self::Aiml => "aiml",
            Self::Anthropic => "anthropic",
            Self::OpenAI => "openai",
            Self::OpenRouter => "openrouter",
        }
    }
}

/// Returns the default model identifier for a given provider.
pub fn default_model_for(provider: &ProviderKind) -> &'static str {
    match provider {
        ProviderKind::Aiml => crate::constants::DEFAULT_AIML_MODEL,
        ProviderKind::Anthropic => crate::constants::DEFAULT_ANTHROPIC_MODEL,
        ProviderKind::OpenAI => crate::constants::DEFAULT_OPENAI_MODEL,
        ProviderKind::OpenRouter => crate::constants::DEFAULT_OPENROUTER_MODEL,
    }
}

/// Resolved provider + model pair.
#[derive(Debug, Clone)]
pub struct ModelSelection {
    pub provider: ProviderKind,
    pub model: String,
}

/// Resolve which provider and model drive the decision function.
/// Priority: CLI flags > config.toml > defaults.
///
/// `--model anthropic/claude-sonnet-4-6` is read as provider/model shorthand
/// only when `--provider` is omitted; otherwise the slash stays in the name.
pub fn resolve_model(
    cli_provider: Option<&str>,
    cli_model: Option<&str>,
    config: &Config,
) -> Result<ModelSelection> {
    if cli_provider.is_none() {
        if let Some((prov, model)) = cli_model.and_then(|m| m.split_once('/')) {
            if let Ok(provider) = ProviderKind::from_str(prov) {
                return Ok(ModelSelection {
                    provider,
                    model: model.to_string(),
                });
            }
        }
    }

    let provider_str = cli_provider
        .or(config.agent.provider.as_deref())
        .unwrap_or(DEFAULT_PROVIDER);
    let provider = ProviderKind::from_str(provider_str)?;

    let model = cli_model
        .map(String::from)
        .or_else(|| config.agent.model.clone())
        .unwrap_or_else(|| default_model_for(&provider).to_string());

    Ok(ModelSelection { provider, model })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_to_aiml() {
        let selection = resolve_model(None, None, &Config::default()).unwrap();
        assert_eq!(selection.provider, ProviderKind::Aiml);
        assert_eq!(selection.model, crate::constants::DEFAULT_AIML_MODEL);
    }

    #[test]
    fn test_shorthand_only_without_provider_flag() {
        let selection = resolve_model(None, Some("anthropic/claude-x"), &Config::default()).unwrap();
        assert_eq!(selection.provider, ProviderKind::Anthropic);
        assert_eq!(selection.model, "claude-x");

        let selection =
            resolve_model(Some("openrouter"), Some("openai/gpt-4.1"), &Config::default()).unwrap();
        assert_eq!(selection.provider, ProviderKind::OpenRouter);
        assert_eq!(selection.model, "openai/gpt-4.1");
    }

    #[test]
    fn test_config_provider_and_model() {
        let mut config = Config::default();
        config.agent.provider = Some("openai".into());
        config.agent.model = Some("gpt-5".into());
        let selection = resolve_model(None, None, &config).unwrap();
        assert_eq!(selection.provider, ProviderKind::OpenAI);
        assert_eq!(selection.model, "gpt-5");
    }

    #[test]
    fn test_unknown_provider() {
        assert!(ProviderKind::from_str("ollama").is_err());
        assert_eq!(ProviderKind::from_str("AIML").unwrap(), ProviderKind::Aiml);
    }
}
