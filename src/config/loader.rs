//! File loading and merging for ugc-agent configuration.

use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

use super::types::{AgentConfig, Config, EndpointConfig, OutputConfig, ProviderConfig, SynthesisConfig};

/// Written on first run so users have something to edit.
pub(super) const DEFAULT_CONFIG_TOML: &str = r#"[agent]
max_iterations = 7
provider = "aiml"

[provider.aiml]
api_key = "{env:AIML_API_KEY}"

[provider.anthropic]
api_key = "{env:ANTHROPIC_API_KEY}"

[provider.openai]
api_key = "{env:OPENAI_API_KEY}"

[variants]
base_url = "https://api.aimlapi.com/v1"
timeout_secs = 60

[synthesis]
base_url = "https://api.aimlapi.com/v1"
timeout_secs = 240
retries = 2
backoff_base_secs = 2
backoff_cap_secs = 30
"#;

impl Config {
    /// Loads the global config from `~/.config/ugc-agent/config.toml`.
    ///
    /// If no config file exists, creates one with sensible defaults
    /// (including `{env:VAR}` placeholders for API keys) and returns it.
    pub(super) fn load_global() -> Result<Self> {
        let path = Self::config_path()?;
        if !path.exists() {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(&path, DEFAULT_CONFIG_TOML)
                .with_context(|| format!("Failed to write default config to {:?}", path))?;
            return Self::parse(DEFAULT_CONFIG_TOML)
                .with_context(|| "Failed to parse default config".to_string());
        }
        Self::load_file(&path)
    }

    /// Look for ugc.toml in the current dir, then walk up to the git root.
    pub(super) fn load_project() -> Result<Option<Config>> {
        let mut dir = std::env::current_dir()?;
        loop {
            let candidate = dir.join(crate::constants::PROJECT_CONFIG_FILENAME);
            if candidate.exists() {
                return Self::load_file(&candidate).map(Some);
            }
            // Stop at git root or filesystem root
            if dir.join(".git").exists() || !dir.pop() {
                break;
            }
        }
        Ok(None)
    }

    pub(super) fn load_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {:?}", path))?;
        Self::parse(&contents).with_context(|| format!("Failed to parse config at {:?}", path))
    }

    pub(super) fn parse(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// Merge project config over global config.
    /// Project values win when present.
    pub(super) fn merge(global: Config, project: Config) -> Config {
        Config {
            agent: AgentConfig {
                max_iterations: project.agent.max_iterations.or(global.agent.max_iterations),
                provider: project.agent.provider.or(global.agent.provider),
                model: project.agent.model.or(global.agent.model),
                system_prompt: project.agent.system_prompt.or(global.agent.system_prompt),
            },
            provider: ProviderConfig {
                aiml: project.provider.aiml.or(global.provider.aiml),
                anthropic: project.provider.anthropic.or(global.provider.anthropic),
                openai: project.provider.openai.or(global.provider.openai),
                openrouter: project.provider.openrouter.or(global.provider.openrouter),
            },
            variants: merge_endpoint(global.variants, project.variants),
            synthesis: SynthesisConfig {
                endpoint: merge_endpoint(global.synthesis.endpoint, project.synthesis.endpoint),
                retries: project.synthesis.retries.or(global.synthesis.retries),
                backoff_base_secs: project
                    .synthesis
                    .backoff_base_secs
                    .or(global.synthesis.backoff_base_secs),
                backoff_cap_secs: project
                    .synthesis
                    .backoff_cap_secs
                    .or(global.synthesis.backoff_cap_secs),
            },
            output: OutputConfig {
                dir: project.output.dir.or(global.output.dir),
            },
        }
    }
}

fn merge_endpoint(global: EndpointConfig, project: EndpointConfig) -> EndpointConfig {
    EndpointConfig {
        base_url: project.base_url.or(global.base_url),
        api_key: project.api_key.or(global.api_key),
        model: project.model.or(global.model),
        timeout_secs: project.timeout_secs.or(global.timeout_secs),
    }
}
