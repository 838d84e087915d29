//! Configuration types and path resolution for ugc-agent.
//!
//! Settings live as TOML at the platform's XDG config path
//! (e.g. `~/.config/ugc-agent/config.toml` on Linux), optionally overridden
//! by a `ugc.toml` in the project directory.

mod loader;
mod paths;
mod resolve;
mod types;

pub use types::Config;

use anyhow::Result;

impl Config {
    /// Load config with precedence: project > global > defaults.
    /// Creates default config file if none exists.
    pub fn load() -> Result<Self> {
        let global = Self::load_global()?;
        let project = Self::load_project()?;

        let mut config = global;
        if let Some(proj) = project {
            config = Self::merge(config, proj);
        }

        config.resolve_substitutions();
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.max_iterations(), 7);
        let retry = config.retry_policy();
        assert_eq!(retry.max_retries, 2);
        assert_eq!(retry.base, Duration::from_secs(2));
        assert_eq!(retry.cap, Duration::from_secs(30));
        assert_eq!(config.synthesis_settings().timeout, Duration::from_secs(240));
        assert_eq!(config.variant_settings().base_url, "https://api.aimlapi.com/v1");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_flattened_synthesis_section() {
        let config = Config::parse(
            r#"
[agent]
max_iterations = 9

[synthesis]
base_url = "http://localhost:8080/v1"
model = "edit-model"
timeout_secs = 200
retries = 3
"#,
        )
        .unwrap();
        assert_eq!(config.max_iterations(), 9);
        let settings = config.synthesis_settings();
        assert_eq!(settings.base_url, "http://localhost:8080/v1");
        assert_eq!(settings.model, "edit-model");
        assert_eq!(settings.timeout, Duration::from_secs(200));
        assert_eq!(config.retry_policy().max_retries, 3);
    }

    #[test]
    fn test_validate_rejects_small_budget_and_zero_timeout() {
        let mut config = Config::default();
        config.agent.max_iterations = Some(1);
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.synthesis.endpoint.timeout_secs = Some(0);
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.agent.max_iterations = Some(2);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_merge_project_wins() {
        let global = Config::parse(
            "[agent]\nmax_iterations = 7\nmodel = \"global\"\n[variants]\ntimeout_secs = 30\n",
        )
        .unwrap();
        let project = Config::parse("[agent]\nmodel = \"project\"\n").unwrap();
        let merged = Config::merge(global, project);
        assert_eq!(merged.agent.model.as_deref(), Some("project"));
        assert_eq!(merged.agent.max_iterations, Some(7));
        assert_eq!(merged.variants.timeout_secs, Some(30));
    }

    #[test]
    fn test_resolve_env_substitution() {
        std::env::set_var("UGC_AGENT_TEST_TOKEN", "secret");
        assert_eq!(
            Config::resolve_str("Bearer {env:UGC_AGENT_TEST_TOKEN}!"),
            "Bearer secret!"
        );
        assert_eq!(Config::resolve_str("{env:UGC_AGENT_TEST_UNSET_VAR}"), "");
        assert_eq!(Config::resolve_str("{env:broken"), "{env:broken");
    }

    #[test]
    fn test_substituted_value_is_not_rescanned() {
        std::env::set_var("UGC_AGENT_TEST_SELF_REF", "x{env:UGC_AGENT_TEST_SELF_REF}y");
        assert_eq!(
            Config::resolve_str("a{env:UGC_AGENT_TEST_SELF_REF}b"),
            "ax{env:UGC_AGENT_TEST_SELF_REF}yb"
        );
        std::env::set_var("UGC_AGENT_TEST_PART", "v");
        assert_eq!(
            Config::resolve_str("{env:UGC_AGENT_TEST_PART}-{env:UGC_AGENT_TEST_PART}"),
            "v-v"
        );
    }

    #[test]
    fn test_default_file_parses_and_serializes() {
        let config = Config::parse(loader_default()).unwrap();
        assert_eq!(config.agent.provider.as_deref(), Some("aiml"));
        let rendered = toml::to_string_pretty(&config).unwrap();
        assert!(rendered.contains("backoff_cap_secs = 30"));
    }

    fn loader_default() -> &'static str {
        loader::DEFAULT_CONFIG_TOML
    }
}
