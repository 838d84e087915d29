//! Centralized constants for ugc-agent.
//!
//! All magic numbers, default strings, and configuration constants live here
//! so they can be changed in one place.

/// Application name used in CLI output and directory paths.
pub const APP_NAME: &str = "ugc-agent";

/// Configuration filename.
pub const CONFIG_FILENAME: &str = "config.toml";

/// Per-project configuration filename.
pub const PROJECT_CONFIG_FILENAME: &str = "ugc.toml";

// --- Agent loop ---

/// Default iteration budget: one variant call, four synthesis calls, slack.
pub const DEFAULT_MAX_ITERATIONS: usize = 7;

/// Smallest usable budget (one variant call plus one synthesis call).
pub const MIN_MAX_ITERATIONS: usize = 2;

/// Number of prompt variants, and therefore output images, per run.
pub const VARIANT_COUNT: usize = 4;

/// Intent used by `--default-intent` when none is given.
pub const DEFAULT_INTENT: &str = "A person showcasing a product in a natural, engaging way";

// --- Tool names ---

/// Tool that turns the intent into four prompt variants.
pub const VARIANTS_TOOL: &str = "generate_prompt_variants";

/// Tool that renders one composite image for a variant index.
pub const SYNTHESIS_TOOL: &str = "generate_ugc_image";

// --- Decision model ---

/// Default provider for the decision model.
pub const DEFAULT_PROVIDER: &str = "aiml";

/// Default decision model on the AIML gateway.
pub const DEFAULT_AIML_MODEL: &str = "gpt-5-2025-08-07";

/// Default decision model for Anthropic.
pub const DEFAULT_ANTHROPIC_MODEL: &str = "claude-sonnet-4-6";

/// Default decision model for OpenAI.
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4.1";

/// Default decision model for OpenRouter.
pub const DEFAULT_OPENROUTER_MODEL: &str = "openai/gpt-4.1";

/// Base URL of the AIML OpenAI-compatible gateway.
pub const AIML_BASE_URL: &str = "https://api.aimlapi.com/v1";

/// Maximum tokens for one decision completion.
pub const MAX_TOKENS: u64 = 2048;

/// Preamble given to the decision model.
pub const DEFAULT_SYSTEM_PROMPT: &str = "You orchestrate UGC image generation. \
Call generate_prompt_variants exactly once to get four prompts. \
Then call generate_ugc_image once for each index 1, 2, 3 and 4. \
Never call generate_prompt_variants twice. \
When all four images are done, or nothing more can be done, reply with a short \
plain-text summary instead of a tool call.";

// --- Variant generator ---

/// Default model for prompt variation.
pub const DEFAULT_VARIANTS_MODEL: &str = "gpt-4o";

/// Default timeout for the variant call, in seconds.
pub const DEFAULT_VARIANTS_TIMEOUT_SECS: u64 = 60;

/// Instruction sent alongside the intent to the variant service.
pub const VARIANTS_INSTRUCTION: &str = "You write prompts for user-generated-content style photos \
that combine a person and a product. Given a base intent, write exactly 4 diverse prompts that \
vary setting, lighting, framing and mood while keeping the person and product recognizable. \
Return ONLY a JSON array of 4 strings.";

// --- Image synthesis ---

/// Default image-edit model.
pub const DEFAULT_SYNTHESIS_MODEL: &str = "google/nano-banana-pro-edit";

/// Default synthesis timeout in seconds; upstream latency is 60-180s.
pub const DEFAULT_SYNTHESIS_TIMEOUT_SECS: u64 = 240;

/// Default number of extra attempts after a synthesis timeout.
pub const DEFAULT_SYNTHESIS_RETRIES: u32 = 2;

/// Default first backoff delay after a synthesis timeout, in seconds.
pub const DEFAULT_BACKOFF_BASE_SECS: u64 = 2;

/// Default ceiling for the backoff delay, in seconds.
pub const DEFAULT_BACKOFF_CAP_SECS: u64 = 30;

// --- Output ---

/// Stem of persisted output files: `generated_ugc_image_{index}.{ext}`.
pub const OUTPUT_FILE_STEM: &str = "generated_ugc_image";

/// Maximum bytes of an upstream error body kept for diagnostics.
pub const UPSTREAM_BODY_LIMIT: usize = 2000;
