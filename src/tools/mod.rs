pub mod synthesis_tool;
pub mod variants_tool;

use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::warn;

use crate::clients::{ImageSynthesizer, VariantGenerator};
use crate::error::ToolError;
use crate::image::{GeneratedImage, SourceImage};

use synthesis_tool::SynthesisTool;
use variants_tool::VariantsTool;

/// What a tool produced on success.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolOutput {
    Variants(Vec<String>),
    Image(GeneratedImage),
}

/// Per-run data a tool may read. Borrowed for the duration of one call.
pub struct ToolContext<'a> {
    pub intent: &'a str,
    pub person: &'a SourceImage,
    pub product: &'a SourceImage,
    /// Prompt variants, once the variant tool has succeeded.
    pub variants: Option<&'a [String]>,
}

/// Definition sent to the decision model so it knows what tools are available.
#[derive(Debug, Clone, Serialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub parameters: Value, // JSON Schema
}

/// Every tool implements this trait.
#[async_trait::async_trait]
pub trait Tool: Send + Sync {
    /// Unique name the decision model uses to call this tool.
    fn name(&self) -> &str;

    /// Human-readable description for the decision model.
    fn description(&self) -> &str;

    /// JSON Schema describing the tool's input parameters.
    fn schema(&self) -> Value;

    /// Execute the tool with arguments that already passed schema validation.
    async fn execute(&self, input: Value, ctx: &ToolContext<'_>) -> Result<ToolOutput, ToolError>;
}

struct Registered {
    tool: Arc<dyn Tool>,
    validator: jsonschema::Validator,
}

/// Holds all registered tools, validates arguments and dispatches calls by name.
pub struct ToolRegistry {
    tools: Vec<Registered>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self { tools: Vec::new() }
    }

    /// Register a tool, compiling its schema once up front.
    ///
    /// # Errors
    ///
    /// Returns an error if the tool's schema is not a valid JSON Schema document.
    pub fn register(&mut self, tool: Box<dyn Tool>) -> anyhow::Result<()> {
        let validator = jsonschema::validator_for(&tool.schema())
            .map_err(|e| anyhow::anyhow!("Invalid schema for tool '{}': {}", tool.name(), e))?;
        self.tools.push(Registered {
            tool: Arc::from(tool),
            validator,
        });
        Ok(())
    }

    /// Produce definitions for the decision model.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools
            .iter()
            .map(|r| ToolDefinition {
                name: r.tool.name().to_string(),
                description: r.tool.description().to_string(),
                parameters: r.tool.schema(),
            })
            .collect()
    }

    fn find(&self, name: &str) -> Result<&Registered, ToolError> {
        self.tools
            .iter()
            .find(|r| r.tool.name() == name)
            .ok_or_else(|| ToolError::UnknownTool(name.to_string()))
    }

    /// Look up a tool by name.
    pub fn lookup(&self, name: &str) -> Result<Arc<dyn Tool>, ToolError> {
        self.find(name).map(|r| Arc::clone(&r.tool))
    }

    /// Check arguments against a tool's schema, reporting every violation.
    pub fn validate(&self, name: &str, input: &Value) -> Result<(), ToolError> {
        let registered = self.find(name)?;
        let violations: Vec<String> = registered
            .validator
            .iter_errors(input)
            .map(|e| {
                let path = e.instance_path.to_string();
                if path.is_empty() {
                    e.to_string()
                } else {
                    format!("{path}: {e}")
                }
            })
            .collect();
        if violations.is_empty() {
            Ok(())
        } else {
            warn!(tool = name, ?violations, "tool arguments rejected by schema");
            Err(ToolError::InvalidArguments(violations.join("; ")))
        }
    }

    /// Validate and execute a tool call.
    ///
    /// Schema violations come back as [`ToolError::InvalidArguments`] so the
    /// decision function can see them and retry with corrected arguments.
    pub async fn invoke(
        &self,
        name: &str,
        input: Value,
        ctx: &ToolContext<'_>,
    ) -> Result<ToolOutput, ToolError> {
        self.validate(name, &input)?;
        let tool = self.lookup(name)?;
        tool.execute(input, ctx).await
    }

    /// How many tools are registered.
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

impl ToolRegistry {
    /// Create a registry with the variant and synthesis tools.
    pub fn with_clients(
        variants: Arc<dyn VariantGenerator>,
        synthesizer: Arc<dyn ImageSynthesizer>,
    ) -> anyhow::Result<Self> {
        let mut registry = Self::new();
        registry.register(Box::new(VariantsTool::new(variants)))?;
        registry.register(Box::new(SynthesisTool::new(synthesizer)))?;
        Ok(registry)
    }
}

#[cfg(test)]
mod tests;
