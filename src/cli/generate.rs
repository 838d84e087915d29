//! The `ugc generate` handler: wires config, clients, decider and storage
//! into a [`RunCoordinator`] and reports the result.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use colored::Colorize;
use tokio_util::sync::CancellationToken;
use tracing::info;

use super::{GenerateArgs, Planner};
use crate::agent::LoopPolicy;
use crate::clients::{SynthesisClient, VariantClient};
use crate::config::Config;
use crate::constants::DEFAULT_INTENT;
use crate::coordinator::{ImageInput, RunCoordinator, RunRequest};
use crate::decision::{self, Decide, LlmDecider, PlannedDecider};
use crate::image::ImageFormat;
use crate::output::{Renderer, TermRenderer};
use crate::storage::FsStorage;
use crate::tools::ToolRegistry;

/// Builds the tool registry backed by the configured HTTP clients.
pub(super) fn build_registry(config: &Config) -> Result<ToolRegistry> {
    let variants = VariantClient::new(config.variant_settings())?;
    let synthesis = SynthesisClient::new(config.synthesis_settings())?;
    ToolRegistry::with_clients(Arc::new(variants), Arc::new(synthesis))
}

/// Resolves the intent from positional words, honoring `--default-intent`.
fn resolve_intent(words: &[String], use_default: bool) -> String {
    let intent = words.join(" ");
    if intent.trim().is_empty() && use_default {
        DEFAULT_INTENT.to_string()
    } else {
        intent
    }
}

/// Reads a photo, taking the declared format from the file extension.
async fn read_image(path: &Path) -> Result<ImageInput> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read image {}", path.display()))?;
    let declared = path
        .extension()
        .and_then(|ext| ext.to_str())
        .and_then(ImageFormat::from_mime);
    Ok(ImageInput::new(bytes, declared))
}

pub(super) async fn handle_generate(args: GenerateArgs) -> Result<()> {
    let mut config = Config::load()?;
    if let Some(max) = args.max_iterations {
        config.agent.max_iterations = Some(max);
        config.validate()?;
    }

    let registry = Arc::new(build_registry(&config)?);

    let (decider, planner_label): (Box<dyn Decide>, String) = match args.planner {
        Planner::Llm => {
            let selection =
                decision::resolve_model(args.provider.as_deref(), args.model.as_deref(), &config)?;
            let label = format!("{}/{}", selection.provider.name(), selection.model);
            let decider = LlmDecider::from_config(&config, &selection, registry.definitions())?;
            (Box::new(decider), label)
        }
        Planner::Planned => (Box::new(PlannedDecider::default()), "planned".to_string()),
    };

    let request = RunRequest {
        intent: resolve_intent(&args.intent, args.default_intent),
        person: read_image(&args.person).await?,
        product: read_image(&args.product).await?,
    };

    let out_dir = args.out.clone().unwrap_or_else(|| config.output_dir());
    let storage = Arc::new(FsStorage::new(out_dir));
    let policy = LoopPolicy {
        max_iterations: config.max_iterations(),
        retry: config.retry_policy(),
    };
    let coordinator = RunCoordinator::new(registry, storage, policy);

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("interrupt received, cancelling run");
            on_interrupt.cancel();
        }
    });

    let mut renderer = TermRenderer::stdout(args.verbose);
    renderer.render_header(&request.intent, &planner_label);

    let report = coordinator.run(request, decider.as_ref(), &cancel).await;
    renderer.render_report(&report);

    if let Some(path) = &args.transcript {
        let json = serde_json::to_string_pretty(&report.transcript)?;
        tokio::fs::write(path, json)
            .await
            .with_context(|| format!("Failed to write transcript to {}", path.display()))?;
        println!("{} {}", "Transcript:".bold(), path.display());
    }

    if !report.is_completed() {
        anyhow::bail!("run {} did not complete", report.run_id);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_intent() {
        let words = vec!["on".to_string(), "a".to_string(), "beach".to_string()];
        assert_eq!(resolve_intent(&words, true), "on a beach");
        assert_eq!(resolve_intent(&[], true), DEFAULT_INTENT);
        assert_eq!(resolve_intent(&[], false), "");
    }

    #[tokio::test]
    async fn test_read_image_declares_format_from_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("person.JPG");
        std::fs::write(&path, crate::testing::JPEG).unwrap();

        let input = read_image(&path).await.unwrap();

        assert_eq!(input.declared, Some(ImageFormat::Jpeg));
        assert_eq!(input.bytes, crate::testing::JPEG);
    }

    #[tokio::test]
    async fn test_read_image_missing_file() {
        let err = read_image(Path::new("/nonexistent/product.png"))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("product.png"));
    }
}
