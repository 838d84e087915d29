use super::*;
use crate::testing::{beach_variants, person, product, FakeSynth, FakeVariants};
use serde_json::json;

fn ctx<'a>(
    person: &'a SourceImage,
    product: &'a SourceImage,
    variants: Option<&'a [String]>,
) -> ToolContext<'a> {
    ToolContext {
        intent: "person holding product on a beach",
        person,
        product,
        variants,
    }
}

#[tokio::test]
async fn test_registry_with_clients() {
    let registry = ToolRegistry::with_clients(FakeVariants::ok(beach_variants()), FakeSynth::new())
        .unwrap();
    assert_eq!(registry.len(), 2);
    assert!(!registry.is_empty());
    let defs = registry.definitions();
    assert_eq!(defs[0].name, "generate_prompt_variants");
    assert_eq!(defs[1].name, "generate_ugc_image");
    assert_eq!(defs[1].parameters["required"], json!(["index"]));
}

#[tokio::test]
async fn test_lookup_unknown_tool() {
    let registry = ToolRegistry::with_clients(FakeVariants::ok(beach_variants()), FakeSynth::new())
        .unwrap();
    assert!(registry.lookup("generate_ugc_image").is_ok());
    let err = registry.lookup("upscale_image").err().unwrap();
    assert_eq!(err, ToolError::UnknownTool("upscale_image".into()));
}

#[tokio::test]
async fn test_variants_defaults_to_run_intent() {
    let variants = FakeVariants::ok(beach_variants());
    let registry = ToolRegistry::with_clients(variants.clone(), FakeSynth::new()).unwrap();
    let (person, product) = (person(), product());
    let output = registry
        .invoke("generate_prompt_variants", json!({}), &ctx(&person, &product, None))
        .await
        .unwrap();
    assert_eq!(output, ToolOutput::Variants(beach_variants()));
    assert_eq!(variants.calls(), 1);
}

#[tokio::test]
async fn test_schema_violation_is_invalid_arguments() {
    let synth = FakeSynth::new();
    let registry = ToolRegistry::with_clients(FakeVariants::ok(beach_variants()), synth.clone())
        .unwrap();
    let (person, product) = (person(), product());
    let prompts = beach_variants();

    for args in [json!({}), json!({"index": 0}), json!({"index": 5}), json!({"index": "2"})] {
        let err = registry
            .invoke("generate_ugc_image", args, &ctx(&person, &product, Some(&prompts)))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments(_)), "got {err:?}");
    }
    let err = registry
        .invoke(
            "generate_prompt_variants",
            json!({"base_intent": 7, "extra": true}),
            &ctx(&person, &product, None),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, ToolError::InvalidArguments(_)));
    assert_eq!(synth.calls(), 0);
}

#[tokio::test]
async fn test_synthesis_uses_variant_for_index() {
    let synth = FakeSynth::new();
    let registry = ToolRegistry::with_clients(FakeVariants::ok(beach_variants()), synth.clone())
        .unwrap();
    let (person, product) = (person(), product());
    let prompts = beach_variants();
    let output = registry
        .invoke(
            "generate_ugc_image",
            json!({"index": 3}),
            &ctx(&person, &product, Some(&prompts)),
        )
        .await
        .unwrap();
    match output {
        ToolOutput::Image(image) => {
            assert_eq!(image.index, 3);
            assert_eq!(image.file_name(), "generated_ugc_image_3.png");
        }
        other => panic!("expected image, got {other:?}"),
    }
    assert_eq!(synth.prompts(), vec![prompts[2].clone()]);
}

#[tokio::test]
async fn test_synthesis_prompt_override() {
    let synth = FakeSynth::new();
    let registry = ToolRegistry::with_clients(FakeVariants::ok(beach_variants()), synth.clone())
        .unwrap();
    let (person, product) = (person(), product());
    let prompts = beach_variants();
    registry
        .invoke(
            "generate_ugc_image",
            json!({"index": 1, "prompt": "studio shot"}),
            &ctx(&person, &product, Some(&prompts)),
        )
        .await
        .unwrap();
    assert_eq!(synth.prompts(), vec!["studio shot".to_string()]);
}

#[tokio::test]
async fn test_synthesis_without_variants_makes_no_call() {
    let synth = FakeSynth::new();
    let registry = ToolRegistry::with_clients(FakeVariants::ok(beach_variants()), synth.clone())
        .unwrap();
    let (person, product) = (person(), product());
    let err = registry
        .invoke("generate_ugc_image", json!({"index": 1}), &ctx(&person, &product, None))
        .await
        .unwrap_err();
    assert!(matches!(err, ToolError::InvalidArguments(msg) if msg.contains("generate_prompt_variants")));
    assert_eq!(synth.calls(), 0);
}
