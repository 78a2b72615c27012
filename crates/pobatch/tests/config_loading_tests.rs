//! Loading configuration files from disk and turning them into a pipeline.

mod common;

use std::io::Write;
use std::sync::Arc;

use tempfile::{Builder, NamedTempFile};

use common::upload;
use pobatch::config::{load_config, BulkProcessingConfig};
use pobatch::error::{ConfigError, PricingError};
use pobatch::extraction::SimulatedExtractor;
use pobatch::pipeline::BatchPipeline;
use pobatch::pricing::{MarkupType, PriceContext, RoundingStrategy, RoundingTarget};
use pobatch::sync::MemoryOrderSink;

const FULL_YAML: &str = r#"
version: "1.0"
processing:
  batchSize: 10
  processingDelay: 0
  autoApproveThreshold: 90
  skipDuplicates: false
  optimizeImages: true
pricingRules:
  - id: premium-snacks
    name: Premium snacks
    conditions:
      category: Snacks
      minPrice: 10
    markupType: percentage
    markupValue: 50
    roundingStrategy: psychological
    psychologicalEnding: ".99"
    priority: 1
  - id: bulk
    name: Bulk items
    conditions:
      supplier: Bulkco
    markupType: tiered
    roundingStrategy: nearest
    roundingTarget: nickel
    priority: 5
categoryMappings:
  - id: bev
    supplierCategory: BEV-01
    targetCategory: Beverages
    defaultMarkup: 35
  - id: snk
    supplierCategory: SNK-01
    targetCategory: Snacks
    defaultMarkup: 45
"#;

fn write_config(suffix: &str, content: &str) -> NamedTempFile {
    let mut file = Builder::new().suffix(suffix).tempfile().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

#[test]
fn test_load_full_yaml_config() {
    let file = write_config(".yaml", FULL_YAML);
    let config = load_config(file.path()).unwrap();

    assert_eq!(config.processing.batch_size, 10);
    assert_eq!(config.processing.processing_delay, 0);
    assert!(!config.processing.skip_duplicates);
    assert!(config.processing.optimize_images);
    // Unset flags keep their defaults
    assert!(config.processing.backup_before_processing);

    assert_eq!(config.pricing_rules.len(), 2);
    let premium = &config.pricing_rules[0];
    assert_eq!(premium.markup_type, MarkupType::Percentage);
    assert_eq!(premium.rounding_strategy, RoundingStrategy::Psychological);
    assert_eq!(premium.conditions.min_price, Some(10.0));
    assert!(premium.enabled);

    let bulk = &config.pricing_rules[1];
    assert_eq!(bulk.markup_type, MarkupType::Tiered);
    assert_eq!(bulk.rounding_target, RoundingTarget::Nickel);

    assert_eq!(config.category_mappings.len(), 2);
    assert!(config.category_mappings.iter().all(|m| m.enabled));
}

#[test]
fn test_load_json_config() {
    let content = r#"{
        "version": "1.0",
        "pricingRules": [
            { "id": "flat", "name": "Flat", "markupType": "fixed", "markupValue": 2 }
        ]
    }"#;
    let file = write_config(".json", content);
    let config = load_config(file.path()).unwrap();

    assert_eq!(config.processing, BulkProcessingConfig::default());
    assert_eq!(config.pricing_rules[0].markup_value, 2.0);
}

#[test]
fn test_load_errors() {
    let missing = load_config("/nonexistent/pobatch.yaml").unwrap_err();
    assert!(matches!(missing, ConfigError::ReadFile { .. }));

    let toml = write_config(".toml", "version = '1.0'");
    assert!(matches!(
        load_config(toml.path()).unwrap_err(),
        ConfigError::UnsupportedFormat(ext) if ext == "toml"
    ));

    let broken = write_config(".yaml", "version: [unclosed");
    assert!(matches!(
        load_config(broken.path()).unwrap_err(),
        ConfigError::ParseYaml(_)
    ));

    let unknown_field = write_config(".json", r#"{ "version": "1.0", "rules": [] }"#);
    assert!(matches!(
        load_config(unknown_field.path()).unwrap_err(),
        ConfigError::SchemaValidation { .. }
    ));
}

#[test]
fn test_rule_validation_at_load() {
    let duplicate = r#"
version: "1.0"
pricingRules:
  - { id: a, name: A, markupType: fixed, markupValue: 1 }
  - { id: a, name: A again, markupType: fixed, markupValue: 2 }
"#;
    let file = write_config(".yml", duplicate);
    match load_config(file.path()).unwrap_err() {
        ConfigError::InvalidRule(PricingError::DuplicateRuleId(id)) => assert_eq!(id, "a"),
        other => panic!("unexpected error: {other}"),
    }

    let inverted = r#"
version: "1.0"
pricingRules:
  - id: band
    name: Band
    markupType: percentage
    markupValue: 10
    conditions: { minPrice: 50, maxPrice: 10 }
"#;
    let file = write_config(".yaml", inverted);
    assert!(matches!(
        load_config(file.path()).unwrap_err(),
        ConfigError::InvalidRule(PricingError::InvalidPriceBounds { .. })
    ));

    let negative = r#"
version: "1.0"
pricingRules:
  - { id: neg, name: Neg, markupType: percentage, markupValue: -5 }
"#;
    let file = write_config(".yaml", negative);
    assert!(matches!(
        load_config(file.path()).unwrap_err(),
        ConfigError::InvalidRule(PricingError::InvalidMarkup { .. })
    ));
}

#[test]
fn test_duplicate_supplier_category_mapping() {
    let content = r#"
version: "1.0"
categoryMappings:
  - { id: m1, supplierCategory: BEV, targetCategory: Drinks }
  - { id: m2, supplierCategory: BEV, targetCategory: Beverages }
"#;
    let file = write_config(".yaml", content);
    match load_config(file.path()).unwrap_err() {
        ConfigError::InvalidMapping { id, .. } => assert_eq!(id, "m2"),
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_pipeline_from_config() {
    let file = write_config(".yaml", FULL_YAML);
    let config = load_config(file.path()).unwrap();

    let extractor = Arc::new(SimulatedExtractor::from_settings(&config.processing));
    let pipeline = BatchPipeline::from_config(&config, extractor, Arc::new(MemoryOrderSink::new()));

    // Snacks already has a rule; only Beverages gets a suggested one
    let ids: Vec<&str> = pipeline
        .engine()
        .rules()
        .iter()
        .map(|rule| rule.id.as_str())
        .collect();
    assert_eq!(ids, vec!["premium-snacks", "bulk", "category-bev"]);
    assert_eq!(pipeline.engine().rules()[2].priority, 6);

    let beverages = PriceContext::new(10.0).category(Some("Beverages"));
    assert!((pipeline.engine().price(&beverages) - 13.5).abs() < 1e-9);

    let snacks = PriceContext::new(20.0).category(Some("Snacks"));
    assert!((pipeline.engine().price(&snacks) - 30.99).abs() < 1e-9);

    // Settings flow into the queue
    assert_eq!(pipeline.settings().batch_size, 10);
    let report = pipeline.add_files(vec![upload("a.pdf"), upload("a.pdf")]);
    assert_eq!(report.added.len(), 2);
}
