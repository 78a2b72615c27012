use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::pricing::{CategoryMapping, PricingRule};

pub const CONFIG_VERSION: &str = "1.0";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    pub version: String,
    #[serde(default)]
    pub processing: BulkProcessingConfig,
    #[serde(default)]
    pub pricing_rules: Vec<PricingRule>,
    #[serde(default)]
    pub category_mappings: Vec<CategoryMapping>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION.to_string(),
            processing: BulkProcessingConfig::default(),
            pricing_rules: vec![],
            category_mappings: vec![],
        }
    }
}

/// Batch tuning knobs.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BulkProcessingConfig {
    /// Maximum number of files accepted per upload; 0 means unlimited.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    /// Delay between simulated extraction steps, in milliseconds.
    #[serde(default = "default_processing_delay")]
    pub processing_delay: u64,
    /// Completed jobs at or above this average confidence (0–100) are
    /// selected for approval automatically. 0 disables auto-selection.
    #[serde(default = "default_auto_approve_threshold")]
    pub auto_approve_threshold: f64,
    #[serde(default = "default_true")]
    pub skip_duplicates: bool,
    #[serde(default = "default_true")]
    pub update_existing_products: bool,
    #[serde(default)]
    pub create_missing_categories: bool,
    #[serde(default)]
    pub generate_descriptions: bool,
    #[serde(default)]
    pub optimize_images: bool,
    #[serde(default = "default_true")]
    pub backup_before_processing: bool,
}

fn default_batch_size() -> usize {
    50
}

fn default_processing_delay() -> u64 {
    200
}

fn default_auto_approve_threshold() -> f64 {
    95.0
}

fn default_true() -> bool {
    true
}

impl Default for BulkProcessingConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            processing_delay: default_processing_delay(),
            auto_approve_threshold: default_auto_approve_threshold(),
            skip_duplicates: true,
            update_existing_products: true,
            create_missing_categories: false,
            generate_descriptions: false,
            optimize_images: false,
            backup_before_processing: true,
        }
    }
}

impl BulkProcessingConfig {
    pub fn processing_delay(&self) -> Duration {
        Duration::from_millis(self.processing_delay)
    }

    /// True when a completed job with `confidence` should be pre-selected.
    pub fn auto_selects(&self, confidence: f64) -> bool {
        self.auto_approve_threshold > 0.0 && confidence >= self.auto_approve_threshold
    }
}
