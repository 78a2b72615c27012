use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::config::schema::{BulkProcessingConfig, Config, CONFIG_VERSION};
use crate::error::ConfigError;
use crate::pricing::{validate_rules, CategoryMapping};

const SCHEMA_JSON: &str = include_str!("../../schema/config-v1.json");

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Json,
    Yaml,
}

impl ConfigFormat {
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_ascii_lowercase();
        match extension.as_str() {
            "json" => Ok(ConfigFormat::Json),
            "yaml" | "yml" => Ok(ConfigFormat::Yaml),
            other => Err(ConfigError::UnsupportedFormat(other.to_string())),
        }
    }
}

/// `<config dir>/pobatch/config.json`, when the platform has a config dir.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("pobatch").join("config.json"))
}

pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
    let path = path.as_ref();
    let format = ConfigFormat::from_path(path)?;
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
        path: path.to_path_buf(),
        source: e,
    })?;

    log::debug!("Loading config from {}", path.display());
    load_config_from_str(&content, format)
}

pub fn load_config_from_str(content: &str, format: ConfigFormat) -> Result<Config, ConfigError> {
    let json_value: serde_json::Value = match format {
        ConfigFormat::Json => serde_json::from_str(content)?,
        ConfigFormat::Yaml => serde_yaml::from_str(content)?,
    };

    validate_schema(&json_value)?;

    let config: Config = serde_json::from_value(json_value)?;

    validate_config(&config)?;

    log::info!(
        "Loaded config with {} pricing rules and {} category mappings",
        config.pricing_rules.len(),
        config.category_mappings.len()
    );
    Ok(config)
}

fn validate_schema(json_value: &serde_json::Value) -> Result<(), ConfigError> {
    let schema: serde_json::Value =
        serde_json::from_str(SCHEMA_JSON).map_err(|e| ConfigError::Validation {
            message: format!("Invalid embedded schema JSON: {}", e),
        })?;

    let validator = jsonschema::validator_for(&schema).map_err(|e| ConfigError::Validation {
        message: format!("Failed to compile JSON schema: {}", e),
    })?;

    let error_messages: Vec<String> = validator
        .iter_errors(json_value)
        .map(|e| e.to_string())
        .collect();
    if !error_messages.is_empty() {
        return Err(ConfigError::SchemaValidation {
            errors: error_messages.join("; "),
        });
    }

    Ok(())
}

fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.version != CONFIG_VERSION {
        return Err(ConfigError::Validation {
            message: format!("Unsupported config version: {}", config.version),
        });
    }

    validate_processing(&config.processing)?;
    validate_rules(&config.pricing_rules)?;
    validate_mappings(&config.category_mappings)?;

    Ok(())
}

fn validate_processing(processing: &BulkProcessingConfig) -> Result<(), ConfigError> {
    let threshold = processing.auto_approve_threshold;
    if !(0.0..=100.0).contains(&threshold) {
        return Err(ConfigError::Validation {
            message: format!(
                "autoApproveThreshold must be between 0 and 100, got {}",
                threshold
            ),
        });
    }
    Ok(())
}

fn validate_mappings(mappings: &[CategoryMapping]) -> Result<(), ConfigError> {
    let mut ids = HashSet::new();
    let mut enabled_sources = HashSet::new();

    for mapping in mappings {
        if !ids.insert(mapping.id.as_str()) {
            return Err(ConfigError::InvalidMapping {
                id: mapping.id.clone(),
                reason: "Duplicate mapping ID".to_string(),
            });
        }

        if !mapping.default_markup.is_finite() || mapping.default_markup < 0.0 {
            return Err(ConfigError::InvalidMapping {
                id: mapping.id.clone(),
                reason: format!("Invalid default markup {}", mapping.default_markup),
            });
        }

        if mapping.enabled && !enabled_sources.insert(mapping.supplier_category.as_str()) {
            return Err(ConfigError::InvalidMapping {
                id: mapping.id.clone(),
                reason: format!(
                    "Supplier category '{}' is already mapped",
                    mapping.supplier_category
                ),
            });
        }
    }

    Ok(())
}
