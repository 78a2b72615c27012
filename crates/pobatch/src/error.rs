use std::path::PathBuf;
use thiserror::Error;

use crate::job::JobStatus;

#[derive(Error, Debug)]
pub enum PobatchError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Pricing error: {0}")]
    Pricing(#[from] PricingError),

    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    #[error("Extraction error: {0}")]
    Extraction(#[from] ExtractionError),

    #[error("Sync error: {0}")]
    Sync(#[from] SyncError),

    #[error("Logging error: {0}")]
    Logging(#[from] LoggingError),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config JSON: {0}")]
    ParseJson(#[from] serde_json::Error),

    #[error("Failed to parse config YAML: {0}")]
    ParseYaml(#[from] serde_yaml::Error),

    #[error("Unsupported config file extension: '{0}'")]
    UnsupportedFormat(String),

    #[error("Config validation failed: {message}")]
    Validation { message: String },

    #[error("Schema validation failed: {errors}")]
    SchemaValidation { errors: String },

    #[error("Invalid pricing rule: {0}")]
    InvalidRule(#[from] PricingError),

    #[error("Invalid category mapping '{id}': {reason}")]
    InvalidMapping { id: String, reason: String },
}

/// Rule validation failures. Evaluation itself never produces these.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PricingError {
    #[error("rule '{id}' has a non-finite or negative markup value ({value})")]
    InvalidMarkup { id: String, value: f64 },

    #[error("rule '{id}' has invalid price bounds (min {min:?}, max {max:?})")]
    InvalidPriceBounds {
        id: String,
        min: Option<f64>,
        max: Option<f64>,
    },

    #[error("rule '{id}' uses psychological rounding with an invalid ending {ending:?}")]
    InvalidPsychologicalEnding { id: String, ending: Option<String> },

    #[error("duplicate rule id '{0}'")]
    DuplicateRuleId(String),
}

impl PricingError {
    pub fn rule_id(&self) -> &str {
        match self {
            PricingError::InvalidMarkup { id, .. }
            | PricingError::InvalidPriceBounds { id, .. }
            | PricingError::InvalidPsychologicalEnding { id, .. }
            | PricingError::DuplicateRuleId(id) => id,
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExtractionError {
    #[error("Unsupported file type '{mime_type}' for '{name}'")]
    UnsupportedFormat { name: String, mime_type: String },

    #[error("File '{0}' is empty")]
    EmptyFile(String),

    #[error("Extraction failed: {0}")]
    Failed(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SyncError {
    #[error("Order '{po_number}' was rejected: {reason}")]
    Rejected { po_number: String, reason: String },

    #[error("Sync target unavailable: {0}")]
    Unavailable(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PipelineError {
    #[error("Job not found: {0}")]
    JobNotFound(String),

    #[error("Cannot {action} job {id} while it is {status}")]
    InvalidTransition {
        id: String,
        status: JobStatus,
        action: &'static str,
    },

    #[error("Failed to spawn batch driver: {0}")]
    SpawnFailed(String),
}

#[derive(Error, Debug)]
pub enum LoggingError {
    #[error("Failed to install tracing subscriber: {0}")]
    Subscriber(#[from] tracing::subscriber::SetGlobalDefaultError),

    #[error("Failed to bridge log records: {0}")]
    LogBridge(#[from] log::SetLoggerError),
}

pub type Result<T> = std::result::Result<T, PobatchError>;
