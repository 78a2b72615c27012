//! Timer-driven stand-in for a real OCR/NLP extractor.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;

use super::{Extractor, ProgressSink};
use crate::config::BulkProcessingConfig;
use crate::error::ExtractionError;
use crate::job::{ParsedItem, ParsedPurchaseOrder, UploadedFile};

const DEFAULT_STEP: u8 = 10;

const SPREADSHEET_TYPES: &[&str] = &[
    "application/vnd.ms-excel",
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
    "application/vnd.oasis.opendocument.spreadsheet",
];

/// (name, quantity, unit price, confidence)
const SAMPLE_LINES: &[(&str, u32, f64, f64)] = &[
    ("Standard widget", 10, 12.5, 96.0),
    ("Deluxe widget", 5, 24.0, 91.0),
    ("Widget assembly kit", 2, 105.0, 88.0),
];

/// Advances progress in fixed steps with a delay between them, then
/// returns a fixed three-line order derived from the file name.
#[derive(Debug, Clone)]
pub struct SimulatedExtractor {
    step_delay: Duration,
    step: u8,
}

impl SimulatedExtractor {
    pub fn new(step_delay: Duration) -> Self {
        Self {
            step_delay,
            step: DEFAULT_STEP,
        }
    }

    pub fn from_settings(settings: &BulkProcessingConfig) -> Self {
        Self::new(settings.processing_delay())
    }

    /// Progress increment per step; clamped to 1–100.
    pub fn with_step(mut self, step: u8) -> Self {
        self.step = step.clamp(1, 100);
        self
    }

    fn sample_order(file: &UploadedFile) -> ParsedPurchaseOrder {
        let stem = Path::new(&file.name)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or(&file.name)
            .to_uppercase();

        let items = SAMPLE_LINES
            .iter()
            .enumerate()
            .map(|(i, (name, quantity, price, confidence))| ParsedItem {
                sku: format!("{}-{:03}", stem, i + 1),
                name: name.to_string(),
                quantity: *quantity,
                price: *price,
                confidence: *confidence,
            })
            .collect();

        ParsedPurchaseOrder::from_items(
            "Simulated Supplier",
            &format!("PO-{stem}"),
            &Utc::now().format("%Y-%m-%d").to_string(),
            items,
        )
    }
}

impl Default for SimulatedExtractor {
    fn default() -> Self {
        Self::from_settings(&BulkProcessingConfig::default())
    }
}

#[async_trait]
impl Extractor for SimulatedExtractor {
    async fn extract(
        &self,
        file: &UploadedFile,
        progress: &dyn ProgressSink,
    ) -> Result<ParsedPurchaseOrder, ExtractionError> {
        if file.size == 0 {
            return Err(ExtractionError::EmptyFile(file.name.clone()));
        }

        let mime_type = file.mime_type.as_deref().unwrap_or("unknown");
        if !self.supports(mime_type) {
            return Err(ExtractionError::UnsupportedFormat {
                name: file.name.clone(),
                mime_type: mime_type.to_string(),
            });
        }

        let mut current: u8 = 0;
        while current < 100 {
            tokio::time::sleep(self.step_delay).await;
            current = current.saturating_add(self.step).min(100);
            progress.report(current).await;
        }

        Ok(Self::sample_order(file))
    }

    fn supports(&self, mime_type: &str) -> bool {
        mime_type == "application/pdf"
            || mime_type.starts_with("image/")
            || mime_type == "text/csv"
            || mime_type == "text/plain"
            || SPREADSHEET_TYPES.contains(&mime_type)
    }
}
