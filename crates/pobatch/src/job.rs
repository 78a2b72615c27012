use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A file handed over by the upload transport. The engine never reads its
/// content; `binary_ref` is an opaque handle for the extractor.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct UploadedFile {
    pub name: String,
    pub size: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    pub binary_ref: String,
}

impl UploadedFile {
    /// Creates a file record, guessing the MIME type from the name.
    pub fn new(name: &str, size: u64, binary_ref: &str) -> Self {
        Self {
            name: name.to_string(),
            size,
            mime_type: Self::detect_mime_type(name),
            binary_ref: binary_ref.to_string(),
        }
    }

    /// Creates a file record with the MIME type reported by the transport.
    pub fn with_mime(name: &str, size: u64, mime_type: &str, binary_ref: &str) -> Self {
        Self {
            name: name.to_string(),
            size,
            mime_type: Some(mime_type.to_string()),
            binary_ref: binary_ref.to_string(),
        }
    }

    /// Returns `None` for unknown extensions.
    fn detect_mime_type(name: &str) -> Option<String> {
        mime_guess::from_path(Path::new(name))
            .first()
            .map(|m| m.to_string())
    }

    /// Two uploads are duplicates when name and size match.
    pub fn is_duplicate_of(&self, other: &UploadedFile) -> bool {
        self.name == other.name && self.size == other.size
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Processing,
    Completed,
    Failed,
    Paused,
}

impl JobStatus {
    /// Processing or paused: the job currently owned by the driver.
    pub fn is_in_flight(self) -> bool {
        matches!(self, JobStatus::Processing | JobStatus::Paused)
    }

    pub fn is_finished(self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobStatus::Pending => write!(f, "pending"),
            JobStatus::Processing => write!(f, "processing"),
            JobStatus::Completed => write!(f, "completed"),
            JobStatus::Failed => write!(f, "failed"),
            JobStatus::Paused => write!(f, "paused"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ParsedItem {
    pub sku: String,
    pub name: String,
    pub quantity: u32,
    /// Unit cost price as printed on the order.
    pub price: f64,
    /// Extraction confidence, 0–100.
    pub confidence: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ParsedPurchaseOrder {
    pub supplier: String,
    pub po_number: String,
    pub date: String,
    pub items: Vec<ParsedItem>,
    pub total_items: u32,
    pub total_value: f64,
    pub average_confidence: f64,
}

impl ParsedPurchaseOrder {
    /// Builds an order and derives its totals from `items`.
    pub fn from_items(supplier: &str, po_number: &str, date: &str, items: Vec<ParsedItem>) -> Self {
        let total_items: u32 = items.iter().map(|i| i.quantity).sum();
        let total_value: f64 = items.iter().map(|i| f64::from(i.quantity) * i.price).sum();
        let average_confidence = if items.is_empty() {
            0.0
        } else {
            items.iter().map(|i| i.confidence).sum::<f64>() / items.len() as f64
        };

        Self {
            supplier: supplier.to_string(),
            po_number: po_number.to_string(),
            date: date.to_string(),
            items,
            total_items,
            total_value,
            average_confidence,
        }
    }
}

/// One uploaded file and its processing lifecycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchJob {
    pub id: String,
    pub file: UploadedFile,
    pub status: JobStatus,
    /// 0–100, meaningful while in flight.
    pub progress: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parsed_data: Option<ParsedPurchaseOrder>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub selected: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub processing_started: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub processing_completed: Option<DateTime<Utc>>,
    /// Bumped each time the job is picked up, so reports from an abandoned
    /// attempt can be told apart from the current one.
    #[serde(skip)]
    pub(crate) attempt: u32,
    /// Set while the order is with the sink.
    #[serde(skip)]
    pub(crate) approving: bool,
}

impl BatchJob {
    pub fn new(file: UploadedFile) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            file,
            status: JobStatus::Pending,
            progress: 0,
            parsed_data: None,
            error: None,
            selected: false,
            processing_started: None,
            processing_completed: None,
            attempt: 0,
            approving: false,
        }
    }

    pub fn filename(&self) -> &str {
        &self.file.name
    }

    /// Completed with parsed data, selected by the operator and not already
    /// being approved.
    pub fn is_approvable(&self) -> bool {
        self.selected
            && !self.approving
            && self.status == JobStatus::Completed
            && self.parsed_data.is_some()
    }

    /// Puts the job back in the queue as if it had just been added.
    pub(crate) fn reset_to_pending(&mut self) {
        self.status = JobStatus::Pending;
        self.progress = 0;
        self.parsed_data = None;
        self.error = None;
        self.processing_started = None;
        self.processing_completed = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(quantity: u32, price: f64, confidence: f64) -> ParsedItem {
        ParsedItem {
            sku: "SKU".to_string(),
            name: "Item".to_string(),
            quantity,
            price,
            confidence,
        }
    }

    #[test]
    fn test_uploaded_file_mime_detection() {
        assert_eq!(
            UploadedFile::new("order.pdf", 10, "ref").mime_type.as_deref(),
            Some("application/pdf")
        );
        assert_eq!(
            UploadedFile::new("scan.png", 10, "ref").mime_type.as_deref(),
            Some("image/png")
        );
        assert!(UploadedFile::new("blob.xyz123", 10, "ref").mime_type.is_none());
    }

    #[test]
    fn test_explicit_mime_overrides_detection() {
        let file = UploadedFile::with_mime("order.pdf", 10, "text/csv", "ref");
        assert_eq!(file.mime_type.as_deref(), Some("text/csv"));
    }

    #[test]
    fn test_duplicate_detection() {
        let a = UploadedFile::new("po.pdf", 100, "ref-a");
        assert!(a.is_duplicate_of(&UploadedFile::new("po.pdf", 100, "ref-b")));
        assert!(!a.is_duplicate_of(&UploadedFile::new("po.pdf", 101, "ref-a")));
    }

    #[test]
    fn test_new_job_is_pending() {
        let job = BatchJob::new(UploadedFile::new("po.pdf", 1, "ref"));
        assert!(!job.id.is_empty());
        assert_eq!(job.status, JobStatus::Pending);
        assert_eq!(job.progress, 0);
        assert!(!job.selected);
        assert!(job.parsed_data.is_none());
        assert!(job.processing_started.is_none());
    }

    #[test]
    fn test_order_totals() {
        let order = ParsedPurchaseOrder::from_items(
            "Acme",
            "PO-7",
            "2024-01-01",
            vec![item(2, 10.0, 90.0), item(3, 5.0, 80.0)],
        );
        assert_eq!(order.total_items, 5);
        assert!((order.total_value - 35.0).abs() < 1e-9);
        assert!((order.average_confidence - 85.0).abs() < 1e-9);
    }

    #[test]
    fn test_empty_order_has_zero_confidence() {
        let order = ParsedPurchaseOrder::from_items("Acme", "PO-8", "2024-01-01", vec![]);
        assert_eq!(order.total_items, 0);
        assert_eq!(order.average_confidence, 0.0);
    }

    #[test]
    fn test_status_serializes_snake_case() {
        assert_eq!(serde_json::to_string(&JobStatus::Paused).unwrap(), "\"paused\"");
        assert!(JobStatus::Paused.is_in_flight());
        assert!(JobStatus::Failed.is_finished());
        assert!(!JobStatus::Pending.is_finished());
    }
}
