pub mod simulated;

use async_trait::async_trait;

use crate::error::ExtractionError;
use crate::job::{ParsedPurchaseOrder, UploadedFile};

pub use simulated::SimulatedExtractor;

/// Receives extraction progress for one job, 0–100.
///
/// Implementations may hold the caller while the batch is paused, so
/// extractors should await `report` before continuing with the next step.
#[async_trait]
pub trait ProgressSink: Send + Sync {
    async fn report(&self, progress: u8);
}

/// No-op sink for unit tests.
pub struct NoopProgress;

#[async_trait]
impl ProgressSink for NoopProgress {
    async fn report(&self, _progress: u8) {}
}

/// Turns an uploaded purchase order into structured data.
#[async_trait]
pub trait Extractor: Send + Sync {
    async fn extract(
        &self,
        file: &UploadedFile,
        progress: &dyn ProgressSink,
    ) -> Result<ParsedPurchaseOrder, ExtractionError>;

    fn supports(&self, mime_type: &str) -> bool;
}
