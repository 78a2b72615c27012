pub mod batch;
pub mod broadcast;
pub mod config;
pub mod error;
pub mod extraction;
pub mod job;
pub mod logging;
pub mod pipeline;
pub mod pricing;
pub mod sync;

pub use batch::{AddFilesReport, BatchQueue, BatchStats};
pub use broadcast::{BatchEvent, BatchEventBroadcaster, BatchEventKind};
pub use config::{load_config, BulkProcessingConfig, Config};
pub use error::{
    ConfigError, ExtractionError, PipelineError, PobatchError, PricingError, Result, SyncError,
};
pub use extraction::{Extractor, ProgressSink, SimulatedExtractor};
pub use job::{BatchJob, JobStatus, ParsedItem, ParsedPurchaseOrder, UploadedFile};
pub use pipeline::{ApprovalOutcome, ApprovalReport, BatchPipeline};
pub use pricing::{calculate_price, PricingEngine, PricingRule};
pub use sync::{ApprovedOrder, MemoryOrderSink, OrderSink};
