//! Pipeline test harness with a step-driven extractor.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{broadcast, mpsc, Mutex};

use pobatch::broadcast::{BatchEvent, BatchEventKind};
use pobatch::config::BulkProcessingConfig;
use pobatch::error::{ExtractionError, SyncError};
use pobatch::extraction::{Extractor, ProgressSink, SimulatedExtractor};
use pobatch::job::{BatchJob, JobStatus, ParsedPurchaseOrder, UploadedFile};
use pobatch::pipeline::BatchPipeline;
use pobatch::pricing::PricingEngine;
use pobatch::sync::{ApprovedOrder, MemoryOrderSink, OrderSink};

const EVENT_TIMEOUT: Duration = Duration::from_secs(5);

/// One instruction for the extraction currently in flight.
pub enum Step {
    Progress(u8),
    Finish(Result<ParsedPurchaseOrder, ExtractionError>),
}

/// Extractor that does nothing until the test feeds it steps.
pub struct ScriptedExtractor {
    steps: Mutex<mpsc::UnboundedReceiver<Step>>,
}

impl ScriptedExtractor {
    pub fn new() -> (Self, mpsc::UnboundedSender<Step>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                steps: Mutex::new(rx),
            },
            tx,
        )
    }
}

#[async_trait]
impl Extractor for ScriptedExtractor {
    async fn extract(
        &self,
        _file: &UploadedFile,
        progress: &dyn ProgressSink,
    ) -> Result<ParsedPurchaseOrder, ExtractionError> {
        loop {
            let step = self.steps.lock().await.recv().await;
            match step {
                Some(Step::Progress(value)) => progress.report(value).await,
                Some(Step::Finish(result)) => return result,
                None => return Err(ExtractionError::Failed("script closed".to_string())),
            }
        }
    }

    fn supports(&self, _mime_type: &str) -> bool {
        true
    }
}

/// Sink that refuses every order.
pub struct RejectingSink;

#[async_trait]
impl OrderSink for RejectingSink {
    async fn submit(&self, order: ApprovedOrder) -> Result<(), SyncError> {
        Err(SyncError::Rejected {
            po_number: order.order.po_number,
            reason: "catalogue is read-only".to_string(),
        })
    }
}

/// Sink that holds each order for `delay` before accepting it.
pub struct SlowSink {
    pub inner: MemoryOrderSink,
    delay: Duration,
}

impl SlowSink {
    pub fn new(delay: Duration) -> Self {
        Self {
            inner: MemoryOrderSink::new(),
            delay,
        }
    }
}

#[async_trait]
impl OrderSink for SlowSink {
    async fn submit(&self, order: ApprovedOrder) -> Result<(), SyncError> {
        tokio::time::sleep(self.delay).await;
        self.inner.submit(order).await
    }
}

/// A pipeline, its sink and an event subscription opened before any work.
pub struct PipelineHarness {
    pub pipeline: BatchPipeline,
    pub sink: Arc<MemoryOrderSink>,
    pub events: broadcast::Receiver<BatchEvent>,
    pub steps: Option<mpsc::UnboundedSender<Step>>,
}

impl PipelineHarness {
    /// Simulated extraction without delays.
    pub fn simulated(settings: BulkProcessingConfig, engine: PricingEngine) -> Self {
        let extractor = SimulatedExtractor::new(Duration::ZERO).with_step(25);
        Self::build(settings, engine, Arc::new(extractor), None)
    }

    /// Extraction driven through [`PipelineHarness::step`].
    pub fn scripted(settings: BulkProcessingConfig) -> Self {
        let (extractor, steps) = ScriptedExtractor::new();
        Self::build(
            settings,
            PricingEngine::default(),
            Arc::new(extractor),
            Some(steps),
        )
    }

    fn build(
        settings: BulkProcessingConfig,
        engine: PricingEngine,
        extractor: Arc<dyn Extractor>,
        steps: Option<mpsc::UnboundedSender<Step>>,
    ) -> Self {
        let sink = Arc::new(MemoryOrderSink::new());
        let pipeline = BatchPipeline::new(settings, engine, extractor, sink.clone());
        let events = pipeline.subscribe();
        Self {
            pipeline,
            sink,
            events,
            steps,
        }
    }

    pub fn step(&self, step: Step) {
        self.steps
            .as_ref()
            .expect("harness is not scripted")
            .send(step)
            .expect("extractor dropped");
    }

    /// Waits for the first event matching `predicate`, discarding others.
    pub async fn wait_for<F>(&mut self, predicate: F) -> BatchEvent
    where
        F: Fn(&BatchEvent) -> bool,
    {
        let events = &mut self.events;
        tokio::time::timeout(EVENT_TIMEOUT, async {
            loop {
                match events.recv().await {
                    Ok(event) if predicate(&event) => return event,
                    Ok(_) => continue,
                    Err(broadcast::error::RecvError::Lagged(_)) => continue,
                    Err(broadcast::error::RecvError::Closed) => panic!("event channel closed"),
                }
            }
        })
        .await
        .expect("timed out waiting for batch event")
    }

    /// Collects events until the batch goes idle, inclusive.
    pub async fn run_until_idle(&mut self) -> Vec<BatchEvent> {
        let events = &mut self.events;
        tokio::time::timeout(EVENT_TIMEOUT, async {
            let mut seen = Vec::new();
            loop {
                match events.recv().await {
                    Ok(event) => {
                        let idle = event.kind == BatchEventKind::Idle;
                        seen.push(event);
                        if idle {
                            return seen;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(_)) => continue,
                    Err(broadcast::error::RecvError::Closed) => panic!("event channel closed"),
                }
            }
        })
        .await
        .expect("timed out waiting for the batch to go idle")
    }

    pub async fn wait_for_job(&mut self, job_id: &str, kind: BatchEventKind) -> BatchEvent {
        self.wait_for(|event| event.job_id.as_deref() == Some(job_id) && event.kind == kind)
            .await
    }

    pub async fn wait_for_progress(&mut self, job_id: &str, progress: u8) {
        self.wait_for_job(job_id, BatchEventKind::Progress { progress })
            .await;
    }

    pub fn job(&self, job_id: &str) -> BatchJob {
        self.pipeline.job(job_id).expect("job should exist")
    }

    pub fn status(&self, job_id: &str) -> JobStatus {
        self.job(job_id).status
    }

    /// Gives the driver a chance to act on anything it could act on.
    pub async fn settle(&self) {
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
}
