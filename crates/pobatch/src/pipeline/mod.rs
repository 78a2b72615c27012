//! Sequential batch processing of uploaded purchase orders.
//!
//! [`BatchPipeline`] is a cheap, cloneable handle. All job state lives in a
//! [`BatchQueue`] behind a mutex; a single tokio task started by
//! [`BatchPipeline::start`] pulls pending jobs through the extractor one at a
//! time and stops once nothing is pending.

mod approval;
mod driver;
mod progress;

use std::sync::{Arc, Mutex, MutexGuard};

use log::{debug, info, warn};
use tokio::runtime::Handle;
use tokio::sync::{broadcast, watch};
use tokio_util::sync::CancellationToken;

use crate::batch::{AddFilesReport, Assignment, BatchQueue, BatchStats};
use crate::broadcast::{BatchEvent, BatchEventBroadcaster, BatchEventKind};
use crate::config::{BulkProcessingConfig, Config};
use crate::error::PipelineError;
use crate::extraction::Extractor;
use crate::job::{BatchJob, UploadedFile};
use crate::pricing::{CategoryMappings, PricingEngine};
use crate::sync::{OrderSink, SyncOptions};

pub use approval::{ApprovalFailure, ApprovalOutcome, ApprovalReport, ApprovedJob};

struct InFlight {
    job_id: String,
    token: CancellationToken,
}

struct ActiveRun {
    id: u64,
    token: CancellationToken,
    job: Option<InFlight>,
}

enum NextStep {
    /// The job is in flight and `Started` has been sent.
    Run(Assignment, CancellationToken),
    /// Paused between jobs.
    Wait,
    /// Nothing pending; the run has been closed and `Idle` sent.
    Drained,
    /// Stopped or replaced by a newer run.
    Stopped,
}

#[derive(Default)]
struct Control {
    run: Option<ActiveRun>,
    last_run_id: u64,
}

/// State shared between the handle and the driver task.
///
/// Lock order is `control` before `queue`.
pub(crate) struct Shared {
    queue: Mutex<BatchQueue>,
    control: Mutex<Control>,
    paused: watch::Sender<bool>,
    extractor: Arc<dyn Extractor>,
    sink: Arc<dyn OrderSink>,
    engine: PricingEngine,
    options: SyncOptions,
    events: BatchEventBroadcaster,
}

impl Shared {
    pub(crate) fn lock_queue(&self) -> MutexGuard<'_, BatchQueue> {
        self.queue.lock().unwrap_or_else(|poisoned| {
            warn!("Batch queue lock was poisoned, recovering");
            poisoned.into_inner()
        })
    }

    fn lock_control(&self) -> MutexGuard<'_, Control> {
        self.control.lock().unwrap_or_else(|poisoned| {
            warn!("Batch control lock was poisoned, recovering");
            poisoned.into_inner()
        })
    }

    pub(crate) async fn wait_until_resumed(&self) {
        let mut rx = self.paused.subscribe();
        // The sender lives as long as `self`
        let _ = rx.wait_for(|paused| !*paused).await;
    }

    /// Decides what run `run_id` does next. The pause flag and the pending
    /// set are read under the control lock, so `pause`, `start` and `stop`
    /// never race the decision.
    fn next_step(&self, run_id: u64) -> NextStep {
        let mut control = self.lock_control();
        let Some(run) = control.run.as_mut().filter(|run| run.id == run_id) else {
            return NextStep::Stopped;
        };
        if run.token.is_cancelled() {
            return NextStep::Stopped;
        }
        if *self.paused.borrow() {
            return NextStep::Wait;
        }

        let Some(assignment) = self.lock_queue().begin_next() else {
            // Closing the run here lets a concurrent `start` spawn a new one
            control.run = None;
            self.paused.send_replace(false);
            self.events.send(BatchEvent::batch(BatchEventKind::Idle));
            return NextStep::Drained;
        };

        let token = run.token.child_token();
        run.job = Some(InFlight {
            job_id: assignment.job_id.clone(),
            token: token.clone(),
        });
        self.events.job(
            &assignment.job_id,
            &assignment.file.name,
            BatchEventKind::Started,
        );
        NextStep::Run(assignment, token)
    }

    fn clear_in_flight(&self, run_id: u64, job_id: &str) {
        let mut control = self.lock_control();
        if let Some(run) = control.run.as_mut().filter(|run| run.id == run_id) {
            if run.job.as_ref().is_some_and(|job| job.job_id == job_id) {
                run.job = None;
            }
        }
    }

    /// Removes the jobs picked by `remove` and cancels the extraction of
    /// the in-flight one if it is among them.
    fn remove_jobs<F>(&self, remove: F) -> Vec<BatchJob>
    where
        F: FnOnce(&mut BatchQueue) -> Vec<BatchJob>,
    {
        let control = self.lock_control();
        let removed = {
            let mut queue = self.lock_queue();
            remove(&mut *queue)
        };

        if let Some(in_flight) = control.run.as_ref().and_then(|run| run.job.as_ref()) {
            if removed.iter().any(|job| job.id == in_flight.job_id) {
                debug!("Cancelling extraction of removed job {}", in_flight.job_id);
                in_flight.token.cancel();
            }
        }
        drop(control);

        for job in &removed {
            self.events
                .job(&job.id, job.filename(), BatchEventKind::Removed);
        }
        removed
    }
}

/// Handle to a batch of purchase-order jobs and the task processing them.
#[derive(Clone)]
pub struct BatchPipeline {
    shared: Arc<Shared>,
}

impl BatchPipeline {
    pub fn new(
        settings: BulkProcessingConfig,
        engine: PricingEngine,
        extractor: Arc<dyn Extractor>,
        sink: Arc<dyn OrderSink>,
    ) -> Self {
        Self::with_events(
            settings,
            engine,
            extractor,
            sink,
            BatchEventBroadcaster::default(),
        )
    }

    pub fn with_events(
        settings: BulkProcessingConfig,
        engine: PricingEngine,
        extractor: Arc<dyn Extractor>,
        sink: Arc<dyn OrderSink>,
        events: BatchEventBroadcaster,
    ) -> Self {
        let (paused, _) = watch::channel(false);
        let options = SyncOptions::from(&settings);

        Self {
            shared: Arc::new(Shared {
                queue: Mutex::new(BatchQueue::new(settings)),
                control: Mutex::new(Control::default()),
                paused,
                extractor,
                sink,
                engine,
                options,
                events,
            }),
        }
    }

    /// Builds a pipeline from a loaded configuration. Enabled category
    /// mappings without a matching rule contribute a suggested rule ranked
    /// after the configured ones.
    pub fn from_config(
        config: &Config,
        extractor: Arc<dyn Extractor>,
        sink: Arc<dyn OrderSink>,
    ) -> Self {
        let mut rules = config.pricing_rules.clone();
        let base_priority = rules
            .iter()
            .map(|rule| rule.priority)
            .max()
            .map_or(0, |max| max.saturating_add(1));
        let mappings = CategoryMappings::new(config.category_mappings.clone());
        let suggested = mappings.suggest_rules(&rules, base_priority);
        if !suggested.is_empty() {
            debug!("Adding {} rules from category mappings", suggested.len());
        }
        rules.extend(suggested);

        Self::new(
            config.processing.clone(),
            PricingEngine::new(rules),
            extractor,
            sink,
        )
    }

    pub fn engine(&self) -> &PricingEngine {
        &self.shared.engine
    }

    pub fn subscribe(&self) -> broadcast::Receiver<BatchEvent> {
        self.shared.events.subscribe()
    }

    /// Queues files as pending jobs. Processing does not begin until
    /// [`start`](Self::start) is called.
    pub fn add_files(&self, files: Vec<UploadedFile>) -> AddFilesReport {
        let (report, added) = {
            let mut queue = self.shared.lock_queue();
            let report = queue.add_files(files);
            let added: Vec<(String, String)> = report
                .added
                .iter()
                .filter_map(|id| queue.get(id))
                .map(|job| (job.id.clone(), job.file.name.clone()))
                .collect();
            (report, added)
        };

        for (id, filename) in added {
            self.shared.events.job(&id, &filename, BatchEventKind::Added);
        }
        report
    }

    /// Spawns the driver on the current tokio runtime. Returns `Ok(false)`
    /// when a run is already active or nothing is pending.
    pub fn start(&self) -> Result<bool, PipelineError> {
        let handle =
            Handle::try_current().map_err(|e| PipelineError::SpawnFailed(e.to_string()))?;

        let (run_id, token) = {
            let mut control = self.shared.lock_control();
            if control.run.is_some() {
                debug!("Batch already running, ignoring start");
                return Ok(false);
            }
            if !self.shared.lock_queue().has_pending() {
                debug!("No pending jobs, nothing to start");
                return Ok(false);
            }

            control.last_run_id += 1;
            let run_id = control.last_run_id;
            let token = CancellationToken::new();
            control.run = Some(ActiveRun {
                id: run_id,
                token: token.clone(),
                job: None,
            });
            (run_id, token)
        };

        info!("Starting batch run {}", run_id);
        handle.spawn(driver::drive(Arc::clone(&self.shared), run_id, token));
        Ok(true)
    }

    /// Freezes the in-flight job and holds back the next one. Returns
    /// `false` when idle or already paused.
    pub fn pause(&self) -> bool {
        let control = self.shared.lock_control();
        if control.run.is_none() || *self.shared.paused.borrow() {
            return false;
        }
        self.shared.paused.send_replace(true);

        let paused_job = self
            .shared
            .lock_queue()
            .pause_in_flight()
            .map(|job| (job.id.clone(), job.file.name.clone()));
        drop(control);

        info!("Batch paused");
        self.emit_for(paused_job, BatchEventKind::Paused);
        true
    }

    /// Returns `false` when not paused.
    pub fn resume(&self) -> bool {
        let control = self.shared.lock_control();
        if !*self.shared.paused.borrow() {
            return false;
        }
        self.shared.paused.send_replace(false);

        let resumed_job = self
            .shared
            .lock_queue()
            .resume_in_flight()
            .map(|job| (job.id.clone(), job.file.name.clone()));
        drop(control);

        info!("Batch resumed");
        self.emit_for(resumed_job, BatchEventKind::Resumed);
        true
    }

    /// Cancels the active run. The in-flight job goes back to pending with
    /// its progress reset; finished jobs are left alone. Returns `false`
    /// when idle.
    pub fn stop(&self) -> bool {
        let mut control = self.shared.lock_control();
        let Some(run) = control.run.take() else {
            return false;
        };
        run.token.cancel();
        self.shared.paused.send_replace(false);

        let requeued = self
            .shared
            .lock_queue()
            .requeue_in_flight()
            .map(|job| (job.id.clone(), job.file.name.clone()));
        drop(control);

        info!("Batch run {} stopped", run.id);
        if let Some((id, filename)) = requeued {
            self.shared
                .events
                .job(&id, &filename, BatchEventKind::Requeued);
        }
        self.shared
            .events
            .send(BatchEvent::batch(BatchEventKind::Idle));
        true
    }

    fn emit_for(&self, job: Option<(String, String)>, kind: BatchEventKind) {
        match job {
            Some((id, filename)) => self.shared.events.job(&id, &filename, kind),
            None => self.shared.events.send(BatchEvent::batch(kind)),
        }
    }

    pub fn is_processing(&self) -> bool {
        self.shared.lock_control().run.is_some()
    }

    pub fn is_paused(&self) -> bool {
        *self.shared.paused.borrow()
    }

    /// Returns the new selection state of the job.
    pub fn toggle_select(&self, id: &str) -> Result<bool, PipelineError> {
        let (selected, filename) = {
            let mut queue = self.shared.lock_queue();
            let selected = queue.toggle_select(id)?;
            let filename = queue
                .get(id)
                .map(|job| job.file.name.clone())
                .unwrap_or_default();
            (selected, filename)
        };
        self.shared
            .events
            .job(id, &filename, BatchEventKind::Selected { selected });
        Ok(selected)
    }

    /// Returns `true` when everything ended up selected.
    pub fn select_all(&self) -> bool {
        let selected = self.shared.lock_queue().select_all();
        self.shared
            .events
            .send(BatchEvent::batch(BatchEventKind::Selected { selected }));
        selected
    }

    pub fn remove(&self, id: &str) -> Result<BatchJob, PipelineError> {
        let mut outcome = Ok(());
        let mut removed = self.shared.remove_jobs(|queue| match queue.remove(id) {
            Ok(job) => vec![job],
            Err(e) => {
                outcome = Err(e);
                Vec::new()
            }
        });
        outcome?;
        removed
            .pop()
            .ok_or_else(|| PipelineError::JobNotFound(id.to_string()))
    }

    pub fn remove_selected(&self) -> Vec<BatchJob> {
        self.shared.remove_jobs(BatchQueue::remove_selected)
    }

    pub fn clear_completed(&self) -> Vec<BatchJob> {
        self.shared.remove_jobs(BatchQueue::clear_completed)
    }

    /// Puts a failed job back in the queue. Does not start a run.
    pub fn retry(&self, id: &str) -> Result<(), PipelineError> {
        let filename = {
            let mut queue = self.shared.lock_queue();
            let job = queue.retry(id)?;
            job.file.name.clone()
        };
        info!("Retrying {}", filename);
        self.shared
            .events
            .job(id, &filename, BatchEventKind::Requeued);
        Ok(())
    }

    /// Prices and submits every selected, completed job. Jobs the sink
    /// accepts are removed; rejected ones stay and are listed in the report.
    pub async fn approve_selected(&self) -> ApprovalOutcome {
        let claimed = self.shared.lock_queue().claim_for_approval();
        if claimed.is_empty() {
            debug!("Nothing selected for approval");
            return ApprovalOutcome::NothingToApprove;
        }
        approval::approve(&self.shared, claimed).await
    }

    pub fn stats(&self) -> BatchStats {
        self.shared.lock_queue().stats()
    }

    pub fn jobs(&self) -> Vec<BatchJob> {
        self.shared.lock_queue().jobs().to_vec()
    }

    pub fn job(&self, id: &str) -> Option<BatchJob> {
        self.shared.lock_queue().get(id).cloned()
    }

    pub fn settings(&self) -> BulkProcessingConfig {
        self.shared.lock_queue().settings().clone()
    }
}
