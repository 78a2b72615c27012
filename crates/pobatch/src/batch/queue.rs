//! The job collection and its state machine.
//!
//! `BatchQueue` is synchronous and owns no tasks; the pipeline driver calls
//! into it under a lock. Every transition checks the job's current status so
//! late or duplicate reports cannot move a job backwards.

use chrono::Utc;
use log::{debug, info, warn};
use serde::Serialize;

use crate::config::BulkProcessingConfig;
use crate::error::PipelineError;
use crate::job::{BatchJob, JobStatus, ParsedPurchaseOrder, UploadedFile};

use super::stats::BatchStats;

/// Outcome of an upload.
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AddFilesReport {
    /// Ids of the jobs created, in upload order.
    pub added: Vec<String>,
    /// Names of files already present in the queue.
    pub skipped_duplicates: Vec<String>,
    /// Names of files beyond the batch size.
    pub rejected: Vec<String>,
}

/// A pending job handed to the driver.
#[derive(Debug, Clone)]
pub struct Assignment {
    pub job_id: String,
    pub attempt: u32,
    pub file: UploadedFile,
}

pub struct BatchQueue {
    jobs: Vec<BatchJob>,
    settings: BulkProcessingConfig,
}

impl BatchQueue {
    pub fn new(settings: BulkProcessingConfig) -> Self {
        Self {
            jobs: Vec::new(),
            settings,
        }
    }

    pub fn settings(&self) -> &BulkProcessingConfig {
        &self.settings
    }

    pub fn jobs(&self) -> &[BatchJob] {
        &self.jobs
    }

    pub fn get(&self, id: &str) -> Option<&BatchJob> {
        self.jobs.iter().find(|job| job.id == id)
    }

    fn get_mut(&mut self, id: &str) -> Option<&mut BatchJob> {
        self.jobs.iter_mut().find(|job| job.id == id)
    }

    fn position(&self, id: &str) -> Result<usize, PipelineError> {
        self.jobs
            .iter()
            .position(|job| job.id == id)
            .ok_or_else(|| PipelineError::JobNotFound(id.to_string()))
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    pub fn has_pending(&self) -> bool {
        self.jobs.iter().any(|job| job.status == JobStatus::Pending)
    }

    /// The job currently processing or paused, if any.
    pub fn in_flight(&self) -> Option<&BatchJob> {
        self.jobs.iter().find(|job| job.status.is_in_flight())
    }

    pub fn stats(&self) -> BatchStats {
        BatchStats::from_jobs(&self.jobs)
    }

    /// Appends files as pending jobs, honouring the batch size and
    /// duplicate settings.
    pub fn add_files(&mut self, files: Vec<UploadedFile>) -> AddFilesReport {
        let mut report = AddFilesReport::default();
        let limit = match self.settings.batch_size {
            0 => usize::MAX,
            n => n,
        };

        for file in files {
            if self.settings.skip_duplicates
                && self.jobs.iter().any(|job| job.file.is_duplicate_of(&file))
            {
                debug!("Skipping duplicate upload {}", file.name);
                report.skipped_duplicates.push(file.name);
                continue;
            }
            if report.added.len() >= limit {
                report.rejected.push(file.name);
                continue;
            }

            let job = BatchJob::new(file);
            report.added.push(job.id.clone());
            self.jobs.push(job);
        }

        if !report.rejected.is_empty() {
            warn!(
                "Batch size {} exceeded, rejected {} files",
                limit,
                report.rejected.len()
            );
        }
        info!("Queued {} files", report.added.len());
        report
    }

    /// Moves the first pending job to processing. Returns `None` when
    /// nothing is pending or another job is already in flight.
    pub fn begin_next(&mut self) -> Option<Assignment> {
        if self.in_flight().is_some() {
            return None;
        }

        let job = self
            .jobs
            .iter_mut()
            .find(|job| job.status == JobStatus::Pending)?;
        job.status = JobStatus::Processing;
        job.progress = 0;
        job.processing_started = Some(Utc::now());
        job.attempt += 1;

        Some(Assignment {
            job_id: job.id.clone(),
            attempt: job.attempt,
            file: job.file.clone(),
        })
    }

    fn in_flight_attempt(&mut self, id: &str, attempt: u32) -> Option<&mut BatchJob> {
        self.get_mut(id)
            .filter(|job| job.attempt == attempt && job.status.is_in_flight())
    }

    /// Raises the job's progress, clamped to 100. Returns the new value when
    /// it changed; stale attempts and lower values are ignored.
    pub fn record_progress(&mut self, id: &str, attempt: u32, progress: u8) -> Option<u8> {
        let job = self.in_flight_attempt(id, attempt)?;
        let progress = progress.min(100);
        if progress <= job.progress {
            return None;
        }
        job.progress = progress;
        Some(progress)
    }

    /// Records a successful extraction and returns the job's selection
    /// state afterwards. `None` when the attempt is no longer current, e.g.
    /// the job was removed or requeued.
    pub fn complete(
        &mut self,
        id: &str,
        attempt: u32,
        order: ParsedPurchaseOrder,
    ) -> Option<bool> {
        let auto_select = self.settings.auto_selects(order.average_confidence);
        let job = self.in_flight_attempt(id, attempt)?;

        job.status = JobStatus::Completed;
        job.progress = 100;
        job.parsed_data = Some(order);
        job.error = None;
        job.processing_completed = Some(Utc::now());
        if auto_select {
            job.selected = true;
        }
        Some(job.selected)
    }

    /// Records a failed extraction. Same staleness rules as [`complete`].
    ///
    /// [`complete`]: BatchQueue::complete
    pub fn fail(&mut self, id: &str, attempt: u32, error: String) -> bool {
        let Some(job) = self.in_flight_attempt(id, attempt) else {
            return false;
        };

        job.status = JobStatus::Failed;
        job.parsed_data = None;
        job.error = Some(error);
        job.processing_completed = Some(Utc::now());
        true
    }

    /// Processing → paused for the in-flight job.
    pub fn pause_in_flight(&mut self) -> Option<&BatchJob> {
        let job = self
            .jobs
            .iter_mut()
            .find(|job| job.status == JobStatus::Processing)?;
        job.status = JobStatus::Paused;
        Some(job)
    }

    /// Paused → processing for the in-flight job. Progress is kept.
    pub fn resume_in_flight(&mut self) -> Option<&BatchJob> {
        let job = self
            .jobs
            .iter_mut()
            .find(|job| job.status == JobStatus::Paused)?;
        job.status = JobStatus::Processing;
        Some(job)
    }

    /// Abandons the in-flight job and puts it back in the queue.
    pub fn requeue_in_flight(&mut self) -> Option<&BatchJob> {
        let job = self.jobs.iter_mut().find(|job| job.status.is_in_flight())?;
        job.reset_to_pending();
        Some(job)
    }

    /// Flips `selected`; returns the new value.
    pub fn toggle_select(&mut self, id: &str) -> Result<bool, PipelineError> {
        let job = self
            .get_mut(id)
            .ok_or_else(|| PipelineError::JobNotFound(id.to_string()))?;
        job.selected = !job.selected;
        Ok(job.selected)
    }

    /// Deselects everything when every job is selected, otherwise selects
    /// everything. Returns the new selection state.
    pub fn select_all(&mut self) -> bool {
        let select = !self.jobs.iter().all(|job| job.selected);
        for job in &mut self.jobs {
            job.selected = select;
        }
        select
    }

    pub fn remove(&mut self, id: &str) -> Result<BatchJob, PipelineError> {
        let index = self.position(id)?;
        Ok(self.jobs.remove(index))
    }

    pub fn remove_selected(&mut self) -> Vec<BatchJob> {
        self.drain_where(|job| job.selected)
    }

    pub fn clear_completed(&mut self) -> Vec<BatchJob> {
        self.drain_where(|job| job.status == JobStatus::Completed)
    }

    fn drain_where(&mut self, predicate: impl Fn(&BatchJob) -> bool) -> Vec<BatchJob> {
        let (removed, kept): (Vec<BatchJob>, Vec<BatchJob>) =
            std::mem::take(&mut self.jobs).into_iter().partition(predicate);
        self.jobs = kept;
        removed
    }

    /// Failed → pending.
    pub fn retry(&mut self, id: &str) -> Result<&BatchJob, PipelineError> {
        let job = self
            .get_mut(id)
            .ok_or_else(|| PipelineError::JobNotFound(id.to_string()))?;
        if job.status != JobStatus::Failed {
            return Err(PipelineError::InvalidTransition {
                id: id.to_string(),
                status: job.status,
                action: "retry",
            });
        }
        job.reset_to_pending();
        Ok(job)
    }

    /// Marks every approvable job as being approved and returns snapshots of
    /// them. Claimed jobs are not offered again until released.
    pub fn claim_for_approval(&mut self) -> Vec<BatchJob> {
        self.jobs
            .iter_mut()
            .filter(|job| job.is_approvable())
            .map(|job| {
                job.approving = true;
                job.clone()
            })
            .collect()
    }

    /// Removes a claimed job after its order has been handed off. Returns
    /// `None` when the job was removed in the meantime.
    pub fn take_approved(&mut self, id: &str) -> Option<BatchJob> {
        let index = self
            .jobs
            .iter()
            .position(|job| job.id == id && job.approving)?;
        Some(self.jobs.remove(index))
    }

    /// Drops the claim on a job the sink refused.
    pub fn release_approval(&mut self, id: &str) {
        if let Some(job) = self.get_mut(id) {
            job.approving = false;
        }
    }
}

impl Default for BatchQueue {
    fn default() -> Self {
        Self::new(BulkProcessingConfig::default())
    }
}
