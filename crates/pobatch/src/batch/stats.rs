use serde::{Deserialize, Serialize};

use crate::job::{BatchJob, JobStatus};

/// Snapshot of the queue, derived from the job list on every read.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BatchStats {
    pub total: usize,
    pub pending: usize,
    pub processing: usize,
    pub paused: usize,
    pub completed: usize,
    pub failed: usize,
    pub selected: usize,
    /// Sum of `total_value` over completed jobs.
    pub total_value: f64,
    /// Sum of `total_items` over completed jobs.
    pub total_items: u64,
    /// Mean of `average_confidence` over completed jobs; 0 when none.
    pub average_confidence: f64,
}

impl BatchStats {
    pub fn from_jobs(jobs: &[BatchJob]) -> Self {
        let mut stats = BatchStats {
            total: jobs.len(),
            ..Default::default()
        };

        let mut confidence_sum = 0.0;
        let mut confidence_count = 0usize;

        for job in jobs {
            match job.status {
                JobStatus::Pending => stats.pending += 1,
                JobStatus::Processing => stats.processing += 1,
                JobStatus::Paused => stats.paused += 1,
                JobStatus::Completed => stats.completed += 1,
                JobStatus::Failed => stats.failed += 1,
            }
            if job.selected {
                stats.selected += 1;
            }

            if job.status != JobStatus::Completed {
                continue;
            }
            if let Some(order) = &job.parsed_data {
                stats.total_value += order.total_value;
                stats.total_items += u64::from(order.total_items);
                confidence_sum += order.average_confidence;
                confidence_count += 1;
            }
        }

        if confidence_count > 0 {
            stats.average_confidence = confidence_sum / confidence_count as f64;
        }

        stats
    }

    /// Jobs still waiting for or undergoing extraction.
    pub fn remaining(&self) -> usize {
        self.pending + self.processing + self.paused
    }
}
