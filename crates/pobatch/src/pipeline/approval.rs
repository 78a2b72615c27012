use chrono::Utc;
use serde::Serialize;

use super::Shared;
use crate::broadcast::BatchEventKind;
use crate::error::SyncError;
use crate::job::BatchJob;
use crate::sync::ApprovedOrder;

/// Result of [`BatchPipeline::approve_selected`].
///
/// [`BatchPipeline::approve_selected`]: super::BatchPipeline::approve_selected
#[derive(Debug, Clone, PartialEq)]
pub enum ApprovalOutcome {
    /// No job was both selected and completed.
    NothingToApprove,
    Processed(ApprovalReport),
}

impl ApprovalOutcome {
    pub fn approved_count(&self) -> usize {
        match self {
            ApprovalOutcome::NothingToApprove => 0,
            ApprovalOutcome::Processed(report) => report.approved.len(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ApprovalReport {
    pub approved: Vec<ApprovedJob>,
    pub failed: Vec<ApprovalFailure>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ApprovedJob {
    pub job_id: String,
    pub po_number: String,
    /// Sum of sell price times quantity over the priced lines.
    pub sell_value: f64,
}

/// The sink refused the order; the job stays in the queue.
#[derive(Debug, Clone, PartialEq)]
pub struct ApprovalFailure {
    pub job_id: String,
    pub filename: String,
    pub error: SyncError,
}

/// Submits jobs already claimed through `BatchQueue::claim_for_approval`.
/// Each claim ends in either removal or release.
pub(crate) async fn approve(shared: &Shared, claimed: Vec<BatchJob>) -> ApprovalOutcome {
    let mut report = ApprovalReport::default();

    for job in claimed {
        let Some(order) = job.parsed_data else {
            shared.lock_queue().release_approval(&job.id);
            continue;
        };

        let lines = shared.engine.price_order(&order, None);
        let approved = ApprovedOrder {
            job_id: job.id.clone(),
            filename: job.file.name.clone(),
            order,
            lines,
            options: shared.options,
            approved_at: Utc::now(),
        };
        let po_number = approved.order.po_number.clone();
        let sell_value = approved.sell_value();

        match shared.sink.submit(approved).await {
            Ok(()) => {
                let taken = shared.lock_queue().take_approved(&job.id);
                if taken.is_some() {
                    shared.events.job(
                        &job.id,
                        &job.file.name,
                        BatchEventKind::Approved {
                            po_number: po_number.clone(),
                        },
                    );
                } else {
                    log::debug!("Approved job {} was removed during submission", job.id);
                }
                log::info!("Approved {} ({})", po_number, job.file.name);
                report.approved.push(ApprovedJob {
                    job_id: job.id,
                    po_number,
                    sell_value,
                });
            }
            Err(error) => {
                log::error!("Failed to submit {}: {}", job.file.name, error);
                shared.lock_queue().release_approval(&job.id);
                report.failed.push(ApprovalFailure {
                    job_id: job.id,
                    filename: job.file.name,
                    error,
                });
            }
        }
    }

    ApprovalOutcome::Processed(report)
}
