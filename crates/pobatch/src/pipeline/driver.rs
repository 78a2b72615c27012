//! The background task that works through pending jobs one at a time.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn, Instrument};

use super::progress::JobProgress;
use super::{NextStep, Shared};
use crate::batch::Assignment;
use crate::broadcast::BatchEventKind;

/// Runs until no pending job remains or `token` is cancelled.
pub(crate) async fn drive(shared: Arc<Shared>, run_id: u64, token: CancellationToken) {
    let span = tracing::info_span!("batch_run", run_id);

    async move {
        info!("Batch run started");

        loop {
            tokio::select! {
                biased;
                _ = token.cancelled() => break,
                _ = shared.wait_until_resumed() => {}
            }

            let (assignment, job_token) = match shared.next_step(run_id) {
                NextStep::Run(assignment, job_token) => (assignment, job_token),
                NextStep::Wait => continue,
                NextStep::Drained => {
                    info!("Batch run finished, no pending jobs left");
                    return;
                }
                NextStep::Stopped => break,
            };

            run_job(&shared, &assignment, job_token).await;
            shared.clear_in_flight(run_id, &assignment.job_id);
        }

        debug!("Batch run stopped");
    }
    .instrument(span)
    .await
}

async fn run_job(shared: &Shared, assignment: &Assignment, token: CancellationToken) {
    let job_id = assignment.job_id.as_str();
    let filename = assignment.file.name.as_str();
    let span = tracing::info_span!("job", job_id, filename, attempt = assignment.attempt);

    async move {
        let progress = JobProgress::new(shared, assignment);
        let work = async {
            let result = shared.extractor.extract(&assignment.file, &progress).await;
            // Completion is committed only while running
            shared.wait_until_resumed().await;
            result
        };

        let result = tokio::select! {
            biased;
            _ = token.cancelled() => {
                debug!("Extraction cancelled");
                return;
            }
            result = work => result,
        };

        match result {
            Ok(order) => {
                let average_confidence = order.average_confidence;
                let committed = shared
                    .lock_queue()
                    .complete(job_id, assignment.attempt, order);
                match committed {
                    Some(selected) => {
                        info!(average_confidence, selected, "Job completed");
                        shared.events.job(
                            job_id,
                            filename,
                            BatchEventKind::Completed {
                                average_confidence,
                                selected,
                            },
                        );
                    }
                    None => debug!("Dropping result for a job that is no longer in flight"),
                }
            }
            Err(e) => {
                let error = e.to_string();
                let committed = shared
                    .lock_queue()
                    .fail(job_id, assignment.attempt, error.clone());
                if committed {
                    warn!(%error, "Job failed");
                    shared
                        .events
                        .job(job_id, filename, BatchEventKind::Failed { error });
                }
            }
        }
    }
    .instrument(span)
    .await
}
