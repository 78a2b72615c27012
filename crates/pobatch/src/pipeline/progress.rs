use async_trait::async_trait;

use super::Shared;
use crate::batch::Assignment;
use crate::broadcast::BatchEventKind;
use crate::extraction::ProgressSink;

/// Feeds extractor progress for one attempt into the queue and the event
/// channel. Reports wait while the batch is paused.
pub(crate) struct JobProgress<'a> {
    shared: &'a Shared,
    job_id: &'a str,
    filename: &'a str,
    attempt: u32,
}

impl<'a> JobProgress<'a> {
    pub(crate) fn new(shared: &'a Shared, assignment: &'a Assignment) -> Self {
        Self {
            shared,
            job_id: &assignment.job_id,
            filename: &assignment.file.name,
            attempt: assignment.attempt,
        }
    }
}

#[async_trait]
impl<'a> ProgressSink for JobProgress<'a> {
    async fn report(&self, progress: u8) {
        self.shared.wait_until_resumed().await;

        let recorded = self
            .shared
            .lock_queue()
            .record_progress(self.job_id, self.attempt, progress);

        if let Some(progress) = recorded {
            tracing::trace!(job_id = self.job_id, progress, "progress");
            self.shared.events.job(
                self.job_id,
                self.filename,
                BatchEventKind::Progress { progress },
            );
        }
    }
}
