//! Batch event broadcaster for real-time queue updates.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// What happened to the batch or one of its jobs.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BatchEventKind {
    Added,
    Started,
    Progress { progress: u8 },
    Paused,
    Resumed,
    /// `selected` includes auto-selection by confidence.
    Completed { average_confidence: f64, selected: bool },
    Failed { error: String },
    Removed,
    Requeued,
    Approved { po_number: String },
    /// Per job from a toggle, batch-level from select-all.
    Selected { selected: bool },
    /// No pending jobs remain; the driver has stopped.
    Idle,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchEvent {
    /// Absent for batch-level events.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    #[serde(flatten)]
    pub kind: BatchEventKind,
    pub timestamp: DateTime<Utc>,
}

impl BatchEvent {
    pub fn job(job_id: &str, filename: &str, kind: BatchEventKind) -> Self {
        Self {
            job_id: Some(job_id.to_string()),
            filename: Some(filename.to_string()),
            kind,
            timestamp: Utc::now(),
        }
    }

    pub fn batch(kind: BatchEventKind) -> Self {
        Self {
            job_id: None,
            filename: None,
            kind,
            timestamp: Utc::now(),
        }
    }
}

#[derive(Clone)]
pub struct BatchEventBroadcaster {
    sender: Arc<broadcast::Sender<BatchEvent>>,
}

impl BatchEventBroadcaster {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender: Arc::new(sender),
        }
    }

    pub fn send(&self, event: BatchEvent) {
        // Ignore errors - no active receivers is fine
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<BatchEvent> {
        self.sender.subscribe()
    }

    pub fn job(&self, job_id: &str, filename: &str, kind: BatchEventKind) {
        self.send(BatchEvent::job(job_id, filename, kind));
    }
}

impl Default for BatchEventBroadcaster {
    fn default() -> Self {
        Self::new(256)
    }
}
