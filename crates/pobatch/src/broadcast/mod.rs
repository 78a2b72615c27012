//! Broadcasting of batch events for UI streaming.

pub mod batch_events;

pub use batch_events::{BatchEvent, BatchEventBroadcaster, BatchEventKind};
