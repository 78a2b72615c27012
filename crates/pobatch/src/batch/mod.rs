pub mod queue;
pub mod stats;

pub use queue::{AddFilesReport, Assignment, BatchQueue};
pub use stats::BatchStats;
