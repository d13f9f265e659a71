pub mod scheduler;
pub mod snapshot;

pub use scheduler::{CompletionCallback, Scheduler};
pub use snapshot::{SnapshotGenerator, SnapshotPoll};
