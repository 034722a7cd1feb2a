pub mod schedule;
pub mod walk;

pub use schedule::{CycleStats, ScanScheduler};
pub use walk::{walk_and_enqueue, PathFilter};
