pub mod collector;
pub mod snapshot;

pub use collector::RunStatistics;
pub use snapshot::BatchReport;
