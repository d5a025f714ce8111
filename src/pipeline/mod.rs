pub mod format;
pub mod orchestrator;
pub mod retrieve;

pub use format::{Report, Section, SectionKind};
pub use orchestrator::{HealthPolicy, RunOutcome, run_once};
pub use retrieve::Snapshot;
