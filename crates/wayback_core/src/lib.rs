//! Wayback core: pure batch model, no IO.
mod outcome;
mod report;
mod state;
mod target;
mod view_model;

pub use outcome::{FailureReason, Outcome};
pub use report::{BatchReport, CompletedTarget, FAILURE_LOG_FILENAME};
pub use state::BatchState;
pub use target::{index_targets, parse_targets, Target, TargetIndex};
pub use view_model::BatchViewModel;
