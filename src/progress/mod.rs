//! Progress state and the events snapshotted from it.

pub mod event;
pub mod state;

pub use event::{now_millis, ChapterProgress, ProgressEvent, RunStatus};
pub use state::{format_duration, ChapterSubStep, ProgressState, Step, StepId, StepStatus};
