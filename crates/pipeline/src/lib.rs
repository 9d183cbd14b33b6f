//! Pitchcast Pipeline
//!
//! Runs one commentary video end to end as a linear state machine:
//!
//! ```text
//! Scripts ──▶ Charts ──▶ Jobs ──▶ Assembly
//! ```
//!
//! Each stage persists its output into the run workspace before the next
//! one starts, so a failed run leaves everything up to the failing stage on
//! disk. The cancel flag is checked before every stage.

pub mod orchestrator;
pub mod stages;
pub mod summary;

pub use orchestrator::{AssemblyReport, Pipeline, PipelineError};
pub use stages::{ChartStage, ScriptStage, Stage, StageError};
pub use summary::{RunSummary, SegmentFailure};
