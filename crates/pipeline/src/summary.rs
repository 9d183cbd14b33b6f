//! Aggregate report for one run.

use chrono::{DateTime, Utc};
use pitchcast_avatar_engine::PollOutcome;
use pitchcast_common::config::AvatarProvider;
use pitchcast_render_engine::{AssemblyOutcome, ComposedClip};
use serde::{Deserialize, Serialize};

/// Per-segment outcome of a run, persisted as `run_summary.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub started_at: DateTime<Utc>,
    pub elapsed_secs: f64,
    pub provider: AvatarProvider,
    pub segments: usize,

    /// Chart names that were rendered.
    pub charts: Vec<String>,

    /// Segment ids with a usable avatar clip.
    pub completed: Vec<u32>,
    pub failed: Vec<SegmentFailure>,
    pub timed_out: Vec<u32>,
    pub abandoned: Vec<u32>,

    pub clips: Vec<ComposedClip>,
    pub output: AssemblyOutcome,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentFailure {
    pub segment_id: u32,
    pub error: String,
}

impl RunSummary {
    /// Fill the per-job fields from a poll outcome.
    #[allow(clippy::too_many_arguments)]
    pub fn from_parts(
        started_at: DateTime<Utc>,
        elapsed_secs: f64,
        provider: AvatarProvider,
        segments: usize,
        charts: Vec<String>,
        poll: &PollOutcome,
        clips: Vec<ComposedClip>,
        output: AssemblyOutcome,
    ) -> Self {
        Self {
            started_at,
            elapsed_secs,
            provider,
            segments,
            charts,
            completed: poll.completed().map(|a| a.segment_id).collect(),
            failed: poll
                .failed()
                .map(|a| SegmentFailure {
                    segment_id: a.segment_id,
                    error: a.error.clone().unwrap_or_default(),
                })
                .collect(),
            timed_out: poll.timed_out.iter().map(|j| j.segment_id).collect(),
            abandoned: poll.abandoned.iter().map(|j| j.segment_id).collect(),
            clips,
            output,
        }
    }

    /// The run finished but something fell back: a segment is missing or
    /// the output is a placeholder.
    pub fn is_degraded(&self) -> bool {
        self.output.is_placeholder()
            || !self.failed.is_empty()
            || !self.timed_out.is_empty()
            || !self.abandoned.is_empty()
    }
}
