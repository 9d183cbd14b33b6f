//! Remote render jobs and their polled status.

use serde::{Deserialize, Serialize};

pub use pitchcast_common::config::AvatarProvider;

/// Content locators with this prefix are synthetic: they name no remote
/// resource and are materialized as local placeholder files.
pub const SYNTHETIC_LOCATOR_PREFIX: &str = "mock_";

/// A request to render one segment's avatar clip.
///
/// Owned by the poller until it reaches a terminal state; never resurrected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderJob {
    pub segment_id: u32,

    /// Which provider holds the job. `Offline` marks a synthetic job,
    /// including one produced by a failed live submission.
    pub provider: AvatarProvider,

    pub remote_job_id: String,

    pub state: JobState,

    /// Known up front for synthetic jobs; live jobs learn it from polling.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_locator: Option<String>,

    /// Estimated spoken length, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_duration_secs: Option<f64>,
}

/// Lifecycle of a render job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    Processing,
    Completed,
    Failed,
    TimedOut,
}

impl JobState {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, JobState::Processing)
    }
}

/// Provider-reported state of a job, as seen by one poll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteState {
    Processing,
    Pending,
    Completed,
    Failed,
    /// A status string this client does not recognize.
    Unknown(String),
}

impl RemoteState {
    /// Map a provider status string onto a remote state.
    pub fn from_provider(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "completed" | "done" => RemoteState::Completed,
            "processing" | "started" | "waiting" => RemoteState::Processing,
            "pending" | "created" => RemoteState::Pending,
            "failed" | "error" | "rejected" => RemoteState::Failed,
            _ => RemoteState::Unknown(raw.to_string()),
        }
    }
}

/// Result of one status query. Produced fresh on every poll, never cached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobStatus {
    pub state: RemoteState,
    pub content_locator: Option<String>,
}

impl JobStatus {
    pub fn new(state: RemoteState, content_locator: Option<String>) -> Self {
        Self {
            state,
            content_locator: content_locator.filter(|l| !l.trim().is_empty()),
        }
    }
}

/// Whether a locator is synthetic (see [`SYNTHETIC_LOCATOR_PREFIX`]).
pub fn is_synthetic_locator(locator: &str) -> bool {
    locator.starts_with(SYNTHETIC_LOCATOR_PREFIX)
}
