//! Offline render client.
//!
//! Synthesizes completed jobs locally. Used for explicit offline runs and as
//! the degradation target when a live provider fails.

use std::sync::Arc;

use pitchcast_common::clock::Clock;
use pitchcast_common::config::AvatarProvider;
use pitchcast_match_model::{JobState, JobStatus, RemoteState, RenderJob, SYNTHETIC_LOCATOR_PREFIX};

use crate::client::RenderClient;
use crate::error::ProviderError;

/// Estimated spoken length per script word, in seconds.
pub const SECS_PER_WORD: f64 = 0.4;

#[derive(Clone)]
pub struct OfflineClient {
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for OfflineClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OfflineClient").finish_non_exhaustive()
    }
}

impl OfflineClient {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self { clock }
    }

    /// Build a completed synthetic job for one segment.
    pub fn synthesize(&self, script: &str, segment_id: u32) -> RenderJob {
        let words = script.split_whitespace().count();
        RenderJob {
            segment_id,
            provider: AvatarProvider::Offline,
            remote_job_id: format!(
                "{SYNTHETIC_LOCATOR_PREFIX}video_{segment_id}_{}",
                self.clock.unix_secs()
            ),
            state: JobState::Completed,
            content_locator: Some(synthetic_locator(segment_id)),
            estimated_duration_secs: Some(words as f64 * SECS_PER_WORD),
        }
    }
}

/// Synthetic content locator for a segment's clip.
pub fn synthetic_locator(segment_id: u32) -> String {
    format!("{SYNTHETIC_LOCATOR_PREFIX}avatar_segment_{segment_id}.mp4")
}

#[async_trait::async_trait]
impl RenderClient for OfflineClient {
    fn provider(&self) -> AvatarProvider {
        AvatarProvider::Offline
    }

    async fn submit(&self, script: &str, segment_id: u32) -> Result<RenderJob, ProviderError> {
        Ok(self.synthesize(script, segment_id))
    }

    async fn poll(&self, remote_job_id: &str) -> Result<JobStatus, ProviderError> {
        Ok(JobStatus::new(
            RemoteState::Completed,
            Some(format!("{SYNTHETIC_LOCATOR_PREFIX}video_{remote_job_id}.mp4")),
        ))
    }
}
