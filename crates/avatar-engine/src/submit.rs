//! Paced submission of a segment list.

use std::time::Duration;

use pitchcast_common::clock::Clock;
use pitchcast_match_model::{RenderJob, Segment};

use crate::client::RenderClient;
use crate::error::ProviderError;

/// Submit one render job per segment, in segment order.
///
/// Consecutive live submissions are separated by `delay`. No delay follows a
/// synthetic job or the last segment.
pub async fn submit_all<C: RenderClient + ?Sized>(
    client: &C,
    segments: &[Segment],
    clock: &dyn Clock,
    delay: Duration,
) -> Result<Vec<RenderJob>, ProviderError> {
    let mut jobs = Vec::with_capacity(segments.len());

    for (index, segment) in segments.iter().enumerate() {
        tracing::info!(
            segment_id = segment.id,
            kind = ?segment.kind,
            script_chars = segment.script.chars().count(),
            "Submitting avatar render"
        );
        let job = client.submit(&segment.script, segment.id).await?;
        let live = !job.provider.is_synthetic();
        tracing::debug!(
            segment_id = job.segment_id,
            job_id = %job.remote_job_id,
            provider = %job.provider,
            "Render job created"
        );
        jobs.push(job);

        if live && index + 1 < segments.len() {
            clock.sleep(delay).await;
        }
    }

    Ok(jobs)
}
