//! Job poller.
//!
//! Drives a batch of render jobs to terminal artifacts:
//!
//! 1. Synthetic jobs are materialized immediately and never polled.
//! 2. Remaining jobs are polled in rounds. Each round queries a snapshot of
//!    the pending set concurrently, then builds the next pending set by
//!    filtering on a single path.
//! 3. Between rounds the poller sleeps for the interval minus the time the
//!    round took, measured from round start. It never sleeps after a round
//!    that empties the pending set, nor after the last round.
//! 4. Jobs still pending after the round budget are reported as timed out.
//!
//! Artifacts are returned in segment-id order regardless of completion order.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::time::Duration;

use pitchcast_common::clock::{secs_to_duration, CancelFlag, Clock};
use pitchcast_common::config::PollingConfig;
use pitchcast_match_model::{Artifact, JobState, JobStatus, RemoteState, RenderJob};

use crate::client::RenderClient;
use crate::error::ProviderError;
use crate::fetch::ArtifactFetcher;
use crate::offline::synthetic_locator;

/// Result of polling a batch of jobs.
#[derive(Debug, Clone, Default)]
pub struct PollOutcome {
    /// Terminal artifacts (completed and failed), sorted by segment id.
    pub artifacts: Vec<Artifact>,

    /// Jobs that never resolved within the round budget.
    pub timed_out: Vec<RenderJob>,

    /// Jobs still pending when the run was cancelled.
    pub abandoned: Vec<RenderJob>,

    /// Poll rounds started.
    pub rounds: u32,

    /// Status queries issued.
    pub remote_calls: u32,

    pub cancelled: bool,
}

impl PollOutcome {
    pub fn completed(&self) -> impl Iterator<Item = &Artifact> {
        self.artifacts.iter().filter(|a| a.is_completed())
    }

    pub fn failed(&self) -> impl Iterator<Item = &Artifact> {
        self.artifacts.iter().filter(|a| !a.is_completed())
    }
}

/// What one status query means for a job.
enum Step {
    Done(Artifact),
    Pending(RenderJob),
}

/// Polls render jobs until each is terminal or the round budget runs out.
pub struct JobPoller {
    client: Arc<dyn RenderClient>,
    fetcher: Arc<dyn ArtifactFetcher>,
    clock: Arc<dyn Clock>,
    cancel: CancelFlag,
    max_rounds: u32,
    interval: Duration,
}

impl JobPoller {
    pub fn new(
        client: Arc<dyn RenderClient>,
        fetcher: Arc<dyn ArtifactFetcher>,
        clock: Arc<dyn Clock>,
        config: &PollingConfig,
    ) -> Self {
        Self {
            client,
            fetcher,
            clock,
            cancel: CancelFlag::new(),
            max_rounds: config.max_rounds,
            interval: secs_to_duration(config.interval_secs),
        }
    }

    /// Stop before the next round once `cancel` is set.
    pub fn with_cancel(mut self, cancel: CancelFlag) -> Self {
        self.cancel = cancel;
        self
    }

    /// Drive `jobs` to terminal artifacts.
    pub async fn run(&self, jobs: Vec<RenderJob>) -> PollOutcome {
        let started = self.clock.now();
        let mut outcome = PollOutcome::default();
        let mut results: BTreeMap<u32, Artifact> = BTreeMap::new();
        let mut seen = BTreeSet::new();
        let mut pending = Vec::new();

        for job in jobs {
            if !seen.insert(job.segment_id) {
                tracing::warn!(
                    segment_id = job.segment_id,
                    job_id = %job.remote_job_id,
                    "Duplicate job for segment; keeping the first"
                );
                continue;
            }

            if job.provider.is_synthetic() {
                let artifact = self.resolve_synthetic(&job).await;
                results.insert(artifact.segment_id, artifact);
            } else if job.provider != self.client.provider() {
                tracing::error!(
                    segment_id = job.segment_id,
                    job_provider = %job.provider,
                    client_provider = %self.client.provider(),
                    "No client for job provider"
                );
                let error = format!("no client for provider {}", job.provider);
                results.insert(
                    job.segment_id,
                    Artifact::failed(job.segment_id, job.remote_job_id, job.provider, error),
                );
            } else if job.state.is_terminal() {
                let error = format!("submitted in terminal state {:?}", job.state);
                results.insert(
                    job.segment_id,
                    Artifact::failed(job.segment_id, job.remote_job_id, job.provider, error),
                );
            } else {
                pending.push(job);
            }
        }

        for round in 1..=self.max_rounds {
            if pending.is_empty() {
                break;
            }
            if self.cancel.is_cancelled() {
                tracing::warn!(round, pending = pending.len(), "Polling cancelled");
                outcome.cancelled = true;
                break;
            }

            let round_start = self.clock.now();
            outcome.rounds = round;
            outcome.remote_calls += pending.len() as u32;

            let statuses = futures_util::future::join_all(
                pending.iter().map(|job| self.client.poll(&job.remote_job_id)),
            )
            .await;

            let mut next = Vec::with_capacity(pending.len());
            for (job, status) in pending.into_iter().zip(statuses) {
                match self.step(job, status).await {
                    Step::Done(artifact) => {
                        results.insert(artifact.segment_id, artifact);
                    }
                    Step::Pending(job) => next.push(job),
                }
            }
            pending = next;

            tracing::info!(
                round,
                max_rounds = self.max_rounds,
                pending = pending.len(),
                resolved = results.len(),
                "Poll round finished"
            );

            if !pending.is_empty() && round < self.max_rounds {
                let spent = self.clock.now().saturating_sub(round_start);
                self.clock.sleep(self.interval.saturating_sub(spent)).await;
            }
        }

        if outcome.cancelled {
            outcome.abandoned = pending;
        } else {
            outcome.timed_out = pending
                .into_iter()
                .map(|mut job| {
                    tracing::warn!(
                        segment_id = job.segment_id,
                        job_id = %job.remote_job_id,
                        "Render job timed out"
                    );
                    job.state = JobState::TimedOut;
                    job
                })
                .collect();
        }

        outcome.artifacts = results.into_values().collect();
        tracing::info!(
            completed = outcome.completed().count(),
            failed = outcome.failed().count(),
            timed_out = outcome.timed_out.len(),
            abandoned = outcome.abandoned.len(),
            rounds = outcome.rounds,
            elapsed_secs = self.clock.now().saturating_sub(started).as_secs_f64(),
            "Polling finished"
        );
        outcome
    }

    async fn resolve_synthetic(&self, job: &RenderJob) -> Artifact {
        let locator = job
            .content_locator
            .clone()
            .unwrap_or_else(|| synthetic_locator(job.segment_id));
        self.materialize(job, &locator).await
    }

    async fn materialize(&self, job: &RenderJob, locator: &str) -> Artifact {
        let file_name = format!("segment_{}.mp4", job.segment_id);
        match self.fetcher.fetch(locator, &file_name).await {
            Ok(path) => {
                tracing::info!(
                    segment_id = job.segment_id,
                    provider = %job.provider,
                    path = %path.display(),
                    "Segment clip ready"
                );
                Artifact::completed(job.segment_id, job.remote_job_id.clone(), job.provider, path)
            }
            Err(e) => {
                tracing::error!(segment_id = job.segment_id, error = %e, "Clip download failed");
                Artifact::failed(
                    job.segment_id,
                    job.remote_job_id.clone(),
                    job.provider,
                    e.to_string(),
                )
            }
        }
    }

    async fn step(&self, job: RenderJob, status: Result<JobStatus, ProviderError>) -> Step {
        let status = match status {
            Ok(status) => status,
            Err(e) if e.is_retryable() => {
                tracing::warn!(
                    segment_id = job.segment_id,
                    job_id = %job.remote_job_id,
                    error = %e,
                    "Status query failed; will retry next round"
                );
                return Step::Pending(job);
            }
            Err(e) => {
                tracing::error!(
                    segment_id = job.segment_id,
                    job_id = %job.remote_job_id,
                    error = %e,
                    "Status query rejected"
                );
                return Step::Done(Artifact::failed(
                    job.segment_id,
                    job.remote_job_id,
                    job.provider,
                    e.to_string(),
                ));
            }
        };

        match status.state {
            RemoteState::Completed => match status.content_locator {
                Some(locator) => Step::Done(self.materialize(&job, &locator).await),
                None => {
                    tracing::warn!(
                        segment_id = job.segment_id,
                        job_id = %job.remote_job_id,
                        "Job reported completed without a content locator"
                    );
                    Step::Pending(job)
                }
            },
            RemoteState::Failed => {
                tracing::error!(
                    segment_id = job.segment_id,
                    job_id = %job.remote_job_id,
                    "Provider reported render failure"
                );
                Step::Done(Artifact::failed(
                    job.segment_id,
                    job.remote_job_id,
                    job.provider,
                    "provider reported failure",
                ))
            }
            RemoteState::Processing | RemoteState::Pending => {
                tracing::debug!(segment_id = job.segment_id, state = ?status.state, "Still rendering");
                Step::Pending(job)
            }
            RemoteState::Unknown(raw) => {
                tracing::warn!(
                    segment_id = job.segment_id,
                    job_id = %job.remote_job_id,
                    status = %raw,
                    "Unrecognized job status; treating as in flight"
                );
                Step::Pending(job)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::{HashMap, VecDeque};
    use std::path::PathBuf;
    use std::sync::Mutex;

    use pitchcast_common::clock::ManualClock;
    use pitchcast_common::config::AvatarProvider;

    use crate::error::FetchError;

    /// Replays scripted statuses per job id; repeats the last one forever.
    struct ScriptedClient {
        scripts: Mutex<HashMap<String, VecDeque<Result<JobStatus, ProviderError>>>>,
        calls: Mutex<Vec<String>>,
    }

    impl ScriptedClient {
        fn new(scripts: Vec<(&str, Vec<Result<JobStatus, ProviderError>>)>) -> Self {
            Self {
                scripts: Mutex::new(
                    scripts
                        .into_iter()
                        .map(|(id, s)| (id.to_string(), s.into_iter().collect()))
                        .collect(),
                ),
                calls: Mutex::new(Vec::new()),
            }
        }

        fn calls_for(&self, id: &str) -> usize {
            self.calls.lock().unwrap().iter().filter(|c| *c == id).count()
        }
    }

    #[async_trait::async_trait]
    impl RenderClient for ScriptedClient {
        fn provider(&self) -> AvatarProvider {
            AvatarProvider::HeyGen
        }

        async fn submit(&self, _script: &str, _segment_id: u32) -> Result<RenderJob, ProviderError> {
            unreachable!("poller never submits")
        }

        async fn poll(&self, remote_job_id: &str) -> Result<JobStatus, ProviderError> {
            self.calls.lock().unwrap().push(remote_job_id.to_string());
            let mut scripts = self.scripts.lock().unwrap();
            let queue = scripts.get_mut(remote_job_id).expect("unscripted job");
            if queue.len() > 1 {
                queue.pop_front().unwrap()
            } else {
                queue.front().cloned().unwrap()
            }
        }
    }

    /// Records fetches; fails for locators containing "broken".
    #[derive(Default)]
    struct RecordingFetcher {
        fetched: Mutex<Vec<String>>,
    }

    #[async_trait::async_trait]
    impl ArtifactFetcher for RecordingFetcher {
        async fn fetch(&self, locator: &str, file_name: &str) -> Result<PathBuf, FetchError> {
            self.fetched.lock().unwrap().push(locator.to_string());
            if locator.contains("broken") {
                Err(FetchError::Status { code: 404 })
            } else {
                Ok(PathBuf::from("/clips").join(file_name))
            }
        }
    }

    fn live_job(segment_id: u32) -> RenderJob {
        RenderJob {
            segment_id,
            provider: AvatarProvider::HeyGen,
            remote_job_id: format!("vid_{segment_id}"),
            state: JobState::Processing,
            content_locator: None,
            estimated_duration_secs: None,
        }
    }

    fn processing() -> Result<JobStatus, ProviderError> {
        Ok(JobStatus::new(RemoteState::Processing, None))
    }

    fn completed(url: &str) -> Result<JobStatus, ProviderError> {
        Ok(JobStatus::new(RemoteState::Completed, Some(url.to_string())))
    }

    fn poller(
        client: Arc<ScriptedClient>,
        fetcher: Arc<RecordingFetcher>,
        clock: Arc<ManualClock>,
    ) -> JobPoller {
        JobPoller::new(client, fetcher, clock, &PollingConfig::default())
    }

    #[tokio::test]
    async fn test_never_resolving_jobs_time_out_after_budget() {
        let client = Arc::new(ScriptedClient::new(vec![
            ("vid_1", vec![processing()]),
            ("vid_2", vec![Ok(JobStatus::new(RemoteState::Pending, None))]),
        ]));
        let fetcher = Arc::new(RecordingFetcher::default());
        let clock = Arc::new(ManualClock::default());

        let outcome = poller(client.clone(), fetcher, clock.clone())
            .run(vec![live_job(1), live_job(2)])
            .await;

        assert_eq!(outcome.rounds, 60);
        assert_eq!(outcome.remote_calls, 120);
        assert!(outcome.artifacts.is_empty());
        assert_eq!(outcome.timed_out.len(), 2);
        assert!(outcome.timed_out.iter().all(|j| j.state == JobState::TimedOut));
        assert_eq!(clock.sleeps().len(), 59);
        assert_eq!(clock.total_slept(), Duration::from_secs(295));
        assert_eq!(client.calls_for("vid_1"), 60);
    }

    #[tokio::test]
    async fn test_terminal_jobs_are_not_requeried() {
        let client = Arc::new(ScriptedClient::new(vec![
            ("vid_1", vec![completed("https://cdn/1.mp4")]),
            (
                "vid_2",
                vec![processing(), processing(), completed("https://cdn/2.mp4")],
            ),
            ("vid_3", vec![Ok(JobStatus::new(RemoteState::Failed, None))]),
        ]));
        let fetcher = Arc::new(RecordingFetcher::default());
        let clock = Arc::new(ManualClock::default());

        let outcome = poller(client.clone(), fetcher.clone(), clock.clone())
            .run(vec![live_job(1), live_job(2), live_job(3)])
            .await;

        assert_eq!(client.calls_for("vid_1"), 1);
        assert_eq!(client.calls_for("vid_3"), 1);
        assert_eq!(client.calls_for("vid_2"), 3);
        assert_eq!(outcome.rounds, 3);
        // No sleep after the round that empties the pending set.
        assert_eq!(clock.sleeps().len(), 2);

        let ids: Vec<u32> = outcome.artifacts.iter().map(|a| a.segment_id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
        assert!(outcome.artifacts[0].is_completed());
        assert!(outcome.artifacts[1].is_completed());
        assert!(!outcome.artifacts[2].is_completed());
    }

    #[tokio::test]
    async fn test_fetch_failure_is_terminal_and_attempted_once() {
        let client = Arc::new(ScriptedClient::new(vec![(
            "vid_1",
            vec![completed("https://cdn/broken.mp4")],
        )]));
        let fetcher = Arc::new(RecordingFetcher::default());
        let clock = Arc::new(ManualClock::default());

        let outcome = poller(client.clone(), fetcher.clone(), clock.clone())
            .run(vec![live_job(1)])
            .await;

        assert_eq!(fetcher.fetched.lock().unwrap().len(), 1);
        assert_eq!(client.calls_for("vid_1"), 1);
        assert_eq!(outcome.failed().count(), 1);
        assert!(outcome.timed_out.is_empty());
        assert!(clock.sleeps().is_empty());
    }

    #[tokio::test]
    async fn test_completed_without_locator_stays_pending() {
        let client = Arc::new(ScriptedClient::new(vec![(
            "vid_1",
            vec![
                Ok(JobStatus::new(RemoteState::Completed, None)),
                completed("https://cdn/1.mp4"),
            ],
        )]));
        let fetcher = Arc::new(RecordingFetcher::default());
        let clock = Arc::new(ManualClock::default());

        let outcome = poller(client.clone(), fetcher, clock)
            .run(vec![live_job(1)])
            .await;

        assert_eq!(client.calls_for("vid_1"), 2);
        assert_eq!(outcome.completed().count(), 1);
    }

    #[tokio::test]
    async fn test_unknown_status_and_retryable_errors_stay_pending() {
        let client = Arc::new(ScriptedClient::new(vec![
            (
                "vid_1",
                vec![
                    Ok(JobStatus::new(RemoteState::Unknown("queued_v2".into()), None)),
                    Err(ProviderError::Status { code: 503, body: String::new() }),
                    completed("https://cdn/1.mp4"),
                ],
            ),
            (
                "vid_2",
                vec![Err(ProviderError::Status { code: 401, body: "bad key".into() })],
            ),
        ]));
        let fetcher = Arc::new(RecordingFetcher::default());
        let clock = Arc::new(ManualClock::default());

        let outcome = poller(client.clone(), fetcher, clock)
            .run(vec![live_job(1), live_job(2)])
            .await;

        assert_eq!(client.calls_for("vid_1"), 3);
        assert_eq!(client.calls_for("vid_2"), 1);
        assert!(outcome.artifacts[0].is_completed());
        assert!(outcome.artifacts[1].error.as_deref().unwrap().contains("401"));
    }

    #[tokio::test]
    async fn test_synthetic_jobs_skip_polling() {
        let client = Arc::new(ScriptedClient::new(vec![]));
        let fetcher = Arc::new(RecordingFetcher::default());
        let clock = Arc::new(ManualClock::default());

        let mut job = live_job(7);
        job.provider = AvatarProvider::Offline;
        job.state = JobState::Completed;
        job.content_locator = None;

        let outcome = poller(client.clone(), fetcher.clone(), clock.clone())
            .run(vec![job])
            .await;

        assert_eq!(outcome.rounds, 0);
        assert_eq!(outcome.remote_calls, 0);
        assert!(client.calls.lock().unwrap().is_empty());
        assert_eq!(
            *fetcher.fetched.lock().unwrap(),
            vec!["mock_avatar_segment_7.mp4".to_string()]
        );
        assert!(clock.sleeps().is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_segment_keeps_first_job() {
        let client = Arc::new(ScriptedClient::new(vec![("vid_1", vec![completed("u1")])]));
        let fetcher = Arc::new(RecordingFetcher::default());
        let clock = Arc::new(ManualClock::default());

        let mut dup = live_job(1);
        dup.remote_job_id = "vid_1_again".to_string();

        let outcome = poller(client.clone(), fetcher, clock)
            .run(vec![live_job(1), dup])
            .await;

        assert_eq!(outcome.artifacts.len(), 1);
        assert_eq!(outcome.artifacts[0].remote_job_id, "vid_1");
    }

    #[tokio::test]
    async fn test_foreign_provider_job_fails_without_polling() {
        let client = Arc::new(ScriptedClient::new(vec![]));
        let fetcher = Arc::new(RecordingFetcher::default());
        let clock = Arc::new(ManualClock::default());

        let mut job = live_job(1);
        job.provider = AvatarProvider::DId;

        let outcome = poller(client.clone(), fetcher, clock).run(vec![job]).await;
        assert_eq!(outcome.failed().count(), 1);
        assert!(client.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_cancel_abandons_pending_jobs() {
        let client = Arc::new(ScriptedClient::new(vec![("vid_1", vec![processing()])]));
        let fetcher = Arc::new(RecordingFetcher::default());
        let clock = Arc::new(ManualClock::default());
        let cancel = CancelFlag::new();
        cancel.cancel();

        let outcome = poller(client.clone(), fetcher, clock)
            .with_cancel(cancel)
            .run(vec![live_job(1)])
            .await;

        assert!(outcome.cancelled);
        assert_eq!(outcome.rounds, 0);
        assert_eq!(outcome.abandoned.len(), 1);
        assert!(outcome.timed_out.is_empty());
        assert_eq!(client.calls_for("vid_1"), 0);
    }

    #[tokio::test]
    async fn test_sleep_measured_from_round_start() {
        /// Takes two virtual seconds per query.
        struct SlowClient {
            clock: Arc<ManualClock>,
            calls: Mutex<u32>,
        }

        #[async_trait::async_trait]
        impl RenderClient for SlowClient {
            fn provider(&self) -> AvatarProvider {
                AvatarProvider::HeyGen
            }
            async fn submit(&self, _: &str, _: u32) -> Result<RenderJob, ProviderError> {
                unreachable!()
            }
            async fn poll(&self, _: &str) -> Result<JobStatus, ProviderError> {
                self.clock.advance(Duration::from_secs(2));
                let mut calls = self.calls.lock().unwrap();
                *calls += 1;
                if *calls >= 2 {
                    completed("https://cdn/1.mp4")
                } else {
                    processing()
                }
            }
        }

        let clock = Arc::new(ManualClock::default());
        let client = Arc::new(SlowClient {
            clock: clock.clone(),
            calls: Mutex::new(0),
        });
        let fetcher = Arc::new(RecordingFetcher::default());

        let outcome = JobPoller::new(client, fetcher, clock.clone(), &PollingConfig::default())
            .run(vec![live_job(1)])
            .await;

        assert_eq!(outcome.completed().count(), 1);
        assert_eq!(clock.sleeps(), vec![Duration::from_secs(3)]);
    }
}
