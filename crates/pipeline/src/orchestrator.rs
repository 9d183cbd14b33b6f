//! Pipeline orchestrator.
//!
//! Sequences the four stages and nothing else. Each stage reads its inputs
//! from arguments (or the workspace, when run standalone) and writes its
//! outputs to the workspace before returning.

use std::sync::Arc;
use std::time::Duration;

use pitchcast_avatar_engine::{
    submit_all, ArtifactFetcher, AvatarClient, HttpArtifactFetcher, JobPoller, PollOutcome,
    RenderClient,
};
use pitchcast_commentary::{ChartRenderer, TemplateScriptWriter};
use pitchcast_common::clock::{secs_to_duration, CancelFlag, Clock, SystemClock};
use pitchcast_common::config::AppConfig;
use pitchcast_match_model::{
    validate_segments, Artifact, ChartPaths, MatchData, RunWorkspace, ScriptBundle, Segment,
    WorkspaceError, SUMMARY_FILE,
};
use pitchcast_render_engine::{
    AssemblyOutcome, ComposedClip, FfmpegBackend, MediaBackend, SegmentComposer,
    SequenceAssembler,
};

use crate::stages::{ChartStage, ScriptStage, Stage, StageError};
use crate::summary::RunSummary;

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("Stage '{stage}' failed: {source}")]
    Stage {
        stage: Stage,
        #[source]
        source: StageError,
    },

    #[error("Run cancelled at stage '{stage}'")]
    Cancelled { stage: Stage },

    #[error(transparent)]
    Workspace(#[from] WorkspaceError),
}

impl PipelineError {
    pub fn stage(stage: Stage, source: impl Into<StageError>) -> Self {
        Self::Stage {
            stage,
            source: source.into(),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, PipelineError::Cancelled { .. })
    }
}

/// Clips and final output of the assembly stage.
#[derive(Debug, Clone)]
pub struct AssemblyReport {
    pub clips: Vec<ComposedClip>,
    pub outcome: AssemblyOutcome,
}

/// One configured run.
///
/// Collaborators default to the production implementations and are built
/// lazily, when their stage starts. Tests swap them with the `with_*`
/// builders.
pub struct Pipeline {
    config: Arc<AppConfig>,
    workspace: RunWorkspace,
    match_data: MatchData,
    clock: Arc<dyn Clock>,
    cancel: CancelFlag,
    backend: Arc<dyn MediaBackend>,
    scripts: Arc<dyn ScriptStage>,
    charts: Option<Arc<dyn ChartStage>>,
    client: Option<Arc<dyn RenderClient>>,
    fetcher: Option<Arc<dyn ArtifactFetcher>>,
}

impl Pipeline {
    /// Open the run workspace at `config.output_dir`.
    pub fn new(config: Arc<AppConfig>) -> Result<Self, PipelineError> {
        let workspace = RunWorkspace::open(&config.output_dir)?;
        let backend = Arc::new(FfmpegBackend::new(config.composition.timeouts.probe_secs));
        Ok(Self {
            config,
            workspace,
            match_data: MatchData::sample(),
            clock: Arc::new(SystemClock::start()),
            cancel: CancelFlag::new(),
            backend,
            scripts: Arc::new(TemplateScriptWriter::new()),
            charts: None,
            client: None,
            fetcher: None,
        })
    }

    pub fn with_match_data(mut self, data: MatchData) -> Self {
        self.match_data = data;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_cancel(mut self, cancel: CancelFlag) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn with_backend(mut self, backend: Arc<dyn MediaBackend>) -> Self {
        self.backend = backend;
        self
    }

    pub fn with_script_stage(mut self, scripts: Arc<dyn ScriptStage>) -> Self {
        self.scripts = scripts;
        self
    }

    pub fn with_chart_stage(mut self, charts: Arc<dyn ChartStage>) -> Self {
        self.charts = Some(charts);
        self
    }

    pub fn with_client(mut self, client: Arc<dyn RenderClient>) -> Self {
        self.client = Some(client);
        self
    }

    pub fn with_fetcher(mut self, fetcher: Arc<dyn ArtifactFetcher>) -> Self {
        self.fetcher = Some(fetcher);
        self
    }

    pub fn workspace(&self) -> &RunWorkspace {
        &self.workspace
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    fn check_cancel(&self, stage: Stage) -> Result<(), PipelineError> {
        if self.cancel.is_cancelled() {
            tracing::warn!(%stage, "Run cancelled");
            return Err(PipelineError::Cancelled { stage });
        }
        Ok(())
    }

    /// Run all four stages and persist the run summary.
    pub async fn run(&self) -> Result<RunSummary, PipelineError> {
        let started_at = chrono::Utc::now();
        let started = self.clock.now();
        tracing::info!(
            output_dir = %self.config.output_dir.display(),
            provider = %self.config.avatar.provider,
            "Starting commentary run"
        );

        self.check_cancel(Stage::Scripts)?;
        let bundle = self.run_scripts()?;

        self.check_cancel(Stage::Charts)?;
        let charts = self.run_charts(&bundle.match_data)?;

        self.check_cancel(Stage::Jobs)?;
        let poll = self.run_jobs(&bundle.segments).await?;

        self.check_cancel(Stage::Assembly)?;
        let report = self
            .run_assembly(&bundle.segments, &poll.artifacts, &charts)
            .await?;

        let elapsed = self.clock.now().saturating_sub(started);
        let summary = RunSummary::from_parts(
            started_at,
            elapsed.as_secs_f64(),
            self.provider_in_use(),
            bundle.segments.len(),
            charts.0.keys().cloned().collect(),
            &poll,
            report.clips,
            report.outcome,
        );
        self.workspace.write_json(SUMMARY_FILE, &summary)?;

        tracing::info!(
            elapsed_secs = summary.elapsed_secs,
            completed = summary.completed.len(),
            failed = summary.failed.len(),
            timed_out = summary.timed_out.len(),
            degraded = summary.is_degraded(),
            output = %summary.output.path().display(),
            "Run finished"
        );
        Ok(summary)
    }

    fn provider_in_use(&self) -> pitchcast_common::config::AvatarProvider {
        match &self.client {
            Some(client) => client.provider(),
            None => self.config.avatar.provider,
        }
    }

    /// Scripts stage: write and validate the segment list.
    pub fn run_scripts(&self) -> Result<ScriptBundle, PipelineError> {
        let segments = self
            .scripts
            .write_segments(&self.match_data)
            .map_err(|e| PipelineError::stage(Stage::Scripts, e))?;
        validate_segments(&segments).map_err(|e| PipelineError::stage(Stage::Scripts, e))?;

        let bundle = ScriptBundle {
            match_data: self.match_data.clone(),
            segments,
        };
        self.workspace.save_scripts(&bundle)?;
        tracing::info!(segments = bundle.segments.len(), "Scripts ready");
        Ok(bundle)
    }

    /// Charts stage: render chart images for the match.
    pub fn run_charts(&self, data: &MatchData) -> Result<ChartPaths, PipelineError> {
        let charts = match &self.charts {
            Some(stage) => stage.render_charts(data),
            None => ChartRenderer::new(self.workspace.charts_dir())
                .map_err(StageError::from)
                .and_then(|renderer| renderer.render_charts(data)),
        }
        .map_err(|e| PipelineError::stage(Stage::Charts, e))?;

        self.workspace.save_chart_paths(&charts)?;
        Ok(charts)
    }

    /// Jobs stage: submit one render job per segment and poll them all.
    ///
    /// Cancellation while polling still saves the artifacts resolved so far,
    /// then returns [`PipelineError::Cancelled`].
    pub async fn run_jobs(&self, segments: &[Segment]) -> Result<PollOutcome, PipelineError> {
        let client: Arc<dyn RenderClient> = match &self.client {
            Some(client) => client.clone(),
            None => Arc::new(
                AvatarClient::from_config(&self.config.avatar, self.clock.clone())
                    .map_err(|e| PipelineError::stage(Stage::Jobs, e))?,
            ),
        };
        let fetcher: Arc<dyn ArtifactFetcher> = match &self.fetcher {
            Some(fetcher) => fetcher.clone(),
            None => Arc::new(
                HttpArtifactFetcher::new(
                    self.workspace.avatar_dir(),
                    Duration::from_secs(self.config.avatar.download_timeout_secs),
                )
                .map_err(|e| PipelineError::stage(Stage::Jobs, e))?,
            ),
        };

        let jobs = submit_all(
            client.as_ref(),
            segments,
            self.clock.as_ref(),
            secs_to_duration(self.config.avatar.submit_delay_secs),
        )
        .await
        .map_err(|e| PipelineError::stage(Stage::Jobs, e))?;
        self.workspace.save_render_jobs(&jobs)?;

        let outcome = JobPoller::new(client, fetcher, self.clock.clone(), &self.config.polling)
            .with_cancel(self.cancel.clone())
            .run(jobs)
            .await;
        self.workspace.save_artifacts(&outcome.artifacts)?;
        if outcome.cancelled {
            tracing::warn!(
                abandoned = outcome.abandoned.len(),
                "Polling cancelled; saved partial artifacts"
            );
            return Err(PipelineError::Cancelled { stage: Stage::Jobs });
        }

        tracing::info!(
            completed = outcome.completed().count(),
            failed = outcome.failed().count(),
            timed_out = outcome.timed_out.len(),
            rounds = outcome.rounds,
            "Avatar clips ready"
        );
        Ok(outcome)
    }

    /// Assembly stage: compose each completed clip and concatenate them.
    ///
    /// The toolchain is probed once. Without it, composition is skipped and
    /// the raw avatar clips go straight to the manifest.
    pub async fn run_assembly(
        &self,
        segments: &[Segment],
        artifacts: &[Artifact],
        charts: &ChartPaths,
    ) -> Result<AssemblyReport, PipelineError> {
        let mut ready: Vec<(u32, &std::path::Path)> = artifacts
            .iter()
            .filter(|a| a.is_completed())
            .filter_map(|a| a.local_path.as_deref().map(|p| (a.segment_id, p)))
            .collect();
        ready.sort_by_key(|(id, _)| *id);

        let available = self.backend.is_available().await;
        let composition = self.config.composition.clone();

        let mut clips = Vec::with_capacity(ready.len());
        if available {
            let composer = SegmentComposer::new(
                self.backend.clone(),
                composition.clone(),
                self.workspace.temp_dir(),
            )
            .map_err(|e| PipelineError::stage(Stage::Assembly, e))?;

            for (segment_id, avatar) in ready {
                let overlay = charts.for_segment(segment_id, &self.config.charts);
                let title = segments
                    .iter()
                    .find(|s| s.id == segment_id)
                    .map(|s| s.kind.title());
                clips.push(composer.compose(segment_id, avatar, overlay, title).await);
            }
        } else {
            tracing::warn!("ffmpeg unavailable; skipping composition");
            clips.extend(
                ready
                    .into_iter()
                    .map(|(segment_id, avatar)| ComposedClip::passthrough(segment_id, avatar)),
            );
        }

        let assembler = SequenceAssembler::new(
            self.backend.clone(),
            composition,
            self.workspace.temp_dir(),
            self.config.output_path(),
        );
        let outcome = assembler
            .assemble_with(&clips, available)
            .await
            .map_err(|e| PipelineError::stage(Stage::Assembly, e))?;

        Ok(AssemblyReport { clips, outcome })
    }
}
