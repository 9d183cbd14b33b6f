//! Run single stages against the saved workspace.

use std::sync::Arc;

use anyhow::Context;
use pitchcast_common::clock::CancelFlag;
use pitchcast_common::config::AppConfig;
use pitchcast_match_model::{ChartPaths, WorkspaceError};
use pitchcast_pipeline::Pipeline;

pub fn scripts(config: Arc<AppConfig>) -> anyhow::Result<()> {
    let pipeline = Pipeline::new(config)?;
    let bundle = pipeline.run_scripts()?;

    println!(
        "Commentary for {} vs {}:",
        bundle.match_data.teams.batting, bundle.match_data.teams.bowling
    );
    for segment in &bundle.segments {
        println!(
            "  [{}] {} {:?} ({} words)",
            segment.timestamp,
            segment.id,
            segment.kind,
            segment.word_count()
        );
    }
    println!("Saved to {}", pipeline.workspace().root().display());
    Ok(())
}

pub fn charts(config: Arc<AppConfig>) -> anyhow::Result<()> {
    let pipeline = Pipeline::new(config)?;
    let bundle = pipeline
        .workspace()
        .load_scripts()
        .context("Failed to load scripts")?;
    let charts = pipeline.run_charts(&bundle.match_data)?;

    for (name, path) in &charts.0 {
        println!("  {name}: {}", path.display());
    }
    Ok(())
}

pub async fn avatars(config: Arc<AppConfig>, cancel: CancelFlag) -> anyhow::Result<()> {
    let pipeline = Pipeline::new(config)?.with_cancel(cancel);
    let bundle = pipeline
        .workspace()
        .load_scripts()
        .context("Failed to load scripts")?;
    let outcome = pipeline.run_jobs(&bundle.segments).await?;

    for artifact in &outcome.artifacts {
        match (&artifact.local_path, &artifact.error) {
            (Some(path), _) if artifact.is_completed() => {
                println!("[OK]   Segment {}: {}", artifact.segment_id, path.display())
            }
            (_, error) => println!(
                "[FAIL] Segment {}: {}",
                artifact.segment_id,
                error.as_deref().unwrap_or("unknown error")
            ),
        }
    }
    for job in &outcome.timed_out {
        println!("[WARN] Segment {}: render timed out", job.segment_id);
    }
    println!("{} poll rounds", outcome.rounds);
    Ok(())
}

pub async fn compose(config: Arc<AppConfig>) -> anyhow::Result<()> {
    let pipeline = Pipeline::new(config)?;
    let workspace = pipeline.workspace();
    let bundle = workspace.load_scripts().context("Failed to load scripts")?;
    let artifacts = workspace
        .load_artifacts()
        .context("Failed to load avatar clips")?;
    let charts = match workspace.load_chart_paths() {
        Ok(charts) => charts,
        Err(WorkspaceError::Missing { .. }) => {
            tracing::warn!("No saved charts; composing without overlays");
            ChartPaths::new()
        }
        Err(e) => return Err(e.into()),
    };

    let report = pipeline
        .run_assembly(&bundle.segments, &artifacts, &charts)
        .await?;
    println!("{} clips assembled", report.clips.len());
    println!("Output: {}", report.outcome.path().display());
    Ok(())
}
