//! Run the full pipeline.

use std::sync::Arc;

use pitchcast_common::clock::CancelFlag;
use pitchcast_common::config::AppConfig;
use pitchcast_pipeline::{Pipeline, RunSummary};
use pitchcast_render_engine::AssemblyOutcome;

pub async fn run(config: Arc<AppConfig>, cancel: CancelFlag) -> anyhow::Result<()> {
    println!("Pitchcast commentary run");
    println!("  Output dir: {}", config.output_dir.display());
    println!("  Provider: {}", config.avatar.provider);
    println!(
        "  Lower thirds: {}",
        if config.composition.lower_thirds { "on" } else { "off" }
    );
    if let Some(music) = &config.composition.background_music {
        println!("  Music: {}", music.display());
    }
    println!();

    let pipeline = Pipeline::new(config)?.with_cancel(cancel);
    let summary = pipeline.run().await?;
    print_summary(&summary);
    Ok(())
}

pub fn print_summary(summary: &RunSummary) {
    println!("Run summary ({:.1}s)", summary.elapsed_secs);
    println!("{}", "=".repeat(50));
    println!("  Segments: {}", summary.segments);
    println!("  Charts: {}", summary.charts.join(", "));
    println!("  Provider: {}", summary.provider);
    println!();

    for clip in &summary.clips {
        let mut notes = Vec::new();
        if clip.overlay {
            notes.push("chart overlay");
        }
        if clip.titled {
            notes.push("title");
        }
        if clip.faded {
            notes.push("fades");
        }
        let notes = if notes.is_empty() {
            "as-is".to_string()
        } else {
            notes.join(", ")
        };
        println!(
            "[OK]   Segment {}: {} ({notes})",
            clip.segment_id,
            clip.path.display()
        );
    }
    for failure in &summary.failed {
        println!("[FAIL] Segment {}: {}", failure.segment_id, failure.error);
    }
    for id in &summary.timed_out {
        println!("[WARN] Segment {id}: render timed out");
    }
    for id in &summary.abandoned {
        println!("[WARN] Segment {id}: abandoned");
    }

    println!();
    match &summary.output {
        AssemblyOutcome::Video {
            path, music_mixed, ..
        } => {
            println!("Final video: {}", path.display());
            if *music_mixed {
                println!("  Background music mixed in");
            }
        }
        AssemblyOutcome::Manifest { path, .. } => {
            println!("ffmpeg not found; wrote manifest instead: {}", path.display());
        }
    }
    if summary.is_degraded() {
        println!("Completed in degraded mode. See above for details.");
    }
}
