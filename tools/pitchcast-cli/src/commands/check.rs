//! Check toolchain and provider setup.

use std::sync::Arc;

use pitchcast_common::config::AppConfig;
use pitchcast_render_engine::{FfmpegBackend, MediaBackend};

pub async fn run(config: Arc<AppConfig>) -> anyhow::Result<()> {
    println!("Pitchcast System Check");
    println!("{}", "=".repeat(50));

    let backend = FfmpegBackend::new(config.composition.timeouts.probe_secs);
    let ffmpeg = backend.is_available().await;
    if ffmpeg {
        println!("[OK]   ffmpeg found");
    } else {
        println!("[WARN] ffmpeg not found: final output will be a manifest file");
    }

    let provider = config.avatar.provider;
    let has_key = config
        .avatar
        .api_key
        .as_deref()
        .is_some_and(|k| !k.trim().is_empty());
    if provider.is_synthetic() {
        println!("[OK]   Avatar provider: offline (placeholder clips)");
    } else if has_key {
        println!("[OK]   Avatar provider: {provider} (API key set)");
    } else {
        println!("[WARN] Avatar provider: {provider} without API key; clips will be placeholders");
    }

    println!("[OK]   Output: {}", config.output_path().display());

    println!();
    if ffmpeg && (provider.is_synthetic() || has_key) {
        println!("Pitchcast is ready.");
    } else {
        println!("Pitchcast will run in degraded mode. See above.");
    }
    Ok(())
}
