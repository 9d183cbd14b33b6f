//! Individual ffmpeg transforms.
//!
//! Each function performs one toolchain call and returns the output path.
//! None of them decide how a failure degrades; that is the caller's job.

use std::path::{Path, PathBuf};

use pitchcast_common::config::{CompositionConfig, OverlayCorner};

use crate::toolchain::{probe_duration, MediaBackend, ToolError, ToolInvocation};

/// Convert a still image into a `secs`-long video at the output geometry.
pub async fn image_to_video(
    backend: &dyn MediaBackend,
    config: &CompositionConfig,
    image: &Path,
    secs: f64,
    output: &Path,
) -> Result<PathBuf, ToolError> {
    let invocation = ToolInvocation::ffmpeg("image_video", config.timeouts.image_video_secs)
        .args(["-loop", "1", "-i"])
        .path(image)
        .args(["-c:v", config.video_codec.as_str()])
        .args(["-t".to_string(), fmt_secs(secs)])
        .args(["-pix_fmt", "yuv420p"])
        .args(["-vf".to_string(), format!("scale={}:{}", config.width, config.height)])
        .args(["-r".to_string(), config.fps.to_string()])
        .arg("-y")
        .path(output);

    backend.run(&invocation).await?;
    Ok(output.to_path_buf())
}

/// Overlay `overlay` as a scaled, corner-anchored picture-in-picture.
pub async fn picture_in_picture(
    backend: &dyn MediaBackend,
    config: &CompositionConfig,
    main: &Path,
    overlay: &Path,
    output: &Path,
) -> Result<PathBuf, ToolError> {
    let filter = format!(
        "[1:v]scale={}:{}[overlay];[0:v][overlay]overlay={}",
        config.pip_width,
        config.pip_height,
        overlay_position(config.pip_corner, config.pip_margin)
    );
    let invocation = ToolInvocation::ffmpeg("pip", config.timeouts.overlay_secs)
        .arg("-i")
        .path(main)
        .arg("-i")
        .path(overlay)
        .args(["-filter_complex".to_string(), filter])
        .args(["-c:a", "copy", "-y"])
        .path(output);

    backend.run(&invocation).await?;
    Ok(output.to_path_buf())
}

/// Burn a centered lower-third caption near the bottom edge.
pub async fn lower_third(
    backend: &dyn MediaBackend,
    config: &CompositionConfig,
    input: &Path,
    text: &str,
    output: &Path,
) -> Result<PathBuf, ToolError> {
    let filter = format!(
        "drawtext=text='{}':fontsize=36:fontcolor=white:box=1:boxcolor=black@0.7:\
         boxborderw=10:x=(w-text_w)/2:y=main_h-100",
        escape_drawtext(text)
    );
    let invocation = ToolInvocation::ffmpeg("lower_third", config.timeouts.lower_third_secs)
        .arg("-i")
        .path(input)
        .args(["-vf".to_string(), filter])
        .args(["-c:a", "copy", "-y"])
        .path(output);

    backend.run(&invocation).await?;
    Ok(output.to_path_buf())
}

/// Fade in from black and out to black, `config.fade_secs` each side.
///
/// Needs the clip duration, so this probes before it encodes.
pub async fn fade_in_out(
    backend: &dyn MediaBackend,
    config: &CompositionConfig,
    input: &Path,
    output: &Path,
) -> Result<PathBuf, ToolError> {
    let duration = probe_duration(backend, input, config.timeouts.ffprobe_secs).await?;
    let fade = config.fade_secs;
    let fade_out_start = (duration - fade).max(0.0);

    let filter = format!(
        "fade=t=in:st=0:d={},fade=t=out:st={}:d={}",
        fmt_secs(fade),
        fmt_secs(fade_out_start),
        fmt_secs(fade)
    );
    let invocation = ToolInvocation::ffmpeg("fade", config.timeouts.fade_secs)
        .arg("-i")
        .path(input)
        .args(["-vf".to_string(), filter])
        .args(["-c:a", "copy", "-y"])
        .path(output);

    backend.run(&invocation).await?;
    Ok(output.to_path_buf())
}

/// Mix background music under the video's own audio track.
pub async fn mix_background_music(
    backend: &dyn MediaBackend,
    config: &CompositionConfig,
    video: &Path,
    music: &Path,
    output: &Path,
) -> Result<PathBuf, ToolError> {
    let filter = format!(
        "[1:a]volume={}[a1];[0:a][a1]amix=inputs=2:duration=first[aout]",
        config.music_volume
    );
    let invocation = ToolInvocation::ffmpeg("music_mix", config.timeouts.mix_secs)
        .arg("-i")
        .path(video)
        .arg("-i")
        .path(music)
        .args(["-filter_complex".to_string(), filter])
        .args(["-map", "0:v", "-map", "[aout]", "-c:v", "copy"])
        .args(["-c:a", config.audio_codec.as_str(), "-y"])
        .path(output);

    backend.run(&invocation).await?;
    Ok(output.to_path_buf())
}

/// Overlay placement expression for a corner.
pub fn overlay_position(corner: OverlayCorner, margin: u32) -> String {
    match corner {
        OverlayCorner::TopLeft => format!("{margin}:{margin}"),
        OverlayCorner::TopRight => format!("main_w-overlay_w-{margin}:{margin}"),
        OverlayCorner::BottomLeft => format!("{margin}:main_h-overlay_h-{margin}"),
        OverlayCorner::BottomRight => {
            format!("main_w-overlay_w-{margin}:main_h-overlay_h-{margin}")
        }
    }
}

/// Escape text for a single-quoted drawtext value.
pub fn escape_drawtext(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            ':' => out.push_str("\\:"),
            '\'' => out.push_str("'\\''"),
            '%' => out.push_str("\\%"),
            _ => out.push(c),
        }
    }
    out
}

/// Seconds with at most millisecond precision and no trailing zeros.
fn fmt_secs(secs: f64) -> String {
    let rounded = (secs * 1000.0).round() / 1000.0;
    format!("{rounded}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overlay_positions() {
        assert_eq!(
            overlay_position(OverlayCorner::BottomRight, 20),
            "main_w-overlay_w-20:main_h-overlay_h-20"
        );
        assert_eq!(overlay_position(OverlayCorner::TopLeft, 20), "20:20");
        assert_eq!(
            overlay_position(OverlayCorner::TopRight, 10),
            "main_w-overlay_w-10:10"
        );
        assert_eq!(
            overlay_position(OverlayCorner::BottomLeft, 5),
            "5:main_h-overlay_h-5"
        );
    }

    #[test]
    fn test_escape_drawtext() {
        assert_eq!(escape_drawtext("KEY MOMENT"), "KEY MOMENT");
        assert_eq!(escape_drawtext("17:2"), "17\\:2");
        assert_eq!(escape_drawtext("it's 50%"), "it'\\''s 50\\%");
    }

    #[test]
    fn test_fmt_secs() {
        assert_eq!(fmt_secs(8.0), "8");
        assert_eq!(fmt_secs(0.5), "0.5");
        assert_eq!(fmt_secs(11.98), "11.98");
        assert_eq!(fmt_secs(1.0 / 3.0), "0.333");
    }
}
