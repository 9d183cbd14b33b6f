//! Composition and assembly against a recording toolchain backend.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use pitchcast_common::config::CompositionConfig;
use pitchcast_render_engine::{
    AssemblerError, AssemblyOutcome, ComposedClip, MediaBackend, SegmentComposer,
    SequenceAssembler, Tool, ToolError, ToolInvocation, ToolOutput,
};

/// Records every invocation and "produces" the output file named by the
/// last argument. Labels in `fail` return a non-zero exit instead.
struct FakeBackend {
    available: bool,
    fail: HashSet<&'static str>,
    duration: &'static str,
    calls: Mutex<Vec<ToolInvocation>>,
}

impl FakeBackend {
    fn new() -> Self {
        Self {
            available: true,
            fail: HashSet::new(),
            duration: "12.5\n",
            calls: Mutex::new(Vec::new()),
        }
    }

    fn failing(labels: &[&'static str]) -> Self {
        Self {
            fail: labels.iter().copied().collect(),
            ..Self::new()
        }
    }

    fn unavailable() -> Self {
        Self {
            available: false,
            ..Self::new()
        }
    }

    fn labels(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|c| c.label.clone())
            .collect()
    }

    fn call(&self, label: &str) -> ToolInvocation {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .find(|c| c.label == label)
            .cloned()
            .unwrap_or_else(|| panic!("no {label} invocation"))
    }
}

#[async_trait::async_trait]
impl MediaBackend for FakeBackend {
    fn name(&self) -> &str {
        "fake"
    }

    async fn is_available(&self) -> bool {
        self.available
    }

    async fn run(&self, invocation: &ToolInvocation) -> Result<ToolOutput, ToolError> {
        self.calls.lock().unwrap().push(invocation.clone());
        if self.fail.contains(invocation.label.as_str()) {
            return Err(ToolError::Failed {
                label: invocation.label.clone(),
                code: Some(1),
                stderr: "simulated failure".to_string(),
            });
        }
        match invocation.tool {
            Tool::Ffprobe => Ok(ToolOutput {
                stdout: self.duration.to_string(),
                stderr: String::new(),
            }),
            Tool::Ffmpeg => {
                if let Some(out) = invocation.args.last() {
                    std::fs::write(out, invocation.label.as_bytes()).unwrap();
                }
                Ok(ToolOutput::default())
            }
        }
    }
}

fn scratch(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!(
        "pitchcast_render_{}_{}",
        name,
        std::process::id()
    ));
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

fn composer(backend: &Arc<FakeBackend>, dir: &Path, lower_thirds: bool) -> SegmentComposer {
    let config = CompositionConfig {
        lower_thirds,
        ..CompositionConfig::default()
    };
    SegmentComposer::new(backend.clone(), config, dir.join("temp")).unwrap()
}

#[tokio::test]
async fn test_segment_without_overlay_only_fades() {
    let dir = scratch("no_overlay");
    let backend = Arc::new(FakeBackend::new());
    let avatar = dir.join("segment_2.mp4");

    let clip = composer(&backend, &dir, false)
        .compose(2, &avatar, None, Some("KEY MOMENT"))
        .await;

    assert_eq!(backend.labels(), vec!["probe_duration", "fade"]);
    assert_eq!(clip.path, dir.join("temp").join("composed_segment_2.mp4"));
    assert!(!clip.overlay);
    assert!(!clip.titled);
    assert!(clip.faded);

    let fade = backend.call("fade");
    assert!(fade
        .args
        .contains(&"fade=t=in:st=0:d=0.5,fade=t=out:st=12:d=0.5".to_string()));
    let _ = std::fs::remove_dir_all(&dir);
}

#[tokio::test]
async fn test_overlay_and_title_chain() {
    let dir = scratch("full_chain");
    let backend = Arc::new(FakeBackend::new());
    let avatar = dir.join("segment_1.mp4");
    let chart = dir.join("run_rate.png");
    let temp = dir.join("temp");

    let clip = composer(&backend, &dir, true)
        .compose(1, &avatar, Some(&chart), Some("MATCH SUMMARY"))
        .await;

    assert_eq!(
        backend.labels(),
        vec!["image_video", "pip", "lower_third", "probe_duration", "fade"]
    );
    assert!(clip.overlay && clip.titled && clip.faded);
    assert_eq!(clip.path, temp.join("composed_segment_1.mp4"));

    let image = backend.call("image_video");
    assert!(image.args.contains(&"8".to_string()));
    assert!(image.args.contains(&"scale=1920:1080".to_string()));

    let pip = backend.call("pip");
    assert_eq!(pip.args[1], avatar.to_string_lossy());
    assert_eq!(pip.args[3], temp.join("chart_video_1.mp4").to_string_lossy());
    assert!(pip.args.iter().any(|a| a.contains(
        "[1:v]scale=640:360[overlay];[0:v][overlay]overlay=main_w-overlay_w-20:main_h-overlay_h-20"
    )));

    let title = backend.call("lower_third");
    assert_eq!(title.args[1], temp.join("pip_segment_1.mp4").to_string_lossy());
    assert!(title.args.iter().any(|a| a.contains("text='MATCH SUMMARY'")));

    let fade = backend.call("fade");
    assert_eq!(fade.args[1], temp.join("titled_segment_1.mp4").to_string_lossy());
    let _ = std::fs::remove_dir_all(&dir);
}

#[tokio::test]
async fn test_chart_video_failure_returns_avatar_clip() {
    let dir = scratch("chart_fail");
    let backend = Arc::new(FakeBackend::failing(&["image_video"]));
    let avatar = dir.join("segment_1.mp4");

    let clip = composer(&backend, &dir, true)
        .compose(1, &avatar, Some(&dir.join("run_rate.png")), Some("MATCH SUMMARY"))
        .await;

    assert_eq!(clip, ComposedClip::passthrough(1, &avatar));
    assert_eq!(backend.labels(), vec!["image_video"]);
    let _ = std::fs::remove_dir_all(&dir);
}

#[tokio::test]
async fn test_pip_failure_returns_avatar_clip() {
    let dir = scratch("pip_fail");
    let backend = Arc::new(FakeBackend::failing(&["pip"]));
    let avatar = dir.join("segment_3.mp4");

    let clip = composer(&backend, &dir, false)
        .compose(3, &avatar, Some(&dir.join("manhattan.png")), None)
        .await;

    assert_eq!(clip, ComposedClip::passthrough(3, &avatar));
    assert_eq!(backend.labels(), vec!["image_video", "pip"]);
    let _ = std::fs::remove_dir_all(&dir);
}

#[tokio::test]
async fn test_lower_third_failure_continues_untitled() {
    let dir = scratch("title_fail");
    let backend = Arc::new(FakeBackend::failing(&["lower_third"]));
    let avatar = dir.join("segment_2.mp4");

    let clip = composer(&backend, &dir, true)
        .compose(2, &avatar, None, Some("KEY MOMENT"))
        .await;

    assert!(!clip.titled);
    assert!(clip.faded);
    assert_eq!(backend.call("fade").args[1], avatar.to_string_lossy());
    let _ = std::fs::remove_dir_all(&dir);
}

#[tokio::test]
async fn test_fade_failure_keeps_previous_clip() {
    let dir = scratch("fade_fail");
    let backend = Arc::new(FakeBackend::failing(&["fade"]));
    let avatar = dir.join("segment_1.mp4");

    let clip = composer(&backend, &dir, false)
        .compose(1, &avatar, Some(&dir.join("run_rate.png")), None)
        .await;

    assert!(clip.overlay);
    assert!(!clip.faded);
    assert_eq!(clip.path, dir.join("temp").join("pip_segment_1.mp4"));
    let _ = std::fs::remove_dir_all(&dir);
}

#[tokio::test]
async fn test_unreadable_duration_skips_fade() {
    let dir = scratch("probe_fail");
    let backend = Arc::new(FakeBackend {
        duration: "N/A",
        ..FakeBackend::new()
    });
    let avatar = dir.join("segment_2.mp4");

    let clip = composer(&backend, &dir, false)
        .compose(2, &avatar, None, None)
        .await;

    assert_eq!(backend.labels(), vec!["probe_duration"]);
    assert_eq!(clip, ComposedClip::passthrough(2, &avatar));
    let _ = std::fs::remove_dir_all(&dir);
}

fn clips(dir: &Path, ids: &[u32]) -> Vec<ComposedClip> {
    ids.iter()
        .map(|id| ComposedClip::passthrough(*id, dir.join(format!("composed_segment_{id}.mp4"))))
        .collect()
}

#[tokio::test]
async fn test_concat_preserves_input_order() {
    let dir = scratch("concat_order");
    let backend = Arc::new(FakeBackend::new());
    let output = dir.join("final.mp4");
    let assembler = SequenceAssembler::new(
        backend.clone(),
        CompositionConfig::default(),
        dir.join("temp"),
        &output,
    );

    let outcome = assembler.assemble(&clips(&dir, &[3, 1, 2])).await.unwrap();
    assert_eq!(
        outcome,
        AssemblyOutcome::Video {
            path: output.clone(),
            clips: 3,
            music_mixed: false,
        }
    );

    let list = std::fs::read_to_string(dir.join("temp").join("concat_list.txt")).unwrap();
    let order: Vec<String> = list.lines().map(str::to_string).collect();
    assert_eq!(
        order,
        vec![
            format!("file '{}'", dir.join("composed_segment_3.mp4").display()),
            format!("file '{}'", dir.join("composed_segment_1.mp4").display()),
            format!("file '{}'", dir.join("composed_segment_2.mp4").display()),
        ]
    );

    let concat = backend.call("concat");
    assert_eq!(concat.timeout.as_secs(), 180);
    assert!(concat.args.windows(2).any(|w| w == ["-c", "copy"]));
    assert_eq!(concat.args.last().unwrap(), &output.to_string_lossy());
    let _ = std::fs::remove_dir_all(&dir);
}

#[tokio::test]
async fn test_missing_toolchain_writes_manifest() {
    let dir = scratch("manifest");
    let backend = Arc::new(FakeBackend::unavailable());
    let assembler = SequenceAssembler::new(
        backend.clone(),
        CompositionConfig::default(),
        dir.join("temp"),
        dir.join("final.mp4"),
    );

    let input = clips(&dir, &[1, 2, 3]);
    let outcome = assembler.assemble(&input).await.unwrap();
    let manifest = dir.join("mock_final.mp4");
    assert_eq!(
        outcome,
        AssemblyOutcome::Manifest {
            path: manifest.clone(),
            clips: 3,
        }
    );
    assert!(backend.labels().is_empty());
    assert!(!dir.join("final.mp4").exists());

    let text = std::fs::read_to_string(&manifest).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(
        lines[0],
        "Mock final video - FFmpeg required for actual composition"
    );
    for (line, clip) in lines[1..].iter().zip(&input) {
        assert_eq!(
            *line,
            format!("Segment {}: {}", clip.segment_id, clip.path.display())
        );
    }
    assert_eq!(lines.len(), 4);
    let _ = std::fs::remove_dir_all(&dir);
}

#[tokio::test]
async fn test_missing_toolchain_with_no_clips_writes_header_only_manifest() {
    let dir = scratch("manifest-empty");
    let backend = Arc::new(FakeBackend::unavailable());
    let assembler = SequenceAssembler::new(
        backend.clone(),
        CompositionConfig::default(),
        dir.join("temp"),
        dir.join("final.mp4"),
    );

    let outcome = assembler.assemble(&[]).await.unwrap();
    let manifest = dir.join("mock_final.mp4");
    assert_eq!(
        outcome,
        AssemblyOutcome::Manifest {
            path: manifest.clone(),
            clips: 0,
        }
    );
    assert!(backend.labels().is_empty());

    let text = std::fs::read_to_string(&manifest).unwrap();
    assert_eq!(
        text.lines().collect::<Vec<_>>(),
        vec!["Mock final video - FFmpeg required for actual composition"]
    );
    let _ = std::fs::remove_dir_all(&dir);
}

#[tokio::test]
async fn test_empty_clip_list_is_an_error() {
    let dir = scratch("empty");
    let assembler = SequenceAssembler::new(
        Arc::new(FakeBackend::new()),
        CompositionConfig::default(),
        dir.join("temp"),
        dir.join("final.mp4"),
    );
    assert!(matches!(
        assembler.assemble(&[]).await,
        Err(AssemblerError::NothingToAssemble)
    ));
    let _ = std::fs::remove_dir_all(&dir);
}

#[tokio::test]
async fn test_concat_failure_is_fatal() {
    let dir = scratch("concat_fail");
    let assembler = SequenceAssembler::new(
        Arc::new(FakeBackend::failing(&["concat"])),
        CompositionConfig::default(),
        dir.join("temp"),
        dir.join("final.mp4"),
    );
    let err = assembler.assemble(&clips(&dir, &[1])).await.unwrap_err();
    assert!(matches!(
        err,
        AssemblerError::Toolchain(ToolError::Failed { .. })
    ));
    let _ = std::fs::remove_dir_all(&dir);
}

#[tokio::test]
async fn test_background_music_is_mixed_in_place() {
    let dir = scratch("music");
    let music = dir.join("bed.mp3");
    std::fs::write(&music, b"music").unwrap();
    let backend = Arc::new(FakeBackend::new());
    let output = dir.join("final.mp4");
    let config = CompositionConfig {
        background_music: Some(music.clone()),
        ..CompositionConfig::default()
    };
    let assembler = SequenceAssembler::new(backend.clone(), config, dir.join("temp"), &output);

    let outcome = assembler.assemble(&clips(&dir, &[1, 2])).await.unwrap();
    assert!(matches!(
        outcome,
        AssemblyOutcome::Video {
            music_mixed: true,
            ..
        }
    ));
    assert_eq!(backend.labels(), vec!["concat", "music_mix"]);
    assert_eq!(std::fs::read_to_string(&output).unwrap(), "music_mix");
    let _ = std::fs::remove_dir_all(&dir);
}

#[tokio::test]
async fn test_music_failure_keeps_unmixed_video() {
    let dir = scratch("music_fail");
    let music = dir.join("bed.mp3");
    std::fs::write(&music, b"music").unwrap();
    let output = dir.join("final.mp4");
    let config = CompositionConfig {
        background_music: Some(music),
        ..CompositionConfig::default()
    };
    let assembler = SequenceAssembler::new(
        Arc::new(FakeBackend::failing(&["music_mix"])),
        config,
        dir.join("temp"),
        &output,
    );

    let outcome = assembler.assemble(&clips(&dir, &[1])).await.unwrap();
    assert!(matches!(
        outcome,
        AssemblyOutcome::Video {
            music_mixed: false,
            ..
        }
    ));
    assert_eq!(std::fs::read_to_string(&output).unwrap(), "concat");
    let _ = std::fs::remove_dir_all(&dir);
}
