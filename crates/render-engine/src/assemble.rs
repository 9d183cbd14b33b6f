//! Sequence assembler.
//!
//! Concatenates composed clips into the final video with the concat demuxer
//! and stream copy. The input order is authoritative: callers pass clips
//! already sorted by segment id and the assembler never reorders them.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use pitchcast_common::config::CompositionConfig;
use serde::{Deserialize, Serialize};

use crate::compose::ComposedClip;
use crate::effects;
use crate::toolchain::{MediaBackend, ToolError, ToolInvocation};

pub const CONCAT_LIST_FILE: &str = "concat_list.txt";

/// What the assembly step produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AssemblyOutcome {
    /// A real concatenated video.
    Video {
        path: PathBuf,
        clips: usize,
        music_mixed: bool,
    },

    /// Placeholder listing the intended inputs; the toolchain was missing.
    Manifest { path: PathBuf, clips: usize },
}

impl AssemblyOutcome {
    pub fn path(&self) -> &Path {
        match self {
            AssemblyOutcome::Video { path, .. } | AssemblyOutcome::Manifest { path, .. } => path,
        }
    }

    pub fn is_placeholder(&self) -> bool {
        matches!(self, AssemblyOutcome::Manifest { .. })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AssemblerError {
    #[error("No clips to assemble")]
    NothingToAssemble,

    #[error("Concatenation failed: {0}")]
    Toolchain(#[from] ToolError),

    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

pub struct SequenceAssembler {
    backend: Arc<dyn MediaBackend>,
    config: CompositionConfig,
    temp_dir: PathBuf,
    output_path: PathBuf,
}

impl SequenceAssembler {
    pub fn new(
        backend: Arc<dyn MediaBackend>,
        config: CompositionConfig,
        temp_dir: impl Into<PathBuf>,
        output_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            backend,
            config,
            temp_dir: temp_dir.into(),
            output_path: output_path.into(),
        }
    }

    /// Path of the placeholder written when the toolchain is missing.
    pub fn manifest_path(&self) -> PathBuf {
        let name = self
            .output_path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "output.mp4".to_string());
        self.output_path.with_file_name(format!("mock_{name}"))
    }

    /// Probe the toolchain, then assemble.
    pub async fn assemble(&self, clips: &[ComposedClip]) -> Result<AssemblyOutcome, AssemblerError> {
        let available = self.backend.is_available().await;
        self.assemble_with(clips, available).await
    }

    /// Assemble using an earlier toolchain probe result.
    pub async fn assemble_with(
        &self,
        clips: &[ComposedClip],
        toolchain_available: bool,
    ) -> Result<AssemblyOutcome, AssemblerError> {
        if let Some(parent) = self.output_path.parent() {
            create_dir(parent)?;
        }

        if !toolchain_available {
            let path = self.write_manifest(clips)?;
            tracing::warn!(
                path = %path.display(),
                clips = clips.len(),
                "ffmpeg unavailable; wrote placeholder manifest"
            );
            return Ok(AssemblyOutcome::Manifest {
                path,
                clips: clips.len(),
            });
        }
        if clips.is_empty() {
            return Err(AssemblerError::NothingToAssemble);
        }

        create_dir(&self.temp_dir)?;
        let list_path = self.temp_dir.join(CONCAT_LIST_FILE);
        let list = concat_list(clips).map_err(|e| AssemblerError::Io {
            path: list_path.clone(),
            source: e,
        })?;
        std::fs::write(&list_path, list).map_err(|e| AssemblerError::Io {
            path: list_path.clone(),
            source: e,
        })?;

        let invocation = ToolInvocation::ffmpeg("concat", self.config.timeouts.concat_secs)
            .args(["-f", "concat", "-safe", "0", "-i"])
            .path(&list_path)
            .args(["-c", "copy", "-y"])
            .path(&self.output_path);
        self.backend.run(&invocation).await?;

        let music_mixed = self.mix_music().await;
        tracing::info!(
            path = %self.output_path.display(),
            clips = clips.len(),
            music_mixed,
            "Final video assembled"
        );
        Ok(AssemblyOutcome::Video {
            path: self.output_path.clone(),
            clips: clips.len(),
            music_mixed,
        })
    }

    /// Mix configured background music into the output in place.
    /// Keeps the unmixed video on any failure.
    async fn mix_music(&self) -> bool {
        let Some(music) = self.config.background_music.as_deref() else {
            return false;
        };
        if !music.exists() {
            tracing::warn!(path = %music.display(), "Background music file missing; skipping mix");
            return false;
        }

        let mixed = self.temp_dir.join("final_with_music.mp4");
        let result = effects::mix_background_music(
            self.backend.as_ref(),
            &self.config,
            &self.output_path,
            music,
            &mixed,
        )
        .await;

        match result {
            Ok(_) => match std::fs::rename(&mixed, &self.output_path) {
                Ok(()) => true,
                Err(e) => {
                    tracing::warn!(error = %e, "Could not replace output with mixed video");
                    false
                }
            },
            Err(e) => {
                tracing::warn!(error = %e, "Background music mix failed; keeping unmixed video");
                false
            }
        }
    }

    fn write_manifest(&self, clips: &[ComposedClip]) -> Result<PathBuf, AssemblerError> {
        let path = self.manifest_path();
        let mut text = String::from("Mock final video - FFmpeg required for actual composition\n");
        for clip in clips {
            let _ = writeln!(text, "Segment {}: {}", clip.segment_id, clip.path.display());
        }
        std::fs::write(&path, text).map_err(|e| AssemblerError::Io {
            path: path.clone(),
            source: e,
        })?;
        Ok(path)
    }
}

/// Concat demuxer list, one `file '<absolute path>'` line per clip, in order.
pub fn concat_list(clips: &[ComposedClip]) -> std::io::Result<String> {
    let mut list = String::new();
    for clip in clips {
        let path = absolute(&clip.path)?;
        let quoted = path.to_string_lossy().replace('\'', "'\\''");
        let _ = writeln!(list, "file '{quoted}'");
    }
    Ok(list)
}

fn absolute(path: &Path) -> std::io::Result<PathBuf> {
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        Ok(std::env::current_dir()?.join(path))
    }
}

fn create_dir(dir: &Path) -> Result<(), AssemblerError> {
    if dir.as_os_str().is_empty() {
        return Ok(());
    }
    std::fs::create_dir_all(dir).map_err(|e| AssemblerError::Io {
        path: dir.to_path_buf(),
        source: e,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_concat_list_keeps_input_order() {
        let clips = vec![
            ComposedClip::passthrough(3, "/v/c.mp4"),
            ComposedClip::passthrough(1, "/v/a.mp4"),
            ComposedClip::passthrough(2, "/v/b.mp4"),
        ];
        assert_eq!(
            concat_list(&clips).unwrap(),
            "file '/v/c.mp4'\nfile '/v/a.mp4'\nfile '/v/b.mp4'\n"
        );
    }

    #[test]
    fn test_concat_list_escapes_quotes_and_absolutizes() {
        let clips = vec![
            ComposedClip::passthrough(1, "/v/it's.mp4"),
            ComposedClip::passthrough(2, "rel/clip.mp4"),
        ];
        let list = concat_list(&clips).unwrap();
        let mut lines = list.lines();
        assert_eq!(lines.next().unwrap(), "file '/v/it'\\''s.mp4'");
        let second = lines.next().unwrap();
        assert!(second.starts_with("file '/"));
        assert!(second.ends_with("rel/clip.mp4'"));
    }

    #[test]
    fn test_manifest_path_prefixes_output_name() {
        struct Never;
        #[async_trait::async_trait]
        impl MediaBackend for Never {
            fn name(&self) -> &str {
                "never"
            }
            async fn is_available(&self) -> bool {
                false
            }
            async fn run(
                &self,
                _invocation: &ToolInvocation,
            ) -> Result<crate::toolchain::ToolOutput, ToolError> {
                unreachable!()
            }
        }

        let assembler = SequenceAssembler::new(
            Arc::new(Never),
            CompositionConfig::default(),
            "/out/temp_video_files",
            "/out/final.mp4",
        );
        assert_eq!(assembler.manifest_path(), PathBuf::from("/out/mock_final.mp4"));
    }

    #[test]
    fn test_outcome_serializes_with_kind_tag() {
        let outcome = AssemblyOutcome::Manifest {
            path: PathBuf::from("mock_final.mp4"),
            clips: 3,
        };
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["kind"], "manifest");
        assert_eq!(json["clips"], 3);
        assert!(outcome.is_placeholder());
    }
}
