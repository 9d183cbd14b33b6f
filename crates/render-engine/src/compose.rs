//! Segment composer.
//!
//! Builds one finished clip per segment from its avatar clip and optional
//! chart overlay. Composition never fails: each step that goes wrong leaves
//! the best clip produced so far.
//!
//! | Step            | On failure                    |
//! |-----------------|-------------------------------|
//! | chart → video   | return the avatar clip        |
//! | picture-in-pic. | return the avatar clip        |
//! | lower third     | continue with the untitled clip |
//! | fade in/out     | return the clip before fading |

use std::path::{Path, PathBuf};
use std::sync::Arc;

use pitchcast_common::config::CompositionConfig;
use serde::{Deserialize, Serialize};

use crate::effects;
use crate::toolchain::MediaBackend;

/// Result of composing one segment. Always names exactly one file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComposedClip {
    pub segment_id: u32,
    pub path: PathBuf,

    /// A chart picture-in-picture was applied.
    pub overlay: bool,

    /// A lower-third caption was burned in.
    pub titled: bool,

    /// Fade transitions were applied.
    pub faded: bool,
}

impl ComposedClip {
    /// A clip used as-is, with no transforms applied.
    pub fn passthrough(segment_id: u32, path: impl Into<PathBuf>) -> Self {
        Self {
            segment_id,
            path: path.into(),
            overlay: false,
            titled: false,
            faded: false,
        }
    }
}

pub struct SegmentComposer {
    backend: Arc<dyn MediaBackend>,
    config: CompositionConfig,
    temp_dir: PathBuf,
}

impl SegmentComposer {
    /// Create a composer writing intermediates to `temp_dir`, creating it if needed.
    pub fn new(
        backend: Arc<dyn MediaBackend>,
        config: CompositionConfig,
        temp_dir: impl AsRef<Path>,
    ) -> std::io::Result<Self> {
        let temp_dir = temp_dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&temp_dir)?;
        Ok(Self {
            backend,
            config,
            temp_dir,
        })
    }

    fn temp(&self, stem: &str, segment_id: u32) -> PathBuf {
        self.temp_dir.join(format!("{stem}_{segment_id}.mp4"))
    }

    /// Compose one segment.
    ///
    /// `title` is burned in as a lower third only when lower thirds are
    /// enabled in the composition config.
    pub async fn compose(
        &self,
        segment_id: u32,
        avatar: &Path,
        overlay: Option<&Path>,
        title: Option<&str>,
    ) -> ComposedClip {
        let backend = self.backend.as_ref();
        let mut clip = ComposedClip::passthrough(segment_id, avatar);

        if let Some(chart) = overlay {
            let chart_video = self.temp("chart_video", segment_id);
            if let Err(e) = effects::image_to_video(
                backend,
                &self.config,
                chart,
                self.config.chart_clip_secs,
                &chart_video,
            )
            .await
            {
                tracing::warn!(segment_id, error = %e, "Chart video failed; using plain avatar clip");
                return clip;
            }

            let pip = self.temp("pip_segment", segment_id);
            match effects::picture_in_picture(backend, &self.config, avatar, &chart_video, &pip)
                .await
            {
                Ok(path) => {
                    clip.path = path;
                    clip.overlay = true;
                }
                Err(e) => {
                    tracing::warn!(segment_id, error = %e, "Picture-in-picture failed; using plain avatar clip");
                    return clip;
                }
            }
        }

        if let Some(text) = title.filter(|_| self.config.lower_thirds) {
            let titled = self.temp("titled_segment", segment_id);
            match effects::lower_third(backend, &self.config, &clip.path, text, &titled).await {
                Ok(path) => {
                    clip.path = path;
                    clip.titled = true;
                }
                Err(e) => {
                    tracing::warn!(segment_id, error = %e, "Lower third failed; keeping untitled clip");
                }
            }
        }

        let faded = self.temp("composed_segment", segment_id);
        match effects::fade_in_out(backend, &self.config, &clip.path, &faded).await {
            Ok(path) => {
                clip.path = path;
                clip.faded = true;
            }
            Err(e) => {
                tracing::warn!(segment_id, error = %e, "Fade failed; keeping clip without transitions");
            }
        }

        tracing::info!(
            segment_id,
            overlay = clip.overlay,
            titled = clip.titled,
            faded = clip.faded,
            path = %clip.path.display(),
            "Segment composed"
        );
        clip
    }
}
