//! Commentary segments.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::workspace::WorkspaceError;

/// One timed unit of the output video.
///
/// Created once per run by the script stage and immutable afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    /// Unique id; defines the order of the final video.
    pub id: u32,

    #[serde(rename = "type")]
    pub kind: SegmentKind,

    /// Position in the programme ("HH:MM:SS").
    #[serde(default)]
    pub timestamp: String,

    /// Planned length in seconds.
    #[serde(default, rename = "duration")]
    pub duration_secs: f64,

    /// Text the avatar speaks.
    pub script: String,

    #[serde(rename = "visual")]
    pub visual_hint: VisualHint,
}

/// What a segment talks about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SegmentKind {
    Summary,
    KeyMoment,
    Statistics,
}

/// Visual treatment the script stage suggests for a segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VisualHint {
    Scoreboard,
    HighlightReplay,
    Charts,
}

impl SegmentKind {
    /// On-screen title used for lower thirds.
    pub fn title(&self) -> &'static str {
        match self {
            SegmentKind::Summary => "MATCH SUMMARY",
            SegmentKind::KeyMoment => "KEY MOMENT",
            SegmentKind::Statistics => "BY THE NUMBERS",
        }
    }
}

impl Segment {
    /// Number of whitespace-separated words in the script.
    pub fn word_count(&self) -> usize {
        self.script.split_whitespace().count()
    }
}

/// Check that a segment list is non-empty and ids are unique.
pub fn validate_segments(segments: &[Segment]) -> Result<(), WorkspaceError> {
    if segments.is_empty() {
        return Err(WorkspaceError::ValidationError {
            message: "segment list is empty".to_string(),
        });
    }

    let mut seen = BTreeSet::new();
    for segment in segments {
        if !seen.insert(segment.id) {
            return Err(WorkspaceError::ValidationError {
                message: format!("duplicate segment id {}", segment.id),
            });
        }
    }
    Ok(())
}

/// Format whole seconds as `HH:MM:SS`.
pub fn format_timestamp(total_secs: u32) -> String {
    format!(
        "{:02}:{:02}:{:02}",
        total_secs / 3600,
        (total_secs / 60) % 60,
        total_secs % 60
    )
}
