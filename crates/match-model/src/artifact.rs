//! Materialized per-segment results and chart images.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use pitchcast_common::config::ChartConfig;
use serde::{Deserialize, Serialize};

use crate::job::AvatarProvider;

/// Terminal outcome for one segment's avatar clip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Artifact {
    pub segment_id: u32,
    pub remote_job_id: String,
    pub provider: AvatarProvider,

    /// Local file; `None` when the artifact failed before anything was written.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_path: Option<PathBuf>,

    pub state: ArtifactState,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactState {
    Completed,
    Failed,
}

impl Artifact {
    pub fn completed(
        segment_id: u32,
        remote_job_id: impl Into<String>,
        provider: AvatarProvider,
        local_path: PathBuf,
    ) -> Self {
        Self {
            segment_id,
            remote_job_id: remote_job_id.into(),
            provider,
            local_path: Some(local_path),
            state: ArtifactState::Completed,
            error: None,
        }
    }

    pub fn failed(
        segment_id: u32,
        remote_job_id: impl Into<String>,
        provider: AvatarProvider,
        error: impl Into<String>,
    ) -> Self {
        Self {
            segment_id,
            remote_job_id: remote_job_id.into(),
            provider,
            local_path: None,
            state: ArtifactState::Failed,
            error: Some(error.into()),
        }
    }

    pub fn is_completed(&self) -> bool {
        self.state == ArtifactState::Completed && self.local_path.is_some()
    }
}

/// Chart images produced by the chart stage, keyed by chart name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChartPaths(pub BTreeMap<String, PathBuf>);

impl ChartPaths {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, path: PathBuf) {
        self.0.insert(name.into(), path);
    }

    pub fn get(&self, name: &str) -> Option<&Path> {
        self.0.get(name).map(PathBuf::as_path)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Overlay chart for a segment via the caller-supplied mapping.
    ///
    /// Returns `None` when the segment has no mapping, or when the mapped
    /// chart was not produced.
    pub fn for_segment(&self, segment_id: u32, mapping: &ChartConfig) -> Option<&Path> {
        mapping
            .segment_charts
            .get(&segment_id)
            .and_then(|name| self.get(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chart_lookup_follows_mapping() {
        let mut charts = ChartPaths::new();
        charts.insert("run_rate", PathBuf::from("charts/run_rate.png"));
        charts.insert("manhattan", PathBuf::from("charts/manhattan.png"));
        let mapping = ChartConfig::default();

        assert_eq!(
            charts.for_segment(1, &mapping),
            Some(Path::new("charts/run_rate.png"))
        );
        assert_eq!(charts.for_segment(2, &mapping), None);
        assert_eq!(
            charts.for_segment(3, &mapping),
            Some(Path::new("charts/manhattan.png"))
        );
    }

    #[test]
    fn test_mapped_but_missing_chart_is_none() {
        let charts = ChartPaths::new();
        assert!(charts.for_segment(1, &ChartConfig::default()).is_none());
    }

    #[test]
    fn test_chart_paths_serialize_as_flat_map() {
        let mut charts = ChartPaths::new();
        charts.insert("partnership", PathBuf::from("p.png"));
        let json = serde_json::to_string(&charts).unwrap();
        assert_eq!(json, r#"{"partnership":"p.png"}"#);
    }

    #[test]
    fn test_failed_artifact_has_no_path() {
        let a = Artifact::failed(2, "vid_2", AvatarProvider::HeyGen, "HTTP 404");
        assert!(!a.is_completed());
        assert_eq!(a.error.as_deref(), Some("HTTP 404"));
    }
}
