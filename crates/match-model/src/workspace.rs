//! On-disk layout of a run.
//!
//! ```text
//! <output_dir>/
//! ├── scripts.json          # {match_data, segments}
//! ├── chart_paths.json      # {chart_name: path}
//! ├── render_jobs.json      # submitted jobs
//! ├── avatar_videos.json    # ordered artifact list
//! ├── run_summary.json
//! ├── charts/
//! ├── avatar_videos/
//! └── temp_video_files/
//! ```
//!
//! Every stage reads its inputs from and writes its outputs to these fixed
//! file names, so any stage can be re-run on its own.

use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::artifact::{Artifact, ChartPaths};
use crate::job::RenderJob;
use crate::match_data::MatchData;
use crate::segment::{validate_segments, Segment};

pub const SCRIPTS_FILE: &str = "scripts.json";
pub const CHART_PATHS_FILE: &str = "chart_paths.json";
pub const RENDER_JOBS_FILE: &str = "render_jobs.json";
pub const ARTIFACTS_FILE: &str = "avatar_videos.json";
pub const SUMMARY_FILE: &str = "run_summary.json";

pub const CHARTS_DIR: &str = "charts";
pub const AVATAR_DIR: &str = "avatar_videos";
pub const TEMP_DIR: &str = "temp_video_files";

/// Output of the script stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScriptBundle {
    pub match_data: MatchData,
    pub segments: Vec<Segment>,
}

/// Handle to a run's working directory.
#[derive(Debug, Clone)]
pub struct RunWorkspace {
    root: PathBuf,
}

impl RunWorkspace {
    /// Open a workspace, creating the directory structure if needed.
    pub fn open(root: impl AsRef<Path>) -> Result<Self, WorkspaceError> {
        let root = root.as_ref().to_path_buf();
        for subdir in [CHARTS_DIR, AVATAR_DIR, TEMP_DIR] {
            let dir = root.join(subdir);
            std::fs::create_dir_all(&dir)
                .map_err(|e| WorkspaceError::IoError { path: dir, source: e })?;
        }
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn charts_dir(&self) -> PathBuf {
        self.root.join(CHARTS_DIR)
    }

    pub fn avatar_dir(&self) -> PathBuf {
        self.root.join(AVATAR_DIR)
    }

    pub fn temp_dir(&self) -> PathBuf {
        self.root.join(TEMP_DIR)
    }

    pub fn path(&self, file_name: &str) -> PathBuf {
        self.root.join(file_name)
    }

    pub fn save_scripts(&self, bundle: &ScriptBundle) -> Result<(), WorkspaceError> {
        validate_segments(&bundle.segments)?;
        self.write_json(SCRIPTS_FILE, bundle)
    }

    pub fn load_scripts(&self) -> Result<ScriptBundle, WorkspaceError> {
        let bundle: ScriptBundle = self.read_json(SCRIPTS_FILE)?;
        validate_segments(&bundle.segments)?;
        Ok(bundle)
    }

    pub fn save_chart_paths(&self, charts: &ChartPaths) -> Result<(), WorkspaceError> {
        self.write_json(CHART_PATHS_FILE, charts)
    }

    pub fn load_chart_paths(&self) -> Result<ChartPaths, WorkspaceError> {
        self.read_json(CHART_PATHS_FILE)
    }

    pub fn save_render_jobs(&self, jobs: &[RenderJob]) -> Result<(), WorkspaceError> {
        self.write_json(RENDER_JOBS_FILE, &jobs)
    }

    pub fn load_render_jobs(&self) -> Result<Vec<RenderJob>, WorkspaceError> {
        self.read_json(RENDER_JOBS_FILE)
    }

    pub fn save_artifacts(&self, artifacts: &[Artifact]) -> Result<(), WorkspaceError> {
        self.write_json(ARTIFACTS_FILE, &artifacts)
    }

    /// Load the artifact list sorted by segment id.
    pub fn load_artifacts(&self) -> Result<Vec<Artifact>, WorkspaceError> {
        let mut artifacts: Vec<Artifact> = self.read_json(ARTIFACTS_FILE)?;
        artifacts.sort_by_key(|a| a.segment_id);
        Ok(artifacts)
    }

    /// Serialize `value` as pretty JSON to `<root>/<file_name>`.
    pub fn write_json<T: Serialize + ?Sized>(
        &self,
        file_name: &str,
        value: &T,
    ) -> Result<(), WorkspaceError> {
        let path = self.path(file_name);
        let json = serde_json::to_string_pretty(value).map_err(|e| WorkspaceError::ParseError {
            path: path.clone(),
            source: e,
        })?;
        std::fs::write(&path, json).map_err(|e| WorkspaceError::IoError {
            path: path.clone(),
            source: e,
        })?;
        tracing::debug!(path = %path.display(), "Wrote workspace file");
        Ok(())
    }

    pub fn read_json<T: DeserializeOwned>(&self, file_name: &str) -> Result<T, WorkspaceError> {
        let path = self.path(file_name);
        if !path.exists() {
            return Err(WorkspaceError::Missing { path });
        }
        let json = std::fs::read_to_string(&path).map_err(|e| WorkspaceError::IoError {
            path: path.clone(),
            source: e,
        })?;
        serde_json::from_str(&json).map_err(|e| WorkspaceError::ParseError { path, source: e })
    }
}

/// Errors that can occur when reading or writing the run workspace.
#[derive(Debug, thiserror::Error)]
pub enum WorkspaceError {
    #[error("I/O error at {path}: {source}")]
    IoError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Parse error in {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Missing workspace file {path}; run the earlier stage first")]
    Missing { path: PathBuf },

    #[error("Invalid run data: {message}")]
    ValidationError { message: String },
}
