//! Stage names and the upstream collaborator seams.

use pitchcast_commentary::{ChartRenderer, TemplateScriptWriter};
use pitchcast_match_model::{ChartPaths, MatchData, Segment};
use serde::{Deserialize, Serialize};

/// Boxed error from a stage collaborator.
pub type StageError = Box<dyn std::error::Error + Send + Sync>;

/// The four pipeline stages, in run order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Scripts,
    Charts,
    Jobs,
    Assembly,
}

impl Stage {
    pub const ALL: [Stage; 4] = [Stage::Scripts, Stage::Charts, Stage::Jobs, Stage::Assembly];

    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Scripts => "scripts",
            Stage::Charts => "charts",
            Stage::Jobs => "jobs",
            Stage::Assembly => "assembly",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Produces the ordered commentary segments for a match.
pub trait ScriptStage: Send + Sync {
    fn write_segments(&self, data: &MatchData) -> Result<Vec<Segment>, StageError>;
}

/// Produces chart images keyed by chart name.
pub trait ChartStage: Send + Sync {
    fn render_charts(&self, data: &MatchData) -> Result<ChartPaths, StageError>;
}

impl ScriptStage for TemplateScriptWriter {
    fn write_segments(&self, data: &MatchData) -> Result<Vec<Segment>, StageError> {
        Ok(self.timed_script(data))
    }
}

impl ChartStage for ChartRenderer {
    fn render_charts(&self, data: &MatchData) -> Result<ChartPaths, StageError> {
        Ok(self.render_all(data)?)
    }
}
