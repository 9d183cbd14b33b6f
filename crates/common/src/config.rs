//! Application configuration.
//!
//! The configuration is built once at startup, frozen behind an `Arc`, and
//! handed to every component constructor. Nothing reads the environment or
//! the config file after that point.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{PitchcastError, PitchcastResult};

/// Global application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Working directory for intermediate state and the final output.
    pub output_dir: PathBuf,

    /// File name of the final video inside `output_dir`.
    pub output_filename: String,

    /// Avatar provider settings.
    pub avatar: AvatarConfig,

    /// Job polling budget.
    pub polling: PollingConfig,

    /// Media composition settings.
    pub composition: CompositionConfig,

    /// Segment to chart mapping.
    pub charts: ChartConfig,

    /// Logging configuration.
    pub logging: LoggingConfig,
}

/// Which remote avatar provider renders the segment clips.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AvatarProvider {
    #[serde(rename = "heygen")]
    HeyGen,
    #[serde(rename = "d-id")]
    DId,
    /// Deterministic no-network variant.
    #[serde(rename = "offline")]
    Offline,
}

impl AvatarProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            AvatarProvider::HeyGen => "heygen",
            AvatarProvider::DId => "d-id",
            AvatarProvider::Offline => "offline",
        }
    }

    /// Whether jobs from this provider are synthesized locally.
    pub fn is_synthetic(&self) -> bool {
        matches!(self, AvatarProvider::Offline)
    }

    pub fn parse(raw: &str) -> PitchcastResult<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "heygen" => Ok(AvatarProvider::HeyGen),
            "d-id" | "did" => Ok(AvatarProvider::DId),
            "offline" | "mock" => Ok(AvatarProvider::Offline),
            other => Err(PitchcastError::config(format!(
                "Unknown avatar provider: {other}. Use: heygen, d-id, offline"
            ))),
        }
    }
}

impl std::fmt::Display for AvatarProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Avatar provider configuration.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AvatarConfig {
    /// Selected provider.
    pub provider: AvatarProvider,

    /// API key for the selected provider. Without one, submissions are
    /// synthesized offline.
    pub api_key: Option<String>,

    /// HeyGen request settings.
    pub heygen: HeyGenSettings,

    /// D-ID request settings.
    pub did: DIdSettings,

    /// Timeout for submit and status requests.
    pub request_timeout_secs: u64,

    /// Timeout for downloading a finished clip.
    pub download_timeout_secs: u64,

    /// Minimum gap between consecutive live submissions.
    pub submit_delay_secs: f64,
}

impl std::fmt::Debug for AvatarConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AvatarConfig")
            .field("provider", &self.provider)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("heygen", &self.heygen)
            .field("did", &self.did)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("download_timeout_secs", &self.download_timeout_secs)
            .field("submit_delay_secs", &self.submit_delay_secs)
            .finish()
    }
}

/// HeyGen (provider A) request settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HeyGenSettings {
    pub base_url: String,
    pub talking_photo_id: String,
    pub voice_id: String,
    pub width: u32,
    pub height: u32,
}

/// D-ID (provider B) request settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DIdSettings {
    pub base_url: String,
    pub presenter_id: String,
    pub voice_id: String,
}

/// Polling budget for remote render jobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PollingConfig {
    /// Maximum number of poll rounds before pending jobs time out.
    pub max_rounds: u32,

    /// Interval between round starts.
    pub interval_secs: f64,
}

/// Media composition settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CompositionConfig {
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    pub video_codec: String,
    pub audio_codec: String,

    /// Fade-in and fade-out length applied to every composed clip.
    pub fade_secs: f64,

    /// Length of the video rendered from a static chart image.
    pub chart_clip_secs: f64,

    /// Picture-in-picture overlay size and placement.
    pub pip_width: u32,
    pub pip_height: u32,
    pub pip_corner: OverlayCorner,
    pub pip_margin: u32,

    /// Burn a title for the segment kind into each clip.
    pub lower_thirds: bool,

    /// Optional music bed mixed under the final video.
    pub background_music: Option<PathBuf>,

    /// Music volume relative to the commentary track.
    pub music_volume: f64,

    /// Per-invocation toolchain timeouts.
    pub timeouts: ToolTimeouts,
}

/// Corner placement for the chart overlay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum OverlayCorner {
    TopLeft,
    TopRight,
    BottomLeft,
    #[default]
    BottomRight,
}

/// Timeouts (seconds) for each kind of toolchain invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolTimeouts {
    pub probe_secs: u64,
    pub ffprobe_secs: u64,
    pub image_video_secs: u64,
    pub fade_secs: u64,
    pub lower_third_secs: u64,
    pub overlay_secs: u64,
    pub concat_secs: u64,
    pub mix_secs: u64,
}

/// Which chart overlays which segment.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChartConfig {
    /// Segment id to chart name. Segments absent from the map get no overlay.
    pub segment_charts: BTreeMap<u32, String>,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "pitchcast=debug,warn").
    pub level: String,

    /// Whether to output structured JSON logs.
    pub json: bool,

    /// Optional log file path.
    pub file: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("cricket_output"),
            output_filename: "cricket_commentary_final.mp4".to_string(),
            avatar: AvatarConfig::default(),
            polling: PollingConfig::default(),
            composition: CompositionConfig::default(),
            charts: ChartConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for AvatarConfig {
    fn default() -> Self {
        Self {
            provider: AvatarProvider::HeyGen,
            api_key: None,
            heygen: HeyGenSettings::default(),
            did: DIdSettings::default(),
            request_timeout_secs: 30,
            download_timeout_secs: 60,
            submit_delay_secs: 1.0,
        }
    }
}

impl Default for HeyGenSettings {
    fn default() -> Self {
        Self {
            base_url: "https://api.heygen.com".to_string(),
            talking_photo_id: "7ae960f017754f06ac14ad8c9579c839".to_string(),
            voice_id: "2b5a8ab8a0a74166a031d6eda4321600".to_string(),
            width: 1280,
            height: 720,
        }
    }
}

impl Default for DIdSettings {
    fn default() -> Self {
        Self {
            base_url: "https://api.d-id.com".to_string(),
            presenter_id: "amy-Aq6OmGZnMt".to_string(),
            voice_id: "en-US-JennyNeural".to_string(),
        }
    }
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            max_rounds: 60,
            interval_secs: 5.0,
        }
    }
}

impl Default for CompositionConfig {
    fn default() -> Self {
        Self {
            width: 1920,
            height: 1080,
            fps: 30,
            video_codec: "libx264".to_string(),
            audio_codec: "aac".to_string(),
            fade_secs: 0.5,
            chart_clip_secs: 8.0,
            pip_width: 640,
            pip_height: 360,
            pip_corner: OverlayCorner::BottomRight,
            pip_margin: 20,
            lower_thirds: false,
            background_music: None,
            music_volume: 0.2,
            timeouts: ToolTimeouts::default(),
        }
    }
}

impl Default for ToolTimeouts {
    fn default() -> Self {
        Self {
            probe_secs: 5,
            ffprobe_secs: 10,
            image_video_secs: 60,
            fade_secs: 60,
            lower_third_secs: 60,
            overlay_secs: 120,
            concat_secs: 180,
            mix_secs: 180,
        }
    }
}

impl Default for ChartConfig {
    fn default() -> Self {
        let mut segment_charts = BTreeMap::new();
        segment_charts.insert(1, "run_rate".to_string());
        segment_charts.insert(3, "manhattan".to_string());
        Self { segment_charts }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
            file: None,
        }
    }
}

impl AppConfig {
    /// Load config from the standard location, falling back to defaults.
    pub fn load() -> Self {
        let config_path = config_file_path();
        if config_path.exists() {
            match Self::load_from(&config_path) {
                Ok(config) => return config,
                Err(e) => {
                    tracing::warn!("Failed to load config at {:?}: {}", config_path, e);
                }
            }
        }
        Self::default()
    }

    /// Load config from an explicit path. Unlike [`AppConfig::load`], a
    /// missing or malformed file is an error.
    pub fn load_from(path: &Path) -> PitchcastResult<Self> {
        if !path.exists() {
            return Err(PitchcastError::FileNotFound {
                path: path.to_path_buf(),
            });
        }
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content).map_err(|e| {
            PitchcastError::config(format!("Failed to parse {}: {e}", path.display()))
        })
    }

    /// Save config to the standard location.
    pub fn save(&self) -> PitchcastResult<()> {
        self.save_to(&config_file_path())
    }

    pub fn save_to(&self, path: &Path) -> PitchcastResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Pick up provider API keys from the process environment.
    ///
    /// `HEYGEN_API_KEY` wins over `DID_API_KEY`; whichever is found also
    /// selects its provider.
    pub fn with_env_overrides(self) -> Self {
        self.with_api_keys(
            std::env::var("HEYGEN_API_KEY").ok(),
            std::env::var("DID_API_KEY").ok(),
        )
    }

    fn with_api_keys(mut self, heygen: Option<String>, did: Option<String>) -> Self {
        let heygen = heygen.filter(|key| !key.trim().is_empty());
        let did = did.filter(|key| !key.trim().is_empty());
        if let Some(key) = heygen {
            self.avatar.api_key = Some(key);
            self.avatar.provider = AvatarProvider::HeyGen;
        } else if let Some(key) = did {
            self.avatar.api_key = Some(key);
            self.avatar.provider = AvatarProvider::DId;
        }
        self
    }

    /// Full path of the final video.
    pub fn output_path(&self) -> PathBuf {
        self.output_dir.join(&self.output_filename)
    }
}

/// Standard config file location.
fn config_file_path() -> PathBuf {
    let base = std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".config")
        });
    base.join("pitchcast").join("config.json")
}
