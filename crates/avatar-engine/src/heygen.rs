//! HeyGen talking-photo client.

use std::time::Duration;

use pitchcast_common::config::{AvatarProvider, HeyGenSettings};
use pitchcast_match_model::{JobState, JobStatus, RemoteState, RenderJob};
use serde::{Deserialize, Serialize};

use crate::client::{http_client, read_json, RenderClient};
use crate::error::ProviderError;

/// Client for the HeyGen video generation API.
#[derive(Clone)]
pub struct HeyGenClient {
    http: reqwest::Client,
    api_key: String,
    settings: HeyGenSettings,
}

impl std::fmt::Debug for HeyGenClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HeyGenClient")
            .field("base_url", &self.settings.base_url)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    video_inputs: Vec<VideoInput<'a>>,
    dimension: Dimension,
}

#[derive(Debug, Serialize)]
struct VideoInput<'a> {
    character: Character<'a>,
    voice: Voice<'a>,
}

#[derive(Debug, Serialize)]
struct Character<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    talking_photo_id: &'a str,
}

#[derive(Debug, Serialize)]
struct Voice<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    input_text: &'a str,
    voice_id: &'a str,
}

#[derive(Debug, Serialize)]
struct Dimension {
    width: u32,
    height: u32,
}

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    data: Option<T>,
}

#[derive(Debug, Deserialize)]
struct GenerateData {
    video_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StatusData {
    status: Option<String>,
    video_url: Option<String>,
}

impl HeyGenClient {
    pub fn new(
        api_key: impl Into<String>,
        settings: HeyGenSettings,
        timeout: Duration,
    ) -> Result<Self, ProviderError> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(ProviderError::MissingApiKey {
                provider: "heygen".to_string(),
            });
        }
        Ok(Self {
            http: http_client(timeout)?,
            api_key,
            settings,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.settings.base_url.trim_end_matches('/'), path)
    }

    fn payload<'a>(&'a self, script: &'a str) -> GenerateRequest<'a> {
        GenerateRequest {
            video_inputs: vec![VideoInput {
                character: Character {
                    kind: "talking_photo",
                    talking_photo_id: &self.settings.talking_photo_id,
                },
                voice: Voice {
                    kind: "text",
                    input_text: script,
                    voice_id: &self.settings.voice_id,
                },
            }],
            dimension: Dimension {
                width: self.settings.width,
                height: self.settings.height,
            },
        }
    }
}

#[async_trait::async_trait]
impl RenderClient for HeyGenClient {
    fn provider(&self) -> AvatarProvider {
        AvatarProvider::HeyGen
    }

    async fn submit(&self, script: &str, segment_id: u32) -> Result<RenderJob, ProviderError> {
        let response = self
            .http
            .post(self.url("/v2/video/generate"))
            .header("x-api-key", &self.api_key)
            .header("accept", "application/json")
            .json(&self.payload(script))
            .send()
            .await?;

        let envelope: Envelope<GenerateData> = read_json(response).await?;
        let video_id = envelope
            .data
            .and_then(|d| d.video_id)
            .filter(|id| !id.is_empty())
            .ok_or_else(|| ProviderError::Malformed("missing data.video_id".to_string()))?;

        tracing::info!(segment_id, job_id = %video_id, provider = "heygen", "Render job submitted");
        Ok(RenderJob {
            segment_id,
            provider: AvatarProvider::HeyGen,
            remote_job_id: video_id,
            state: JobState::Processing,
            content_locator: None,
            estimated_duration_secs: None,
        })
    }

    async fn poll(&self, remote_job_id: &str) -> Result<JobStatus, ProviderError> {
        let response = self
            .http
            .get(self.url("/v1/video_status.get"))
            .header("x-api-key", &self.api_key)
            .query(&[("video_id", remote_job_id)])
            .send()
            .await?;

        let envelope: Envelope<StatusData> = read_json(response).await?;
        let data = envelope
            .data
            .ok_or_else(|| ProviderError::Malformed("missing data".to_string()))?;
        let status = data
            .status
            .ok_or_else(|| ProviderError::Malformed("missing data.status".to_string()))?;

        Ok(JobStatus::new(RemoteState::from_provider(&status), data.video_url))
    }
}
