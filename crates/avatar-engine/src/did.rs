//! D-ID talks client.

use std::time::Duration;

use pitchcast_common::config::{AvatarProvider, DIdSettings};
use pitchcast_match_model::{JobState, JobStatus, RemoteState, RenderJob};
use serde::{Deserialize, Serialize};

use crate::client::{http_client, read_json, RenderClient};
use crate::error::ProviderError;

const PRESENTER_IMAGE_BASE: &str = "https://create-images-results.d-id.com/DefaultPresenters";

/// Client for the D-ID talks API. Authenticates with a Basic token.
#[derive(Clone)]
pub struct DIdClient {
    http: reqwest::Client,
    api_key: String,
    settings: DIdSettings,
}

impl std::fmt::Debug for DIdClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DIdClient")
            .field("base_url", &self.settings.base_url)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Serialize)]
struct TalkRequest<'a> {
    script: Script<'a>,
    config: TalkConfig,
    source_url: String,
}

#[derive(Debug, Serialize)]
struct Script<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    input: &'a str,
    provider: VoiceProvider<'a>,
}

#[derive(Debug, Serialize)]
struct VoiceProvider<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    voice_id: &'a str,
}

#[derive(Debug, Serialize)]
struct TalkConfig {
    fluent: bool,
    pad_audio: u32,
}

#[derive(Debug, Deserialize)]
struct TalkCreated {
    id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TalkStatus {
    status: Option<String>,
    result_url: Option<String>,
}

impl DIdClient {
    pub fn new(
        api_key: impl Into<String>,
        settings: DIdSettings,
        timeout: Duration,
    ) -> Result<Self, ProviderError> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(ProviderError::MissingApiKey {
                provider: "d-id".to_string(),
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

    fn authorization(&self) -> String {
        format!("Basic {}", self.api_key)
    }

    fn payload<'a>(&'a self, script: &'a str) -> TalkRequest<'a> {
        TalkRequest {
            script: Script {
                kind: "text",
                input: script,
                provider: VoiceProvider {
                    kind: "microsoft",
                    voice_id: &self.settings.voice_id,
                },
            },
            config: TalkConfig {
                fluent: true,
                pad_audio: 0,
            },
            source_url: format!(
                "{PRESENTER_IMAGE_BASE}/{}/image.png",
                self.settings.presenter_id
            ),
        }
    }
}

#[async_trait::async_trait]
impl RenderClient for DIdClient {
    fn provider(&self) -> AvatarProvider {
        AvatarProvider::DId
    }

    async fn submit(&self, script: &str, segment_id: u32) -> Result<RenderJob, ProviderError> {
        let response = self
            .http
            .post(self.url("/talks"))
            .header("Authorization", self.authorization())
            .json(&self.payload(script))
            .send()
            .await?;

        let created: TalkCreated = read_json(response).await?;
        let talk_id = created
            .id
            .filter(|id| !id.is_empty())
            .ok_or_else(|| ProviderError::Malformed("missing id".to_string()))?;

        tracing::info!(segment_id, job_id = %talk_id, provider = "d-id", "Render job submitted");
        Ok(RenderJob {
            segment_id,
            provider: AvatarProvider::DId,
            remote_job_id: talk_id,
            state: JobState::Processing,
            content_locator: None,
            estimated_duration_secs: None,
        })
    }

    async fn poll(&self, remote_job_id: &str) -> Result<JobStatus, ProviderError> {
        let response = self
            .http
            .get(self.url(&format!("/talks/{remote_job_id}")))
            .header("Authorization", self.authorization())
            .send()
            .await?;

        let talk: TalkStatus = read_json(response).await?;
        let status = talk
            .status
            .ok_or_else(|| ProviderError::Malformed("missing status".to_string()))?;

        Ok(JobStatus::new(RemoteState::from_provider(&status), talk.result_url))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_shape() {
        let client = DIdClient::new("k", DIdSettings::default(), Duration::from_secs(1)).unwrap();
        let json = serde_json::to_value(client.payload("What a shot")).unwrap();

        assert_eq!(json["script"]["type"], "text");
        assert_eq!(json["script"]["input"], "What a shot");
        assert_eq!(json["script"]["provider"]["type"], "microsoft");
        assert_eq!(json["script"]["provider"]["voice_id"], "en-US-JennyNeural");
        assert_eq!(json["config"]["fluent"], true);
        assert_eq!(json["config"]["pad_audio"], 0);
        assert_eq!(
            json["source_url"],
            "https://create-images-results.d-id.com/DefaultPresenters/amy-Aq6OmGZnMt/image.png"
        );
    }

    #[test]
    fn test_basic_authorization() {
        let client = DIdClient::new("dXNlcjpwYXNz", DIdSettings::default(), Duration::from_secs(1))
            .unwrap();
        assert_eq!(client.authorization(), "Basic dXNlcjpwYXNz");
    }
}
