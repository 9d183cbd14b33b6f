//! Remote render client capability and provider selection.

use std::sync::Arc;
use std::time::Duration;

use pitchcast_common::clock::Clock;
use pitchcast_common::config::{AvatarConfig, AvatarProvider};
use pitchcast_match_model::{JobStatus, RenderJob};
use serde::de::DeserializeOwned;

use crate::did::DIdClient;
use crate::error::ProviderError;
use crate::heygen::HeyGenClient;
use crate::offline::OfflineClient;

/// Submit render jobs and query their status.
#[async_trait::async_trait]
pub trait RenderClient: Send + Sync {
    /// Provider whose jobs this client can poll.
    fn provider(&self) -> AvatarProvider;

    /// Submit a render job for one segment's script.
    async fn submit(&self, script: &str, segment_id: u32) -> Result<RenderJob, ProviderError>;

    /// Query the current status of a submitted job.
    async fn poll(&self, remote_job_id: &str) -> Result<JobStatus, ProviderError>;
}

/// The closed set of render providers.
#[derive(Debug, Clone)]
pub enum ProviderClient {
    HeyGen(HeyGenClient),
    DId(DIdClient),
    Offline,
}

/// Render client for the configured provider with offline degradation.
///
/// `submit` never fails: any provider error turns into a synthetic job
/// tagged [`AvatarProvider::Offline`].
#[derive(Debug, Clone)]
pub struct AvatarClient {
    inner: ProviderClient,
    offline: OfflineClient,
}

impl AvatarClient {
    /// Build the client for `config.provider`.
    ///
    /// A live provider without an API key falls back to offline mode.
    pub fn from_config(config: &AvatarConfig, clock: Arc<dyn Clock>) -> Result<Self, ProviderError> {
        let offline = OfflineClient::new(clock);
        let timeout = Duration::from_secs(config.request_timeout_secs);

        let key = config.api_key.as_deref().filter(|k| !k.trim().is_empty());
        let inner = match (config.provider, key) {
            (AvatarProvider::Offline, _) => ProviderClient::Offline,
            (provider, None) => {
                tracing::warn!(%provider, "No API key provided; using offline avatar clips");
                ProviderClient::Offline
            }
            (AvatarProvider::HeyGen, Some(key)) => {
                ProviderClient::HeyGen(HeyGenClient::new(key, config.heygen.clone(), timeout)?)
            }
            (AvatarProvider::DId, Some(key)) => {
                ProviderClient::DId(DIdClient::new(key, config.did.clone(), timeout)?)
            }
        };

        tracing::info!(provider = %provider_of(&inner), "Avatar client ready");
        Ok(Self { inner, offline })
    }

    pub fn offline(clock: Arc<dyn Clock>) -> Self {
        Self {
            inner: ProviderClient::Offline,
            offline: OfflineClient::new(clock),
        }
    }

    pub fn inner(&self) -> &ProviderClient {
        &self.inner
    }

    fn degrade(&self, script: &str, segment_id: u32, error: &ProviderError) -> RenderJob {
        tracing::warn!(
            segment_id,
            provider = %self.provider(),
            error = %error,
            "Avatar submission failed; using offline clip"
        );
        self.offline.synthesize(script, segment_id)
    }
}

fn provider_of(inner: &ProviderClient) -> AvatarProvider {
    match inner {
        ProviderClient::HeyGen(_) => AvatarProvider::HeyGen,
        ProviderClient::DId(_) => AvatarProvider::DId,
        ProviderClient::Offline => AvatarProvider::Offline,
    }
}

#[async_trait::async_trait]
impl RenderClient for AvatarClient {
    fn provider(&self) -> AvatarProvider {
        provider_of(&self.inner)
    }

    async fn submit(&self, script: &str, segment_id: u32) -> Result<RenderJob, ProviderError> {
        let result = match &self.inner {
            ProviderClient::HeyGen(client) => client.submit(script, segment_id).await,
            ProviderClient::DId(client) => client.submit(script, segment_id).await,
            ProviderClient::Offline => return self.offline.submit(script, segment_id).await,
        };

        Ok(result.unwrap_or_else(|e| self.degrade(script, segment_id, &e)))
    }

    async fn poll(&self, remote_job_id: &str) -> Result<JobStatus, ProviderError> {
        match &self.inner {
            ProviderClient::HeyGen(client) => client.poll(remote_job_id).await,
            ProviderClient::DId(client) => client.poll(remote_job_id).await,
            ProviderClient::Offline => self.offline.poll(remote_job_id).await,
        }
    }
}

/// Build the shared HTTP client for a provider.
pub(crate) fn http_client(timeout: Duration) -> Result<reqwest::Client, ProviderError> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| ProviderError::Transport(format!("failed to build HTTP client: {e}")))
}

/// Check the status code and decode a JSON body.
pub(crate) async fn read_json<T: DeserializeOwned>(
    response: reqwest::Response,
) -> Result<T, ProviderError> {
    let status = response.status();
    let body = response.text().await?;
    if !status.is_success() {
        return Err(ProviderError::Status {
            code: status.as_u16(),
            body: truncate(&body, 512),
        });
    }
    serde_json::from_str(&body).map_err(|e| ProviderError::Malformed(e.to_string()))
}

fn truncate(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}
