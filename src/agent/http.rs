//! REST client for the remote agent service.
//!
//! Endpoint shape:
//! - `POST   {base}/v1/jobs`           creates a job, returns `{ "id": ... }`
//! - `GET    {base}/v1/jobs/{id}`      polls status
//! - `POST   {base}/v1/jobs/{id}/stop` requests cancellation

use crate::agent::{AgentService, JobHandle, JobPayload, JobPoll};
use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

/// Default per-request timeout. Job execution itself is long-running, but
/// individual API calls should return quickly.
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// HTTP implementation of [`AgentService`].
pub struct HttpAgentService {
    base_url: String,
    token: Option<String>,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct CreateJobResponse {
    id: String,
}

impl HttpAgentService {
    /// Create a client for the given service endpoint.
    pub fn new(base_url: &str, token: Option<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
            client,
        })
    }

    fn authorize(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(token) => req.bearer_auth(token),
            None => req,
        }
    }
}

#[async_trait]
impl AgentService for HttpAgentService {
    async fn create_job(&self, payload: &JobPayload) -> Result<JobHandle> {
        let url = format!("{}/v1/jobs", self.base_url);
        let response = self
            .authorize(self.client.post(&url))
            .json(payload)
            .send()
            .await
            .with_context(|| format!("Failed to reach agent service at {url}"))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            bail!("Agent service rejected job creation ({status}): {body}");
        }

        let created: CreateJobResponse = response
            .json()
            .await
            .context("Invalid job-creation response from agent service")?;

        Ok(JobHandle(created.id))
    }

    async fn poll_job(&self, handle: &JobHandle) -> Result<JobPoll> {
        let url = format!("{}/v1/jobs/{}", self.base_url, handle);
        let response = self
            .authorize(self.client.get(&url))
            .send()
            .await
            .with_context(|| format!("Failed to poll job {handle}"))?;

        if !response.status().is_success() {
            bail!("Agent service returned {} for job {handle}", response.status());
        }

        response
            .json()
            .await
            .with_context(|| format!("Invalid poll response for job {handle}"))
    }

    async fn stop_job(&self, handle: &JobHandle) -> Result<()> {
        let url = format!("{}/v1/jobs/{}/stop", self.base_url, handle);
        let response = self
            .authorize(self.client.post(&url))
            .send()
            .await
            .with_context(|| format!("Failed to request stop for job {handle}"))?;

        if !response.status().is_success() {
            bail!(
                "Agent service returned {} stopping job {handle}",
                response.status()
            );
        }

        Ok(())
    }
}
