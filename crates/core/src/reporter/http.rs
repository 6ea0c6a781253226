//! Reporter talking to the API server's status endpoints.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{ReportError, StatusReporter};
use crate::status::{JobState, JobStatus, StatusUpdate, WriteOutcome};

#[derive(Debug, Serialize)]
struct UpdateBody<'a> {
    status: JobState,
    #[serde(skip_serializing_if = "Option::is_none")]
    output_url: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct UpdateResponse {
    applied: bool,
}

/// Reporter for worker processes running apart from the API server.
///
/// Writes go to `POST {base}/api/v1/jobs/{id}/status` and reads to
/// `GET {base}/api/v1/jobs/{id}/status`. Connection failures and 5xx answers
/// are [`ReportError::Transport`]; 4xx answers are [`ReportError::Rejected`].
pub struct HttpStatusReporter {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl HttpStatusReporter {
    pub fn new(base_url: impl Into<String>, api_key: Option<String>) -> Result<Self, ReportError> {
        let client = Client::builder()
            .user_agent(concat!("aeroguard/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| ReportError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
        })
    }

    fn status_url(&self, job_id: &str) -> String {
        format!(
            "{}/api/v1/jobs/{}/status",
            self.base_url,
            urlencoding::encode(job_id)
        )
    }

    async fn check(response: reqwest::Response) -> Result<reqwest::Response, ReportError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = format!("{status}: {body}");
        if status.is_client_error() && status != StatusCode::TOO_MANY_REQUESTS {
            Err(ReportError::Rejected(message))
        } else {
            Err(ReportError::Transport(message))
        }
    }
}

#[async_trait]
impl StatusReporter for HttpStatusReporter {
    fn name(&self) -> &str {
        "http"
    }

    async fn report(
        &self,
        job_id: &str,
        update: StatusUpdate,
    ) -> Result<WriteOutcome, ReportError> {
        let body = UpdateBody {
            status: update.state(),
            output_url: update.output_url(),
        };

        let mut request = self.client.post(self.status_url(job_id)).json(&body);
        if let Some(ref key) = self.api_key {
            request = request.header("x-api-key", key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| ReportError::Transport(e.to_string()))?;
        let response = Self::check(response).await?;

        let parsed: UpdateResponse = response
            .json()
            .await
            .map_err(|e| ReportError::Transport(format!("unreadable response: {e}")))?;

        let outcome = if parsed.applied {
            WriteOutcome::Applied
        } else {
            WriteOutcome::Absorbed
        };
        debug!(job_id = %job_id, state = %body.status, outcome = outcome.as_str(), "Reported status");
        Ok(outcome)
    }

    async fn query(&self, job_id: &str) -> Result<JobStatus, ReportError> {
        let response = self
            .client
            .get(self.status_url(job_id))
            .send()
            .await
            .map_err(|e| ReportError::Transport(e.to_string()))?;
        let response = Self::check(response).await?;

        response
            .json()
            .await
            .map_err(|e| ReportError::Transport(format!("unreadable response: {e}")))
    }
}
