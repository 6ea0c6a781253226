//! HTTP client for the remote roster optimizer.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use super::{OptimizeRequest, OptimizeResult, Optimizer, OptimizerError};

/// Success body of the optimizer endpoint.
#[derive(Debug, Deserialize)]
struct OptimizeResponse {
    #[serde(default)]
    public_url: Option<String>,
    #[serde(default)]
    gcs_url: Option<String>,
}

/// Optimizer reached over HTTP.
///
/// Posts the job inputs as JSON with an `x-api-key` header and expects a
/// JSON body carrying `public_url`.
pub struct HttpOptimizer {
    client: Client,
    url: String,
    api_key: Option<String>,
}

impl HttpOptimizer {
    pub fn new(url: impl Into<String>, api_key: Option<String>) -> Result<Self, OptimizerError> {
        let client = Client::builder()
            .user_agent(concat!("aeroguard/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| OptimizerError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            url: url.into(),
            api_key,
        })
    }
}

#[async_trait]
impl Optimizer for HttpOptimizer {
    fn name(&self) -> &str {
        "http"
    }

    async fn optimize(&self, request: &OptimizeRequest) -> Result<OptimizeResult, OptimizerError> {
        debug!(url = %self.url, start_date = %request.start_date, "Calling optimizer");

        let mut builder = self.client.post(&self.url).json(request);
        if let Some(ref key) = self.api_key {
            builder = builder.header("x-api-key", key);
        }

        let response = builder.send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(OptimizerError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let body: OptimizeResponse = response
            .json()
            .await
            .map_err(|e| OptimizerError::InvalidResponse(e.to_string()))?;

        let output_url = body
            .public_url
            .filter(|u| !u.trim().is_empty())
            .ok_or_else(|| OptimizerError::InvalidResponse("missing public_url".to_string()))?;

        Ok(OptimizeResult {
            output_url,
            gcs_url: body.gcs_url,
        })
    }
}
