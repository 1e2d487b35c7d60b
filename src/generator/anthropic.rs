//! Messages API client.

use super::service::{ContentService, ServiceError, ServiceRequest, ServiceResponse};
use std::time::Duration;
use tracing::debug;

const API_VERSION: &str = "2023-06-01";

/// Generation can take minutes for long tool inputs.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(300);

/// [`ContentService`] backed by the Anthropic Messages API.
pub struct AnthropicService {
    api_key: String,
    api_url: String,
    http: reqwest::Client,
}

impl AnthropicService {
    pub fn new(api_key: String, api_url: String) -> Result<Self, ServiceError> {
        let http = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            api_key,
            api_url,
            http,
        })
    }
}

impl ContentService for AnthropicService {
    async fn submit(&self, request: &ServiceRequest) -> Result<ServiceResponse, ServiceError> {
        debug!(model = %request.model, url = %self.api_url, "Submitting generation request");

        let resp = self
            .http
            .post(&self.api_url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .header("content-type", "application/json")
            .json(request)
            .send()
            .await?;

        let status = resp.status();
        let body = resp.text().await?;
        if !status.is_success() {
            return Err(ServiceError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let response: ServiceResponse = serde_json::from_str(&body)?;
        if let Some(usage) = &response.usage {
            debug!(
                input_tokens = usage.input_tokens,
                output_tokens = usage.output_tokens,
                stop_reason = response.stop_reason.as_deref().unwrap_or("-"),
                "Generation response received"
            );
        }
        Ok(response)
    }
}
