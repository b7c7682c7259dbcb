//! REST client for the Fal queue API.
//!
//! Submits a request to `{queue_url}/{model_id}`, polls its status URL
//! until the backend reports completion, then fetches the result.
//! Every poll is forwarded to the caller as a [`QueueUpdate`].

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;

use crate::messages::{self, PollOutcome, StatusResponse, SubmitResponse};
use crate::provider::{
    GenerationClient, GenerationOutput, GenerationRequest, ProgressSender, RemoteError,
};

/// Default Fal queue endpoint.
pub const DEFAULT_QUEUE_URL: &str = "https://queue.fal.run";
/// Default text-to-video model.
pub const DEFAULT_MODEL_ID: &str = "fal-ai/ltx-video";

/// Timeout on each individual queue request.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Connection settings for [`FalClient`].
#[derive(Debug, Clone)]
pub struct FalConfig {
    /// `FAL_KEY`; `None` leaves the client unconfigured.
    pub api_key: Option<String>,
    pub model_id: String,
    pub queue_url: String,
    pub poll_interval: Duration,
}

impl Default for FalConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model_id: DEFAULT_MODEL_ID.to_string(),
            queue_url: DEFAULT_QUEUE_URL.to_string(),
            poll_interval: Duration::from_millis(1000),
        }
    }
}

/// Input body for the LTX video model.
#[derive(Debug, Serialize)]
struct ModelInput<'a> {
    prompt: &'a str,
    num_inference_steps: u32,
    guidance_scale: f64,
}

/// HTTP client for the Fal queue.
pub struct FalClient {
    client: reqwest::Client,
    config: FalConfig,
}

impl FalClient {
    pub fn new(config: FalConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .expect("Failed to build reqwest HTTP client");
        Self::with_client(client, config)
    }

    /// Create a client reusing an existing [`reqwest::Client`].
    pub fn with_client(client: reqwest::Client, config: FalConfig) -> Self {
        Self { client, config }
    }

    fn api_key(&self) -> Result<&str, RemoteError> {
        self.config
            .api_key
            .as_deref()
            .filter(|k| !k.trim().is_empty())
            .ok_or(RemoteError::NotConfigured)
    }

    fn auth_header(key: &str) -> String {
        format!("Key {key}")
    }

    /// `POST {queue}/{model}` with the model input.
    async fn submit(
        &self,
        key: &str,
        request: &GenerationRequest,
    ) -> Result<SubmitResponse, RemoteError> {
        let body = ModelInput {
            prompt: &request.prompt,
            num_inference_steps: request.params.num_inference_steps,
            guidance_scale: request.params.guidance_scale,
        };

        let response = self
            .client
            .post(format!(
                "{}/{}",
                self.config.queue_url.trim_end_matches('/'),
                self.config.model_id
            ))
            .header(reqwest::header::AUTHORIZATION, Self::auth_header(key))
            .json(&body)
            .send()
            .await?;

        Self::parse_response(response).await
    }

    /// One status poll, logs included.
    async fn poll_status(&self, key: &str, status_url: &str) -> Result<StatusResponse, RemoteError> {
        let response = self
            .client
            .get(status_url)
            .query(&[("logs", "1")])
            .header(reqwest::header::AUTHORIZATION, Self::auth_header(key))
            .send()
            .await?;

        Self::parse_response(response).await
    }

    /// Fetch the final result payload.
    async fn fetch_result(
        &self,
        key: &str,
        request_id: &str,
        response_url: &str,
    ) -> Result<GenerationOutput, RemoteError> {
        let response = self
            .client
            .get(response_url)
            .header(reqwest::header::AUTHORIZATION, Self::auth_header(key))
            .send()
            .await?;

        let status = response.status();
        let body: serde_json::Value = if status.is_success() {
            response.json().await?
        } else {
            let text = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            // Failed generations answer the result URL with a JSON `detail`.
            return Err(serde_json::from_str::<serde_json::Value>(&text)
                .ok()
                .as_ref()
                .and_then(messages::error_detail)
                .map(RemoteError::Generation)
                .unwrap_or(RemoteError::Api {
                    status: status.as_u16(),
                    body: text,
                }));
        };

        messages::parse_result(request_id, &body)
    }

    /// URL the queue serves a request under, when the submit answer omits it.
    fn request_url(&self, request_id: &str) -> String {
        format!(
            "{}/{}/requests/{}",
            self.config.queue_url.trim_end_matches('/'),
            self.config.model_id,
            request_id
        )
    }

    // ---- private helpers ----

    async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, RemoteError> {
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(RemoteError::Api {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    async fn parse_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, RemoteError> {
        let response = Self::ensure_success(response).await?;
        Ok(response.json::<T>().await?)
    }
}

#[async_trait]
impl GenerationClient for FalClient {
    fn is_configured(&self) -> bool {
        self.api_key().is_ok()
    }

    async fn generate(
        &self,
        request: GenerationRequest,
        progress: ProgressSender,
    ) -> Result<GenerationOutput, RemoteError> {
        let key = self.api_key()?;

        let submitted = self.submit(key, &request).await?;
        let request_id = submitted.request_id;
        let status_url = submitted
            .status_url
            .unwrap_or_else(|| format!("{}/status", self.request_url(&request_id)));
        let response_url = submitted
            .response_url
            .unwrap_or_else(|| self.request_url(&request_id));

        tracing::info!(
            request_id = %request_id,
            model = %self.config.model_id,
            steps = request.params.num_inference_steps,
            guidance_scale = request.params.guidance_scale,
            "Submitted generation request",
        );

        loop {
            match self.poll_status(key, &status_url).await?.into_outcome() {
                PollOutcome::Pending(update) => {
                    let _ = progress.send(update);
                }
                PollOutcome::Done(update) => {
                    let _ = progress.send(update);
                    break;
                }
                PollOutcome::Failed(detail) => {
                    tracing::warn!(request_id = %request_id, error = %detail, "Generation failed remotely");
                    return Err(RemoteError::Generation(detail));
                }
            }
            tokio::time::sleep(self.config.poll_interval).await;
        }

        let output = self.fetch_result(key, &request_id, &response_url).await?;
        tracing::info!(
            request_id = %request_id,
            content_type = %output.content_type,
            "Generation result ready",
        );
        Ok(output)
    }
}
