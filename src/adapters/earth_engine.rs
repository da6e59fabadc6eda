//! REST client for the Earth Engine v1 API.
//!
//! Only the two calls the export loop needs are implemented: starting a table
//! export and reading back the resulting operation.

use crate::core::ExportBackend;
use crate::domain::model::{ExportTask, Operation};
use crate::utils::error::{ExportError, Result};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::Deserialize;
use std::time::Duration;

pub const DEFAULT_API_BASE_URL: &str = "https://earthengine.googleapis.com";

#[derive(Debug, Clone)]
pub struct ClientSettings {
    pub api_base_url: String,
    pub project: String,
    pub access_token: String,
    pub request_timeout: Duration,
    /// Extra attempts after the first one, for transient failures only.
    pub retry_attempts: u32,
    /// Delay before the first retry; doubles each time up to `max_retry_delay`.
    pub retry_delay: Duration,
    pub max_retry_delay: Duration,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            project: String::new(),
            access_token: String::new(),
            request_timeout: Duration::from_secs(60),
            retry_attempts: 3,
            retry_delay: Duration::from_secs(2),
            max_retry_delay: Duration::from_secs(60),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    code: u16,
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: String,
}

pub struct EarthEngineClient {
    client: Client,
    settings: ClientSettings,
}

impl EarthEngineClient {
    pub fn new(settings: ClientSettings) -> Result<Self> {
        let client = Client::builder()
            .timeout(settings.request_timeout)
            .connect_timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self { client, settings })
    }

    pub fn settings(&self) -> &ClientSettings {
        &self.settings
    }

    fn base(&self) -> &str {
        self.settings.api_base_url.trim_end_matches('/')
    }

    pub fn export_url(&self) -> String {
        format!("{}/v1/projects/{}/table:export", self.base(), self.settings.project)
    }

    pub fn operation_url(&self, name: &str) -> String {
        format!("{}/v1/{}", self.base(), name.trim_start_matches('/'))
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .bearer_auth(&self.settings.access_token)
            .header("x-goog-user-project", &self.settings.project)
    }

    async fn decode(response: Response) -> Result<Operation> {
        let status = response.status();
        if status.is_success() {
            return Ok(response.json::<Operation>().await?);
        }

        let body = response.text().await.unwrap_or_default();
        let error = match serde_json::from_str::<ErrorEnvelope>(&body) {
            Ok(envelope) => ExportError::ApiError {
                code: if envelope.error.code == 0 {
                    status.as_u16()
                } else {
                    envelope.error.code
                },
                status: envelope.error.status,
                message: envelope.error.message,
            },
            Err(_) => ExportError::ApiError {
                code: status.as_u16(),
                status: status.canonical_reason().unwrap_or("UNKNOWN").to_string(),
                message: body,
            },
        };
        Err(error)
    }

    /// Sends the request built by `build`, retrying transient failures with a
    /// doubling delay.
    async fn send_with_retry<F>(&self, label: &str, build: F) -> Result<Operation>
    where
        F: Fn() -> RequestBuilder + Send + Sync,
    {
        let mut delay = self.settings.retry_delay.min(self.settings.max_retry_delay);
        let mut attempt = 0;

        loop {
            attempt += 1;
            let outcome = match build().send().await {
                Ok(response) => Self::decode(response).await,
                Err(e) => Err(ExportError::from(e)),
            };

            match outcome {
                Ok(operation) => return Ok(operation),
                Err(e) if e.is_retryable() && attempt <= self.settings.retry_attempts => {
                    tracing::warn!(
                        "{} failed (attempt {}/{}): {}; retrying in {:?}",
                        label,
                        attempt,
                        self.settings.retry_attempts + 1,
                        e,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                    delay = delay.saturating_mul(2).min(self.settings.max_retry_delay);
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[async_trait]
impl ExportBackend for EarthEngineClient {
    async fn submit_table_export(&self, task: &ExportTask) -> Result<Operation> {
        let url = self.export_url();
        tracing::debug!("POST {} ({})", url, task.request.request_id);

        self.send_with_retry(&task.description, || {
            self.authorize(self.client.post(&url)).json(&task.request)
        })
        .await
    }

    async fn get_operation(&self, name: &str) -> Result<Operation> {
        let url = self.operation_url(name);
        tracing::debug!("GET {}", url);

        self.send_with_retry(name, || self.authorize(self.client.get(&url)))
            .await
    }
}
