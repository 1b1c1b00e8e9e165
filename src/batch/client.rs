//! Clients the batch driver uses to request samples.
//!
//! [`HttpSampleClient`] talks to a running sample service; [`LocalSampleClient`]
//! calls the same service core in-process.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;

use crate::error::ClientError;
use crate::service::{GenerateRequest, GenerateResponse, GenerateService};

#[async_trait]
pub trait SampleClient: Send + Sync {
    /// Issue one request. Transport problems and non-2xx statuses are errors;
    /// an `ok: false` body is not.
    async fn generate(&self, request: &GenerateRequest) -> Result<GenerateResponse, ClientError>;

    /// Where requests go, for run metadata.
    fn endpoint(&self) -> &str;
}

/// Client for a remote `/generate` endpoint.
pub struct HttpSampleClient {
    endpoint: String,
    http_client: Client,
}

impl HttpSampleClient {
    /// Create a client with a per-request timeout.
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, ClientError> {
        let http_client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ClientError::RequestFailed(e.to_string()))?;
        Ok(Self {
            endpoint: endpoint.into(),
            http_client,
        })
    }
}

#[async_trait]
impl SampleClient for HttpSampleClient {
    async fn generate(&self, request: &GenerateRequest) -> Result<GenerateResponse, ClientError> {
        let http_response = self
            .http_client
            .post(&self.endpoint)
            .json(request)
            .send()
            .await
            .map_err(|e| ClientError::RequestFailed(e.to_string()))?;

        let status = http_response.status();
        if !status.is_success() {
            let body = http_response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read error response".to_string());
            return Err(ClientError::Status {
                status: status.as_u16(),
                body,
            });
        }

        http_response
            .json()
            .await
            .map_err(|e| ClientError::Decode(e.to_string()))
    }

    fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

/// In-process client over a [`GenerateService`].
pub struct LocalSampleClient {
    service: GenerateService,
}

impl LocalSampleClient {
    pub fn new(service: GenerateService) -> Self {
        Self { service }
    }
}

#[async_trait]
impl SampleClient for LocalSampleClient {
    async fn generate(&self, request: &GenerateRequest) -> Result<GenerateResponse, ClientError> {
        Ok(self.service.generate(request.clone()).await)
    }

    fn endpoint(&self) -> &str {
        "in-process"
    }
}
