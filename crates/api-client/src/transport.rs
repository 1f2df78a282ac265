//! GraphQL request transport.
//!
//! [`Transport`] is the seam middleware wraps: it takes one [`ApiRequest`] and
//! returns the raw JSON response document. [`HttpTransport`] is the only
//! network implementation.

use async_trait::async_trait;
use reqwest::header::AUTHORIZATION;
use serde::Serialize;
use tracing::debug;
use workflows::ApiError;

/// A GraphQL request body.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GraphQlRequest {
    pub query: &'static str,
    #[serde(rename = "operationName")]
    pub operation_name: &'static str,
    pub variables: serde_json::Value,
}

/// One outbound call.
///
/// `authorization` is filled in by middleware; callers leave it `None`.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub body: GraphQlRequest,
    pub authorization: Option<String>,
}

/// Sends one request and returns the response document.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: ApiRequest) -> Result<serde_json::Value, ApiError>;
}

/// POSTs GraphQL requests to a fixed endpoint.
///
/// No timeout is configured; a slow API stalls the caller until it answers.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpTransport {
    pub fn new(endpoint: impl Into<String>) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("workflows-handler/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ApiError::Transport(e.to_string()))?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: ApiRequest) -> Result<serde_json::Value, ApiError> {
        debug!(
            endpoint = %self.endpoint,
            operation = request.body.operation_name,
            "Sending API request"
        );

        let mut builder = self.client.post(&self.endpoint).json(&request.body);
        if let Some(authorization) = request.authorization {
            builder = builder.header(AUTHORIZATION, authorization);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::Status {
                status: status.as_u16(),
                body,
            });
        }

        response
            .json::<serde_json::Value>()
            .await
            .map_err(|e| ApiError::Decode(e.to_string()))
    }
}
