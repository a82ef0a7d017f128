use super::envelope::{ApiEnvelope, error_message};
use crate::client::ClientConfig;
use crate::core::{CacheError, MutationError};
use async_trait::async_trait;
use log::debug;
use reqwest::Method;
use serde_json::Value;

/// Write request sent to the backend
#[derive(Debug, Clone, PartialEq)]
pub struct MutationRequest {
    pub method: Method,
    pub path: String,
    pub payload: Option<Value>,
}

impl MutationRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            payload: None,
        }
    }

    pub fn post(path: impl Into<String>, payload: Value) -> Self {
        Self::new(Method::POST, path).payload(payload)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    pub fn payload(mut self, payload: Value) -> Self {
        self.payload = Some(payload);
        self
    }
}

/// Boundary to the REST backend.
///
/// Implementations perform exactly one call per invocation and never retry.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: &MutationRequest) -> Result<ApiEnvelope, MutationError>;

    async fn fetch(&self, path: &str) -> Result<ApiEnvelope, MutationError>;
}

/// `Transport` over HTTP with reqwest
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
    auth_token: Option<String>,
}

impl HttpTransport {
    pub fn new(config: &ClientConfig) -> Result<Self, CacheError> {
        config.validate()?;
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|err| CacheError::Config(format!("cannot build HTTP client: {}", err)))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            auth_token: config.auth_token.clone(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }

    async fn call(
        &self,
        method: Method,
        path: &str,
        payload: Option<&Value>,
    ) -> Result<ApiEnvelope, MutationError> {
        let url = self.url(path);
        debug!("{} {}", method, url);

        let mut builder = self.client.request(method, &url);
        if let Some(token) = &self.auth_token {
            builder = builder.bearer_auth(token);
        }
        if let Some(payload) = payload {
            builder = builder.json(payload);
        }

        let response = builder.send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            let fallback = status.canonical_reason().unwrap_or("request failed");
            return Err(MutationError::from_status(
                status.as_u16(),
                error_message(&body, fallback),
            ));
        }

        if body.trim().is_empty() {
            return Ok(ApiEnvelope::ok(Value::Null));
        }
        let decoded: Value = serde_json::from_str(&body)
            .map_err(|err| MutationError::Decode(format!("{} {}: {}", status, url, err)))?;
        Ok(ApiEnvelope::from_body(decoded))
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: &MutationRequest) -> Result<ApiEnvelope, MutationError> {
        self.call(
            request.method.clone(),
            &request.path,
            request.payload.as_ref(),
        )
        .await
    }

    async fn fetch(&self, path: &str) -> Result<ApiEnvelope, MutationError> {
        self.call(Method::GET, path, None).await
    }
}
