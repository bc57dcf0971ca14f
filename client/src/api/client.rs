use std::{sync::Arc, time::Duration};

use reqwest::{Client, Method, StatusCode};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;

use crate::{api::provider::TokenProvider, error::ApiError};

/// How a request is authorized.
///
/// `Session` uses the signed-in user's token and may refresh it once on a
/// 401. `Bearer` carries a caller-supplied token (service account) and never
/// touches the user's session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Authorization {
    #[default]
    Session,
    Bearer(String),
}

#[derive(Debug, Clone)]
pub struct ApiRequest {
    method: Method,
    path: String,
    query: Vec<(String, String)>,
    body: Option<Value>,
    authorization: Authorization,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
            authorization: Authorization::Session,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    pub fn json<T: Serialize>(mut self, body: &T) -> Result<Self, ApiError> {
        let value = serde_json::to_value(body)
            .map_err(|e| ApiError::Encode(e.to_string()))?;
        self.body = Some(value);
        Ok(self)
    }

    pub fn bearer(mut self, token: impl Into<String>) -> Self {
        self.authorization = Authorization::Bearer(token.into());
        self
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn authorization(&self) -> &Authorization {
        &self.authorization
    }
}

/// Status and raw body of a completed exchange. Non-2xx statuses are not
/// errors at this layer.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: StatusCode,
    pub body: String,
}

impl ApiResponse {
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, ApiError> {
        serde_json::from_str(&self.body)
            .map_err(|e| ApiError::Decode(format!("Failed to parse response: {}", e)))
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }
}

pub fn normalize_base_url(base_url: &str) -> String {
    base_url.trim().trim_end_matches('/').to_string()
}

pub fn build_http_client(timeout: Duration) -> Result<Client, ApiError> {
    Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| ApiError::Transport(format!("Failed to build HTTP client: {}", e)))
}

pub(crate) fn endpoint(base_url: &str, path: &str) -> String {
    format!("{}/{}", base_url, path.trim_start_matches('/'))
}

/// Authorized request executor with a single refresh-and-retry on 401.
pub struct ApiClient {
    client: Client,
    base_url: String,
    tokens: Arc<dyn TokenProvider>,
}

impl ApiClient {
    pub fn new(client: Client, base_url: impl AsRef<str>, tokens: Arc<dyn TokenProvider>) -> Self {
        Self {
            client,
            base_url: normalize_base_url(base_url.as_ref()),
            tokens,
        }
    }

    pub fn new_with_base_url(base_url: impl AsRef<str>, tokens: Arc<dyn TokenProvider>) -> Self {
        Self::new(Client::new(), base_url, tokens)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn execute(&self, request: ApiRequest) -> Result<ApiResponse, ApiError> {
        match &request.authorization {
            Authorization::Bearer(token) => self.send(&request, Some(token.as_str())).await,
            Authorization::Session => self.send_with_refresh(&request).await,
        }
    }

    /// At most two attempts: the first send and one retry after a successful
    /// refresh. A 401 on the retry is final.
    async fn send_with_refresh(&self, request: &ApiRequest) -> Result<ApiResponse, ApiError> {
        let token = self.tokens.access_token().await;
        let response = self.send(request, token.as_deref()).await?;
        if response.status != StatusCode::UNAUTHORIZED {
            return Ok(response);
        }

        tracing::debug!(path = %request.path, "Received 401, attempting token refresh");
        if !self.tokens.refresh_token().await {
            tracing::warn!(path = %request.path, "Token refresh failed, ending session");
            self.tokens.on_auth_failure().await;
            return Err(ApiError::Unauthorized);
        }

        let token = self.tokens.access_token().await;
        let retried = self.send(request, token.as_deref()).await?;
        if retried.status == StatusCode::UNAUTHORIZED {
            tracing::warn!(path = %request.path, "Still unauthorized after refresh, ending session");
            self.tokens.on_auth_failure().await;
            return Err(ApiError::Unauthorized);
        }
        Ok(retried)
    }

    async fn send(&self, request: &ApiRequest, token: Option<&str>) -> Result<ApiResponse, ApiError> {
        let url = endpoint(&self.base_url, &request.path);
        let mut builder = self.client.request(request.method.clone(), &url);
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }
        if let Some(token) = token {
            builder = builder.bearer_auth(token);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))?;
        tracing::debug!(method = %request.method, path = %request.path, status = status.as_u16(), "API response");
        Ok(ApiResponse { status, body })
    }
}
