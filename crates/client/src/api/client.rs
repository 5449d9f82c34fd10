//! HTTP client for the shop REST API.
//!
//! Wraps `reqwest` with the API's conventions: JSON bodies, optional bearer
//! token, a per-request `x-request-id`, and the `{ "data": ... }` response
//! envelope.

use std::sync::Arc;

use reqwest::{Method, RequestBuilder, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, error};
use url::Url;
use uuid::Uuid;

use super::ApiError;
use super::types::ApiResponse;
use crate::config::ApiConfig;

/// The HTTP header name for request IDs.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Maximum number of body characters included in logs and error messages.
const BODY_PREVIEW_CHARS: usize = 500;

/// Client for the shop REST API.
///
/// Cheaply cloneable; clones share the connection pool.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<ApiClientInner>,
}

struct ApiClientInner {
    client: reqwest::Client,
    base_url: Url,
    token: Option<SecretString>,
}

impl ApiClient {
    /// Create a new API client.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying HTTP client cannot be built.
    pub fn new(config: &ApiConfig) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()?;

        Ok(Self {
            inner: Arc::new(ApiClientInner {
                client,
                base_url: config.base_url.clone(),
                token: config.token.clone(),
            }),
        })
    }

    /// Base URL all endpoint paths are appended to.
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.inner.base_url
    }

    /// Absolute URL for an endpoint path.
    #[must_use]
    pub fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.inner.base_url.as_str().trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    // =========================================================================
    // Verbs
    // =========================================================================

    /// `GET` an endpoint and unwrap its `data`.
    pub(crate) async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.execute(self.request(Method::GET, path)).await
    }

    /// `POST` a JSON body and unwrap the response `data`.
    pub(crate) async fn post<B, T>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.execute(self.request(Method::POST, path).json(body))
            .await
    }

    /// `POST` without a body and unwrap the response `data`.
    pub(crate) async fn post_empty<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.execute(self.request(Method::POST, path)).await
    }

    /// `PUT` a JSON body and unwrap the response `data`.
    pub(crate) async fn put<B, T>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.execute(self.request(Method::PUT, path).json(body))
            .await
    }

    /// `DELETE` an endpoint and unwrap the response `data`.
    pub(crate) async fn delete<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.execute(self.request(Method::DELETE, path)).await
    }

    // =========================================================================
    // Internals
    // =========================================================================

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let request_id = Uuid::new_v4().to_string();
        debug!(method = method.as_str(), path, request_id = %request_id, "Sending API request");

        let builder = self
            .inner
            .client
            .request(method, self.endpoint(path))
            .header(REQUEST_ID_HEADER, request_id)
            .header("Accept", "application/json");

        match &self.inner.token {
            Some(token) => builder.bearer_auth(token.expose_secret()),
            None => builder,
        }
    }

    /// Send a request and unwrap the response envelope.
    async fn execute<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ApiError> {
        let response = request.send().await?;
        let status = response.status();

        // Check for rate limiting
        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(1);
            return Err(ApiError::RateLimited(retry_after));
        }

        // Get response body as text first for better error diagnostics
        let body = response.text().await?;

        if !status.is_success() {
            let message = error_message(&body).unwrap_or_else(|| {
                status
                    .canonical_reason()
                    .unwrap_or("request failed")
                    .to_string()
            });
            error!(
                status = %status,
                body = %preview(&body),
                "API returned non-success status"
            );
            return Err(ApiError::from_status(status, message));
        }

        let envelope: ApiResponse<T> = serde_json::from_str(&body).map_err(|e| {
            error!(
                error = %e,
                body = %preview(&body),
                "Failed to parse API response"
            );
            ApiError::Parse(e)
        })?;

        envelope.data.ok_or_else(|| {
            error!(body = %preview(&body), "API response has no data field");
            ApiError::Validation("expected data field absent".to_string())
        })
    }
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.inner.base_url.as_str())
            .field(
                "token",
                &self.inner.token.as_ref().map(|_| "[REDACTED]"),
            )
            .finish_non_exhaustive()
    }
}

/// Extract the backend's error message from an error body.
fn error_message(body: &str) -> Option<String> {
    let envelope: ApiResponse<serde_json::Value> = serde_json::from_str(body).ok()?;
    envelope
        .error
        .or(envelope.message)
        .filter(|m| !m.is_empty())
}

fn preview(body: &str) -> String {
    body.chars().take(BODY_PREVIEW_CHARS).collect()
}
