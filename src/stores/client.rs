use std::time::Duration;

use reqwest::{header::AUTHORIZATION, Client as ReqwestClient, Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use super::UpstreamError;
use crate::auth::AuthContext;

/// Thin wrapper over a pooled reqwest client bound to one backend base URL
#[derive(Clone, Debug)]
pub struct BackendClient {
    http_client: ReqwestClient,
    base_url: String,
}

impl BackendClient {
    /// Every request sent through this client is bounded by `timeout`
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, UpstreamError> {
        let http_client = ReqwestClient::builder()
            .timeout(timeout)
            .pool_max_idle_per_host(10)
            .tcp_nodelay(true)
            .build()
            .map_err(|e| UpstreamError::Transport(e.to_string()))?;

        Ok(Self {
            http_client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Starts a request against `path`, forwarding the caller's credential unmodified
    pub fn request(&self, method: Method, path: &str, auth: &AuthContext) -> RequestBuilder {
        self.http_client
            .request(method, format!("{}{}", self.base_url, path))
            .header(AUTHORIZATION, &auth.authorization)
    }

    /// Sends the request and requires exactly `expected` back
    pub async fn send_expecting(
        &self,
        request: RequestBuilder,
        expected: StatusCode,
    ) -> Result<reqwest::Response, UpstreamError> {
        let response = request.send().await.map_err(|e| {
            let error = UpstreamError::from(e);
            warn!(error = %error, base_url = %self.base_url, "Upstream call failed");
            error
        })?;

        let status = response.status();
        debug!(status = status.as_u16(), url = %response.url(), "Upstream responded");

        if status != expected {
            return Err(UpstreamError::Status(status.as_u16()));
        }

        Ok(response)
    }

    /// Decodes a JSON array body
    pub async fn records<T: DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<Vec<T>, UpstreamError> {
        response
            .json::<Vec<T>>()
            .await
            .map_err(|e| UpstreamError::Decode(e.to_string()))
    }

    /// Decodes any JSON body, treating an empty body as `null`
    pub async fn body(response: reqwest::Response) -> Result<serde_json::Value, UpstreamError> {
        let bytes = response.bytes().await.map_err(UpstreamError::from)?;
        if bytes.is_empty() {
            return Ok(serde_json::Value::Null);
        }
        serde_json::from_slice(&bytes).map_err(|e| UpstreamError::Decode(e.to_string()))
    }
}
