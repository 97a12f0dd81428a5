//! HTTP client implementation

use std::time::Duration;

use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, error};
use url::Url;

use crate::errors::{DomainError, ProvisionerError};
use openapi_client::models::GatewayError;

/// Header carrying the gateway session id
pub const SESSION_HEADER: &str = "X-Session-ID";

/// HTTP client for the virtualization gateway
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
    base_url: Url,
}

impl HttpClient {
    /// Create a new HTTP client
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ProvisionerError> {
        let base_url = Url::parse(base_url.trim_end_matches('/'))
            .map_err(|e| ProvisionerError::ConfigError(format!("{}: {}", base_url, e)))?;
        if base_url.cannot_be_a_base() {
            return Err(ProvisionerError::ConfigError(format!(
                "{} cannot be used as a base URL",
                base_url
            )));
        }

        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client, base_url })
    }

    /// Get the base URL
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Build a URL from path segments, escaping each one
    pub fn url(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn request(&self, method: Method, segments: &[&str], session: Option<&str>) -> RequestBuilder {
        let url = self.url(segments);
        debug!("{} {}", method, url);

        let mut request = self.client.request(method, url);
        if let Some(session) = session {
            request = request.header(SESSION_HEADER, session);
        }
        request
    }

    /// Send a request and decode a JSON body
    pub async fn send_json<T: DeserializeOwned, B: Serialize>(
        &self,
        method: Method,
        segments: &[&str],
        session: Option<&str>,
        body: Option<&B>,
    ) -> Result<T, ProvisionerError> {
        let mut request = self.request(method, segments, session);
        if let Some(body) = body {
            request = request.json(body);
        }
        let response = check(request.send().await?).await?;
        Ok(response.json().await?)
    }

    /// Send a request and discard the body
    pub async fn send<B: Serialize>(
        &self,
        method: Method,
        segments: &[&str],
        session: Option<&str>,
        body: Option<&B>,
    ) -> Result<(), ProvisionerError> {
        let mut request = self.request(method, segments, session);
        if let Some(body) = body {
            request = request.json(body);
        }
        check(request.send().await?).await?;
        Ok(())
    }
}

/// Map an unsuccessful response onto the error taxonomy
async fn check(response: Response) -> Result<Response, ProvisionerError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<GatewayError>(&body)
        .ok()
        .map(|e| e.error)
        .filter(|e| !e.is_empty())
        .unwrap_or(body);

    if is_rejection(status) {
        debug!("Gateway rejected request: {} - {}", status, message);
        return Err(DomainError::Rejected(message).into());
    }

    error!("Gateway request failed: {} - {}", status, message);
    Err(ProvisionerError::BackendError(format!("{}: {}", status, message)))
}

/// Statuses that mean the caller asked for something wrong
pub fn is_rejection(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::BAD_REQUEST
            | StatusCode::NOT_FOUND
            | StatusCode::CONFLICT
            | StatusCode::UNPROCESSABLE_ENTITY
    )
}
