//! Authenticated requests against the Trakt API.

use std::sync::Arc;

use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE, RETRY_AFTER};
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::auth::controller::DEFAULT_BASE_URL;
use crate::auth::{AuthError, DeviceAuthController};
use crate::error::{Result, TraktError};

pub const DEFAULT_API_VERSION: &str = "2";

/// Trakt API client that authorizes every request through a
/// [`DeviceAuthController`].
///
/// # Example
/// ```no_run
/// use std::sync::Arc;
/// use trakt_auth::auth::{ClientCredentials, DeviceAuthController, FileTokenStore};
/// use trakt_auth::client::TraktClient;
///
/// # async fn example() -> trakt_auth::error::Result<()> {
/// let store = Arc::new(FileTokenStore::new_default()?);
/// let controller = DeviceAuthController::new(ClientCredentials::new("id", "secret"), store);
/// let client = TraktClient::new(Arc::new(controller));
/// let settings: serde_json::Value = client.get("users/settings").await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct TraktClient {
    http: reqwest::Client,
    auth: Arc<DeviceAuthController>,
    base_url: String,
    api_version: String,
}

impl TraktClient {
    pub fn new(auth: Arc<DeviceAuthController>) -> Self {
        Self {
            http: reqwest::Client::new(),
            auth,
            base_url: DEFAULT_BASE_URL.to_string(),
            api_version: DEFAULT_API_VERSION.to_string(),
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_api_version(mut self, version: impl Into<String>) -> Self {
        self.api_version = version.into();
        self
    }

    pub fn auth(&self) -> &DeviceAuthController {
        &self.auth
    }

    /// GET `path` and decode the JSON body.
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let resp = self
            .authenticated_request(Method::GET, path, None::<&()>)
            .await?;
        decode(resp).await
    }

    /// POST `body` to `path` and decode the JSON body.
    pub async fn post<B, T>(&self, path: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let resp = self
            .authenticated_request(Method::POST, path, Some(body))
            .await?;
        decode(resp).await
    }

    /// Send a request with the bearer token and Trakt headers attached.
    ///
    /// The raw response is returned whatever its status.
    pub async fn authenticated_request<B>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<reqwest::Response>
    where
        B: Serialize + ?Sized,
    {
        let url = format!("{}/{}", self.base_url, path.trim_start_matches('/'));
        let headers = self.headers().await?;
        tracing::debug!(%method, %url, "trakt request");
        let mut request = self.http.request(method, &url).headers(headers);
        if let Some(body) = body {
            request = request.json(body);
        }
        Ok(request.send().await?)
    }

    async fn headers(&self) -> Result<HeaderMap> {
        let access_token = self.auth.access_token().await?;
        if access_token.is_empty() {
            return Err(AuthError::NotLoggedIn.into());
        }
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert("trakt-api-key", header_value(&self.auth.credentials().client_id)?);
        headers.insert("trakt-api-version", header_value(&self.api_version)?);
        headers.insert(AUTHORIZATION, header_value(&format!("Bearer {access_token}"))?);
        Ok(headers)
    }
}

fn header_value(value: &str) -> Result<HeaderValue> {
    HeaderValue::from_str(value)
        .map_err(|err| TraktError::Configuration(format!("Invalid header value: {err}")))
}

async fn decode<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T> {
    let status = resp.status();
    if status == StatusCode::TOO_MANY_REQUESTS {
        let retry_after_ms = resp
            .headers()
            .get(RETRY_AFTER)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.trim().parse::<u64>().ok())
            .map(|secs| secs.saturating_mul(1000));
        return Err(TraktError::RateLimited { retry_after_ms });
    }
    let bytes = resp.bytes().await?;
    if !status.is_success() {
        let message = String::from_utf8_lossy(&bytes).into_owned();
        return Err(TraktError::api(status.as_u16(), message));
    }
    if bytes.is_empty() {
        return Ok(serde_json::from_slice(b"null")?);
    }
    Ok(serde_json::from_slice(&bytes)?)
}
