use std::fmt;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, Utc};
use reqwest::StatusCode;
use serde::Serialize;
use strum::Display;

use super::clock::{Clock, SystemClock};
use super::device_code::{DeviceCodeGrant, DeviceCodePoll, DeviceCodeResponse};
use super::error::AuthError;
use super::policy::{PollPolicy, RefreshFailurePolicy};
use super::prompt::{DevicePrompt, StderrPrompt};
use super::store::TokenStore;
use super::token::{TokenRecord, TokenResponse};

pub const DEFAULT_BASE_URL: &str = "https://api.trakt.tv";
const OOB_REDIRECT_URI: &str = "urn:ietf:wg:oauth:2.0:oob";

/// Reuse a cached token only while it stays valid this far into the future.
pub fn default_freshness_margin() -> Duration {
    Duration::days(7)
}

/// Application identity registered with the provider.
#[derive(Clone, PartialEq, Eq)]
pub struct ClientCredentials {
    pub client_id: String,
    pub client_secret: String,
}

impl ClientCredentials {
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
        }
    }
}

impl fmt::Debug for ClientCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientCredentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"..")
            .finish()
    }
}

/// Where the controller stands in the token lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum AuthState {
    NoToken,
    HaveValid,
    HaveExpiredRefreshable,
    AwaitingUserApproval,
    Authenticated,
    Failed,
}

/// Classify a stored record without touching the network.
pub fn assess(record: &TokenRecord, now: DateTime<Utc>, freshness_margin: Duration) -> AuthState {
    if record.is_fresh(now, freshness_margin) {
        AuthState::HaveValid
    } else if !record.refresh_token.is_empty() {
        AuthState::HaveExpiredRefreshable
    } else {
        AuthState::NoToken
    }
}

#[derive(Serialize)]
struct DeviceCodeRequest<'a> {
    client_id: &'a str,
}

#[derive(Serialize)]
struct DeviceTokenRequest<'a> {
    client_id: &'a str,
    client_secret: &'a str,
    code: &'a str,
}

#[derive(Serialize)]
struct RefreshRequest<'a> {
    client_id: &'a str,
    client_secret: &'a str,
    refresh_token: &'a str,
    redirect_uri: &'a str,
    grant_type: &'a str,
}

/// Keeps a Trakt access token valid using the OAuth device-code grant.
///
/// [`access_token`](Self::access_token) returns a cached token while it is
/// fresh, refreshes it when it nears expiry, and otherwise runs the device
/// flow, persisting every new token set through the [`TokenStore`].
///
/// # Example
/// ```no_run
/// use std::sync::Arc;
/// use trakt_auth::auth::{ClientCredentials, DeviceAuthController, FileTokenStore};
///
/// # async fn example() -> Result<(), trakt_auth::auth::AuthError> {
/// let store = Arc::new(FileTokenStore::new_default()?);
/// let controller = DeviceAuthController::new(ClientCredentials::new("id", "secret"), store);
/// let token = controller.access_token().await?;
/// # Ok(())
/// # }
/// ```
pub struct DeviceAuthController {
    client: reqwest::Client,
    credentials: ClientCredentials,
    base_url: String,
    store: Arc<dyn TokenStore>,
    clock: Arc<dyn Clock>,
    prompt: Arc<dyn DevicePrompt>,
    poll_policy: PollPolicy,
    freshness_margin: Duration,
    refresh_failure_policy: RefreshFailurePolicy,
    state: Mutex<AuthState>,
}

impl DeviceAuthController {
    pub fn new(credentials: ClientCredentials, store: Arc<dyn TokenStore>) -> Self {
        Self {
            client: reqwest::Client::new(),
            credentials,
            base_url: DEFAULT_BASE_URL.to_string(),
            store,
            clock: Arc::new(SystemClock),
            prompt: Arc::new(StderrPrompt),
            poll_policy: PollPolicy::default(),
            freshness_margin: default_freshness_margin(),
            refresh_failure_policy: RefreshFailurePolicy::default(),
            state: Mutex::new(AuthState::NoToken),
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_http_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_prompt(mut self, prompt: Arc<dyn DevicePrompt>) -> Self {
        self.prompt = prompt;
        self
    }

    pub fn with_poll_policy(mut self, policy: PollPolicy) -> Self {
        self.poll_policy = policy;
        self
    }

    pub fn with_freshness_margin(mut self, margin: Duration) -> Self {
        self.freshness_margin = margin;
        self
    }

    pub fn with_refresh_failure_policy(mut self, policy: RefreshFailurePolicy) -> Self {
        self.refresh_failure_policy = policy;
        self
    }

    pub fn credentials(&self) -> &ClientCredentials {
        &self.credentials
    }

    pub fn store(&self) -> &Arc<dyn TokenStore> {
        &self.store
    }

    pub fn freshness_margin(&self) -> Duration {
        self.freshness_margin
    }

    /// State reached by the most recent operation.
    pub fn state(&self) -> AuthState {
        self.state
            .lock()
            .map(|guard| *guard)
            .unwrap_or(AuthState::Failed)
    }

    /// Return a usable access token, refreshing or re-authorizing as needed.
    pub async fn access_token(&self) -> Result<String, AuthError> {
        let result = self.resolve_access_token().await;
        if let Err(err) = &result {
            tracing::warn!(error = %err, "could not obtain access token");
            self.set_state(AuthState::Failed);
        }
        result
    }

    /// Stored record, or an empty one when the file is missing or corrupt.
    pub fn load_record(&self) -> Result<TokenRecord, AuthError> {
        match self.store.load() {
            Ok(record) => Ok(record),
            Err(AuthError::NoTokenFile) => Ok(TokenRecord::default()),
            Err(AuthError::CorruptTokenFile(reason)) => {
                tracing::warn!(%reason, "ignoring corrupt token file");
                Ok(TokenRecord::default())
            }
            Err(err) => Err(err),
        }
    }

    /// Classify the stored record against the clock.
    pub fn assess_stored(&self) -> Result<(TokenRecord, AuthState), AuthError> {
        let record = self.load_record()?;
        let state = assess(&record, self.clock.now(), self.freshness_margin);
        Ok((record, state))
    }

    async fn resolve_access_token(&self) -> Result<String, AuthError> {
        let (record, state) = self.assess_stored()?;
        self.set_state(state);

        match state {
            AuthState::HaveValid => return Ok(record.access_token),
            AuthState::HaveExpiredRefreshable => match self.refresh(&record.refresh_token).await {
                Ok(fresh) => return Ok(fresh.access_token),
                Err(AuthError::RefreshFailed { status }) => match self.refresh_failure_policy {
                    RefreshFailurePolicy::UseStaleToken if !record.access_token.is_empty() => {
                        tracing::warn!(status, "token refresh failed, using stored token");
                        return Ok(record.access_token);
                    }
                    RefreshFailurePolicy::UseStaleToken | RefreshFailurePolicy::Propagate => {
                        return Err(AuthError::RefreshFailed { status });
                    }
                    RefreshFailurePolicy::DeviceFlow => {
                        tracing::warn!(status, "token refresh failed, starting device flow");
                    }
                },
                Err(err) => return Err(err),
            },
            _ => {}
        }

        let record = self.run_device_flow().await?;
        Ok(record.access_token)
    }

    /// Exchange a refresh token for a new token set and persist it.
    ///
    /// Any non-200 answer fails with [`AuthError::RefreshFailed`].
    pub async fn refresh(&self, refresh_token: &str) -> Result<TokenRecord, AuthError> {
        let body = RefreshRequest {
            client_id: &self.credentials.client_id,
            client_secret: &self.credentials.client_secret,
            refresh_token,
            redirect_uri: OOB_REDIRECT_URI,
            grant_type: "refresh_token",
        };
        let resp = self.post("oauth/token", &body).await?;
        let status = resp.status();
        if status != StatusCode::OK {
            return Err(AuthError::RefreshFailed {
                status: status.as_u16(),
            });
        }
        let payload: TokenResponse = resp
            .json()
            .await
            .map_err(|err| AuthError::InvalidResponse(format!("Refresh token body: {err}")))?;
        let record = payload.into_record(self.clock.now())?;
        self.store.save(&record)?;
        self.set_state(AuthState::Authenticated);
        tracing::info!("access token refreshed");
        Ok(record)
    }

    /// Run the whole device-code flow: request a grant, show it, poll.
    pub async fn run_device_flow(&self) -> Result<TokenRecord, AuthError> {
        let grant = self.request_device_code().await?;
        self.set_state(AuthState::AwaitingUserApproval);
        self.prompt.show(&grant);
        self.clock.sleep(self.poll_policy.initial_delay).await;
        self.wait_for_approval(&grant).await
    }

    pub async fn request_device_code(&self) -> Result<DeviceCodeGrant, AuthError> {
        let body = DeviceCodeRequest {
            client_id: &self.credentials.client_id,
        };
        let resp = self.post("oauth/device/code", &body).await?;
        if resp.status() != StatusCode::OK {
            return Err(AuthError::InvalidResponse(format!(
                "Device code request failed with status {}",
                resp.status()
            )));
        }
        let payload: DeviceCodeResponse = resp
            .json()
            .await
            .map_err(|err| AuthError::InvalidResponse(format!("Device code body: {err}")))?;
        payload.into_grant(self.clock.now())
    }

    /// Poll until the user approves, rejects, or the grant runs out.
    pub async fn wait_for_approval(
        &self,
        grant: &DeviceCodeGrant,
    ) -> Result<TokenRecord, AuthError> {
        loop {
            if grant.is_expired(self.clock.now()) {
                return Err(AuthError::GrantExpired);
            }
            let poll = self.poll_device_code(grant).await?;
            if let DeviceCodePoll::Authorized { record } = poll {
                return Ok(record);
            }
            if let Some(err) = poll.terminal_error() {
                return Err(err);
            }
            match &poll {
                DeviceCodePoll::Pending => tracing::debug!("waiting for the user to authorize"),
                DeviceCodePoll::SlowDown => tracing::debug!("polling too quickly, backing off"),
                other => tracing::debug!(?other, "unexpected device token response"),
            }
            let delay = self.poll_policy.delay_after(&poll, grant);
            self.clock.sleep(delay).await;
        }
    }

    /// Single poll of the device-token endpoint; an approval is persisted.
    pub async fn poll_device_code(
        &self,
        grant: &DeviceCodeGrant,
    ) -> Result<DeviceCodePoll, AuthError> {
        let body = DeviceTokenRequest {
            client_id: &self.credentials.client_id,
            client_secret: &self.credentials.client_secret,
            code: &grant.device_code,
        };
        let resp = self.post("oauth/device/token", &body).await?;
        let status = resp.status();
        let bytes = resp.bytes().await?;
        let poll = DeviceCodePoll::from_response(status, &bytes, self.clock.now())?;
        if let DeviceCodePoll::Authorized { record } = &poll {
            self.store.save(record)?;
            self.set_state(AuthState::Authenticated);
            tracing::info!("device authorized, token saved");
        }
        Ok(poll)
    }

    async fn post<B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<reqwest::Response, AuthError> {
        let url = format!("{}/{path}", self.base_url);
        tracing::debug!(%url, "POST");
        Ok(self.client.post(&url).json(body).send().await?)
    }

    fn set_state(&self, next: AuthState) {
        if let Ok(mut guard) = self.state.lock() {
            let previous = *guard;
            if previous != next {
                tracing::debug!(from = %previous, to = %next, "auth state");
            }
            *guard = next;
        }
    }
}

impl fmt::Debug for DeviceAuthController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeviceAuthController")
            .field("credentials", &self.credentials)
            .field("base_url", &self.base_url)
            .field("poll_policy", &self.poll_policy)
            .field("freshness_margin", &self.freshness_margin)
            .field("refresh_failure_policy", &self.refresh_failure_policy)
            .field("state", &self.state())
            .finish()
    }
}
