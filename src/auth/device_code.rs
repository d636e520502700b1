use chrono::{DateTime, TimeDelta, Utc};
use reqwest::StatusCode;
use serde::Deserialize;

use super::error::AuthError;
use super::token::{TokenRecord, TokenResponse};

/// Device-code grant handed out by `oauth/device/code`.
///
/// Lives only for one device-flow attempt.
///
/// # Example
/// ```
/// use trakt_auth::auth::DeviceCodeGrant;
/// use chrono::Utc;
///
/// let grant = DeviceCodeGrant {
///     device_code: "d1".to_string(),
///     user_code: "U1".to_string(),
///     verification_url: "https://trakt.tv/activate".to_string(),
///     expires_in: 600,
///     interval: 5,
///     issued_at: Utc::now(),
/// };
/// assert!(!grant.is_expired(grant.issued_at));
/// ```
#[derive(Debug, Clone)]
pub struct DeviceCodeGrant {
    pub device_code: String,
    pub user_code: String,
    pub verification_url: String,
    pub expires_in: u64,
    pub interval: u64,
    pub issued_at: DateTime<Utc>,
}

impl DeviceCodeGrant {
    /// Lifetimes past chrono's range clamp to the latest representable instant.
    pub fn expires_at(&self) -> DateTime<Utc> {
        expiry(self.issued_at, self.expires_in).unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at()
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct DeviceCodeResponse {
    pub device_code: String,
    pub user_code: String,
    pub verification_url: String,
    pub expires_in: u64,
    #[serde(default)]
    pub interval: u64,
}

fn expiry(issued_at: DateTime<Utc>, expires_in: u64) -> Option<DateTime<Utc>> {
    let lifetime = TimeDelta::try_seconds(i64::try_from(expires_in).ok()?)?;
    issued_at.checked_add_signed(lifetime)
}

impl DeviceCodeResponse {
    pub(crate) fn into_grant(
        self,
        issued_at: DateTime<Utc>,
    ) -> Result<DeviceCodeGrant, AuthError> {
        if expiry(issued_at, self.expires_in).is_none() {
            return Err(AuthError::InvalidResponse(format!(
                "Device code lifetime out of range: {}s",
                self.expires_in
            )));
        }
        Ok(DeviceCodeGrant {
            device_code: self.device_code,
            user_code: self.user_code,
            verification_url: self.verification_url,
            expires_in: self.expires_in,
            interval: self.interval,
            issued_at,
        })
    }
}

/// Outcome of a single `oauth/device/token` poll, keyed on the status code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceCodePoll {
    /// 200: the user approved.
    Authorized { record: TokenRecord },
    /// 400: waiting for the user.
    Pending,
    /// 404
    InvalidGrant,
    /// 409
    AlreadyUsed,
    /// 410
    Expired,
    /// 418
    Denied,
    /// 429: polling too fast.
    SlowDown,
    /// Anything else; keep polling.
    Transient(u16),
}

impl DeviceCodePoll {
    /// Classify a device-token response. Only a 200 body is read.
    pub fn from_response(
        status: StatusCode,
        body: &[u8],
        now: DateTime<Utc>,
    ) -> Result<Self, AuthError> {
        Ok(match status.as_u16() {
            200 => {
                let response: TokenResponse = serde_json::from_slice(body).map_err(|err| {
                    AuthError::InvalidResponse(format!("Device token body: {err}"))
                })?;
                Self::Authorized {
                    record: response.into_record(now)?,
                }
            }
            400 => Self::Pending,
            404 => Self::InvalidGrant,
            409 => Self::AlreadyUsed,
            410 => Self::Expired,
            418 => Self::Denied,
            429 => Self::SlowDown,
            other => Self::Transient(other),
        })
    }

    /// The error that ends the polling loop, if this outcome is a rejection.
    pub fn terminal_error(&self) -> Option<AuthError> {
        match self {
            Self::InvalidGrant => Some(AuthError::InvalidGrant),
            Self::AlreadyUsed => Some(AuthError::AlreadyUsed),
            Self::Expired => Some(AuthError::GrantExpired),
            Self::Denied => Some(AuthError::Denied),
            _ => None,
        }
    }
}
