use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::error::AuthError;

/// OAuth token set persisted by a [`TokenStore`](super::TokenStore).
///
/// Empty strings mean "no token". `created_at` is in epoch seconds and
/// `created_at + expires_in` is the absolute expiry instant.
///
/// # Example
/// ```
/// use trakt_auth::auth::TokenRecord;
///
/// let record = TokenRecord {
///     access_token: "access".to_string(),
///     refresh_token: "refresh".to_string(),
///     expires_in: 7_776_000,
///     created_at: 1_700_000_000,
/// };
/// assert_eq!(record.expires_at_secs(), 1_707_776_000);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TokenRecord {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in: i64,
    pub created_at: i64,
}

impl TokenRecord {
    /// Both tokens present, i.e. the user authorized at some point.
    pub fn has_credentials(&self) -> bool {
        !self.access_token.is_empty() && !self.refresh_token.is_empty()
    }

    pub fn expires_at_secs(&self) -> i64 {
        self.created_at.saturating_add(self.expires_in)
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        DateTime::<Utc>::from_timestamp(self.expires_at_secs(), 0)
    }

    /// True when the token stays valid for longer than `margin` past `now`.
    pub fn is_fresh(&self, now: DateTime<Utc>, margin: Duration) -> bool {
        if !self.has_credentials() || self.expires_in == 0 {
            return false;
        }
        match now.checked_add_signed(margin) {
            Some(limit) => self.expires_at_secs() > limit.timestamp(),
            None => false,
        }
    }
}

/// Token body returned by the device-token and refresh endpoints.
///
/// Fields the provider adds (`token_type`, `scope`, `created_at`) are ignored;
/// the issuance time is stamped locally.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: String,
    #[serde(default)]
    pub expires_in: i64,
}

impl TokenResponse {
    /// Stamp the body with `now`. Both tokens must be present.
    pub fn into_record(self, now: DateTime<Utc>) -> Result<TokenRecord, AuthError> {
        if self.access_token.is_empty() || self.refresh_token.is_empty() {
            return Err(AuthError::InvalidResponse(
                "Token body is missing access_token or refresh_token".to_string(),
            ));
        }
        Ok(TokenRecord {
            access_token: self.access_token,
            refresh_token: self.refresh_token,
            expires_in: self.expires_in,
            created_at: now.timestamp(),
        })
    }
}
