use thiserror::Error;

/// Authentication errors raised by the token store and device-code flow.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("No token file")]
    NoTokenFile,
    #[error("Corrupt token file: {0}")]
    CorruptTokenFile(String),
    #[error("Token refresh failed with status {status}")]
    RefreshFailed { status: u16 },
    #[error("Device code expired, start the authorization again")]
    GrantExpired,
    #[error("Invalid device code")]
    InvalidGrant,
    #[error("Device code already used")]
    AlreadyUsed,
    #[error("User denied the device code")]
    Denied,
    #[error("Not logged in")]
    NotLoggedIn,
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
    #[error("Network error: {0}")]
    Network(String),
    #[error("IO error: {0}")]
    Io(String),
    #[error("Serialization error: {0}")]
    Serialization(String),
    #[error("Cannot resolve home directory: {0}")]
    HomeDirectory(String),
}

impl AuthError {
    /// Whether the caller has to show a fresh user code to recover.
    pub fn requires_new_device_flow(&self) -> bool {
        matches!(
            self,
            Self::GrantExpired | Self::InvalidGrant | Self::AlreadyUsed | Self::Denied
        )
    }

    /// Whether this error only means "nothing usable on disk".
    pub fn is_missing_token(&self) -> bool {
        matches!(self, Self::NoTokenFile | Self::CorruptTokenFile(_))
    }
}

impl From<reqwest::Error> for AuthError {
    fn from(error: reqwest::Error) -> Self {
        Self::Network(error.to_string())
    }
}

impl From<std::io::Error> for AuthError {
    fn from(error: std::io::Error) -> Self {
        Self::Io(error.to_string())
    }
}

impl From<serde_json::Error> for AuthError {
    fn from(error: serde_json::Error) -> Self {
        Self::Serialization(error.to_string())
    }
}
