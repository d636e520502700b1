//! Configuration system (layered: code > env > config file).

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration as StdDuration;

use serde::Deserialize;

use crate::auth::controller::{default_freshness_margin, DEFAULT_BASE_URL};
use crate::auth::{
    AuthError, ClientCredentials, DeviceAuthController, FileTokenStore, PollPolicy,
    RefreshFailurePolicy, TokenStoreConfig,
};
use crate::client::{TraktClient, DEFAULT_API_VERSION};
use crate::error::TraktError;
use crate::paths;

const CONFIG_DIR_NAME: &str = ".trakt-auth";
const CONFIG_FILE_NAME: &str = "config.toml";

/// Settings for the device-auth controller and API client.
///
/// Resolution order:
/// 1. Values set in code (`with_*`)
/// 2. Environment (`TRAKT_CLIENT_ID`, `TRAKT_CLIENT_SECRET`, `TRAKT_BASE_URL`,
///    `TRAKT_TOKEN_FILE`, `TRAKT_FRESHNESS_DAYS`, `TRAKT_REFRESH_FAILURE`)
/// 3. `~/.trakt-auth/config.toml`
#[derive(Debug, Clone)]
pub struct TraktConfig {
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub base_url: String,
    pub token_path: Option<PathBuf>,
    pub freshness_margin: chrono::Duration,
    pub refresh_failure_policy: RefreshFailurePolicy,
    pub poll_policy: PollPolicy,
    pub api_version: String,
}

impl Default for TraktConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl TraktConfig {
    pub fn new() -> Self {
        Self {
            client_id: None,
            client_secret: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            token_path: None,
            freshness_margin: default_freshness_margin(),
            refresh_failure_policy: RefreshFailurePolicy::default(),
            poll_policy: PollPolicy::default(),
            api_version: DEFAULT_API_VERSION.to_string(),
        }
    }

    /// Defaults, then the default config file if present, then the environment.
    pub fn load() -> Result<Self, TraktError> {
        let path = Self::default_config_path()?;
        if path.exists() {
            Self::load_from_path(path)
        } else {
            let mut config = Self::new();
            config.apply_env()?;
            Ok(config)
        }
    }

    /// Defaults, then the given TOML file, then the environment.
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self, TraktError> {
        let mut config = Self::from_toml_file(path)?;
        config.apply_env()?;
        Ok(config)
    }

    /// Defaults overlaid with the given TOML file only.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, TraktError> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path)?;
        Self::from_toml_str(&raw).map_err(|err| {
            TraktError::Configuration(format!("{}: {err}", path.display()))
        })
    }

    pub fn from_toml_str(raw: &str) -> Result<Self, TraktError> {
        let file: ConfigFile =
            toml::from_str(raw).map_err(|err| TraktError::Configuration(err.to_string()))?;
        let mut config = Self::new();
        file.apply(&mut config)?;
        Ok(config)
    }

    /// Defaults overlaid with the environment (`.env` is loaded if present).
    pub fn from_env() -> Result<Self, TraktError> {
        let mut config = Self::new();
        config.apply_env()?;
        Ok(config)
    }

    /// `~/.trakt-auth/config.toml`.
    pub fn default_config_path() -> Result<PathBuf, TraktError> {
        Ok(paths::resolve_home_directory()?
            .join(CONFIG_DIR_NAME)
            .join(CONFIG_FILE_NAME))
    }

    pub fn apply_env(&mut self) -> Result<(), TraktError> {
        let _ = dotenvy::dotenv();
        self.apply_vars(|key| std::env::var(key).ok())
    }

    /// Overlay values from `lookup`, keyed by environment variable name.
    pub fn apply_vars<F>(&mut self, lookup: F) -> Result<(), TraktError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        if let Some(id) = lookup("TRAKT_CLIENT_ID") {
            self.client_id = Some(id);
        }
        if let Some(secret) = lookup("TRAKT_CLIENT_SECRET") {
            self.client_secret = Some(secret);
        }
        if let Some(url) = lookup("TRAKT_BASE_URL") {
            self.base_url = url;
        }
        if let Some(path) = lookup("TRAKT_TOKEN_FILE") {
            self.token_path = Some(PathBuf::from(path));
        }
        if let Some(days) = lookup("TRAKT_FRESHNESS_DAYS") {
            let days: i64 = days.trim().parse().map_err(|_| {
                TraktError::Configuration(format!("TRAKT_FRESHNESS_DAYS is not a number: {days}"))
            })?;
            self.freshness_margin = freshness_margin_from_days(days)?;
        }
        if let Some(policy) = lookup("TRAKT_REFRESH_FAILURE") {
            self.refresh_failure_policy = policy.trim().parse().map_err(|_| {
                TraktError::Configuration(format!("Unknown TRAKT_REFRESH_FAILURE value: {policy}"))
            })?;
        }
        Ok(())
    }

    pub fn with_credentials(
        mut self,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Self {
        self.client_id = Some(client_id.into());
        self.client_secret = Some(client_secret.into());
        self
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn with_token_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.token_path = Some(path.into());
        self
    }

    pub fn with_freshness_margin(mut self, margin: chrono::Duration) -> Self {
        self.freshness_margin = margin;
        self
    }

    pub fn with_refresh_failure_policy(mut self, policy: RefreshFailurePolicy) -> Self {
        self.refresh_failure_policy = policy;
        self
    }

    pub fn with_poll_policy(mut self, policy: PollPolicy) -> Self {
        self.poll_policy = policy;
        self
    }

    pub fn credentials(&self) -> Result<ClientCredentials, TraktError> {
        match (&self.client_id, &self.client_secret) {
            (Some(id), Some(secret)) => Ok(ClientCredentials::new(id, secret)),
            (None, _) => Err(TraktError::Configuration(
                "Client id not set (TRAKT_CLIENT_ID)".to_string(),
            )),
            (_, None) => Err(TraktError::Configuration(
                "Client secret not set (TRAKT_CLIENT_SECRET)".to_string(),
            )),
        }
    }

    /// Configured token file (with `~` expanded) or `$HOME/.trakt-auth.json`.
    pub fn token_path(&self) -> Result<PathBuf, AuthError> {
        match &self.token_path {
            Some(path) => paths::expand_user(path),
            None => TokenStoreConfig::default_path(),
        }
    }

    /// Controller backed by the configured token file.
    pub fn controller(&self) -> Result<DeviceAuthController, TraktError> {
        let store = FileTokenStore::new(TokenStoreConfig::new(self.token_path()?));
        Ok(DeviceAuthController::new(self.credentials()?, Arc::new(store))
            .with_base_url(&self.base_url)
            .with_poll_policy(self.poll_policy)
            .with_freshness_margin(self.freshness_margin)
            .with_refresh_failure_policy(self.refresh_failure_policy))
    }

    /// API client sharing the configured controller.
    pub fn client(&self) -> Result<TraktClient, TraktError> {
        Ok(TraktClient::new(Arc::new(self.controller()?))
            .with_base_url(&self.base_url)
            .with_api_version(&self.api_version))
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    client_id: Option<String>,
    client_secret: Option<String>,
    base_url: Option<String>,
    token_file: Option<PathBuf>,
    freshness_days: Option<i64>,
    refresh_failure: Option<RefreshFailurePolicy>,
    api_version: Option<String>,
    polling: Option<PollingSection>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct PollingSection {
    initial_delay_secs: Option<u64>,
    interval_secs: Option<u64>,
    rate_limit_backoff_secs: Option<u64>,
}

/// Margin of `days` whole days; negative or out-of-range values are rejected.
fn freshness_margin_from_days(days: i64) -> Result<chrono::Duration, TraktError> {
    if days < 0 {
        return Err(TraktError::Configuration(format!(
            "Freshness margin must not be negative: {days} days"
        )));
    }
    chrono::Duration::try_days(days).ok_or_else(|| {
        TraktError::Configuration(format!("Freshness margin out of range: {days} days"))
    })
}

impl ConfigFile {
    fn apply(self, config: &mut TraktConfig) -> Result<(), TraktError> {
        if self.client_id.is_some() {
            config.client_id = self.client_id;
        }
        if self.client_secret.is_some() {
            config.client_secret = self.client_secret;
        }
        if let Some(url) = self.base_url {
            config.base_url = url;
        }
        if self.token_file.is_some() {
            config.token_path = self.token_file;
        }
        if let Some(days) = self.freshness_days {
            config.freshness_margin = freshness_margin_from_days(days)?;
        }
        if let Some(policy) = self.refresh_failure {
            config.refresh_failure_policy = policy;
        }
        if let Some(version) = self.api_version {
            config.api_version = version;
        }
        if let Some(polling) = self.polling {
            let policy = &mut config.poll_policy;
            if let Some(secs) = polling.initial_delay_secs {
                policy.initial_delay = StdDuration::from_secs(secs);
            }
            if let Some(secs) = polling.interval_secs {
                policy.interval = StdDuration::from_secs(secs);
            }
            if let Some(secs) = polling.rate_limit_backoff_secs {
                policy.rate_limit_backoff = StdDuration::from_secs(secs);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_point_at_trakt() {
        let config = TraktConfig::new();
        assert_eq!(config.base_url, "https://api.trakt.tv");
        assert_eq!(config.api_version, "2");
        assert_eq!(config.freshness_margin, chrono::Duration::days(7));
        assert_eq!(
            config.refresh_failure_policy,
            RefreshFailurePolicy::UseStaleToken
        );
    }

    #[test]
    fn missing_credentials_are_configuration_errors() {
        let config = TraktConfig::new();
        assert!(
            matches!(config.credentials(), Err(TraktError::Configuration(msg)) if msg.contains("TRAKT_CLIENT_ID"))
        );
        let config = TraktConfig {
            client_id: Some("id".to_string()),
            ..TraktConfig::new()
        };
        assert!(
            matches!(config.credentials(), Err(TraktError::Configuration(msg)) if msg.contains("TRAKT_CLIENT_SECRET"))
        );
    }

    #[test]
    fn env_vars_overlay_defaults() {
        let mut config = TraktConfig::new();
        config
            .apply_vars(vars(&[
                ("TRAKT_CLIENT_ID", "env-id"),
                ("TRAKT_CLIENT_SECRET", "env-secret"),
                ("TRAKT_BASE_URL", "http://localhost:9000"),
                ("TRAKT_TOKEN_FILE", "/tmp/tokens.json"),
                ("TRAKT_FRESHNESS_DAYS", "3"),
                ("TRAKT_REFRESH_FAILURE", "propagate"),
            ]))
            .unwrap();
        let credentials = config.credentials().unwrap();
        assert_eq!(credentials.client_id, "env-id");
        assert_eq!(credentials.client_secret, "env-secret");
        assert_eq!(config.base_url, "http://localhost:9000");
        assert_eq!(config.token_path().unwrap(), PathBuf::from("/tmp/tokens.json"));
        assert_eq!(config.freshness_margin, chrono::Duration::days(3));
        assert_eq!(config.refresh_failure_policy, RefreshFailurePolicy::Propagate);
    }

    #[test]
    fn blank_env_vars_are_ignored() {
        let mut config = TraktConfig::new().with_credentials("code-id", "code-secret");
        config
            .apply_vars(vars(&[("TRAKT_CLIENT_ID", "  ")]))
            .unwrap();
        assert_eq!(config.client_id.as_deref(), Some("code-id"));
    }

    #[test]
    fn bad_freshness_days_is_rejected() {
        let mut config = TraktConfig::new();
        let result = config.apply_vars(vars(&[("TRAKT_FRESHNESS_DAYS", "soon")]));
        assert!(matches!(result, Err(TraktError::Configuration(_))));
    }

    #[test]
    fn toml_file_sets_every_field() {
        let config = TraktConfig::from_toml_str(
            r#"
            client_id = "file-id"
            client_secret = "file-secret"
            base_url = "http://127.0.0.1:8080"
            token_file = "/var/lib/trakt/tokens.json"
            freshness_days = 14
            refresh_failure = "device_flow"
            api_version = "3"

            [polling]
            initial_delay_secs = 1
            interval_secs = 2
            rate_limit_backoff_secs = 3
            "#,
        )
        .unwrap();
        assert_eq!(config.client_id.as_deref(), Some("file-id"));
        assert_eq!(config.base_url, "http://127.0.0.1:8080");
        assert_eq!(config.freshness_margin, chrono::Duration::days(14));
        assert_eq!(config.refresh_failure_policy, RefreshFailurePolicy::DeviceFlow);
        assert_eq!(config.api_version, "3");
        assert_eq!(
            config.poll_policy,
            PollPolicy::builder()
                .initial_delay(StdDuration::from_secs(1))
                .interval(StdDuration::from_secs(2))
                .rate_limit_backoff(StdDuration::from_secs(3))
                .build()
        );
    }

    #[test]
    fn freshness_days_out_of_range_are_rejected() {
        for days in ["999999999999999", "-1"] {
            let mut config = TraktConfig::new();
            let result = config.apply_vars(vars(&[("TRAKT_FRESHNESS_DAYS", days)]));
            assert!(
                matches!(result, Err(TraktError::Configuration(ref msg)) if msg.contains(days)),
                "{days}: {result:?}"
            );
            assert_eq!(config.freshness_margin, chrono::Duration::days(7));
        }

        let result = TraktConfig::from_toml_str("freshness_days = 999999999999999");
        assert!(matches!(result, Err(TraktError::Configuration(_))));
        let result = TraktConfig::from_toml_str("freshness_days = -3");
        assert!(matches!(result, Err(TraktError::Configuration(_))));
    }

    #[test]
    fn zero_freshness_days_is_allowed() {
        let config = TraktConfig::from_toml_str("freshness_days = 0").unwrap();
        assert_eq!(config.freshness_margin, chrono::Duration::zero());
    }

    #[test]
    fn env_wins_over_toml_file() {
        let mut config = TraktConfig::from_toml_str(
            r#"
            client_id = "file-id"
            client_secret = "file-secret"
            "#,
        )
        .unwrap();
        config
            .apply_vars(vars(&[("TRAKT_CLIENT_ID", "env-id")]))
            .unwrap();
        assert_eq!(config.client_id.as_deref(), Some("env-id"));
        assert_eq!(config.client_secret.as_deref(), Some("file-secret"));
    }

    #[test]
    fn unknown_toml_keys_are_rejected() {
        let result = TraktConfig::from_toml_str("client_idd = \"typo\"");
        assert!(matches!(result, Err(TraktError::Configuration(_))));
    }
}
