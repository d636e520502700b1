//! Polling cadence and refresh-failure handling.

use std::time::Duration;

use bon::Builder;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use super::device_code::{DeviceCodeGrant, DeviceCodePoll};

const DEFAULT_INITIAL_DELAY: Duration = Duration::from_secs(5);
const DEFAULT_INTERVAL: Duration = Duration::from_secs(5);
const DEFAULT_RATE_LIMIT_BACKOFF: Duration = Duration::from_secs(5);

/// Fixed, jitter-free polling cadence for the device flow.
///
/// # Example
/// ```
/// use std::time::Duration;
/// use trakt_auth::auth::PollPolicy;
///
/// let policy = PollPolicy::builder()
///     .interval(Duration::from_secs(10))
///     .build();
/// assert_eq!(policy.initial_delay, Duration::from_secs(5));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Builder)]
pub struct PollPolicy {
    /// Wait between showing the user code and the first poll.
    #[builder(default = DEFAULT_INITIAL_DELAY)]
    pub initial_delay: Duration,
    /// Wait between polls. The grant's own interval is honored when larger.
    #[builder(default = DEFAULT_INTERVAL)]
    pub interval: Duration,
    /// Extra wait after the provider answers 429.
    #[builder(default = DEFAULT_RATE_LIMIT_BACKOFF)]
    pub rate_limit_backoff: Duration,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            initial_delay: DEFAULT_INITIAL_DELAY,
            interval: DEFAULT_INTERVAL,
            rate_limit_backoff: DEFAULT_RATE_LIMIT_BACKOFF,
        }
    }
}

impl PollPolicy {
    /// Wait before the next poll after a non-terminal `outcome`.
    pub fn delay_after(&self, outcome: &DeviceCodePoll, grant: &DeviceCodeGrant) -> Duration {
        let base = self.interval.max(Duration::from_secs(grant.interval));
        match outcome {
            DeviceCodePoll::SlowDown => base + self.rate_limit_backoff,
            _ => base,
        }
    }
}

/// What to do when the refresh endpoint answers anything but 200.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum RefreshFailurePolicy {
    /// Return the previously stored access token.
    #[default]
    UseStaleToken,
    /// Fail with [`AuthError::RefreshFailed`](super::AuthError::RefreshFailed).
    Propagate,
    /// Run the full device flow instead.
    DeviceFlow,
}
