//! OAuth device-code flow and token storage.

pub mod clock;
pub mod controller;
pub mod device_code;
pub mod error;
pub mod policy;
pub mod prompt;
pub mod store;
pub mod token;

pub use clock::{Clock, SystemClock};
pub use controller::{assess, AuthState, ClientCredentials, DeviceAuthController};
pub use device_code::{DeviceCodeGrant, DeviceCodePoll};
pub use error::AuthError;
pub use policy::{PollPolicy, RefreshFailurePolicy};
pub use prompt::{DevicePrompt, StderrPrompt};
pub use store::{FileTokenStore, TokenStore, TokenStoreConfig};
pub use token::{TokenRecord, TokenResponse};
