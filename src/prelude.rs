//! Convenience re-exports for common use.

pub use crate::auth::{
    AuthError, AuthState, ClientCredentials, DeviceAuthController, FileTokenStore, TokenRecord,
    TokenStore,
};
pub use crate::client::TraktClient;
pub use crate::config::TraktConfig;
pub use crate::error::{Result, TraktError};
