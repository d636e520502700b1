//! trakt-auth — Trakt OAuth device-code client
//!
//! Obtains a Trakt access token through the OAuth device-authorization
//! grant, persists it to a private file in the home directory, refreshes it
//! well before it expires, and attaches it to API requests.
//!
//! # Quick Start
//!
//! ```no_run
//! use trakt_auth::config::TraktConfig;
//!
//! # async fn example() -> trakt_auth::error::Result<()> {
//! let client = TraktConfig::load()?.client()?;
//! let watched: serde_json::Value = client.get("sync/watched/shows").await?;
//! println!("{watched}");
//! # Ok(())
//! # }
//! ```

pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod paths;
pub mod prelude;

#[cfg(feature = "cli")]
pub mod cli;
