//! CLI entry point for trakt-auth.

pub mod api;
pub mod auth;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::TraktConfig;
use crate::error::TraktError;

/// Trakt device-code authentication CLI
#[derive(Parser, Debug)]
#[command(name = "trakt-auth", version, about = "Trakt OAuth device-code client")]
pub struct Cli {
    /// Config file (defaults to ~/.trakt-auth/config.toml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Authentication management
    Auth(AuthArgs),
    /// Authenticated GET request, prints the JSON response
    Get(GetArgs),
    /// Authenticated POST request, prints the JSON response
    Post(PostArgs),
}

/// Arguments for the `auth` subcommand group.
#[derive(Parser, Debug)]
pub struct AuthArgs {
    #[command(subcommand)]
    pub command: AuthCommands,
}

/// Auth subcommands.
#[derive(Subcommand, Debug)]
pub enum AuthCommands {
    /// Make sure a valid token is stored, authorizing this device if needed
    Login,
    /// Print a valid access token
    Token,
    /// Show the stored token state
    Status,
}

/// Arguments for `trakt-auth get`.
#[derive(Parser, Debug)]
pub struct GetArgs {
    /// API path, e.g. users/settings
    pub path: String,
}

/// Arguments for `trakt-auth post`.
#[derive(Parser, Debug)]
pub struct PostArgs {
    /// API path, e.g. sync/history
    pub path: String,
    /// JSON request body
    pub body: String,
}

impl Cli {
    /// Resolve configuration from `--config` or the default locations.
    pub fn load_config(&self) -> Result<TraktConfig, TraktError> {
        match &self.config {
            Some(path) => TraktConfig::load_from_path(path),
            None => TraktConfig::load(),
        }
    }
}
