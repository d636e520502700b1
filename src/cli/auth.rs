//! CLI auth command handlers for login, token, and status.

use crate::auth::AuthState;
use crate::config::TraktConfig;

/// Handle `trakt-auth auth login`.
pub async fn handle_login(config: &TraktConfig) -> Result<(), Box<dyn std::error::Error>> {
    let controller = config.controller()?;
    controller.access_token().await?;
    match controller.state() {
        AuthState::HaveValid => println!("✅ Already logged in"),
        _ => println!("✅ Trakt login successful!"),
    }
    Ok(())
}

/// Handle `trakt-auth auth token`.
pub async fn handle_token(config: &TraktConfig) -> Result<(), Box<dyn std::error::Error>> {
    let controller = config.controller()?;
    let token = controller.access_token().await?;
    println!("{token}");
    Ok(())
}

/// Handle `trakt-auth auth status`.
pub async fn handle_status(config: &TraktConfig) -> Result<(), Box<dyn std::error::Error>> {
    let path = config.token_path()?;
    println!("🔐 Authentication Status\n");
    println!("  Token file: {}", path.display());

    match config.controller() {
        Ok(controller) => {
            let (record, state) = controller.assess_stored()?;
            let status = match state {
                AuthState::HaveValid => "✅ Logged in".to_string(),
                AuthState::HaveExpiredRefreshable => {
                    "⚠️  Token near expiry (will refresh on next use)".to_string()
                }
                _ => "❌ Not logged in".to_string(),
            };
            println!("  State: {status}");
            if record.has_credentials() {
                if let Some(expires) = record.expires_at() {
                    println!("  Expires: {}", expires.format("%Y-%m-%d %H:%M"));
                }
            }
        }
        Err(e) => println!("  ⚠️  {e}"),
    }

    println!("\n📌 Environment Variables:");
    for env_key in ["TRAKT_CLIENT_ID", "TRAKT_CLIENT_SECRET"] {
        let status = if std::env::var(env_key).is_ok() {
            "✅ Set"
        } else {
            "❌ Not set"
        };
        println!("  {env_key}: {status}");
    }

    Ok(())
}
