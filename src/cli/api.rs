//! CLI handlers for raw API requests.

use crate::config::TraktConfig;

/// Handle `trakt-auth get <path>`.
pub async fn handle_get(
    config: &TraktConfig,
    path: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let client = config.client()?;
    let value: serde_json::Value = client.get(path).await?;
    println!("{}", serde_json::to_string_pretty(&value)?);
    Ok(())
}

/// Handle `trakt-auth post <path> <body>`.
pub async fn handle_post(
    config: &TraktConfig,
    path: &str,
    body: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let body: serde_json::Value =
        serde_json::from_str(body).map_err(|e| format!("Request body is not valid JSON: {e}"))?;
    let client = config.client()?;
    let value: serde_json::Value = client.post(path, &body).await?;
    println!("{}", serde_json::to_string_pretty(&value)?);
    Ok(())
}
