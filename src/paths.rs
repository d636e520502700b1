//! Home-directory resolution.

use std::path::{Path, PathBuf};

use crate::auth::AuthError;

/// Resolve the user's home directory.
///
/// `$HOME` wins when set and non-empty, otherwise the platform lookup is used.
pub fn resolve_home_directory() -> Result<PathBuf, AuthError> {
    if let Some(home) = std::env::var_os("HOME").filter(|value| !value.is_empty()) {
        return Ok(PathBuf::from(home));
    }
    directories::UserDirs::new()
        .map(|dirs| dirs.home_dir().to_path_buf())
        .ok_or_else(|| AuthError::HomeDirectory("no home directory for current user".to_string()))
}

/// Replace a leading `~` with the home directory.
pub fn expand_user(path: impl AsRef<Path>) -> Result<PathBuf, AuthError> {
    let path = path.as_ref();
    match path.strip_prefix("~") {
        Ok(rest) => Ok(resolve_home_directory()?.join(rest)),
        Err(_) => Ok(path.to_path_buf()),
    }
}
