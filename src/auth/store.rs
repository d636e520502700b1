use std::fs;
use std::io::Write;
#[cfg(unix)]
use std::os::unix::fs::OpenOptionsExt;
use std::path::{Path, PathBuf};

use super::error::AuthError;
use super::token::TokenRecord;
use crate::paths;

/// File name of the token file under the home directory.
pub const DEFAULT_TOKEN_FILE_NAME: &str = ".trakt-auth.json";

/// Storage abstraction for the persisted token set.
pub trait TokenStore: Send + Sync {
    /// Fails with [`AuthError::NoTokenFile`] or [`AuthError::CorruptTokenFile`]
    /// when nothing usable is stored.
    fn load(&self) -> Result<TokenRecord, AuthError>;
    fn save(&self, record: &TokenRecord) -> Result<(), AuthError>;
    fn path(&self) -> Option<&Path> {
        None
    }
}

/// Configuration for file-backed token storage.
#[derive(Debug, Clone)]
pub struct TokenStoreConfig {
    pub path: PathBuf,
}

impl TokenStoreConfig {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// `$HOME/.trakt-auth.json`.
    pub fn default_path() -> Result<PathBuf, AuthError> {
        let home = paths::resolve_home_directory()?;
        Ok(home.join(DEFAULT_TOKEN_FILE_NAME))
    }
}

/// File-backed token store holding a single JSON record.
///
/// # Example
/// ```no_run
/// use trakt_auth::auth::{FileTokenStore, TokenRecord, TokenStore};
///
/// let store = FileTokenStore::new_default()?;
/// store.save(&TokenRecord {
///     access_token: "access".to_string(),
///     refresh_token: "refresh".to_string(),
///     expires_in: 7_776_000,
///     created_at: 1_700_000_000,
/// })?;
/// # Ok::<(), trakt_auth::auth::AuthError>(())
/// ```
#[derive(Debug, Clone)]
pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    pub fn new(config: TokenStoreConfig) -> Self {
        Self { path: config.path }
    }

    pub fn new_default() -> Result<Self, AuthError> {
        Ok(Self {
            path: TokenStoreConfig::default_path()?,
        })
    }
}

impl TokenStore for FileTokenStore {
    fn load(&self) -> Result<TokenRecord, AuthError> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(data) => data,
            Err(err) => {
                tracing::debug!(path = %self.path.display(), error = %err, "token file not readable");
                return Err(AuthError::NoTokenFile);
            }
        };
        serde_json::from_str(&raw).map_err(|err| AuthError::CorruptTokenFile(err.to_string()))
    }

    fn save(&self, record: &TokenRecord) -> Result<(), AuthError> {
        let serialized = serde_json::to_vec_pretty(record)?;
        write_private(&self.path, &serialized)?;
        tracing::debug!(path = %self.path.display(), "token file written");
        Ok(())
    }

    fn path(&self) -> Option<&Path> {
        Some(&self.path)
    }
}

/// Replace `path` by renaming a freshly written owner-only sibling over it.
fn write_private(path: &Path, data: &[u8]) -> Result<(), AuthError> {
    if let Some(parent) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let mut temp_path = path.as_os_str().to_owned();
    temp_path.push(format!(".tmp-{}", std::process::id()));
    let temp_path = PathBuf::from(temp_path);

    let mut options = fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    options.mode(0o600);

    let written = options
        .open(&temp_path)
        .and_then(|mut file| file.write_all(data).and_then(|()| file.sync_all()))
        .and_then(|()| fs::rename(&temp_path, path));
    if let Err(err) = written {
        let _ = fs::remove_file(&temp_path);
        return Err(err.into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn temp_store() -> (TempDir, FileTokenStore) {
        let dir = TempDir::new().unwrap();
        let store = FileTokenStore::new(TokenStoreConfig::new(dir.path().join("tokens.json")));
        (dir, store)
    }

    fn record(access: &str) -> TokenRecord {
        TokenRecord {
            access_token: access.to_string(),
            refresh_token: "refresh".to_string(),
            expires_in: 7_776_000,
            created_at: 1_700_000_000,
        }
    }

    #[test]
    fn token_round_trip_works() {
        let (_dir, store) = temp_store();
        store.save(&record("access")).unwrap();
        assert_eq!(store.load().unwrap(), record("access"));
    }

    #[test]
    fn save_replaces_longer_prior_content() {
        let (_dir, store) = temp_store();
        let mut long = record("a-much-longer-access-token-than-the-next-one");
        long.refresh_token = "r".repeat(256);
        store.save(&long).unwrap();
        store.save(&record("short")).unwrap();
        assert_eq!(store.load().unwrap(), record("short"));
    }

    #[test]
    fn missing_file_is_no_token_file() {
        let (_dir, store) = temp_store();
        assert!(matches!(store.load(), Err(AuthError::NoTokenFile)));
    }

    #[test]
    fn garbage_file_is_corrupt() {
        let (_dir, store) = temp_store();
        fs::write(store.path().unwrap(), b"{\"access_token\": ").unwrap();
        assert!(matches!(store.load(), Err(AuthError::CorruptTokenFile(_))));
    }

    #[test]
    fn save_creates_parent_directory() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("tokens.json");
        let store = FileTokenStore::new(TokenStoreConfig::new(path.clone()));
        store.save(&record("access")).unwrap();
        assert!(path.exists());
    }

    #[cfg(unix)]
    #[test]
    fn saved_file_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let (_dir, store) = temp_store();
        store.save(&record("access")).unwrap();
        let mode = fs::metadata(store.path().unwrap())
            .unwrap()
            .permissions()
            .mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[cfg(unix)]
    #[test]
    fn save_tightens_permissions_of_existing_file() {
        use std::os::unix::fs::PermissionsExt;

        let (_dir, store) = temp_store();
        let path = store.path().unwrap().to_path_buf();
        fs::write(&path, b"{}").unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o644)).unwrap();
        store.save(&record("access")).unwrap();
        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn save_leaves_no_temp_file_behind() {
        let (dir, store) = temp_store();
        store.save(&record("access")).unwrap();
        let names: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name())
            .collect();
        assert_eq!(names, vec![std::ffi::OsString::from("tokens.json")]);
    }

    #[test]
    fn save_into_unwritable_location_fails() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, b"file, not a directory").unwrap();
        let store = FileTokenStore::new(TokenStoreConfig::new(blocker.join("tokens.json")));
        assert!(matches!(store.save(&record("access")), Err(AuthError::Io(_))));
    }
}
