use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use super::error::AuthError;
use super::token::{now_ms, TokenRecord};

/// Durable persistence for the single managed [`TokenRecord`].
///
/// Implementations are addressed by a storage key fixed at construction
/// time; the trait itself deals with exactly one logical record. Absence is
/// `Ok(None)`, never an error, and `delete` on an absent record is a no-op.
#[async_trait]
pub trait TokenStore: Send + Sync {
    async fn save(&self, record: &TokenRecord) -> Result<(), AuthError>;
    async fn load(&self) -> Result<Option<TokenRecord>, AuthError>;
    async fn delete(&self) -> Result<(), AuthError>;
}

/// On-disk document shape: the logical record plus a storage-internal
/// `updatedAt` stamp that is stripped on read.
#[derive(Debug, Serialize, Deserialize)]
struct StoredRecord {
    #[serde(flatten)]
    record: TokenRecord,
    #[serde(rename = "updatedAt")]
    updated_at: i64,
}

/// JSON-file-backed token store.
///
/// # Example
/// ```no_run
/// use tycho::auth::FileTokenStore;
///
/// let store = FileTokenStore::new(FileTokenStore::default_path("default"));
/// ```
#[derive(Debug, Clone)]
pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Default location for a given storage key: `~/.tycho/<key>.json`.
    pub fn default_path(key: &str) -> PathBuf {
        directories::UserDirs::new()
            .map(|dirs| dirs.home_dir().join(".tycho"))
            .unwrap_or_else(|| PathBuf::from(".tycho"))
            .join(format!("{key}.json"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl TokenStore for FileTokenStore {
    async fn save(&self, record: &TokenRecord) -> Result<(), AuthError> {
        let stored = StoredRecord {
            record: record.clone(),
            updated_at: now_ms(),
        };
        let serialized = serde_json::to_vec_pretty(&stored)?;
        atomic_write(&self.path, &serialized)
    }

    async fn load(&self) -> Result<Option<TokenRecord>, AuthError> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(data) => data,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(AuthError::Storage(err.to_string())),
        };
        let stored: StoredRecord =
            serde_json::from_str(&raw).map_err(|err| AuthError::Storage(err.to_string()))?;
        Ok(Some(stored.record))
    }

    async fn delete(&self) -> Result<(), AuthError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(AuthError::Storage(err.to_string())),
        }
    }
}

/// In-memory token store for tests and local development.
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    slot: RwLock<Option<TokenRecord>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TokenStore for MemoryTokenStore {
    async fn save(&self, record: &TokenRecord) -> Result<(), AuthError> {
        *self.slot.write().await = Some(record.clone());
        Ok(())
    }

    async fn load(&self) -> Result<Option<TokenRecord>, AuthError> {
        Ok(self.slot.read().await.clone())
    }

    async fn delete(&self) -> Result<(), AuthError> {
        *self.slot.write().await = None;
        Ok(())
    }
}

/// Write via a temp file and rename so a crash never leaves a torn record,
/// with owner-only permissions on Unix.
fn atomic_write(path: &Path, data: &[u8]) -> Result<(), AuthError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|err| AuthError::Storage(err.to_string()))?;
        }
    }

    let file_name = path
        .file_name()
        .ok_or_else(|| AuthError::Storage(format!("token path {} has no file name", path.display())))?;
    let temp_name = format!(
        ".{}.tmp-{}-{}",
        file_name.to_string_lossy(),
        std::process::id(),
        now_ms()
    );
    let temp_path = path.with_file_name(temp_name);

    let mut options = fs::OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }

    let write_result = (|| -> std::io::Result<()> {
        let mut temp_file = options.open(&temp_path)?;
        temp_file.write_all(data)?;
        temp_file.sync_all()?;
        Ok(())
    })();

    if let Err(err) = write_result {
        let _ = fs::remove_file(&temp_path);
        return Err(AuthError::Storage(err.to_string()));
    }

    if let Err(err) = fs::rename(&temp_path, path) {
        let _ = fs::remove_file(&temp_path);
        return Err(AuthError::Storage(err.to_string()));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sample_record() -> TokenRecord {
        TokenRecord {
            access_token: "access".to_string(),
            refresh_token: Some("refresh".to_string()),
            expiry_date: Some(1_700_000_000_000),
            token_type: Some("Bearer".to_string()),
            scope: Some("openid email".to_string()),
            id_token: None,
            session_expiry: Some(1_707_776_000_000),
        }
    }

    fn temp_store() -> (TempDir, FileTokenStore) {
        let dir = TempDir::new().unwrap();
        let store = FileTokenStore::new(dir.path().join("default.json"));
        (dir, store)
    }

    #[tokio::test]
    async fn round_trip_strips_updated_at() {
        let (_dir, store) = temp_store();
        store.save(&sample_record()).await.unwrap();

        let raw = fs::read_to_string(store.path()).unwrap();
        assert!(raw.contains("updatedAt"));

        let loaded = store.load().await.unwrap().unwrap();
        assert_eq!(loaded, sample_record());
    }

    #[tokio::test]
    async fn load_absent_returns_none() {
        let (_dir, store) = temp_store();
        assert!(store.load().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn save_overwrites_whole_record() {
        let (_dir, store) = temp_store();
        store.save(&sample_record()).await.unwrap();

        let mut replacement = sample_record();
        replacement.access_token = "next".to_string();
        replacement.refresh_token = None;
        store.save(&replacement).await.unwrap();

        let loaded = store.load().await.unwrap().unwrap();
        assert_eq!(loaded.access_token, "next");
        assert!(loaded.refresh_token.is_none());
    }

    #[tokio::test]
    async fn delete_is_idempotent() {
        let (_dir, store) = temp_store();
        store.delete().await.unwrap();
        store.save(&sample_record()).await.unwrap();
        store.delete().await.unwrap();
        store.delete().await.unwrap();
        assert!(store.load().await.unwrap().is_none());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn token_file_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;
        let (_dir, store) = temp_store();
        store.save(&sample_record()).await.unwrap();
        let mode = fs::metadata(store.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[tokio::test]
    async fn memory_store_round_trip_and_delete() {
        let store = MemoryTokenStore::new();
        assert!(store.load().await.unwrap().is_none());
        store.save(&sample_record()).await.unwrap();
        assert_eq!(store.load().await.unwrap().unwrap(), sample_record());
        store.delete().await.unwrap();
        store.delete().await.unwrap();
        assert!(store.load().await.unwrap().is_none());
    }
}
