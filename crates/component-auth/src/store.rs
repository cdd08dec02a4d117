//! Credential storage for the platform token
//!
//! The manager only depends on the `CredentialStore` contract. Deployments
//! with several processes must back it with shared storage (Redis, a
//! database); `FileStore` and `MemoryStore` cover single-process setups.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;

use tokio::sync::Mutex;
use tracing::{debug, info};
use uuid::Uuid;

use crate::credential::ComponentToken;
use crate::error::{Error, Result};

/// Boxed future returned by collaborator traits.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Load/save pair for the platform token, supplied by the embedding app.
///
/// `load` returns `Ok(None)` when nothing is stored. Errors are reported as
/// any crate `Error`; the manager relabels them (`StoreLoad`, `Persist`).
/// Uses `Pin<Box<dyn Future>>` return types for dyn-compatibility
/// (`Arc<dyn CredentialStore>`).
pub trait CredentialStore: Send + Sync {
    fn load(&self) -> BoxFuture<'_, Result<Option<ComponentToken>>>;

    fn save<'a>(&'a self, token: &'a ComponentToken) -> BoxFuture<'a, Result<()>>;
}

/// Process-local store. Tokens are lost on restart and not shared between
/// processes, so every process mints its own token and invalidates the others.
#[derive(Default)]
pub struct MemoryStore {
    slot: Mutex<Option<ComponentToken>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-seeded with a token.
    pub fn with_token(token: ComponentToken) -> Self {
        Self {
            slot: Mutex::new(Some(token)),
        }
    }
}

impl CredentialStore for MemoryStore {
    fn load(&self) -> BoxFuture<'_, Result<Option<ComponentToken>>> {
        Box::pin(async move { Ok(self.slot.lock().await.clone()) })
    }

    fn save<'a>(&'a self, token: &'a ComponentToken) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            *self.slot.lock().await = Some(token.clone());
            Ok(())
        })
    }
}

/// JSON file holding a single token.
///
/// All writes use atomic temp-file + rename to prevent corruption on crash.
/// A missing file loads as "no token" rather than an error.
pub struct FileStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CredentialStore for FileStore {
    fn load(&self) -> BoxFuture<'_, Result<Option<ComponentToken>>> {
        Box::pin(async move {
            let contents = match tokio::fs::read_to_string(&self.path).await {
                Ok(c) => c,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    debug!(path = %self.path.display(), "token file not found");
                    return Ok(None);
                }
                Err(e) => return Err(Error::Io(format!("reading token file: {e}"))),
            };
            let token = serde_json::from_str(&contents)
                .map_err(|e| Error::CredentialParse(format!("parsing token file: {e}")))?;
            Ok(Some(token))
        })
    }

    fn save<'a>(&'a self, token: &'a ComponentToken) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            let _guard = self.write_lock.lock().await;
            write_atomic(&self.path, token).await?;
            info!(
                path = %self.path.display(),
                expires_at = token.expires_at(),
                "persisted component token"
            );
            Ok(())
        })
    }
}

/// Write the token to a file atomically.
///
/// Writes to a uniquely named temporary file in the same directory, then
/// renames it over the target. Sets 0600 permissions since the file holds a
/// live token.
async fn write_atomic(path: &Path, token: &ComponentToken) -> Result<()> {
    let json = serde_json::to_string_pretty(token)
        .map_err(|e| Error::CredentialParse(format!("serializing token: {e}")))?;

    let dir = path
        .parent()
        .ok_or_else(|| Error::Io("token path has no parent directory".into()))?;

    // Unique per write: other FileStore values may target the same path
    let tmp_path = dir.join(format!(".component-token.tmp.{}", Uuid::new_v4().simple()));

    tokio::fs::write(&tmp_path, json.as_bytes())
        .await
        .map_err(|e| Error::Io(format!("writing temp token file: {e}")))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = std::fs::Permissions::from_mode(0o600);
        tokio::fs::set_permissions(&tmp_path, perms)
            .await
            .map_err(|e| Error::Io(format!("setting token file permissions: {e}")))?;
    }

    if let Err(e) = tokio::fs::rename(&tmp_path, path).await {
        let _ = tokio::fs::remove_file(&tmp_path).await;
        return Err(Error::Io(format!("renaming temp token file: {e}")));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_token(suffix: &str) -> ComponentToken {
        ComponentToken::new(format!("tok_{suffix}"), 1_735_500_000_000)
    }

    #[tokio::test]
    async fn memory_store_starts_empty_and_overwrites() {
        let store = MemoryStore::new();
        assert!(store.load().await.unwrap().is_none());

        store.save(&test_token("1")).await.unwrap();
        store.save(&test_token("2")).await.unwrap();
        assert_eq!(store.load().await.unwrap().unwrap().token(), "tok_2");
    }

    #[tokio::test]
    async fn file_store_missing_file_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().join("token.json"));
        assert!(store.load().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn file_store_roundtrip_across_instances() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("token.json");

        FileStore::new(&path).save(&test_token("1")).await.unwrap();

        let loaded = FileStore::new(&path).load().await.unwrap().unwrap();
        assert_eq!(loaded, test_token("1"));
    }

    #[tokio::test]
    async fn concurrent_saves_from_separate_instances_do_not_collide() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("token.json");
        let first = FileStore::new(&path);
        let second = FileStore::new(&path);

        for round in 0..20 {
            let a = test_token(&format!("a{round}"));
            let b = test_token(&format!("b{round}"));
            let (ra, rb) = tokio::join!(first.save(&a), second.save(&b));
            ra.unwrap();
            rb.unwrap();

            let loaded = first.load().await.unwrap().unwrap();
            assert!(loaded == a || loaded == b, "got: {loaded:?}");
        }

        // Only the target remains; no temp files are left behind
        let mut entries = tokio::fs::read_dir(dir.path()).await.unwrap();
        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await.unwrap() {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
        assert_eq!(names, vec!["token.json"]);
    }

    #[tokio::test]
    async fn file_store_rejects_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("token.json");
        tokio::fs::write(&path, "not json").await.unwrap();

        let err = FileStore::new(&path).load().await.unwrap_err();
        assert!(matches!(err, Error::CredentialParse(_)), "got: {err:?}");
    }

    #[tokio::test]
    async fn file_store_save_fails_without_directory() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().join("missing").join("token.json"));
        let err = store.save(&test_token("1")).await.unwrap_err();
        assert!(matches!(err, Error::Io(_)), "got: {err:?}");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn file_permissions_are_0600() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("token.json");
        FileStore::new(&path).save(&test_token("1")).await.unwrap();

        let metadata = tokio::fs::metadata(&path).await.unwrap();
        let mode = metadata.permissions().mode() & 0o777;
        assert_eq!(mode, 0o600, "token file must be 0600, got {mode:o}");
    }
}
