//! Local file backend
//!
//! Stores state as pretty-printed JSON (default `stratus.state.json`) next to a
//! `.lock` file holding the current [`LockInfo`].

use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::backend::{BackendConfig, BackendError, BackendResult, StateBackend};
use crate::lock::{DEFAULT_LOCK_TIMEOUT_SECS, LockInfo};
use crate::state::StateFile;

pub struct LocalBackend {
    state_path: PathBuf,
    lock_path: PathBuf,
    lock_timeout_secs: i64,
}

impl LocalBackend {
    pub const DEFAULT_STATE_FILE: &'static str = "stratus.state.json";

    pub fn new() -> Self {
        Self::with_path(PathBuf::from(Self::DEFAULT_STATE_FILE))
    }

    pub fn with_path(state_path: PathBuf) -> Self {
        let lock_path = state_path.with_extension("lock");
        Self {
            state_path,
            lock_path,
            lock_timeout_secs: DEFAULT_LOCK_TIMEOUT_SECS,
        }
    }

    /// Reads `path` and `lock_timeout_seconds`
    pub fn from_config(config: &BackendConfig) -> BackendResult<Self> {
        let path = config
            .get_string("path")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(Self::DEFAULT_STATE_FILE));
        if path.as_os_str().is_empty() {
            return Err(BackendError::configuration("path must not be empty"));
        }

        let mut backend = Self::with_path(path);
        if let Some(timeout) = config.get_int("lock_timeout_seconds") {
            if timeout <= 0 {
                return Err(BackendError::configuration(
                    "lock_timeout_seconds must be positive",
                ));
            }
            backend.lock_timeout_secs = timeout;
        }
        Ok(backend)
    }

    pub fn state_path(&self) -> &Path {
        &self.state_path
    }

    fn read_lock(&self) -> BackendResult<Option<LockInfo>> {
        let content = match fs::read_to_string(&self.lock_path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(BackendError::Io(format!("Failed to read lock file: {}", e))),
        };
        serde_json::from_str(&content)
            .map(Some)
            .map_err(|e| BackendError::InvalidState(format!("Failed to parse lock file: {}", e)))
    }

    fn remove_lock(&self) -> BackendResult<()> {
        fs::remove_file(&self.lock_path)
            .map_err(|e| BackendError::Io(format!("Failed to remove lock file: {}", e)))
    }
}

impl Default for LocalBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StateBackend for LocalBackend {
    async fn read_state(&self) -> BackendResult<Option<StateFile>> {
        let content = match fs::read_to_string(&self.state_path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(BackendError::Io(format!("Failed to read state file: {}", e))),
        };

        let state: StateFile = serde_json::from_str(&content).map_err(|e| {
            BackendError::InvalidState(format!("Failed to parse state file: {}", e))
        })?;
        if state.version > StateFile::CURRENT_VERSION {
            return Err(BackendError::InvalidState(format!(
                "state file version {} is newer than supported version {}",
                state.version,
                StateFile::CURRENT_VERSION
            )));
        }
        Ok(Some(state))
    }

    async fn write_state(&self, state: &StateFile) -> BackendResult<()> {
        if let Some(stored) = self.read_state().await? {
            if stored.lineage != state.lineage {
                return Err(BackendError::LineageMismatch {
                    expected: stored.lineage,
                    actual: state.lineage.clone(),
                });
            }
            if stored.serial > state.serial {
                return Err(BackendError::StaleSerial {
                    stored: stored.serial,
                    writing: state.serial,
                });
            }
        }

        let content = serde_json::to_string_pretty(state).map_err(|e| {
            BackendError::Serialization(format!("Failed to serialize state: {}", e))
        })?;

        // write-then-rename keeps the previous state intact on failure
        let tmp_path = self.state_path.with_extension("json.tmp");
        fs::write(&tmp_path, content)
            .map_err(|e| BackendError::Io(format!("Failed to write state file: {}", e)))?;
        fs::rename(&tmp_path, &self.state_path)
            .map_err(|e| BackendError::Io(format!("Failed to replace state file: {}", e)))?;

        log::debug!(
            "wrote state serial {} to {}",
            state.serial,
            self.state_path.display()
        );
        Ok(())
    }

    async fn acquire_lock(&self, operation: &str) -> BackendResult<LockInfo> {
        if let Some(existing) = self.read_lock()? {
            if !existing.is_expired() {
                return Err(BackendError::locked(&existing));
            }
            log::warn!(
                "removing expired lock {} held by {} since {}",
                existing.id,
                existing.who,
                existing.created
            );
            self.remove_lock()?;
        }

        let lock = LockInfo::with_timeout(operation, self.lock_timeout_secs);
        let content = serde_json::to_string_pretty(&lock)
            .map_err(|e| BackendError::Serialization(format!("Failed to serialize lock: {}", e)))?;

        // another run may have taken the lock since the check above
        let mut file = match OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&self.lock_path)
        {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                return match self.read_lock()? {
                    Some(holder) => Err(BackendError::locked(&holder)),
                    None => Err(BackendError::Io("lock file appeared and vanished".to_string())),
                };
            }
            Err(e) => return Err(BackendError::Io(format!("Failed to create lock file: {}", e))),
        };
        file.write_all(content.as_bytes())
            .map_err(|e| BackendError::Io(format!("Failed to write lock file: {}", e)))?;

        Ok(lock)
    }

    async fn release_lock(&self, lock: &LockInfo) -> BackendResult<()> {
        let existing = self
            .read_lock()?
            .ok_or_else(|| BackendError::LockNotFound(lock.id.clone()))?;
        if existing.id != lock.id {
            return Err(BackendError::LockMismatch {
                expected: lock.id.clone(),
                actual: existing.id,
            });
        }
        self.remove_lock()
    }

    async fn force_unlock(&self, lock_id: &str) -> BackendResult<()> {
        let existing = self
            .read_lock()?
            .ok_or_else(|| BackendError::LockNotFound(lock_id.to_string()))?;
        if existing.id != lock_id {
            return Err(BackendError::LockMismatch {
                expected: lock_id.to_string(),
                actual: existing.id,
            });
        }
        self.remove_lock()
    }

    async fn init(&self) -> BackendResult<()> {
        match self.state_path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => fs::create_dir_all(dir)
                .map_err(|e| BackendError::Io(format!("Failed to create state directory: {}", e))),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::ResourceState;
    use stratus_core::resource::Value;
    use tempfile::tempdir;

    #[tokio::test]
    async fn read_write() {
        let dir = tempdir().unwrap();
        let backend = LocalBackend::with_path(dir.path().join("test.state.json"));
        assert!(backend.read_state().await.unwrap().is_none());

        let mut state = StateFile::new();
        state.upsert_resource(ResourceState::new("azurerm_dns_zone", "main", "azurerm"));
        state.increment_serial();
        backend.write_state(&state).await.unwrap();

        let read = backend.read_state().await.unwrap().unwrap();
        assert_eq!(read.serial, 1);
        assert_eq!(read.resources.len(), 1);
        assert!(!dir.path().join("test.state.json.tmp").exists());
    }

    #[tokio::test]
    async fn refuses_other_lineage_and_stale_serial() {
        let dir = tempdir().unwrap();
        let backend = LocalBackend::with_path(dir.path().join("test.state.json"));

        let mut state = StateFile::new();
        state.increment_serial();
        state.increment_serial();
        backend.write_state(&state).await.unwrap();

        let other = StateFile::new();
        assert!(matches!(
            backend.write_state(&other).await,
            Err(BackendError::LineageMismatch { .. })
        ));

        let mut stale = state.clone();
        stale.serial = 1;
        assert!(matches!(
            backend.write_state(&stale).await,
            Err(BackendError::StaleSerial { stored: 2, writing: 1 })
        ));
    }

    #[tokio::test]
    async fn rejects_corrupt_state() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.state.json");
        fs::write(&path, "{not json").unwrap();
        let backend = LocalBackend::with_path(path);
        assert!(matches!(
            backend.read_state().await,
            Err(BackendError::InvalidState(_))
        ));
    }

    #[tokio::test]
    async fn locking() {
        let dir = tempdir().unwrap();
        let backend = LocalBackend::with_path(dir.path().join("test.state.json"));

        let lock = backend.acquire_lock("apply").await.unwrap();
        assert_eq!(lock.operation, "apply");
        assert!(dir.path().join("test.state.lock").exists());

        let err = backend.acquire_lock("destroy").await.unwrap_err();
        assert!(matches!(err, BackendError::Locked { ref operation, .. } if operation == "apply"));

        backend.release_lock(&lock).await.unwrap();
        let again = backend.acquire_lock("destroy").await.unwrap();
        assert!(matches!(
            backend.release_lock(&lock).await,
            Err(BackendError::LockMismatch { .. })
        ));
        backend.release_lock(&again).await.unwrap();
    }

    #[tokio::test]
    async fn expired_lock_is_taken_over() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.state.json");
        let stale = LockInfo::with_timeout("apply", -1);
        fs::write(
            path.with_extension("lock"),
            serde_json::to_string(&stale).unwrap(),
        )
        .unwrap();

        let backend = LocalBackend::with_path(path);
        let lock = backend.acquire_lock("apply").await.unwrap();
        assert_ne!(lock.id, stale.id);
    }

    #[tokio::test]
    async fn force_unlock_checks_the_id() {
        let dir = tempdir().unwrap();
        let backend = LocalBackend::with_path(dir.path().join("test.state.json"));
        let lock = backend.acquire_lock("apply").await.unwrap();

        assert!(matches!(
            backend.force_unlock("other").await,
            Err(BackendError::LockMismatch { .. })
        ));
        backend.force_unlock(&lock.id).await.unwrap();
        assert!(matches!(
            backend.force_unlock(&lock.id).await,
            Err(BackendError::LockNotFound(_))
        ));
    }

    #[tokio::test]
    async fn init_creates_parent_directory() {
        let dir = tempdir().unwrap();
        let backend = LocalBackend::with_path(dir.path().join("nested/env/test.state.json"));
        backend.init().await.unwrap();
        assert!(dir.path().join("nested/env").is_dir());
    }

    #[test]
    fn from_config() {
        let backend = LocalBackend::from_config(&BackendConfig::local("custom.state.json")).unwrap();
        assert_eq!(backend.state_path(), Path::new("custom.state.json"));

        let mut config = BackendConfig::local("custom.state.json");
        config
            .attributes
            .insert("lock_timeout_seconds".to_string(), Value::Int(0));
        assert!(LocalBackend::from_config(&config).is_err());

        let default = LocalBackend::from_config(&BackendConfig {
            backend_type: "local".to_string(),
            attributes: Default::default(),
        })
        .unwrap();
        assert_eq!(default.state_path(), Path::new("stratus.state.json"));
    }
}
