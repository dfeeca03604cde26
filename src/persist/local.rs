//! Local file-based artifact store.
//!
//! Each artifact is one pretty-printed JSON file at
//! `{base}/{namespace}/{name}.json`. Every write runs under an exclusive lock
//! file, compares version tokens, then writes through a temporary file and an
//! atomic rename. A busy lock is reported as a conflict so the caller's retry
//! policy handles contention.
//!
//! A lock is published fully written by hard-linking a staged file into
//! place. Taking over an expired lock and releasing a lock both run under a
//! short-lived guard file, and only remove the lock if its content is still
//! the content that was observed.

use async_trait::async_trait;
use chrono::Utc;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{PersistError, Result, SynthError};

use super::artifact::{Artifact, artifact_key};
use super::lock::{LOCK_EXPIRY_SECS, LockInfo, generate_holder_id};
use super::store::ArtifactStore;

/// Default store directory name.
const STORE_DIR: &str = ".registry-synth";

/// Suffix of the guard file next to a lock file.
const GUARD_SUFFIX: &str = "guard";

/// Attempts made to obtain a guard before giving up.
const GUARD_ATTEMPTS: u32 = 200;

/// Pause between guard attempts.
const GUARD_RETRY_DELAY: Duration = Duration::from_millis(1);

/// Local file-based artifact store.
#[derive(Debug)]
pub struct LocalArtifactStore {
    /// Base directory for artifact files.
    base_dir: PathBuf,
    /// Holder identifier written into lock files.
    holder: String,
}

/// Observed state of a lock file.
#[derive(Debug)]
enum LockState {
    /// No lock file.
    Free,
    /// A live lock.
    Held(LockInfo),
    /// An expired or abandoned lock, identified by its raw content.
    Stale(String),
}

impl LocalArtifactStore {
    /// Creates a new local store under `./.registry-synth`.
    ///
    /// # Errors
    ///
    /// Returns an error if the current directory cannot be determined.
    pub fn new() -> Result<Self> {
        let base_dir = std::env::current_dir()
            .map_err(|e| SynthError::internal(format!("Cannot determine current directory: {e}")))?
            .join(STORE_DIR);

        Ok(Self::with_base_dir(base_dir))
    }

    /// Creates a new local store with a custom base directory.
    #[must_use]
    pub fn with_base_dir(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
            holder: generate_holder_id(),
        }
    }

    /// Returns the base directory.
    #[must_use]
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Returns the file path of an artifact.
    ///
    /// # Errors
    ///
    /// Returns an error if the namespace or name is not a single path segment.
    pub fn artifact_path(&self, namespace: &str, name: &str) -> Result<PathBuf> {
        Ok(self.namespace_dir(namespace, name)?.join(format!("{name}.json")))
    }

    fn lock_path(&self, namespace: &str, name: &str) -> Result<PathBuf> {
        Ok(self.namespace_dir(namespace, name)?.join(format!("{name}.lock")))
    }

    fn namespace_dir(&self, namespace: &str, name: &str) -> Result<PathBuf> {
        let key = artifact_key(namespace, name);
        check_segment("namespace", namespace, &key)?;
        check_segment("name", name, &key)?;
        Ok(self.base_dir.join(namespace))
    }

    /// Ensures the namespace directory exists.
    async fn ensure_dir(&self, namespace: &str, key: &str) -> Result<()> {
        let dir = self.base_dir.join(namespace);
        if !dir.exists() {
            debug!("Creating store directory: {}", dir.display());
            fs::create_dir_all(&dir)
                .await
                .map_err(|e| PersistError::backend("prepare", key, format!("failed to create directory: {e}")))?;
        }
        Ok(())
    }

    /// Acquires the lock file, taking over an expired one.
    async fn acquire_lock(&self, key: &str, lock_path: &Path) -> Result<LockInfo> {
        let info = LockInfo::new(&self.holder);
        let content = serde_json::to_string(&info)
            .map_err(|e| PersistError::serialization(format!("Failed to serialize lock: {e}")))?;

        for _ in 0..2 {
            if publish_lock(key, lock_path, &info, &content).await? {
                return Ok(info);
            }

            match read_lock_state(key, lock_path).await? {
                LockState::Free => {}
                LockState::Held(existing) => {
                    return Err(PersistError::conflict(
                        key,
                        format!(
                            "locked by {} since {} (expires in {}s)",
                            existing.holder,
                            existing.acquired_at.to_rfc3339(),
                            existing.remaining_secs()
                        ),
                    )
                    .into());
                }
                LockState::Stale(observed) => {
                    debug!("Expired lock found for {key}, taking over");
                    self.take_over(key, lock_path, &observed).await?;
                }
            }
        }

        Err(PersistError::conflict(key, "lock was taken by another writer").into())
    }

    /// Removes the stale lock whose content was `observed`, unless another
    /// writer replaced it in the meantime.
    async fn take_over(&self, key: &str, lock_path: &Path, observed: &str) -> Result<()> {
        let guard = sibling(lock_path, GUARD_SUFFIX);
        let lock_err = |e: std::io::Error| PersistError::backend("lock", key, e.to_string());

        if !acquire_guard(&guard).await.map_err(lock_err)? {
            return Err(PersistError::conflict(key, "lock takeover in progress").into());
        }

        let removed = remove_if_unchanged(lock_path, observed).await;
        let released = remove_if_exists(&guard).await;

        if !removed.map_err(lock_err)? {
            debug!("Lock for {key} changed before takeover, leaving it in place");
        }
        released.map_err(lock_err)?;
        Ok(())
    }

    /// Releases the lock if it is still ours.
    async fn release_lock(&self, key: &str, lock_path: &Path, lock: &LockInfo) -> Result<()> {
        let content = serde_json::to_string(lock)
            .map_err(|e| PersistError::serialization(format!("Failed to serialize lock: {e}")))?;
        let guard = sibling(lock_path, GUARD_SUFFIX);
        let unlock_err = |e: std::io::Error| PersistError::backend("unlock", key, e.to_string());

        if !acquire_guard(&guard).await.map_err(unlock_err)? {
            warn!(
                "Could not release lock for {key}, it expires in {}s",
                lock.remaining_secs()
            );
            return Ok(());
        }

        let removed = remove_if_unchanged(lock_path, &content).await;
        let released = remove_if_exists(&guard).await;

        if !removed.map_err(unlock_err)? {
            debug!("Lock for {key} is no longer {}, leaving it in place", lock.lock_id);
        }
        released.map_err(unlock_err)?;
        Ok(())
    }

    async fn read_artifact(&self, path: &Path, key: &str) -> Result<Option<Artifact>> {
        let content = match fs::read_to_string(path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(PersistError::backend("get", key, format!("failed to read artifact file: {e}")).into());
            }
        };

        let artifact = serde_json::from_str(&content)
            .map_err(|e| PersistError::serialization(format!("Failed to parse artifact {key}: {e}")))?;
        Ok(Some(artifact))
    }

    /// Writes to a temporary file first, then renames for atomicity.
    async fn write_artifact(&self, path: &Path, key: &str, artifact: &Artifact) -> Result<()> {
        let content = serde_json::to_string_pretty(artifact)
            .map_err(|e| PersistError::serialization(format!("Failed to serialize artifact {key}: {e}")))?;

        let temp_path = path.with_extension("json.tmp");
        let write_err = |e: std::io::Error| PersistError::backend("write", key, e.to_string());

        let mut file = fs::File::create(&temp_path).await.map_err(write_err)?;
        file.write_all(content.as_bytes()).await.map_err(write_err)?;
        file.sync_all().await.map_err(write_err)?;
        fs::rename(&temp_path, path).await.map_err(write_err)?;

        Ok(())
    }

    async fn create_locked(&self, artifact: &Artifact, path: &Path, key: &str) -> Result<Artifact> {
        if path.exists() {
            return Err(PersistError::AlreadyExists { key: key.to_string() }.into());
        }

        let mut stored = artifact.clone();
        stored.metadata.uid = Uuid::new_v4().to_string();
        stored.metadata.resource_version = String::from("1");
        stored.metadata.creation_timestamp = Some(Utc::now());

        self.write_artifact(path, key, &stored).await?;
        Ok(stored)
    }

    async fn update_locked(&self, artifact: &Artifact, path: &Path, key: &str) -> Result<Artifact> {
        let Some(current) = self.read_artifact(path, key).await? else {
            return Err(PersistError::NotFound { key: key.to_string() }.into());
        };

        if current.metadata.resource_version != artifact.metadata.resource_version {
            return Err(PersistError::conflict(
                key,
                format!(
                    "version {:?} is stale, current version is {}",
                    artifact.metadata.resource_version, current.metadata.resource_version
                ),
            )
            .into());
        }

        let next_version = current
            .metadata
            .resource_version
            .parse::<u64>()
            .ok()
            .and_then(|v| v.checked_add(1))
            .ok_or_else(|| {
                PersistError::serialization(format!(
                    "artifact {key} has invalid version {:?}",
                    current.metadata.resource_version
                ))
            })?;

        let mut stored = artifact.clone();
        stored.metadata.uid = current.metadata.uid;
        stored.metadata.creation_timestamp = current.metadata.creation_timestamp;
        stored.metadata.resource_version = next_version.to_string();

        self.write_artifact(path, key, &stored).await?;
        Ok(stored)
    }
}

#[async_trait]
impl ArtifactStore for LocalArtifactStore {
    async fn get(&self, namespace: &str, name: &str) -> Result<Option<Artifact>> {
        let key = artifact_key(namespace, name);
        let path = self.artifact_path(namespace, name)?;
        debug!("Loading artifact from: {}", path.display());
        self.read_artifact(&path, &key).await
    }

    async fn create(&self, artifact: &Artifact) -> Result<Artifact> {
        let (namespace, name) = (&artifact.metadata.namespace, &artifact.metadata.name);
        let key = artifact.key();
        let path = self.artifact_path(namespace, name)?;
        let lock_path = self.lock_path(namespace, name)?;

        self.ensure_dir(namespace, &key).await?;
        let lock = self.acquire_lock(&key, &lock_path).await?;
        let result = self.create_locked(artifact, &path, &key).await;
        let released = self.release_lock(&key, &lock_path, &lock).await;

        let stored = result?;
        released?;
        info!("Created artifact: {}", path.display());
        Ok(stored)
    }

    async fn update(&self, artifact: &Artifact) -> Result<Artifact> {
        let (namespace, name) = (&artifact.metadata.namespace, &artifact.metadata.name);
        let key = artifact.key();
        let path = self.artifact_path(namespace, name)?;
        let lock_path = self.lock_path(namespace, name)?;

        self.ensure_dir(namespace, &key).await?;
        let lock = self.acquire_lock(&key, &lock_path).await?;
        let result = self.update_locked(artifact, &path, &key).await;
        let released = self.release_lock(&key, &lock_path, &lock).await;

        let stored = result?;
        released?;
        info!("Updated artifact: {} (version {})", path.display(), stored.metadata.resource_version);
        Ok(stored)
    }

    async fn delete(&self, namespace: &str, name: &str) -> Result<bool> {
        let key = artifact_key(namespace, name);
        let path = self.artifact_path(namespace, name)?;
        let lock_path = self.lock_path(namespace, name)?;

        if !path.exists() {
            return Ok(false);
        }

        let lock = self.acquire_lock(&key, &lock_path).await?;
        let result = remove_if_exists(&path)
            .await
            .map_err(|e| SynthError::from(PersistError::backend("delete", &key, e.to_string())));
        let released = self.release_lock(&key, &lock_path, &lock).await;

        let removed = result?;
        released?;
        if removed {
            info!("Deleted artifact: {}", path.display());
        }
        Ok(removed)
    }

    fn backend_type(&self) -> &'static str {
        "local"
    }
}

/// Rejects values that would not stay a single directory entry.
fn check_segment(kind: &str, value: &str, key: &str) -> Result<()> {
    let invalid = value.is_empty()
        || value == "."
        || value == ".."
        || value.contains(['/', '\\', '\0']);

    if invalid {
        return Err(PersistError::backend(
            "resolve",
            key,
            format!("{kind} {value:?} must be a single path segment"),
        )
        .into());
    }
    Ok(())
}

/// Returns `{path}.{suffix}`.
fn sibling(path: &Path, suffix: &str) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(".");
    name.push(suffix);
    PathBuf::from(name)
}

fn lock_expiry() -> Duration {
    Duration::from_secs(LOCK_EXPIRY_SECS.unsigned_abs())
}

/// Writes the lock to a staging file and hard-links it into place.
///
/// Returns false if a lock file already exists.
async fn publish_lock(key: &str, lock_path: &Path, lock: &LockInfo, content: &str) -> Result<bool> {
    let staging = sibling(lock_path, &lock.lock_id);
    let lock_err = |e: std::io::Error| PersistError::backend("lock", key, format!("failed to write lock file: {e}"));

    let mut file = fs::File::create(&staging).await.map_err(lock_err)?;
    file.write_all(content.as_bytes()).await.map_err(lock_err)?;
    file.sync_all().await.map_err(lock_err)?;
    drop(file);

    let linked = fs::hard_link(&staging, lock_path).await;
    remove_if_exists(&staging).await.map_err(lock_err)?;

    match linked {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => Ok(false),
        Err(e) => Err(lock_err(e).into()),
    }
}

/// Reads the state of a lock file.
///
/// An unparsable lock counts as held until the file is older than the lock
/// expiry.
async fn read_lock_state(key: &str, lock_path: &Path) -> Result<LockState> {
    let content = match fs::read_to_string(lock_path).await {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(LockState::Free),
        Err(e) => {
            return Err(PersistError::backend("lock", key, format!("failed to read lock file: {e}")).into());
        }
    };

    let state = match serde_json::from_str::<LockInfo>(&content) {
        Ok(info) if info.is_expired() => LockState::Stale(content),
        Ok(info) => LockState::Held(info),
        Err(_) => {
            let abandoned = file_age(lock_path).await.is_some_and(|age| age > lock_expiry());
            if abandoned {
                LockState::Stale(content)
            } else {
                LockState::Held(LockInfo::new("unknown"))
            }
        }
    };
    Ok(state)
}

/// Creates the guard file, waiting briefly for a current holder.
///
/// A guard older than the lock expiry belongs to a crashed writer and is
/// removed. Returns false if the guard stayed busy.
async fn acquire_guard(guard: &Path) -> std::io::Result<bool> {
    for _ in 0..GUARD_ATTEMPTS {
        match fs::OpenOptions::new().write(true).create_new(true).open(guard).await {
            Ok(_) => return Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                if file_age(guard).await.is_some_and(|age| age > lock_expiry()) {
                    remove_if_exists(guard).await?;
                } else {
                    tokio::time::sleep(GUARD_RETRY_DELAY).await;
                }
            }
            Err(e) => return Err(e),
        }
    }
    Ok(false)
}

/// Removes `path` only if it still holds `expected`.
async fn remove_if_unchanged(path: &Path, expected: &str) -> std::io::Result<bool> {
    match fs::read_to_string(path).await {
        Ok(content) if content == expected => remove_if_exists(path).await,
        Ok(_) => Ok(false),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e),
    }
}

async fn file_age(path: &Path) -> Option<Duration> {
    let modified = fs::metadata(path).await.and_then(|m| m.modified()).ok()?;
    SystemTime::now().duration_since(modified).ok()
}

async fn remove_if_exists(path: &Path) -> std::io::Result<bool> {
    match fs::remove_file(path).await {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persist::artifact::ArtifactMeta;
    use std::sync::Arc;
    use tempfile::TempDir;
    use tokio::sync::Barrier;

    fn create_test_store() -> (LocalArtifactStore, TempDir) {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let store = LocalArtifactStore::with_base_dir(temp_dir.path());
        (store, temp_dir)
    }

    fn plant_expired_lock(store: &LocalArtifactStore, holder: &str) -> String {
        let mut lock = LockInfo::new(holder);
        lock.acquired_at = Utc::now() - chrono::Duration::seconds(90);
        lock.expires_at = Utc::now() - chrono::Duration::seconds(60);
        let content = serde_json::to_string(&lock).expect("lock json");
        std::fs::write(store.lock_path("mcp", "cfg").expect("path"), &content).expect("write lock");
        content
    }

    fn artifact(name: &str) -> Artifact {
        let mut artifact = Artifact {
            metadata: ArtifactMeta {
                name: name.to_string(),
                namespace: String::from("mcp"),
                ..ArtifactMeta::default()
            },
            ..Artifact::default()
        };
        artifact.data.insert(String::from("config.yaml"), String::from("registries: []\n"));
        artifact
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let (store, _temp) = create_test_store();

        let created = store.create(&artifact("cfg")).await.expect("create");
        assert_eq!(created.metadata.resource_version, "1");

        let loaded = store.get("mcp", "cfg").await.expect("get").expect("exists");
        assert_eq!(loaded, created);
        assert!(store.artifact_path("mcp", "cfg").expect("path").exists());
        assert!(!store.lock_path("mcp", "cfg").expect("path").exists());
    }

    #[tokio::test]
    async fn test_get_nonexistent() {
        let (store, _temp) = create_test_store();
        assert!(store.get("mcp", "absent").await.expect("get").is_none());
    }

    #[tokio::test]
    async fn test_create_existing_fails() {
        let (store, _temp) = create_test_store();
        store.create(&artifact("cfg")).await.expect("create");

        let err = store.create(&artifact("cfg")).await.expect_err("should fail");
        assert!(matches!(
            err,
            crate::error::SynthError::Persist(PersistError::AlreadyExists { .. })
        ));
        assert!(!store.lock_path("mcp", "cfg").expect("path").exists());
    }

    #[tokio::test]
    async fn test_update_checks_version() {
        let (store, _temp) = create_test_store();
        let created = store.create(&artifact("cfg")).await.expect("create");

        let updated = store.update(&created).await.expect("update");
        assert_eq!(updated.metadata.resource_version, "2");
        assert_eq!(updated.metadata.uid, created.metadata.uid);

        let err = store.update(&created).await.expect_err("stale");
        assert!(err.is_conflict());
    }

    #[tokio::test]
    async fn test_held_lock_is_a_conflict() {
        let (store, _temp) = create_test_store();
        let created = store.create(&artifact("cfg")).await.expect("create");

        let lock = LockInfo::new("other-writer");
        std::fs::write(
            store.lock_path("mcp", "cfg").expect("path"),
            serde_json::to_string(&lock).expect("lock json"),
        )
        .expect("write lock");

        let err = store.update(&created).await.expect_err("locked");
        assert!(err.is_conflict());
        assert!(err.to_string().contains("other-writer"));
    }

    #[tokio::test]
    async fn test_expired_lock_is_taken_over() {
        let (store, _temp) = create_test_store();
        let created = store.create(&artifact("cfg")).await.expect("create");

        let mut lock = LockInfo::new("crashed-writer");
        lock.expires_at = Utc::now() - chrono::Duration::seconds(1);
        std::fs::write(
            store.lock_path("mcp", "cfg").expect("path"),
            serde_json::to_string(&lock).expect("lock json"),
        )
        .expect("write lock");

        store.update(&created).await.expect("update");
        assert!(!store.lock_path("mcp", "cfg").expect("path").exists());
    }

    #[tokio::test]
    async fn test_delete() {
        let (store, _temp) = create_test_store();
        store.create(&artifact("cfg")).await.expect("create");

        assert!(store.delete("mcp", "cfg").await.expect("delete"));
        assert!(!store.delete("mcp", "cfg").await.expect("delete"));
        assert!(store.get("mcp", "cfg").await.expect("get").is_none());
    }
    #[tokio::test]
    async fn test_takeover_keeps_a_replaced_lock() {
        let (store, _temp) = create_test_store();
        store.create(&artifact("cfg")).await.expect("create");
        let lock_path = store.lock_path("mcp", "cfg").expect("path");

        let observed = plant_expired_lock(&store, "crashed-writer");
        let fresh = serde_json::to_string(&LockInfo::new("live-writer")).expect("lock json");
        std::fs::write(&lock_path, &fresh).expect("replace lock");

        store.take_over("mcp/cfg", &lock_path, &observed).await.expect("take over");

        assert_eq!(std::fs::read_to_string(&lock_path).expect("lock"), fresh);
        assert!(!sibling(&lock_path, GUARD_SUFFIX).exists());
    }

    #[tokio::test]
    async fn test_abandoned_guard_is_recovered() {
        let (store, _temp) = create_test_store();
        let created = store.create(&artifact("cfg")).await.expect("create");
        let lock_path = store.lock_path("mcp", "cfg").expect("path");
        let guard = sibling(&lock_path, GUARD_SUFFIX);

        plant_expired_lock(&store, "crashed-writer");
        let file = std::fs::File::create(&guard).expect("guard");
        let old = SystemTime::now() - Duration::from_secs(120);
        file.set_modified(old).expect("set mtime");
        drop(file);

        store.update(&created).await.expect("update");
        assert!(!lock_path.exists());
        assert!(!guard.exists());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_updates_after_expired_lock() {
        const WRITERS: usize = 8;

        for _ in 0..25 {
            let (store, temp) = create_test_store();
            let created = store.create(&artifact("cfg")).await.expect("create");
            plant_expired_lock(&store, "crashed-writer");

            let barrier = Arc::new(Barrier::new(WRITERS));
            let handles: Vec<_> = (0..WRITERS)
                .map(|i| {
                    let writer = LocalArtifactStore::with_base_dir(temp.path());
                    let barrier = Arc::clone(&barrier);
                    let mut desired = created.clone();
                    desired.data.insert(String::from("writer"), i.to_string());
                    tokio::spawn(async move {
                        barrier.wait().await;
                        writer.update(&desired).await
                    })
                })
                .collect();

            let mut successes = 0;
            for handle in handles {
                match handle.await.expect("join") {
                    Ok(stored) => {
                        successes += 1;
                        assert_eq!(stored.metadata.resource_version, "2");
                    }
                    Err(err) => assert!(
                        matches!(err, SynthError::Persist(PersistError::Conflict { .. })),
                        "unexpected error: {err}"
                    ),
                }
            }

            assert_eq!(successes, 1);
            let current = store.get("mcp", "cfg").await.expect("get").expect("exists");
            assert_eq!(current.metadata.resource_version, "2");
        }
    }

    #[tokio::test]
    async fn test_corrupt_version_is_rejected() {
        let (store, _temp) = create_test_store();
        let created = store.create(&artifact("cfg")).await.expect("create");

        let path = store.artifact_path("mcp", "cfg").expect("path");
        let mut corrupt = created.clone();
        corrupt.metadata.resource_version = String::from("not-a-number");
        std::fs::write(&path, serde_json::to_string(&corrupt).expect("json")).expect("write");

        let err = store.update(&corrupt).await.expect_err("should fail");
        assert!(matches!(err, SynthError::Persist(PersistError::Serialization { .. })));
        assert!(!err.is_conflict());
    }

    #[tokio::test]
    async fn test_path_segments_cannot_escape_the_store() {
        let (store, _temp) = create_test_store();

        for (namespace, name) in [("..", "cfg"), ("mcp", "../cfg"), ("a/b", "cfg"), ("mcp", ""), ("mcp", "c\\d")] {
            assert!(store.artifact_path(namespace, name).is_err(), "{namespace:?}/{name:?}");
            assert!(store.get(namespace, name).await.is_err());
        }

        let mut escaping = artifact("cfg");
        escaping.metadata.namespace = String::from("..");
        assert!(store.create(&escaping).await.is_err());
        assert!(store.artifact_path("mcp", "reg-registry-server-config.v1").is_ok());
    }
}
