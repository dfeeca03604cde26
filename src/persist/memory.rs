//! In-process artifact store.
//!
//! Used for dry runs and tests. Version tokens are a per-store counter.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::BTreeMap;
use tokio::sync::Mutex;
use tracing::debug;
use uuid::Uuid;

use crate::error::{PersistError, Result};

use super::artifact::{Artifact, artifact_key};
use super::store::ArtifactStore;

#[derive(Debug, Default)]
struct Inner {
    artifacts: BTreeMap<String, Artifact>,
    version: u64,
}

impl Inner {
    fn next_version(&mut self) -> String {
        self.version += 1;
        self.version.to_string()
    }
}

/// In-memory artifact store.
#[derive(Debug, Default)]
pub struct MemoryArtifactStore {
    inner: Mutex<Inner>,
}

impl MemoryArtifactStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of stored artifacts.
    pub async fn len(&self) -> usize {
        self.inner.lock().await.artifacts.len()
    }

    /// Returns true if the store holds no artifacts.
    pub async fn is_empty(&self) -> bool {
        self.inner.lock().await.artifacts.is_empty()
    }
}

#[async_trait]
impl ArtifactStore for MemoryArtifactStore {
    async fn get(&self, namespace: &str, name: &str) -> Result<Option<Artifact>> {
        let inner = self.inner.lock().await;
        Ok(inner.artifacts.get(&artifact_key(namespace, name)).cloned())
    }

    async fn create(&self, artifact: &Artifact) -> Result<Artifact> {
        let key = artifact.key();
        let mut inner = self.inner.lock().await;

        if inner.artifacts.contains_key(&key) {
            return Err(PersistError::AlreadyExists { key }.into());
        }

        let mut stored = artifact.clone();
        stored.metadata.uid = Uuid::new_v4().to_string();
        stored.metadata.resource_version = inner.next_version();
        stored.metadata.creation_timestamp = Some(Utc::now());

        debug!("Created {key} at version {}", stored.metadata.resource_version);
        inner.artifacts.insert(key, stored.clone());
        Ok(stored)
    }

    async fn update(&self, artifact: &Artifact) -> Result<Artifact> {
        let key = artifact.key();
        let mut inner = self.inner.lock().await;

        let Some(current) = inner.artifacts.get(&key) else {
            return Err(PersistError::NotFound { key }.into());
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

        let mut stored = artifact.clone();
        stored.metadata.uid.clone_from(&current.metadata.uid);
        stored.metadata.creation_timestamp = current.metadata.creation_timestamp;
        stored.metadata.resource_version = inner.next_version();

        debug!("Updated {key} to version {}", stored.metadata.resource_version);
        inner.artifacts.insert(key, stored.clone());
        Ok(stored)
    }

    async fn delete(&self, namespace: &str, name: &str) -> Result<bool> {
        let mut inner = self.inner.lock().await;
        Ok(inner.artifacts.remove(&artifact_key(namespace, name)).is_some())
    }

    fn backend_type(&self) -> &'static str {
        "memory"
    }
}
