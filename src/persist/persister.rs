//! Conflict-aware persistence of the server configuration artifact.
//!
//! One upsert is a single read-compare-write cycle: read the current
//! artifact, skip the write when the checksums match, otherwise create or
//! update it with the store's version token. The whole cycle is retried when
//! the store reports a conflict.

use std::fmt;

use tracing::{debug, info};

use crate::config::{Config, ConfigHasher};
use crate::error::{PersistError, Result, SynthError};

use super::artifact::{Artifact, OwnerReference, set_owner_reference};
use super::retry::{RetryPolicy, retry_on_conflict};
use super::store::ArtifactStore;

/// Checksum comparator: returns true when two checksums denote the same
/// content.
pub type ChecksumComparator = Box<dyn Fn(&str, &str) -> bool + Send + Sync>;

/// What an upsert did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpsertOutcome {
    /// The artifact did not exist and was created.
    Created(Artifact),
    /// The artifact existed with different content and was updated.
    Updated(Artifact),
    /// The artifact already held the desired content. No write was issued.
    Unchanged(Artifact),
}

impl UpsertOutcome {
    /// Returns the artifact as it is now stored.
    #[must_use]
    pub const fn artifact(&self) -> &Artifact {
        match self {
            Self::Created(a) | Self::Updated(a) | Self::Unchanged(a) => a,
        }
    }

    /// Returns true if a write was issued.
    #[must_use]
    pub const fn is_write(&self) -> bool {
        !matches!(self, Self::Unchanged(_))
    }
}

impl fmt::Display for UpsertOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Created(_) => write!(f, "created"),
            Self::Updated(_) => write!(f, "updated"),
            Self::Unchanged(_) => write!(f, "unchanged"),
        }
    }
}

/// Persists artifacts into an [`ArtifactStore`].
pub struct ConfigPersister<S: ArtifactStore> {
    store: S,
    policy: RetryPolicy,
    comparator: ChecksumComparator,
}

impl<S: ArtifactStore> fmt::Debug for ConfigPersister<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConfigPersister")
            .field("backend", &self.store.backend_type())
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl<S: ArtifactStore> ConfigPersister<S> {
    /// Creates a persister with the default retry policy and a constant-time
    /// checksum comparison.
    pub fn new(store: S) -> Self {
        Self {
            store,
            policy: RetryPolicy::default(),
            comparator: Box::new(ConfigHasher::hashes_match),
        }
    }

    /// Replaces the retry policy.
    #[must_use]
    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Replaces the checksum comparator.
    #[must_use]
    pub fn with_comparator<F>(mut self, comparator: F) -> Self
    where
        F: Fn(&str, &str) -> bool + Send + Sync + 'static,
    {
        self.comparator = Box::new(comparator);
        self
    }

    /// Returns the underlying store.
    pub const fn store(&self) -> &S {
        &self.store
    }

    /// Returns the retry policy.
    pub const fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Serializes a configuration and upserts it as the server config
    /// artifact of `namespace`.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails or the upsert fails.
    pub async fn persist_config(
        &self,
        config: &Config,
        namespace: &str,
        owner: &OwnerReference,
    ) -> Result<UpsertOutcome> {
        let desired = config.to_artifact(namespace)?;
        self.upsert(&desired, owner).await
    }

    /// Creates or updates `desired`, owned by `owner`.
    ///
    /// `desired` must carry its content checksum annotation.
    ///
    /// # Errors
    ///
    /// Returns `RetriesExhausted` when every attempt conflicted, or the first
    /// non-conflict store error wrapped with the failing operation.
    pub async fn upsert(&self, desired: &Artifact, owner: &OwnerReference) -> Result<UpsertOutcome> {
        let key = desired.key();
        if desired.checksum().is_none() {
            return Err(SynthError::internal(format!("artifact {key} has no content checksum")));
        }

        retry_on_conflict(&self.policy, &key, || self.try_upsert(desired, owner)).await
    }

    /// Gets a stored artifact.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    pub async fn get(&self, namespace: &str, name: &str) -> Result<Option<Artifact>> {
        self.store.get(namespace, name).await
    }

    /// Deletes a stored artifact. Returns false if it did not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be written.
    pub async fn delete(&self, namespace: &str, name: &str) -> Result<bool> {
        self.store.delete(namespace, name).await
    }

    async fn try_upsert(&self, desired: &Artifact, owner: &OwnerReference) -> Result<UpsertOutcome> {
        let key = desired.key();
        let current = self
            .store
            .get(&desired.metadata.namespace, &desired.metadata.name)
            .await
            .map_err(|e| with_context(e, "get", &key))?;

        let Some(current) = current else {
            let mut created = desired.clone();
            set_owner_reference(&mut created.metadata, owner)?;

            return match self.store.create(&created).await {
                Ok(stored) => {
                    info!("Created artifact {key} ({})", self.store.backend_type());
                    Ok(UpsertOutcome::Created(stored))
                }
                Err(SynthError::Persist(PersistError::AlreadyExists { key })) => Err(PersistError::conflict(
                    key,
                    "created concurrently by another writer",
                )
                .into()),
                Err(e) => Err(with_context(e, "create", &key)),
            };
        };

        let desired_checksum = desired.checksum().unwrap_or_default();
        if let Some(current_checksum) = current.checksum()
            && (self.comparator)(current_checksum, desired_checksum)
        {
            debug!("Artifact {key} is up to date, skipping write");
            return Ok(UpsertOutcome::Unchanged(current));
        }

        let mut updated = desired.clone();
        updated.metadata.resource_version.clone_from(&current.metadata.resource_version);
        updated.metadata.uid.clone_from(&current.metadata.uid);
        updated.metadata.creation_timestamp = current.metadata.creation_timestamp;
        updated.metadata.owner_references = current.metadata.owner_references;
        set_owner_reference(&mut updated.metadata, owner)?;

        match self.store.update(&updated).await {
            Ok(stored) => {
                info!(
                    "Updated artifact {key} to version {} ({})",
                    stored.metadata.resource_version,
                    self.store.backend_type()
                );
                Ok(UpsertOutcome::Updated(stored))
            }
            Err(e) if e.is_conflict() => Err(e),
            Err(e) => Err(with_context(e, "update", &key)),
        }
    }
}

/// Wraps a non-conflict store failure with the operation it interrupted.
fn with_context(err: SynthError, operation: &str, key: &str) -> SynthError {
    match err {
        SynthError::Persist(PersistError::Conflict { .. } | PersistError::Backend { .. }) => err,
        other => PersistError::backend(operation, key, other.to_string()).into(),
    }
}
