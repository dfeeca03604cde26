//! Artifact store trait definition.
//!
//! This module defines the common interface for artifact storage backends.
//! Writes are optimistic: `create` fails when the artifact exists and
//! `update` fails when the presented version token is stale.

use async_trait::async_trait;

use crate::error::Result;

use super::artifact::Artifact;

/// Trait for artifact storage backends.
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Gets an artifact.
    ///
    /// Returns `None` if it does not exist.
    async fn get(&self, namespace: &str, name: &str) -> Result<Option<Artifact>>;

    /// Creates an artifact and returns it as stored.
    ///
    /// Fails with `AlreadyExists` if an artifact with the same key exists.
    async fn create(&self, artifact: &Artifact) -> Result<Artifact>;

    /// Updates an artifact and returns it as stored.
    ///
    /// Fails with `Conflict` if `resource_version` does not match the stored
    /// version, and with `NotFound` if the artifact does not exist.
    async fn update(&self, artifact: &Artifact) -> Result<Artifact>;

    /// Deletes an artifact. Returns false if it did not exist.
    async fn delete(&self, namespace: &str, name: &str) -> Result<bool>;

    /// Gets the backend type name.
    fn backend_type(&self) -> &'static str;
}

#[async_trait]
impl ArtifactStore for Box<dyn ArtifactStore> {
    async fn get(&self, namespace: &str, name: &str) -> Result<Option<Artifact>> {
        (**self).get(namespace, name).await
    }

    async fn create(&self, artifact: &Artifact) -> Result<Artifact> {
        (**self).create(artifact).await
    }

    async fn update(&self, artifact: &Artifact) -> Result<Artifact> {
        (**self).update(artifact).await
    }

    async fn delete(&self, namespace: &str, name: &str) -> Result<bool> {
        (**self).delete(namespace, name).await
    }

    fn backend_type(&self) -> &'static str {
        (**self).backend_type()
    }
}
