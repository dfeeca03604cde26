//! Persisted artifact types.
//!
//! An artifact is a named key/value document with object metadata, shaped
//! like a `ConfigMap`. The backing store owns `uid`, `resource_version` and
//! `creation_timestamp`; callers own everything else.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::PersistError;

/// Annotation holding the hex-encoded content checksum of an artifact.
pub const CONTENT_CHECKSUM_ANNOTATION: &str = "registry-synth.io/content-checksum";

/// A persisted artifact.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Artifact {
    /// Object metadata.
    pub metadata: ArtifactMeta,
    /// Document payload.
    #[serde(default)]
    pub data: BTreeMap<String, String>,
}

/// Artifact metadata.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ArtifactMeta {
    /// Artifact name.
    pub name: String,
    /// Namespace the artifact lives in.
    pub namespace: String,
    /// Identity assigned by the store on create.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub uid: String,
    /// Version token assigned by the store on every write.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub resource_version: String,
    /// Labels.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
    /// Annotations.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, String>,
    /// Objects this artifact belongs to.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub owner_references: Vec<OwnerReference>,
    /// Creation time, assigned by the store.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creation_timestamp: Option<DateTime<Utc>>,
}

/// Reference tying an artifact's lifecycle to its parent object.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct OwnerReference {
    /// API version of the owner.
    pub api_version: String,
    /// Kind of the owner.
    pub kind: String,
    /// Name of the owner.
    pub name: String,
    /// Identity of the owner.
    pub uid: String,
    /// The owner is the managing controller.
    #[serde(default)]
    pub controller: bool,
    /// Deleting the owner waits for this artifact.
    #[serde(default)]
    pub block_owner_deletion: bool,
}

/// Returns the store key of an artifact: `{namespace}/{name}`.
#[must_use]
pub fn artifact_key(namespace: &str, name: &str) -> String {
    format!("{namespace}/{name}")
}

impl Artifact {
    /// Returns the store key of this artifact.
    #[must_use]
    pub fn key(&self) -> String {
        artifact_key(&self.metadata.namespace, &self.metadata.name)
    }

    /// Returns the content checksum annotation, if set.
    #[must_use]
    pub fn checksum(&self) -> Option<&str> {
        self.metadata
            .annotations
            .get(CONTENT_CHECKSUM_ANNOTATION)
            .map(String::as_str)
    }

    /// Sets the content checksum annotation.
    pub fn set_checksum(&mut self, checksum: impl Into<String>) {
        self.metadata
            .annotations
            .insert(String::from(CONTENT_CHECKSUM_ANNOTATION), checksum.into());
    }
}

/// Attaches an owner reference to artifact metadata.
///
/// A reference with the same owner uid is replaced in place. A second
/// controller reference for a different owner is rejected.
///
/// # Errors
///
/// Returns an error if the reference is malformed or conflicts with an
/// existing controller.
pub fn set_owner_reference(meta: &mut ArtifactMeta, owner: &OwnerReference) -> Result<(), PersistError> {
    let missing = [
        ("apiVersion", &owner.api_version),
        ("kind", &owner.kind),
        ("name", &owner.name),
        ("uid", &owner.uid),
    ]
    .into_iter()
    .find(|(_, value)| value.is_empty());

    if let Some((field, _)) = missing {
        return Err(PersistError::InvalidOwnerReference {
            message: format!("owner {field} is required"),
        });
    }

    if let Some(existing) = meta.owner_references.iter_mut().find(|r| r.uid == owner.uid) {
        *existing = owner.clone();
        return Ok(());
    }

    if owner.controller
        && let Some(controller) = meta.owner_references.iter().find(|r| r.controller)
    {
        return Err(PersistError::InvalidOwnerReference {
            message: format!(
                "artifact {} is already controlled by {} {}",
                artifact_key(&meta.namespace, &meta.name),
                controller.kind,
                controller.name
            ),
        });
    }

    meta.owner_references.push(owner.clone());
    Ok(())
}
