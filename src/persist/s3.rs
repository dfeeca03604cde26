//! S3-based artifact store.
//!
//! Artifacts are JSON objects at `{prefix}{namespace}/{name}.json` in AWS S3
//! (or a compatible service that honours conditional writes). The object
//! `ETag` is the version token: creates use `If-None-Match: *` and updates
//! use `If-Match: <etag>`, so the service itself arbitrates races.

use async_trait::async_trait;
use aws_sdk_s3::Client;
use aws_sdk_s3::error::ProvideErrorMetadata;
use chrono::Utc;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{PersistError, Result};

use super::artifact::{Artifact, artifact_key};
use super::store::ArtifactStore;

/// Error code returned when a conditional write precondition fails.
const PRECONDITION_FAILED: &str = "PreconditionFailed";

/// Error code returned when two conditional writes race on one key.
const CONDITIONAL_REQUEST_CONFLICT: &str = "ConditionalRequestConflict";

/// S3-based artifact store.
#[derive(Debug)]
pub struct S3ArtifactStore {
    /// S3 client.
    client: Client,
    /// Bucket name.
    bucket: String,
    /// Key prefix.
    prefix: String,
}

/// Normalizes a key prefix to either empty or `segment/`.
fn normalize_prefix(prefix: Option<&str>) -> String {
    prefix
        .map(|p| {
            let p = p.trim_matches('/');
            if p.is_empty() {
                String::new()
            } else {
                format!("{p}/")
            }
        })
        .unwrap_or_default()
}

impl S3ArtifactStore {
    /// Creates a new S3 artifact store.
    ///
    /// # Errors
    ///
    /// Returns an error if the S3 client cannot be initialized.
    pub async fn new(bucket: &str, prefix: Option<&str>, region: Option<&str>) -> Result<Self> {
        let config = if let Some(region_str) = region {
            aws_config::from_env()
                .region(aws_config::Region::new(region_str.to_string()))
                .load()
                .await
        } else {
            aws_config::load_from_env().await
        };

        Ok(Self::with_client(Client::new(&config), bucket, prefix))
    }

    /// Creates a new S3 artifact store with an existing client.
    #[must_use]
    pub fn with_client(client: Client, bucket: &str, prefix: Option<&str>) -> Self {
        Self {
            client,
            bucket: bucket.to_string(),
            prefix: normalize_prefix(prefix),
        }
    }

    /// Gets the full S3 key of an artifact.
    fn object_key(&self, namespace: &str, name: &str) -> String {
        format!("{}{namespace}/{name}.json", self.prefix)
    }

    fn encode(artifact: &Artifact, key: &str) -> Result<Vec<u8>> {
        // The ETag is authoritative, a stored token would go stale
        let mut body = artifact.clone();
        body.metadata.resource_version.clear();

        let content = serde_json::to_vec_pretty(&body)
            .map_err(|e| PersistError::serialization(format!("Failed to serialize artifact {key}: {e}")))?;
        Ok(content)
    }

    /// Writes an object conditionally and returns its new `ETag`.
    async fn put_conditional(
        &self,
        operation: &str,
        key: &str,
        object_key: &str,
        body: Vec<u8>,
        if_match: Option<&str>,
    ) -> Result<String> {
        let mut request = self
            .client
            .put_object()
            .bucket(&self.bucket)
            .key(object_key)
            .body(body.into())
            .content_type("application/json");

        request = match if_match {
            Some(etag) => request.if_match(etag),
            None => request.if_none_match("*"),
        };

        match request.send().await {
            Ok(output) => Ok(output.e_tag().unwrap_or_default().to_string()),
            Err(sdk_err) => {
                let service_err = sdk_err.into_service_error();
                let code = service_err.code();

                let err = match (code, if_match) {
                    (Some(PRECONDITION_FAILED), None) => PersistError::AlreadyExists {
                        key: key.to_string(),
                    },
                    (Some(PRECONDITION_FAILED | CONDITIONAL_REQUEST_CONFLICT), _) => {
                        PersistError::conflict(key, format!("S3 rejected conditional write: {service_err}"))
                    }
                    _ => PersistError::backend(operation, key, format!("S3 put error: {service_err}")),
                };
                Err(err.into())
            }
        }
    }
}

#[async_trait]
impl ArtifactStore for S3ArtifactStore {
    async fn get(&self, namespace: &str, name: &str) -> Result<Option<Artifact>> {
        let key = artifact_key(namespace, name);
        let object_key = self.object_key(namespace, name);
        debug!("Loading artifact from s3://{}/{object_key}", self.bucket);

        let result = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(&object_key)
            .send()
            .await;

        let response = match result {
            Ok(response) => response,
            Err(sdk_err) => {
                let service_err = sdk_err.into_service_error();
                if service_err.is_no_such_key() {
                    return Ok(None);
                }
                return Err(PersistError::backend("get", key, format!("S3 get error: {service_err}")).into());
            }
        };

        let etag = response.e_tag().unwrap_or_default().to_string();
        let bytes = response
            .body
            .collect()
            .await
            .map_err(|e| PersistError::backend("get", &key, format!("Failed to read S3 object: {e}")))?;

        let mut artifact: Artifact = serde_json::from_slice(&bytes.into_bytes())
            .map_err(|e| PersistError::serialization(format!("Failed to parse artifact {key}: {e}")))?;
        artifact.metadata.resource_version = etag;

        Ok(Some(artifact))
    }

    async fn create(&self, artifact: &Artifact) -> Result<Artifact> {
        let key = artifact.key();
        let object_key = self.object_key(&artifact.metadata.namespace, &artifact.metadata.name);

        let mut stored = artifact.clone();
        stored.metadata.uid = Uuid::new_v4().to_string();
        stored.metadata.creation_timestamp = Some(Utc::now());

        let body = Self::encode(&stored, &key)?;
        stored.metadata.resource_version = self.put_conditional("create", &key, &object_key, body, None).await?;

        info!("Created artifact at s3://{}/{object_key}", self.bucket);
        Ok(stored)
    }

    async fn update(&self, artifact: &Artifact) -> Result<Artifact> {
        let key = artifact.key();
        let object_key = self.object_key(&artifact.metadata.namespace, &artifact.metadata.name);

        if artifact.metadata.resource_version.is_empty() {
            return Err(PersistError::conflict(key, "update requires a version token").into());
        }

        let body = Self::encode(artifact, &key)?;
        let etag = self
            .put_conditional("update", &key, &object_key, body, Some(&artifact.metadata.resource_version))
            .await?;

        let mut stored = artifact.clone();
        stored.metadata.resource_version = etag;

        info!("Updated artifact at s3://{}/{object_key}", self.bucket);
        Ok(stored)
    }

    async fn delete(&self, namespace: &str, name: &str) -> Result<bool> {
        let key = artifact_key(namespace, name);
        let object_key = self.object_key(namespace, name);

        if self.get(namespace, name).await?.is_none() {
            return Ok(false);
        }

        info!("Deleting artifact from s3://{}/{object_key}", self.bucket);
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(&object_key)
            .send()
            .await
            .map_err(|e| PersistError::backend("delete", key, format!("S3 delete error: {e}")))?;

        Ok(true)
    }

    fn backend_type(&self) -> &'static str {
        "s3"
    }
}
