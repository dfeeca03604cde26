//! Input specification types for a registry manifest.
//!
//! These structs map to the `Registry` manifest document. They describe the
//! user's request verbatim: nullable source fields, optional override blocks,
//! raw Pod template. The resolver turns them into a canonical [`Config`].
//!
//! [`Config`]: super::Config

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Result};
use crate::persist::OwnerReference;
use crate::pod::PodTemplateSpec;

/// API version written on manifests produced by this crate.
pub const MANIFEST_API_VERSION: &str = "registry.dev/v1alpha1";

/// Kind of the registry manifest.
pub const MANIFEST_KIND: &str = "Registry";

/// The root manifest document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RegistryManifest {
    /// API version of the manifest.
    #[serde(default = "default_api_version")]
    pub api_version: String,
    /// Kind of the manifest.
    #[serde(default = "default_kind")]
    pub kind: String,
    /// Object metadata.
    pub metadata: ManifestMetadata,
    /// Registry specification.
    pub spec: RegistrySpec,
}

/// Metadata identifying the manifest object.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ManifestMetadata {
    /// Registry name.
    #[serde(default)]
    pub name: String,
    /// Namespace the registry lives in.
    #[serde(default = "default_namespace")]
    pub namespace: String,
    /// Stable identity of the object, used for owner references.
    #[serde(default)]
    pub uid: String,
}

/// The registry specification.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RegistrySpec {
    /// Human readable name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    /// Ordered list of registry data sources.
    #[serde(default)]
    pub registries: Vec<SourceSpec>,
    /// Optional database override block.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database_config: Option<DatabaseSpec>,
    /// Optional authentication block.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_config: Option<AuthSpec>,
    /// Raw user Pod template override.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pod_template_spec: Option<serde_json::Value>,
}

/// A single named source descriptor.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SourceSpec {
    /// Unique name of the source.
    #[serde(default)]
    pub name: String,
    /// Data format of the source.
    #[serde(default)]
    pub format: String,
    /// ConfigMap holding the registry document.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config_map_ref: Option<ConfigMapKeyRef>,
    /// Git repository holding the registry document.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub git: Option<GitSourceSpec>,
    /// Upstream registry API.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api: Option<ApiSourceSpec>,
    /// Persistent volume claim holding the registry document.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pvc_ref: Option<PvcSourceSpec>,
    /// Synchronization policy.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sync_policy: Option<SyncPolicySpec>,
    /// Entry filter.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<FilterSpec>,
}

/// Reference to a key inside a `ConfigMap`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ConfigMapKeyRef {
    /// `ConfigMap` name.
    pub name: String,
    /// Key inside the `ConfigMap`; empty selects the default key.
    #[serde(default)]
    pub key: String,
}

/// Reference to a key inside a `Secret`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SecretKeyRef {
    /// `Secret` name.
    pub name: String,
    /// Key inside the `Secret`; empty selects the default key.
    #[serde(default)]
    pub key: String,
}

/// Git source descriptor.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct GitSourceSpec {
    /// Repository URL (HTTP/HTTPS/SSH).
    #[serde(default)]
    pub repository: String,
    /// Branch to track.
    #[serde(default)]
    pub branch: String,
    /// Tag to pin.
    #[serde(default)]
    pub tag: String,
    /// Commit SHA to pin.
    #[serde(default)]
    pub commit: String,
    /// Path to the registry document inside the repository.
    #[serde(default)]
    pub path: String,
    /// Optional HTTP basic credentials.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth: Option<GitAuthSpec>,
}

/// Git basic-auth credentials.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct GitAuthSpec {
    /// Username for the repository.
    #[serde(default)]
    pub username: String,
    /// Secret holding the password or token.
    pub password_secret_ref: SecretKeyRef,
}

/// API source descriptor.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ApiSourceSpec {
    /// Base URL of the upstream API.
    #[serde(default)]
    pub endpoint: String,
}

/// PVC source descriptor.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PvcSourceSpec {
    /// Claim name.
    pub claim_name: String,
    /// Relative path of the registry document inside the claim.
    #[serde(default)]
    pub path: String,
}

/// Synchronization policy descriptor.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SyncPolicySpec {
    /// Sync interval, e.g. `5m`.
    #[serde(default)]
    pub interval: String,
}

/// Filter descriptor.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct FilterSpec {
    /// Name based include/exclude lists.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub names: Option<IncludeExcludeSpec>,
    /// Tag based include/exclude lists.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<IncludeExcludeSpec>,
}

/// Include/exclude pattern lists.
///
/// `None` and `Some(vec![])` are distinct: an explicitly empty list survives
/// resolution.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct IncludeExcludeSpec {
    /// Patterns to include.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub include: Option<Vec<String>>,
    /// Patterns to exclude.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exclude: Option<Vec<String>>,
}

/// Database override block. Zero or empty fields keep the default.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DatabaseSpec {
    /// Database host.
    #[serde(default)]
    pub host: String,
    /// Database port.
    #[serde(default)]
    pub port: u16,
    /// Operational (least privilege) user.
    #[serde(default)]
    pub user: String,
    /// Migration (elevated privilege) user.
    #[serde(default)]
    pub migration_user: String,
    /// Database name.
    #[serde(default)]
    pub database: String,
    /// SSL mode.
    #[serde(default)]
    pub ssl_mode: String,
    /// Maximum open connections.
    #[serde(default)]
    pub max_open_conns: u32,
    /// Maximum idle connections.
    #[serde(default)]
    pub max_idle_conns: u32,
    /// Maximum connection lifetime, e.g. `30m`.
    #[serde(default)]
    pub conn_max_lifetime: String,
    /// Secret holding the operational user's password.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub db_app_user_password_secret_ref: Option<SecretKeyRef>,
    /// Secret holding the migration user's password.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub db_migration_user_password_secret_ref: Option<SecretKeyRef>,
}

/// Authentication block.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct AuthSpec {
    /// Mode: `anonymous` or `oauth`. Anything else resolves to `anonymous`.
    #[serde(default)]
    pub mode: String,
    /// OAuth settings, consulted in `oauth` mode.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub oauth: Option<OAuthSpec>,
}

/// OAuth settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct OAuthSpec {
    /// Protected resource URL.
    #[serde(default)]
    pub resource_url: String,
    /// Token issuers accepted by the server.
    #[serde(default)]
    pub providers: Vec<OAuthProviderSpec>,
    /// Scopes advertised in resource metadata.
    #[serde(default)]
    pub scopes_supported: Vec<String>,
    /// Realm advertised in `WWW-Authenticate`.
    #[serde(default)]
    pub realm: String,
}

/// A single OAuth token issuer.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct OAuthProviderSpec {
    /// Unique provider name.
    #[serde(default)]
    pub name: String,
    /// Issuer URL.
    #[serde(default)]
    pub issuer_url: String,
    /// JWKS URL override.
    #[serde(default)]
    pub jwks_url: String,
    /// Expected token audience.
    #[serde(default)]
    pub audience: String,
    /// Client ID used for introspection.
    #[serde(default)]
    pub client_id: String,
    /// Secret holding the client secret.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_secret_ref: Option<SecretKeyRef>,
    /// `ConfigMap` holding the CA bundle.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ca_cert_ref: Option<ConfigMapKeyRef>,
    /// Literal CA bundle path; wins over `ca_cert_ref`.
    #[serde(default)]
    pub ca_cert_path: String,
    /// Secret holding a bearer token for the issuer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_token_ref: Option<SecretKeyRef>,
    /// Literal token file path; wins over `auth_token_ref`.
    #[serde(default)]
    pub auth_token_file: String,
    /// Token introspection endpoint.
    #[serde(default)]
    pub introspection_url: String,
    /// Allow the issuer to resolve to a private address.
    #[serde(default, rename = "allowPrivateIP")]
    pub allow_private_ip: bool,
}

fn default_api_version() -> String {
    String::from(MANIFEST_API_VERSION)
}

fn default_kind() -> String {
    String::from(MANIFEST_KIND)
}

fn default_namespace() -> String {
    String::from("default")
}

impl RegistryManifest {
    /// Returns the registry name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.metadata.name
    }

    /// Returns the namespace of the registry.
    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.metadata.namespace
    }

    /// Returns the owner reference tying persisted artifacts to this registry.
    #[must_use]
    pub fn owner_reference(&self) -> OwnerReference {
        OwnerReference {
            api_version: self.api_version.clone(),
            kind: self.kind.clone(),
            name: self.metadata.name.clone(),
            uid: self.metadata.uid.clone(),
            controller: true,
            block_owner_deletion: true,
        }
    }

    /// Decodes the user's Pod template override, if any.
    ///
    /// # Errors
    ///
    /// Returns a parse error if the override is not a valid Pod template.
    pub fn user_pod_template(&self) -> Result<Option<PodTemplateSpec>> {
        let Some(raw) = &self.spec.pod_template_spec else {
            return Ok(None);
        };

        if raw.is_null() {
            return Ok(None);
        }

        let template = serde_json::from_value(raw.clone()).map_err(|e| ConfigError::ParseError {
            message: format!("invalid podTemplateSpec: {e}"),
            location: Some(String::from("spec.podTemplateSpec")),
        })?;

        Ok(Some(template))
    }
}
