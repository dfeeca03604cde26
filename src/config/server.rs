//! Canonical registry server configuration.
//!
//! This is the document written to the `config.yaml` key of the persisted
//! artifact and read by the registry server on startup. Values are fully
//! resolved: every source carries exactly one variant and every path is final.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::{PersistError, Result};
use crate::persist::{Artifact, ArtifactMeta, CONTENT_CHECKSUM_ANNOTATION};

use super::hash::ConfigHasher;

/// Mount directory of file-backed registry sources.
pub const REGISTRY_SOURCE_BASE_PATH: &str = "/config/registry";

/// Default file name of a file-backed registry document.
pub const REGISTRY_JSON_FILE_NAME: &str = "registry.json";

/// Mount directory of the server configuration artifact.
pub const SERVER_CONFIG_MOUNT_PATH: &str = "/config";

/// Key of the serialized configuration inside the artifact.
pub const SERVER_CONFIG_FILE_NAME: &str = "config.yaml";

/// Name of the implicit cluster-discovery source.
pub const BUILTIN_SOURCE_NAME: &str = "default";

/// Format assumed when a source does not name one.
pub const DEFAULT_REGISTRY_FORMAT: &str = "toolhive";

/// The root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Registry instance name.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub registry_name: String,
    /// Ordered registry sources.
    pub registries: Vec<SourceConfig>,
    /// Database connection settings.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database: Option<DatabaseConfig>,
    /// Authentication settings.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth: Option<AuthConfig>,
}

/// A resolved registry data source.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SourceConfig {
    /// Unique source name.
    pub name: String,
    /// Data format.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub format: String,
    /// The one populated source variant.
    #[serde(flatten)]
    pub source: SourceKind,
    /// Synchronization policy.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sync_policy: Option<SyncPolicy>,
    /// Entry filter.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<Filter>,
}

/// Source variants. Exactly one exists per source by construction.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// A registry document on the local filesystem (ConfigMap or PVC backed).
    File(FileSource),
    /// A registry document in a Git repository.
    Git(GitSource),
    /// An upstream registry API.
    Api(ApiSource),
    /// Servers discovered from the cluster itself.
    Kubernetes(KubernetesSource),
}

/// File source settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FileSource {
    /// Absolute path of the registry document.
    pub path: String,
}

/// Git source settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GitSource {
    /// Repository URL.
    pub repository: String,
    /// The one ref to check out.
    #[serde(flatten)]
    pub reference: GitRef,
    /// Path of the registry document inside the repository.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub path: String,
    /// Basic-auth credentials.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth: Option<GitAuth>,
}

/// A Git ref: branch, tag or commit.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum GitRef {
    /// Track a branch.
    Branch(String),
    /// Pin a tag.
    Tag(String),
    /// Pin a commit.
    Commit(String),
}

/// Git basic-auth credentials with the password resolved to a file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct GitAuth {
    /// Username.
    pub username: String,
    /// Mounted file holding the password.
    pub password_file: String,
}

/// API source settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ApiSource {
    /// Base URL of the upstream API.
    pub endpoint: String,
}

/// Marker for the cluster-discovery source; carries no settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct KubernetesSource {}

/// Synchronization settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SyncPolicy {
    /// Sync interval.
    pub interval: String,
}

/// Entry filter.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Filter {
    /// Name based lists.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub names: Option<NameFilter>,
    /// Tag based lists.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<TagFilter>,
}

/// Name based include/exclude lists.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct NameFilter {
    /// Names to include.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub include: Option<Vec<String>>,
    /// Names to exclude.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exclude: Option<Vec<String>>,
}

/// Tag based include/exclude lists.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct TagFilter {
    /// Tags to include.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub include: Option<Vec<String>>,
    /// Tags to exclude.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exclude: Option<Vec<String>>,
}

/// PostgreSQL connection settings.
///
/// Two accounts are used: `user` for regular queries and `migration_user`
/// for schema changes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DatabaseConfig {
    /// Database host.
    pub host: String,
    /// Database port.
    pub port: u16,
    /// Operational user.
    pub user: String,
    /// Migration user.
    pub migration_user: String,
    /// Database name.
    pub database: String,
    /// SSL mode.
    pub ssl_mode: String,
    /// Maximum open connections.
    pub max_open_conns: u32,
    /// Maximum idle connections.
    pub max_idle_conns: u32,
    /// Maximum connection lifetime.
    pub conn_max_lifetime: String,
}

/// Authentication mode.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum AuthMode {
    /// Unauthenticated access.
    #[default]
    Anonymous,
    /// Bearer tokens validated against OAuth issuers.
    #[serde(rename = "oauth")]
    OAuth,
}

/// Authentication settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AuthConfig {
    /// Authentication mode.
    pub mode: AuthMode,
    /// OAuth settings, present only in `oauth` mode.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub oauth: Option<OAuthConfig>,
}

/// OAuth settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct OAuthConfig {
    /// Protected resource URL.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub resource_url: String,
    /// Advertised scopes.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub scopes_supported: Vec<String>,
    /// Realm.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub realm: String,
    /// Accepted token issuers.
    #[serde(default)]
    pub providers: Vec<OAuthProviderConfig>,
}

/// A resolved OAuth issuer.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct OAuthProviderConfig {
    /// Provider name.
    pub name: String,
    /// Issuer URL.
    pub issuer_url: String,
    /// JWKS URL override.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub jwks_url: String,
    /// Expected audience.
    pub audience: String,
    /// Client ID.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub client_id: String,
    /// Mounted file holding the client secret.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub client_secret_file: String,
    /// Mounted CA bundle.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub ca_cert_path: String,
    /// Mounted bearer token for the issuer.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub auth_token_file: String,
    /// Introspection endpoint.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub introspection_url: String,
    /// Allow private issuer addresses.
    #[serde(default, rename = "allowPrivateIP", skip_serializing_if = "std::ops::Not::not")]
    pub allow_private_ip: bool,
}

/// Returns the artifact name holding the server configuration of a registry.
#[must_use]
pub fn server_config_artifact_name(registry_name: &str) -> String {
    format!("{registry_name}-registry-server-config")
}

/// Returns the mount path of a file-backed source document.
#[must_use]
pub fn source_file_path(source_name: &str, file_name: &str) -> String {
    format!("{REGISTRY_SOURCE_BASE_PATH}/{source_name}/{file_name}")
}

impl Config {
    /// Serializes the configuration to YAML.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).map_err(|e| {
            PersistError::serialization(format!("failed to marshal config to YAML: {e}")).into()
        })
    }

    /// Computes the hex-encoded content checksum of the serialized configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_checksum(&self) -> Result<String> {
        ConfigHasher::new().hash_config(self)
    }

    /// Returns the name of the artifact this configuration is persisted under.
    #[must_use]
    pub fn artifact_name(&self) -> String {
        server_config_artifact_name(&self.registry_name)
    }

    /// Returns a source by name.
    #[must_use]
    pub fn source(&self, name: &str) -> Option<&SourceConfig> {
        self.registries.iter().find(|s| s.name == name)
    }

    /// Returns source names in order.
    #[must_use]
    pub fn source_names(&self) -> Vec<&str> {
        self.registries.iter().map(|s| s.name.as_str()).collect()
    }

    /// Builds the artifact holding this configuration, with its content
    /// checksum attached as an annotation.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_artifact(&self, namespace: &str) -> Result<Artifact> {
        let yaml = self.to_yaml()?;
        let checksum = ConfigHasher::new().checksum(yaml.as_bytes());

        let mut annotations = BTreeMap::new();
        annotations.insert(String::from(CONTENT_CHECKSUM_ANNOTATION), checksum);

        let mut labels = BTreeMap::new();
        labels.insert(String::from("app.kubernetes.io/component"), String::from("registry-api"));
        labels.insert(String::from("app.kubernetes.io/managed-by"), String::from("registry-synth"));
        labels.insert(String::from("registry-synth.io/registry-name"), self.registry_name.clone());

        let mut data = BTreeMap::new();
        data.insert(String::from(SERVER_CONFIG_FILE_NAME), yaml);

        Ok(Artifact {
            metadata: ArtifactMeta {
                name: self.artifact_name(),
                namespace: namespace.to_string(),
                labels,
                annotations,
                ..ArtifactMeta::default()
            },
            data,
        })
    }
}

impl SourceKind {
    /// Returns the variant name as written in the configuration.
    #[must_use]
    pub const fn kind_name(&self) -> &'static str {
        match self {
            Self::File(_) => "file",
            Self::Git(_) => "git",
            Self::Api(_) => "api",
            Self::Kubernetes(_) => "kubernetes",
        }
    }

    /// Returns the file path for file-backed sources.
    #[must_use]
    pub fn file_path(&self) -> Option<&str> {
        match self {
            Self::File(file) => Some(&file.path),
            _ => None,
        }
    }
}

impl GitRef {
    /// Returns the ref value.
    #[must_use]
    pub fn value(&self) -> &str {
        match self {
            Self::Branch(v) | Self::Tag(v) | Self::Commit(v) => v,
        }
    }
}

impl AuthMode {
    /// Parses a mode string. Unknown or empty values fall back to anonymous.
    #[must_use]
    pub fn parse(mode: &str) -> Self {
        match mode {
            "oauth" => Self::OAuth,
            _ => Self::Anonymous,
        }
    }
}

impl std::fmt::Display for AuthMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Anonymous => write!(f, "anonymous"),
            Self::OAuth => write!(f, "oauth"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_config() -> Config {
        Config {
            registry_name: String::from("reg"),
            registries: vec![
                SourceConfig {
                    name: String::from("upstream"),
                    format: String::from(DEFAULT_REGISTRY_FORMAT),
                    source: SourceKind::Git(GitSource {
                        repository: String::from("https://example.com/repo.git"),
                        reference: GitRef::Tag(String::from("v1.2.0")),
                        path: String::from("registry.json"),
                        auth: None,
                    }),
                    sync_policy: Some(SyncPolicy {
                        interval: String::from("5m"),
                    }),
                    filter: Some(Filter {
                        names: Some(NameFilter {
                            include: Some(vec![]),
                            exclude: None,
                        }),
                        tags: None,
                    }),
                },
                SourceConfig {
                    name: String::from(BUILTIN_SOURCE_NAME),
                    format: String::new(),
                    source: SourceKind::Kubernetes(KubernetesSource {}),
                    sync_policy: None,
                    filter: None,
                },
            ],
            database: None,
            auth: Some(AuthConfig {
                mode: AuthMode::Anonymous,
                oauth: None,
            }),
        }
    }

    #[test]
    fn test_yaml_shape() {
        let yaml = sample_config().to_yaml().expect("serialize");
        assert!(yaml.contains("registryName: reg"));
        assert!(yaml.contains("git:"));
        assert!(yaml.contains("tag: v1.2.0"));
        assert!(yaml.contains("kubernetes: {}"));
        assert!(yaml.contains("include: []"));
        assert!(!yaml.contains("exclude"));
        assert!(yaml.contains("mode: anonymous"));
    }

    #[test]
    fn test_yaml_round_trip_preserves_variants() {
        let config = sample_config();
        let yaml = config.to_yaml().expect("serialize");
        let parsed: Config = serde_yaml::from_str(&yaml).expect("parse");
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_artifact_carries_checksum_and_data() {
        let config = sample_config();
        let artifact = config.to_artifact("tools").expect("artifact");

        assert_eq!(artifact.metadata.name, "reg-registry-server-config");
        assert_eq!(artifact.metadata.namespace, "tools");
        assert_eq!(
            artifact.checksum(),
            Some(config.to_checksum().expect("checksum").as_str())
        );
        assert!(artifact.data.contains_key(SERVER_CONFIG_FILE_NAME));
    }

    #[test]
    fn test_auth_mode_parse_falls_back_to_anonymous() {
        assert_eq!(AuthMode::parse("oauth"), AuthMode::OAuth);
        assert_eq!(AuthMode::parse("anonymous"), AuthMode::Anonymous);
        assert_eq!(AuthMode::parse(""), AuthMode::Anonymous);
        assert_eq!(AuthMode::parse("OAUTH"), AuthMode::Anonymous);
    }

    #[test]
    fn test_source_file_path() {
        assert_eq!(
            source_file_path("primary", REGISTRY_JSON_FILE_NAME),
            "/config/registry/primary/registry.json"
        );
    }
}
