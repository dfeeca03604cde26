//! Configuration module for the registry synthesis pipeline.
//!
//! This module handles all configuration-related functionality:
//! - Parsing and deserializing the registry manifest
//! - Resolving it into the canonical server configuration
//! - Computing configuration checksums for change detection

mod auth;
mod hash;
mod parser;
mod resolver;
mod server;
mod spec;

pub use auth::{
    CERTS_MOUNT_BASE, DEFAULT_AUTH_TOKEN_KEY, DEFAULT_CA_CERT_KEY, DEFAULT_CLIENT_SECRET_KEY,
    SECRETS_MOUNT_BASE, cert_file_path, resolve_auth, secret_file_path,
};
pub use hash::ConfigHasher;
pub use parser::{DEFAULT_SPEC_FILES, NAMESPACE_ENV_VAR, SpecParser, find_spec_file};
pub use resolver::{
    ConfigResolver, DEFAULT_GIT_PASSWORD_KEY, build_database_config, default_database_config,
};
pub use server::{
    ApiSource, AuthConfig, AuthMode, BUILTIN_SOURCE_NAME, Config, DEFAULT_REGISTRY_FORMAT,
    DatabaseConfig, FileSource, Filter, GitAuth, GitRef, GitSource, KubernetesSource, NameFilter,
    OAuthConfig, OAuthProviderConfig, REGISTRY_JSON_FILE_NAME, REGISTRY_SOURCE_BASE_PATH,
    SERVER_CONFIG_FILE_NAME, SERVER_CONFIG_MOUNT_PATH, SourceConfig, SourceKind, SyncPolicy,
    TagFilter, server_config_artifact_name, source_file_path,
};
pub use spec::{
    ApiSourceSpec, AuthSpec, ConfigMapKeyRef, DatabaseSpec, FilterSpec, GitAuthSpec,
    GitSourceSpec, IncludeExcludeSpec, MANIFEST_API_VERSION, MANIFEST_KIND, ManifestMetadata,
    OAuthProviderSpec, OAuthSpec, PvcSourceSpec, RegistryManifest, RegistrySpec, SecretKeyRef,
    SourceSpec, SyncPolicySpec,
};
