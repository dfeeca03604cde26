//! Resolution of a registry spec into a canonical [`Config`].
//!
//! Resolution is all-or-nothing: the first violated invariant aborts with a
//! validation error and no partial configuration is produced. The input is
//! static, so none of these errors are worth retrying.

use std::collections::HashSet;
use tracing::debug;

use crate::error::{ConfigError, Result};

use super::auth::{resolve_auth, secret_file_path};
use super::server::{
    ApiSource, BUILTIN_SOURCE_NAME, Config, DEFAULT_REGISTRY_FORMAT, DatabaseConfig, FileSource,
    Filter, GitAuth, GitRef, GitSource, KubernetesSource, NameFilter, REGISTRY_JSON_FILE_NAME,
    SourceConfig, SourceKind, SyncPolicy, TagFilter, source_file_path,
};
use super::spec::{
    ApiSourceSpec, DatabaseSpec, FilterSpec, GitAuthSpec, GitSourceSpec, PvcSourceSpec,
    RegistryManifest, RegistrySpec, SourceSpec,
};

/// Default key of a Git password secret.
pub const DEFAULT_GIT_PASSWORD_KEY: &str = "password";

/// Resolver turning registry specs into server configurations.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConfigResolver;

impl ConfigResolver {
    /// Creates a new resolver.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Resolves a manifest.
    ///
    /// # Errors
    ///
    /// Returns a validation error if any invariant is violated.
    pub fn resolve(&self, manifest: &RegistryManifest) -> Result<Config> {
        self.resolve_spec(manifest.name(), &manifest.spec)
    }

    /// Resolves a registry spec under the given registry name.
    ///
    /// User sources keep their input order; the built-in cluster source is
    /// appended last.
    ///
    /// # Errors
    ///
    /// Returns a validation error if any invariant is violated.
    pub fn resolve_spec(&self, registry_name: &str, spec: &RegistrySpec) -> Result<Config> {
        if registry_name.is_empty() {
            return Err(ConfigError::validation("registry name is required", "metadata.name").into());
        }

        if spec.registries.is_empty() {
            return Err(ConfigError::validation(
                "at least one registry must be specified",
                "spec.registries",
            )
            .into());
        }

        validate_source_names(&spec.registries)
            .map_err(|e| e.context("invalid registry configuration"))?;

        let mut registries = Vec::with_capacity(spec.registries.len() + 1);
        for (i, source) in spec.registries.iter().enumerate() {
            let resolved = build_source(source, i).map_err(|e| {
                e.context(&format!(
                    "failed to build registry configuration for {:?}",
                    source.name
                ))
            })?;
            registries.push(resolved);
        }

        registries.push(SourceConfig {
            name: String::from(BUILTIN_SOURCE_NAME),
            format: String::new(),
            source: SourceKind::Kubernetes(KubernetesSource {}),
            sync_policy: None,
            filter: None,
        });

        let auth = resolve_auth(spec.auth_config.as_ref())?;

        debug!(
            "Resolved registry {registry_name} with {} sources (auth mode {})",
            registries.len(),
            auth.mode
        );

        Ok(Config {
            registry_name: registry_name.to_string(),
            registries,
            database: Some(build_database_config(spec.database_config.as_ref())),
            auth: Some(auth),
        })
    }
}

/// Ensures every source has a unique, non-reserved name.
fn validate_source_names(sources: &[SourceSpec]) -> std::result::Result<(), ConfigError> {
    let mut seen = HashSet::new();

    for (i, source) in sources.iter().enumerate() {
        if source.name.is_empty() {
            return Err(ConfigError::validation(
                "registry name is required",
                format!("spec.registries[{i}].name"),
            ));
        }
        if source.name == BUILTIN_SOURCE_NAME {
            return Err(ConfigError::validation(
                format!("registry name {BUILTIN_SOURCE_NAME:?} is reserved for the built-in source"),
                format!("spec.registries[{i}].name"),
            ));
        }
        if !seen.insert(source.name.as_str()) {
            return Err(ConfigError::DuplicateName {
                resource_type: String::from("registry"),
                name: source.name.clone(),
            });
        }
    }

    Ok(())
}

fn build_source(spec: &SourceSpec, index: usize) -> std::result::Result<SourceConfig, ConfigError> {
    let field = format!("spec.registries[{index}]");

    let source = match (&spec.config_map_ref, &spec.git, &spec.api, &spec.pvc_ref) {
        (Some(config_map), None, None, None) => {
            if config_map.name.is_empty() {
                return Err(ConfigError::validation(
                    "configMapRef name is required",
                    format!("{field}.configMapRef.name"),
                ));
            }
            // ConfigMap data is mounted as a file, the server only ever reads files
            SourceKind::File(FileSource {
                path: source_file_path(&spec.name, REGISTRY_JSON_FILE_NAME),
            })
        }
        (None, Some(git), None, None) => SourceKind::Git(
            build_git_source(git)
                .map_err(|e| e.context("failed to build Git source configuration"))?,
        ),
        (None, None, Some(api), None) => SourceKind::Api(build_api_source(api)?),
        (None, None, None, Some(pvc)) => SourceKind::File(build_pvc_source(&spec.name, pvc)?),
        (None, None, None, None) => {
            return Err(ConfigError::validation(
                "exactly one source type (configMapRef, git, api, or pvcRef) must be specified",
                field,
            ));
        }
        _ => {
            return Err(ConfigError::validation(
                "only one source type (configMapRef, git, api, or pvcRef) can be specified",
                field,
            ));
        }
    };

    let sync_policy = match &spec.sync_policy {
        Some(policy) if policy.interval.is_empty() => {
            return Err(ConfigError::validation(
                "sync policy interval is required",
                format!("{field}.syncPolicy.interval"),
            ));
        }
        Some(policy) => Some(SyncPolicy {
            interval: policy.interval.clone(),
        }),
        None => None,
    };

    let format = if spec.format.is_empty() {
        String::from(DEFAULT_REGISTRY_FORMAT)
    } else {
        spec.format.clone()
    };

    Ok(SourceConfig {
        name: spec.name.clone(),
        format,
        source,
        sync_policy,
        filter: spec.filter.as_ref().map(build_filter),
    })
}

/// Exactly one of branch, tag and commit must be set. Setting several is
/// rejected rather than resolved by priority.
fn build_git_source(git: &GitSourceSpec) -> std::result::Result<GitSource, ConfigError> {
    if git.repository.is_empty() {
        return Err(ConfigError::validation("git repository is required", "git.repository"));
    }

    if git.path.is_empty() {
        return Err(ConfigError::validation("git path is required", "git.path"));
    }

    let refs: Vec<GitRef> = [
        (!git.branch.is_empty()).then(|| GitRef::Branch(git.branch.clone())),
        (!git.tag.is_empty()).then(|| GitRef::Tag(git.tag.clone())),
        (!git.commit.is_empty()).then(|| GitRef::Commit(git.commit.clone())),
    ]
    .into_iter()
    .flatten()
    .collect();

    let [reference] = <[GitRef; 1]>::try_from(refs).map_err(|_| {
        ConfigError::validation(
            "git branch, tag, and commit are mutually exclusive, please provide exactly one of them",
            "git",
        )
    })?;

    let auth = git.auth.as_ref().map(build_git_auth).transpose()?;

    Ok(GitSource {
        repository: git.repository.clone(),
        reference,
        path: git.path.clone(),
        auth,
    })
}

fn build_git_auth(auth: &GitAuthSpec) -> std::result::Result<GitAuth, ConfigError> {
    if auth.username.is_empty() {
        return Err(ConfigError::validation("git auth username is required", "git.auth.username"));
    }
    if auth.password_secret_ref.name.is_empty() {
        return Err(ConfigError::validation(
            "git auth password secret name is required",
            "git.auth.passwordSecretRef.name",
        ));
    }

    Ok(GitAuth {
        username: auth.username.clone(),
        password_file: secret_file_path(&auth.password_secret_ref, DEFAULT_GIT_PASSWORD_KEY),
    })
}

fn build_api_source(api: &ApiSourceSpec) -> std::result::Result<ApiSource, ConfigError> {
    if api.endpoint.is_empty() {
        return Err(ConfigError::validation("api endpoint is required", "api.endpoint"));
    }

    Ok(ApiSource {
        endpoint: api.endpoint.clone(),
    })
}

/// PVC sources are mounted whole at `/config/registry/{source}`, so several
/// sources can share one claim under different sub-paths.
fn build_pvc_source(source_name: &str, pvc: &PvcSourceSpec) -> std::result::Result<FileSource, ConfigError> {
    if pvc.claim_name.is_empty() {
        return Err(ConfigError::validation("pvcRef claimName is required", "pvcRef.claimName"));
    }

    let file_name = if pvc.path.is_empty() {
        REGISTRY_JSON_FILE_NAME
    } else {
        pvc.path.as_str()
    };

    if file_name.starts_with('/') || file_name.split('/').any(|part| part == "..") {
        return Err(ConfigError::validation(
            format!("pvcRef path {file_name:?} must be relative to the claim root"),
            "pvcRef.path",
        ));
    }

    Ok(FileSource {
        path: source_file_path(source_name, file_name),
    })
}

/// Include/exclude lists are copied verbatim, explicit empty lists included.
fn build_filter(filter: &FilterSpec) -> Filter {
    Filter {
        names: filter.names.as_ref().map(|names| NameFilter {
            include: names.include.clone(),
            exclude: names.exclude.clone(),
        }),
        tags: filter.tags.as_ref().map(|tags| TagFilter {
            include: tags.include.clone(),
            exclude: tags.exclude.clone(),
        }),
    }
}

/// Returns the database settings used when no override is given.
#[must_use]
pub fn default_database_config() -> DatabaseConfig {
    DatabaseConfig {
        host: String::from("postgres"),
        port: 5432,
        user: String::from("db_app"),
        migration_user: String::from("db_migrator"),
        database: String::from("registry"),
        ssl_mode: String::from("prefer"),
        max_open_conns: 10,
        max_idle_conns: 2,
        conn_max_lifetime: String::from("30m"),
    }
}

/// Overlays the set fields of an override onto the defaults.
#[must_use]
pub fn build_database_config(spec: Option<&DatabaseSpec>) -> DatabaseConfig {
    let mut config = default_database_config();

    let Some(spec) = spec else {
        return config;
    };

    override_string(&mut config.host, &spec.host);
    if spec.port != 0 {
        config.port = spec.port;
    }
    override_string(&mut config.user, &spec.user);
    override_string(&mut config.migration_user, &spec.migration_user);
    override_string(&mut config.database, &spec.database);
    override_string(&mut config.ssl_mode, &spec.ssl_mode);
    if spec.max_open_conns != 0 {
        config.max_open_conns = spec.max_open_conns;
    }
    if spec.max_idle_conns != 0 {
        config.max_idle_conns = spec.max_idle_conns;
    }
    override_string(&mut config.conn_max_lifetime, &spec.conn_max_lifetime);

    config
}

fn override_string(target: &mut String, value: &str) {
    if !value.is_empty() {
        *target = value.to_string();
    }
}
