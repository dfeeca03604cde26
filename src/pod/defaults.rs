//! Default registry API Pod template.

use std::collections::BTreeMap;
use tracing::debug;

use crate::config::{RegistryManifest, server_config_artifact_name};
use crate::error::Result;

use super::builder::{
    PodOption, PodTemplateBuilder, SERVE_COMMAND, with_annotations, with_auth_mounts,
    with_container, with_git_auth_mounts, with_labels, with_server_config_mount,
    with_service_account_name, with_source_mounts, with_storage_mount,
};
use super::pgpass::{pgpass_secret_name, with_pgpass_mount};
use super::types::{
    Container, ContainerPort, HttpGetAction, PodTemplateSpec, PortTarget, Probe,
    ResourceRequirements,
};

/// Name of the registry API container.
pub const REGISTRY_API_CONTAINER_NAME: &str = "registry-api";

/// Environment variable selecting the registry API image.
pub const REGISTRY_API_IMAGE_ENV_VAR: &str = "REGISTRY_API_IMAGE";

/// Image used when no override is configured.
pub const DEFAULT_REGISTRY_API_IMAGE: &str = "ghcr.io/registry-synth/registry-server:latest";

/// Service account of the registry API Pod.
pub const DEFAULT_SERVICE_ACCOUNT_NAME: &str = "registry-api";

/// Annotation carrying the configuration checksum; a change rolls the Pod.
pub const CONFIG_HASH_ANNOTATION: &str = "registry-synth.io/config-hash";

/// Port the registry API listens on.
pub const REGISTRY_API_PORT: u16 = 8080;

/// Name of the registry API port.
pub const REGISTRY_API_PORT_NAME: &str = "http";

/// CPU request.
pub const DEFAULT_CPU_REQUEST: &str = "100m";
/// Memory request.
pub const DEFAULT_MEMORY_REQUEST: &str = "128Mi";
/// CPU limit.
pub const DEFAULT_CPU_LIMIT: &str = "500m";
/// Memory limit.
pub const DEFAULT_MEMORY_LIMIT: &str = "256Mi";

/// Liveness endpoint.
pub const HEALTH_CHECK_PATH: &str = "/health";
/// Readiness endpoint.
pub const READINESS_CHECK_PATH: &str = "/readiness";

const LIVENESS_INITIAL_DELAY: u32 = 30;
const LIVENESS_PERIOD: u32 = 10;
const READINESS_INITIAL_DELAY: u32 = 5;
const READINESS_PERIOD: u32 = 5;

/// Returns the registry API image, honouring `REGISTRY_API_IMAGE`.
#[must_use]
pub fn registry_api_image() -> String {
    std::env::var(REGISTRY_API_IMAGE_ENV_VAR)
        .ok()
        .filter(|image| !image.is_empty())
        .unwrap_or_else(|| String::from(DEFAULT_REGISTRY_API_IMAGE))
}

/// Builds the registry API container with default settings.
#[must_use]
pub fn registry_api_container(image: &str) -> Container {
    let mut requests = BTreeMap::new();
    requests.insert(String::from("cpu"), String::from(DEFAULT_CPU_REQUEST));
    requests.insert(String::from("memory"), String::from(DEFAULT_MEMORY_REQUEST));

    let mut limits = BTreeMap::new();
    limits.insert(String::from("cpu"), String::from(DEFAULT_CPU_LIMIT));
    limits.insert(String::from("memory"), String::from(DEFAULT_MEMORY_LIMIT));

    Container {
        name: String::from(REGISTRY_API_CONTAINER_NAME),
        image: image.to_string(),
        args: vec![String::from(SERVE_COMMAND)],
        ports: vec![ContainerPort {
            name: String::from(REGISTRY_API_PORT_NAME),
            container_port: REGISTRY_API_PORT,
            protocol: String::from("TCP"),
        }],
        resources: Some(ResourceRequirements { requests, limits }),
        liveness_probe: Some(http_probe(HEALTH_CHECK_PATH, LIVENESS_INITIAL_DELAY, LIVENESS_PERIOD)),
        readiness_probe: Some(http_probe(READINESS_CHECK_PATH, READINESS_INITIAL_DELAY, READINESS_PERIOD)),
        ..Container::default()
    }
}

fn http_probe(path: &str, initial_delay_seconds: u32, period_seconds: u32) -> Probe {
    Probe {
        http_get: Some(HttpGetAction {
            path: path.to_string(),
            port: PortTarget::Number(REGISTRY_API_PORT),
        }),
        initial_delay_seconds,
        period_seconds,
        ..Probe::default()
    }
}

/// Returns the labels identifying the registry API Pod.
#[must_use]
pub fn registry_api_labels(registry_name: &str) -> BTreeMap<String, String> {
    let mut labels = BTreeMap::new();
    labels.insert(String::from("app.kubernetes.io/name"), format!("{registry_name}-api"));
    labels.insert(String::from("app.kubernetes.io/component"), String::from("registry-api"));
    labels.insert(String::from("app.kubernetes.io/managed-by"), String::from("registry-synth"));
    labels.insert(String::from("registry-synth.io/registry-name"), registry_name.to_string());
    labels
}

/// Options producing the bare default template: labels, config hash
/// annotation, service account and the API container.
#[must_use]
pub fn default_options(labels: BTreeMap<String, String>, config_hash: &str, image: &str) -> Vec<PodOption> {
    let mut annotations = BTreeMap::new();
    annotations.insert(String::from(CONFIG_HASH_ANNOTATION), config_hash.to_string());

    vec![
        with_labels(labels),
        with_annotations(annotations),
        with_service_account_name(DEFAULT_SERVICE_ACCOUNT_NAME),
        with_container(registry_api_container(image)),
    ]
}

/// Builds the bare default template.
#[must_use]
pub fn default_pod_template(labels: BTreeMap<String, String>, config_hash: &str, image: &str) -> PodTemplateSpec {
    PodTemplateBuilder::new()
        .apply(default_options(labels, config_hash, image))
        .build_default()
}

/// Builds the full builder for a registry: defaults plus every mount the
/// registry's sources, database and auth settings require.
#[must_use]
pub fn registry_pod_builder(manifest: &RegistryManifest, config_hash: &str, image: &str) -> PodTemplateBuilder {
    let name = manifest.name();
    let spec = &manifest.spec;

    let mut builder = PodTemplateBuilder::new()
        .apply(default_options(registry_api_labels(name), config_hash, image))
        .apply([
            with_server_config_mount(REGISTRY_API_CONTAINER_NAME, &server_config_artifact_name(name)),
            with_storage_mount(REGISTRY_API_CONTAINER_NAME),
            with_source_mounts(REGISTRY_API_CONTAINER_NAME, &spec.registries),
            with_git_auth_mounts(REGISTRY_API_CONTAINER_NAME, &spec.registries),
            with_auth_mounts(REGISTRY_API_CONTAINER_NAME, spec.auth_config.as_ref()),
        ]);

    let has_db_credentials = spec.database_config.as_ref().is_some_and(|db| {
        db.db_app_user_password_secret_ref.is_some() && db.db_migration_user_password_secret_ref.is_some()
    });
    if has_db_credentials {
        builder = builder.apply([with_pgpass_mount(REGISTRY_API_CONTAINER_NAME, &pgpass_secret_name(name))]);
    }

    builder
}

/// Synthesizes the final Pod template of a registry: the default template
/// merged with the user's override, if any.
///
/// # Errors
///
/// Returns a parse error if the user override is malformed.
pub fn synthesize_pod_template(manifest: &RegistryManifest, config_hash: &str, image: &str) -> Result<PodTemplateSpec> {
    let user = manifest.user_pod_template()?;
    let builder = registry_pod_builder(manifest, config_hash, image);

    debug!(
        "Synthesizing pod template for {} from {} options (user override: {})",
        manifest.name(),
        builder.len(),
        user.is_some()
    );

    Ok(builder.build(user.as_ref()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{
        ConfigMapKeyRef, DatabaseSpec, ManifestMetadata, RegistrySpec, SecretKeyRef, SourceSpec,
    };
    use crate::pod::pgpass::PGPASS_VOLUME_NAME;

    fn manifest(pod_template_spec: Option<serde_json::Value>) -> RegistryManifest {
        RegistryManifest {
            api_version: String::from(crate::config::MANIFEST_API_VERSION),
            kind: String::from(crate::config::MANIFEST_KIND),
            metadata: ManifestMetadata {
                name: String::from("tools"),
                namespace: String::from("mcp"),
                uid: String::from("uid-1"),
            },
            spec: RegistrySpec {
                registries: vec![SourceSpec {
                    name: String::from("primary"),
                    config_map_ref: Some(ConfigMapKeyRef {
                        name: String::from("primary-data"),
                        key: String::new(),
                    }),
                    ..SourceSpec::default()
                }],
                pod_template_spec,
                ..RegistrySpec::default()
            },
        }
    }

    #[test]
    fn test_default_container() {
        let container = registry_api_container("img:1");

        assert_eq!(container.name, "registry-api");
        assert_eq!(container.args, vec!["serve"]);
        assert_eq!(container.ports[0].container_port, 8080);
        let resources = container.resources.as_ref().expect("resources");
        assert_eq!(resources.requests.get("cpu").map(String::as_str), Some("100m"));
        assert_eq!(resources.limits.get("memory").map(String::as_str), Some("256Mi"));
        let liveness = container.liveness_probe.as_ref().expect("liveness");
        assert_eq!(liveness.initial_delay_seconds, 30);
        assert_eq!(liveness.http_get.as_ref().map(|h| h.path.as_str()), Some("/health"));
        let readiness = container.readiness_probe.as_ref().expect("readiness");
        assert_eq!(readiness.period_seconds, 5);
    }

    #[test]
    fn test_default_template_carries_hash_annotation() {
        let template = default_pod_template(registry_api_labels("tools"), "abc123", "img:1");

        assert_eq!(
            template.metadata.annotations.get(CONFIG_HASH_ANNOTATION).map(String::as_str),
            Some("abc123")
        );
        assert_eq!(template.spec.service_account_name, DEFAULT_SERVICE_ACCOUNT_NAME);
        assert_eq!(template.spec.containers.len(), 1);
    }

    #[test]
    fn test_synthesize_without_override() {
        let template = synthesize_pod_template(&manifest(None), "abc123", "img:1").expect("template");

        let container = template.container(REGISTRY_API_CONTAINER_NAME).expect("container");
        assert_eq!(container.args, vec!["serve", "--config=/config/config.yaml"]);
        let paths: Vec<&str> = container.volume_mounts.iter().map(|m| m.mount_path.as_str()).collect();
        assert_eq!(paths, vec!["/config", "/data", "/config/registry/primary"]);
        assert!(template.volume(PGPASS_VOLUME_NAME).is_none());
    }

    #[test]
    fn test_synthesize_merges_override() {
        let user = serde_json::json!({
            "metadata": { "labels": { "team": "tools" } },
            "spec": {
                "tolerations": [{ "key": "dedicated", "operator": "Exists" }],
                "containers": [
                    { "name": "registry-api", "image": "custom:2", "env": [{ "name": "LOG_LEVEL", "value": "debug" }] },
                    { "name": "sidecar", "image": "proxy:1" }
                ]
            }
        });

        let template = synthesize_pod_template(&manifest(Some(user)), "abc123", "img:1").expect("template");

        assert_eq!(template.metadata.labels.get("team").map(String::as_str), Some("tools"));
        assert!(template.metadata.labels.contains_key("app.kubernetes.io/name"));
        assert!(template.spec.extra.contains_key("tolerations"));
        assert_eq!(template.spec.containers.len(), 2);

        let api = template.container(REGISTRY_API_CONTAINER_NAME).expect("api");
        assert_eq!(api.image, "custom:2");
        assert!(api.has_env("LOG_LEVEL"));
        assert!(api.liveness_probe.is_some());
        assert_eq!(api.volume_mounts.len(), 3);
        assert_eq!(template.spec.volumes.len(), 3);
    }

    #[test]
    fn test_pgpass_requires_both_password_refs() {
        let mut with_one = manifest(None);
        with_one.spec.database_config = Some(DatabaseSpec {
            db_app_user_password_secret_ref: Some(SecretKeyRef {
                name: String::from("app-secret"),
                key: String::from("password"),
            }),
            ..DatabaseSpec::default()
        });
        let template = synthesize_pod_template(&with_one, "h", "img").expect("template");
        assert!(template.volume(PGPASS_VOLUME_NAME).is_none());

        let mut with_both = with_one.clone();
        if let Some(db) = with_both.spec.database_config.as_mut() {
            db.db_migration_user_password_secret_ref = Some(SecretKeyRef {
                name: String::from("migration-secret"),
                key: String::from("password"),
            });
        }
        let template = synthesize_pod_template(&with_both, "h", "img").expect("template");
        assert!(template.volume(PGPASS_VOLUME_NAME).is_some());
        assert!(template.container(REGISTRY_API_CONTAINER_NAME).expect("api").has_env("PGPASSFILE"));
    }

    #[test]
    fn test_malformed_override_is_an_error() {
        let bad = serde_json::json!({ "spec": { "containers": [{ "image": 3 }] } });
        assert!(synthesize_pod_template(&manifest(Some(bad)), "h", "img").is_err());
    }
}
