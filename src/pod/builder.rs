//! Pod template builder.
//!
//! A template is produced by folding an ordered list of options over an empty
//! template. Each option is a pure `PodTemplateSpec -> PodTemplateSpec`
//! function, so the same list can be folded any number of times. Options that
//! add a named entry leave the template untouched when the name is already
//! present, which makes re-applying a list a no-op.

use std::collections::BTreeMap;
use std::fmt;

use crate::config::{
    AuthMode, AuthSpec, CERTS_MOUNT_BASE, REGISTRY_JSON_FILE_NAME, REGISTRY_SOURCE_BASE_PATH,
    SECRETS_MOUNT_BASE, SERVER_CONFIG_FILE_NAME, SERVER_CONFIG_MOUNT_PATH, SourceSpec,
};

use super::merge::merge_pod_templates;
use super::types::{
    ConfigMapVolumeSource, Container, EnvVar, KeyToPath, PodTemplateSpec, SecretVolumeSource,
    Volume, VolumeMount,
};

/// A single template mutation.
pub type PodOption = Box<dyn Fn(PodTemplateSpec) -> PodTemplateSpec + Send + Sync>;

/// Subcommand the registry API container runs.
pub const SERVE_COMMAND: &str = "serve";

/// Volume holding the server configuration artifact.
pub const SERVER_CONFIG_VOLUME_NAME: &str = "registry-server-config";

/// Scratch volume for registry storage.
pub const STORAGE_VOLUME_NAME: &str = "storage-data";

/// Mount path of the scratch volume.
pub const STORAGE_MOUNT_PATH: &str = "/data";

/// Builder accumulating template options.
#[derive(Default)]
pub struct PodTemplateBuilder {
    options: Vec<PodOption>,
}

impl fmt::Debug for PodTemplateBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PodTemplateBuilder")
            .field("options", &self.options.len())
            .finish()
    }
}

impl PodTemplateBuilder {
    /// Creates an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends options, keeping their order.
    #[must_use]
    pub fn apply(mut self, options: impl IntoIterator<Item = PodOption>) -> Self {
        self.options.extend(options);
        self
    }

    /// Returns the number of accumulated options.
    #[must_use]
    pub fn len(&self) -> usize {
        self.options.len()
    }

    /// Returns true if no options were added.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.options.is_empty()
    }

    /// Folds the options over `initial`.
    #[must_use]
    pub fn apply_to(&self, initial: PodTemplateSpec) -> PodTemplateSpec {
        self.options.iter().fold(initial, |template, option| option(template))
    }

    /// Builds the default template from an empty one.
    #[must_use]
    pub fn build_default(&self) -> PodTemplateSpec {
        self.apply_to(PodTemplateSpec::default())
    }

    /// Builds the default template and merges the user override on top.
    ///
    /// Without an override the default template is returned unmodified.
    #[must_use]
    pub fn build(&self, user: Option<&PodTemplateSpec>) -> PodTemplateSpec {
        let default = self.build_default();
        match user {
            Some(user) => merge_pod_templates(Some(&default), Some(user)),
            None => default,
        }
    }
}

/// Combines several options into one, applied in order.
#[must_use]
pub fn compose(options: Vec<PodOption>) -> PodOption {
    Box::new(move |template| options.iter().fold(template, |acc, option| option(acc)))
}

/// Adds labels, overwriting existing keys.
#[must_use]
pub fn with_labels(labels: BTreeMap<String, String>) -> PodOption {
    Box::new(move |mut template| {
        template.metadata.labels.extend(labels.clone());
        template
    })
}

/// Adds annotations, overwriting existing keys.
#[must_use]
pub fn with_annotations(annotations: BTreeMap<String, String>) -> PodOption {
    Box::new(move |mut template| {
        template.metadata.annotations.extend(annotations.clone());
        template
    })
}

/// Sets the service account.
#[must_use]
pub fn with_service_account_name(name: impl Into<String>) -> PodOption {
    let name = name.into();
    Box::new(move |mut template| {
        template.spec.service_account_name.clone_from(&name);
        template
    })
}

/// Adds a container unless one with the same name exists.
#[must_use]
pub fn with_container(container: Container) -> PodOption {
    Box::new(move |mut template| {
        if template.container(&container.name).is_none() {
            template.spec.containers.push(container.clone());
        }
        template
    })
}

/// Adds a volume unless one with the same name exists.
#[must_use]
pub fn with_volume(volume: Volume) -> PodOption {
    Box::new(move |mut template| {
        if template.volume(&volume.name).is_none() {
            template.spec.volumes.push(volume.clone());
        }
        template
    })
}

/// Adds a volume mount to a container unless the container already mounts
/// that volume. Unknown containers are ignored.
#[must_use]
pub fn with_volume_mount(container_name: impl Into<String>, mount: VolumeMount) -> PodOption {
    let container_name = container_name.into();
    Box::new(move |mut template| {
        if let Some(container) = find_container_mut(&mut template, &container_name)
            && !container.has_volume_mount(&mount.name)
        {
            container.volume_mounts.push(mount.clone());
        }
        template
    })
}

/// Adds an env var to a container unless it is already defined.
#[must_use]
pub fn with_env_var(container_name: impl Into<String>, env: EnvVar) -> PodOption {
    let container_name = container_name.into();
    Box::new(move |mut template| {
        if let Some(container) = find_container_mut(&mut template, &container_name)
            && !container.has_env(&env.name)
        {
            container.env.push(env.clone());
        }
        template
    })
}

/// Replaces the args of a container.
#[must_use]
pub fn with_container_args(container_name: impl Into<String>, args: Vec<String>) -> PodOption {
    let container_name = container_name.into();
    Box::new(move |mut template| {
        if let Some(container) = find_container_mut(&mut template, &container_name) {
            container.args.clone_from(&args);
        }
        template
    })
}

/// Mounts the server configuration artifact read-only at `/config` and
/// points the container at it.
#[must_use]
pub fn with_server_config_mount(container_name: &str, artifact_name: &str) -> PodOption {
    compose(vec![
        with_container_args(
            container_name,
            vec![
                String::from(SERVE_COMMAND),
                format!("--config={SERVER_CONFIG_MOUNT_PATH}/{SERVER_CONFIG_FILE_NAME}"),
            ],
        ),
        with_volume(Volume::from_config_map(
            SERVER_CONFIG_VOLUME_NAME,
            ConfigMapVolumeSource {
                name: artifact_name.to_string(),
                items: Vec::new(),
            },
        )),
        with_volume_mount(
            container_name,
            VolumeMount {
                name: String::from(SERVER_CONFIG_VOLUME_NAME),
                mount_path: String::from(SERVER_CONFIG_MOUNT_PATH),
                read_only: true,
                sub_path: String::new(),
            },
        ),
    ])
}

/// Mounts a scratch volume at `/data`.
#[must_use]
pub fn with_storage_mount(container_name: &str) -> PodOption {
    compose(vec![
        with_volume(Volume::empty_dir(STORAGE_VOLUME_NAME)),
        with_volume_mount(
            container_name,
            VolumeMount {
                name: String::from(STORAGE_VOLUME_NAME),
                mount_path: String::from(STORAGE_MOUNT_PATH),
                read_only: false,
                sub_path: String::new(),
            },
        ),
    ])
}

/// Mounts every ConfigMap and PVC backed source at `/config/registry/{source}`.
///
/// A ConfigMap source projects its key as `registry.json`. A PVC source is
/// mounted whole so the configured sub-path resolves inside it.
#[must_use]
pub fn with_source_mounts(container_name: &str, sources: &[SourceSpec]) -> PodOption {
    let mut options = Vec::new();

    for source in sources {
        let volume_name = format!("registry-data-source-{}", source.name);
        let volume = if let Some(config_map) = &source.config_map_ref {
            let key = if config_map.key.is_empty() {
                REGISTRY_JSON_FILE_NAME
            } else {
                config_map.key.as_str()
            };
            Volume::from_config_map(
                volume_name.as_str(),
                ConfigMapVolumeSource {
                    name: config_map.name.clone(),
                    items: vec![KeyToPath {
                        key: key.to_string(),
                        path: String::from(REGISTRY_JSON_FILE_NAME),
                    }],
                },
            )
        } else if let Some(pvc) = &source.pvc_ref {
            Volume::from_claim(volume_name.as_str(), pvc.claim_name.as_str(), true)
        } else {
            continue;
        };

        options.push(with_volume(volume));
        options.push(with_volume_mount(
            container_name,
            VolumeMount {
                name: volume_name,
                mount_path: format!("{REGISTRY_SOURCE_BASE_PATH}/{}", source.name),
                read_only: true,
                sub_path: String::new(),
            },
        ));
    }

    compose(options)
}

/// Mounts the secrets holding Git passwords at `/secrets/{secret}`.
#[must_use]
pub fn with_git_auth_mounts(container_name: &str, sources: &[SourceSpec]) -> PodOption {
    let secret_names = sources
        .iter()
        .filter_map(|s| s.git.as_ref()?.auth.as_ref())
        .map(|auth| auth.password_secret_ref.name.clone());

    compose(secret_names.map(|name| secret_mount(container_name, &name)).collect())
}

/// Mounts the secrets and CA bundles referenced by OAuth providers at
/// `/secrets/{secret}` and `/config/certs/{configmap}`.
///
/// Nothing is mounted outside oauth mode.
#[must_use]
pub fn with_auth_mounts(container_name: &str, auth: Option<&AuthSpec>) -> PodOption {
    let mut options = Vec::new();

    let providers = auth
        .filter(|a| AuthMode::parse(&a.mode) == AuthMode::OAuth)
        .and_then(|a| a.oauth.as_ref())
        .map(|o| o.providers.as_slice())
        .unwrap_or_default();

    for provider in providers {
        if let Some(secret) = &provider.client_secret_ref {
            options.push(secret_mount(container_name, &secret.name));
        }
        if let Some(token) = &provider.auth_token_ref
            && provider.auth_token_file.is_empty()
        {
            options.push(secret_mount(container_name, &token.name));
        }
        if let Some(ca) = &provider.ca_cert_ref
            && provider.ca_cert_path.is_empty()
        {
            let volume_name = format!("cert-{}", ca.name);
            options.push(with_volume(Volume::from_config_map(
                volume_name.as_str(),
                ConfigMapVolumeSource {
                    name: ca.name.clone(),
                    items: Vec::new(),
                },
            )));
            options.push(with_volume_mount(
                container_name,
                VolumeMount {
                    name: volume_name,
                    mount_path: format!("{CERTS_MOUNT_BASE}/{}", ca.name),
                    read_only: true,
                    sub_path: String::new(),
                },
            ));
        }
    }

    compose(options)
}

/// Volume and mount for a secret at `/secrets/{secret}`. Shared secrets map to
/// the same volume name and are mounted once.
fn secret_mount(container_name: &str, secret_name: &str) -> PodOption {
    let volume_name = format!("secret-{secret_name}");
    compose(vec![
        with_volume(Volume::from_secret(
            volume_name.as_str(),
            SecretVolumeSource {
                secret_name: secret_name.to_string(),
                items: Vec::new(),
                default_mode: None,
            },
        )),
        with_volume_mount(
            container_name,
            VolumeMount {
                name: volume_name,
                mount_path: format!("{SECRETS_MOUNT_BASE}/{secret_name}"),
                read_only: true,
                sub_path: String::new(),
            },
        ),
    ])
}

fn find_container_mut<'a>(template: &'a mut PodTemplateSpec, name: &str) -> Option<&'a mut Container> {
    template.spec.containers.iter_mut().find(|c| c.name == name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{
        ConfigMapKeyRef, GitAuthSpec, GitSourceSpec, OAuthProviderSpec, OAuthSpec, PvcSourceSpec,
        SecretKeyRef,
    };

    fn app() -> Container {
        Container {
            name: String::from("app"),
            image: String::from("x"),
            ..Container::default()
        }
    }

    #[test]
    fn test_adding_volume_twice_keeps_one() {
        let builder = PodTemplateBuilder::new().apply([
            with_volume(Volume::empty_dir("cache")),
            with_volume(Volume::empty_dir("cache")),
        ]);

        let template = builder.build(None);
        assert_eq!(template.spec.volumes.len(), 1);
    }

    #[test]
    fn test_refolding_options_is_a_no_op() {
        let builder = PodTemplateBuilder::new().apply([
            with_container(app()),
            with_storage_mount("app"),
            with_env_var("app", EnvVar::literal("LOG_LEVEL", "info")),
            with_server_config_mount("app", "reg-registry-server-config"),
        ]);

        let once = builder.build_default();
        let twice = builder.apply_to(once.clone());
        assert_eq!(once, twice);

        let container = once.container("app").expect("container");
        assert_eq!(container.volume_mounts.len(), 2);
        assert_eq!(container.env.len(), 1);
    }

    #[test]
    fn test_build_without_override_returns_default() {
        let builder = PodTemplateBuilder::new().apply([with_container(app())]);
        assert_eq!(builder.build(None), builder.build_default());
    }

    #[test]
    fn test_build_merges_user_override() {
        let builder = PodTemplateBuilder::new().apply([
            with_service_account_name("registry-api"),
            with_container(app()),
        ]);

        let mut user = PodTemplateSpec::default();
        user.spec.containers.push(Container {
            name: String::from("app"),
            args: vec![String::from("a")],
            ..Container::default()
        });

        let template = builder.build(Some(&user));
        let container = template.container("app").expect("container");
        assert_eq!(container.image, "x");
        assert_eq!(container.args, vec![String::from("a")]);
        assert_eq!(template.spec.service_account_name, "registry-api");
    }

    #[test]
    fn test_mount_on_unknown_container_is_ignored() {
        let builder = PodTemplateBuilder::new().apply([
            with_container(app()),
            with_volume_mount(
                "missing",
                VolumeMount {
                    name: String::from("v"),
                    mount_path: String::from("/v"),
                    read_only: false,
                    sub_path: String::new(),
                },
            ),
        ]);

        let template = builder.build_default();
        assert!(template.container("app").expect("container").volume_mounts.is_empty());
    }

    #[test]
    fn test_server_config_mount() {
        let template = PodTemplateBuilder::new()
            .apply([with_container(app()), with_server_config_mount("app", "reg-registry-server-config")])
            .build_default();

        let container = template.container("app").expect("container");
        assert_eq!(container.args, vec!["serve", "--config=/config/config.yaml"]);
        let mount = &container.volume_mounts[0];
        assert_eq!(mount.mount_path, "/config");
        assert!(mount.read_only);

        let volume = template.volume(SERVER_CONFIG_VOLUME_NAME).expect("volume");
        assert_eq!(
            volume.config_map.as_ref().map(|c| c.name.as_str()),
            Some("reg-registry-server-config")
        );
    }

    #[test]
    fn test_source_mounts_cover_config_maps_and_claims() {
        let sources = vec![
            SourceSpec {
                name: String::from("primary"),
                config_map_ref: Some(ConfigMapKeyRef {
                    name: String::from("primary-data"),
                    key: String::from("servers.json"),
                }),
                ..SourceSpec::default()
            },
            SourceSpec {
                name: String::from("shared"),
                pvc_ref: Some(PvcSourceSpec {
                    claim_name: String::from("registry-data"),
                    path: String::from("prod/registry.json"),
                }),
                ..SourceSpec::default()
            },
            SourceSpec {
                name: String::from("remote"),
                git: Some(GitSourceSpec::default()),
                ..SourceSpec::default()
            },
        ];

        let template = PodTemplateBuilder::new()
            .apply([with_container(app()), with_source_mounts("app", &sources)])
            .build_default();

        assert_eq!(template.spec.volumes.len(), 2);
        let cm = template.volume("registry-data-source-primary").expect("cm volume");
        let items = &cm.config_map.as_ref().expect("config map").items;
        assert_eq!(items[0].key, "servers.json");
        assert_eq!(items[0].path, "registry.json");

        let pvc = template.volume("registry-data-source-shared").expect("pvc volume");
        assert_eq!(
            pvc.persistent_volume_claim.as_ref().map(|p| p.claim_name.as_str()),
            Some("registry-data")
        );

        let paths: Vec<&str> = template
            .container("app")
            .expect("container")
            .volume_mounts
            .iter()
            .map(|m| m.mount_path.as_str())
            .collect();
        assert_eq!(paths, vec!["/config/registry/primary", "/config/registry/shared"]);
    }

    #[test]
    fn test_auth_mounts_dedupe_shared_secrets() {
        let provider = |name: &str| OAuthProviderSpec {
            name: name.to_string(),
            issuer_url: String::from("https://issuer"),
            audience: String::from("registry"),
            client_secret_ref: Some(SecretKeyRef {
                name: String::from("oauth-shared"),
                key: String::new(),
            }),
            ca_cert_ref: Some(ConfigMapKeyRef {
                name: String::from("corp-ca"),
                key: String::new(),
            }),
            ..OAuthProviderSpec::default()
        };
        let auth = AuthSpec {
            mode: String::from("oauth"),
            oauth: Some(OAuthSpec {
                providers: vec![provider("a"), provider("b")],
                ..OAuthSpec::default()
            }),
        };

        let template = PodTemplateBuilder::new()
            .apply([with_container(app()), with_auth_mounts("app", Some(&auth))])
            .build_default();

        assert_eq!(template.spec.volumes.len(), 2);
        let paths: Vec<&str> = template
            .container("app")
            .expect("container")
            .volume_mounts
            .iter()
            .map(|m| m.mount_path.as_str())
            .collect();
        assert_eq!(paths, vec!["/secrets/oauth-shared", "/config/certs/corp-ca"]);

        let anonymous = AuthSpec {
            mode: String::from("anonymous"),
            ..auth
        };
        let template = PodTemplateBuilder::new()
            .apply([with_container(app()), with_auth_mounts("app", Some(&anonymous))])
            .build_default();
        assert!(template.spec.volumes.is_empty());
    }

    #[test]
    fn test_git_auth_mounts() {
        let sources = vec![SourceSpec {
            name: String::from("private"),
            git: Some(GitSourceSpec {
                auth: Some(GitAuthSpec {
                    username: String::from("bot"),
                    password_secret_ref: SecretKeyRef {
                        name: String::from("git-creds"),
                        key: String::new(),
                    },
                }),
                ..GitSourceSpec::default()
            }),
            ..SourceSpec::default()
        }];

        let template = PodTemplateBuilder::new()
            .apply([with_container(app()), with_git_auth_mounts("app", &sources)])
            .build_default();

        let volume = template.volume("secret-git-creds").expect("volume");
        assert_eq!(
            volume.secret.as_ref().map(|s| s.secret_name.as_str()),
            Some("git-creds")
        );
    }
}
