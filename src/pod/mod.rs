//! Pod template synthesis.
//!
//! This module builds the registry API Pod template:
//! - Pod template types with passthrough of unmodelled fields
//! - A fold-based builder of composable template options
//! - Keyed deep merge of the default template with a user override
//! - pgpass rendering for database credentials

mod builder;
mod defaults;
mod merge;
mod pgpass;
mod types;

pub use builder::{
    PodOption, PodTemplateBuilder, SERVE_COMMAND, SERVER_CONFIG_VOLUME_NAME, STORAGE_MOUNT_PATH,
    STORAGE_VOLUME_NAME, compose, with_annotations, with_auth_mounts, with_container,
    with_container_args, with_env_var, with_git_auth_mounts, with_labels, with_server_config_mount,
    with_service_account_name, with_source_mounts, with_storage_mount, with_volume,
    with_volume_mount,
};
pub use defaults::{
    CONFIG_HASH_ANNOTATION, DEFAULT_REGISTRY_API_IMAGE, DEFAULT_SERVICE_ACCOUNT_NAME,
    REGISTRY_API_CONTAINER_NAME, REGISTRY_API_IMAGE_ENV_VAR, REGISTRY_API_PORT,
    default_options, default_pod_template, registry_api_container, registry_api_image,
    registry_api_labels, registry_pod_builder, synthesize_pod_template,
};
pub use merge::{
    merge_by_key, merge_container, merge_containers, merge_env, merge_keyed, merge_maps,
    merge_pod_templates, merge_ports, merge_volume_mounts, merge_volumes,
};
pub use pgpass::{
    PGPASS_MOUNT_PATH, PGPASS_SECRET_KEY, pgpass_secret_name, render_pgpass, with_pgpass_mount,
};
pub use types::{
    ConfigMapVolumeSource, Container, ContainerPort, EmptyDirVolumeSource, EnvVar, HttpGetAction,
    KeyToPath, PodSpec, PodTemplateSpec, PortTarget, Probe, PvcVolumeSource, ResourceRequirements,
    SecretVolumeSource, TemplateMeta, Volume, VolumeMount,
};
