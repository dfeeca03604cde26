//! Deep merge of Pod templates.
//!
//! The user template always wins. Scalars fall back to the default when the
//! user leaves them unset, maps are unioned with user values winning, and the
//! named collections (containers, volumes, mounts, env vars, ports) are merged
//! by key through [`merge_keyed`]. Merging never fails.

use std::collections::BTreeMap;

use super::types::{Container, ContainerPort, EnvVar, PodSpec, PodTemplateSpec, Volume, VolumeMount};

/// Merges two keyed collections.
///
/// User entries come first in user order; an entry matching a default is
/// replaced by `merge_item(default, user)`. Defaults with no matching user
/// entry are appended in default order.
pub fn merge_keyed<T, F, M>(defaults: &[T], user: &[T], matches: F, merge_item: M) -> Vec<T>
where
    T: Clone,
    F: Fn(&T, &T) -> bool,
    M: Fn(&T, &T) -> T,
{
    if user.is_empty() {
        return defaults.to_vec();
    }
    if defaults.is_empty() {
        return user.to_vec();
    }

    let mut result = Vec::with_capacity(user.len() + defaults.len());
    for item in user {
        match defaults.iter().find(|d| matches(d, item)) {
            Some(default) => result.push(merge_item(default, item)),
            None => result.push(item.clone()),
        }
    }

    for default in defaults {
        if !user.iter().any(|u| matches(default, u)) {
            result.push(default.clone());
        }
    }

    result
}

/// Merges two collections keyed by a single extracted key.
pub fn merge_by_key<T, K, F, M>(defaults: &[T], user: &[T], key_of: F, merge_item: M) -> Vec<T>
where
    T: Clone,
    K: PartialEq,
    F: Fn(&T) -> K,
    M: Fn(&T, &T) -> T,
{
    merge_keyed(defaults, user, |a, b| key_of(a) == key_of(b), merge_item)
}

/// Keeps the user entry whole when keys collide.
fn user_wins<T: Clone>(_default: &T, user: &T) -> T {
    user.clone()
}

/// Merges a default template with an optional user override.
///
/// A missing side degrades to the other one, so `merge(d, None) == d` and
/// `merge(None, u) == u`.
#[must_use]
pub fn merge_pod_templates(
    default: Option<&PodTemplateSpec>,
    user: Option<&PodTemplateSpec>,
) -> PodTemplateSpec {
    match (default, user) {
        (None, None) => PodTemplateSpec::default(),
        (Some(default), None) => default.clone(),
        (None, Some(user)) => user.clone(),
        (Some(default), Some(user)) => {
            let mut result = user.clone();
            result.metadata.labels = merge_maps(&default.metadata.labels, &user.metadata.labels);
            result.metadata.annotations =
                merge_maps(&default.metadata.annotations, &user.metadata.annotations);
            result.spec = merge_pod_spec(&default.spec, &user.spec);
            result
        }
    }
}

fn merge_pod_spec(default: &PodSpec, user: &PodSpec) -> PodSpec {
    let mut result = user.clone();

    fill_string(&mut result.service_account_name, &default.service_account_name);
    result.containers = merge_containers(&default.containers, &user.containers);
    result.init_containers = merge_containers(&default.init_containers, &user.init_containers);
    result.volumes = merge_volumes(&default.volumes, &user.volumes);
    result.extra = merge_maps(&default.extra, &user.extra);

    result
}

/// Merges containers by name, recursing into matching pairs.
#[must_use]
pub fn merge_containers(defaults: &[Container], user: &[Container]) -> Vec<Container> {
    merge_by_key(defaults, user, |c| c.name.clone(), merge_container)
}

/// Fills the unset fields of a user container from the default one.
#[must_use]
pub fn merge_container(default: &Container, user: &Container) -> Container {
    let mut result = user.clone();

    fill_string(&mut result.image, &default.image);
    fill_vec(&mut result.command, &default.command);
    fill_vec(&mut result.args, &default.args);
    fill_string(&mut result.working_dir, &default.working_dir);
    fill_string(&mut result.image_pull_policy, &default.image_pull_policy);

    // An empty requirements block counts as unset
    if result.resources.as_ref().is_none_or(|r| r.requests.is_empty() && r.limits.is_empty()) {
        result.resources.clone_from(&default.resources);
    }
    fill_option(&mut result.liveness_probe, &default.liveness_probe);
    fill_option(&mut result.readiness_probe, &default.readiness_probe);
    fill_option(&mut result.startup_probe, &default.startup_probe);
    fill_option(&mut result.security_context, &default.security_context);

    result.ports = merge_ports(&default.ports, &user.ports);
    result.env = merge_env(&default.env, &user.env);
    result.volume_mounts = merge_volume_mounts(&default.volume_mounts, &user.volume_mounts);
    result.extra = merge_maps(&default.extra, &user.extra);

    result
}

/// Merges volumes by name; a user volume replaces the default one whole.
#[must_use]
pub fn merge_volumes(defaults: &[Volume], user: &[Volume]) -> Vec<Volume> {
    merge_by_key(defaults, user, |v| v.name.clone(), user_wins)
}

/// Merges volume mounts by volume name.
#[must_use]
pub fn merge_volume_mounts(defaults: &[VolumeMount], user: &[VolumeMount]) -> Vec<VolumeMount> {
    merge_by_key(defaults, user, |m| m.name.clone(), user_wins)
}

/// Merges env vars by name.
#[must_use]
pub fn merge_env(defaults: &[EnvVar], user: &[EnvVar]) -> Vec<EnvVar> {
    merge_by_key(defaults, user, |e| e.name.clone(), user_wins)
}

/// Merges ports. Two ports collide when they share a non-empty name or the
/// same port number.
#[must_use]
pub fn merge_ports(defaults: &[ContainerPort], user: &[ContainerPort]) -> Vec<ContainerPort> {
    merge_keyed(
        defaults,
        user,
        |a, b| (!a.name.is_empty() && a.name == b.name) || a.container_port == b.container_port,
        user_wins,
    )
}

/// Unions two maps; user values override defaults.
#[must_use]
pub fn merge_maps<V: Clone>(defaults: &BTreeMap<String, V>, user: &BTreeMap<String, V>) -> BTreeMap<String, V> {
    let mut result = defaults.clone();
    result.extend(user.iter().map(|(k, v)| (k.clone(), v.clone())));
    result
}

fn fill_string(target: &mut String, default: &str) {
    if target.is_empty() {
        *target = default.to_string();
    }
}

fn fill_vec<T: Clone>(target: &mut Vec<T>, default: &[T]) {
    if target.is_empty() {
        *target = default.to_vec();
    }
}

fn fill_option<T: Clone>(target: &mut Option<T>, default: &Option<T>) {
    if target.is_none() {
        target.clone_from(default);
    }
}
