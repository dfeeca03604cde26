//! Authentication resolution.
//!
//! Turns the optional `authConfig` block into an [`AuthConfig`] and resolves
//! every secret, certificate and token reference to the path it is mounted at
//! inside the registry server container.

use std::collections::HashSet;
use tracing::{debug, warn};

use crate::error::ConfigError;

use super::server::{AuthConfig, AuthMode, OAuthConfig, OAuthProviderConfig};
use super::spec::{AuthSpec, ConfigMapKeyRef, OAuthProviderSpec, OAuthSpec, SecretKeyRef};

/// Mount directory of secret-backed values.
pub const SECRETS_MOUNT_BASE: &str = "/secrets";

/// Mount directory of ConfigMap-backed certificates.
pub const CERTS_MOUNT_BASE: &str = "/config/certs";

/// Default key of an OAuth client secret.
pub const DEFAULT_CLIENT_SECRET_KEY: &str = "client-secret";

/// Default key of a CA bundle.
pub const DEFAULT_CA_CERT_KEY: &str = "ca.crt";

/// Default key of an issuer bearer token.
pub const DEFAULT_AUTH_TOKEN_KEY: &str = "token";

/// Returns the mount path of a secret key: `/secrets/{name}/{key|default}`.
#[must_use]
pub fn secret_file_path(reference: &SecretKeyRef, default_key: &str) -> String {
    let key = if reference.key.is_empty() {
        default_key
    } else {
        &reference.key
    };
    format!("{SECRETS_MOUNT_BASE}/{}/{key}", reference.name)
}

/// Returns the mount path of a certificate key: `/config/certs/{name}/{key|default}`.
#[must_use]
pub fn cert_file_path(reference: &ConfigMapKeyRef, default_key: &str) -> String {
    let key = if reference.key.is_empty() {
        default_key
    } else {
        &reference.key
    };
    format!("{CERTS_MOUNT_BASE}/{}/{key}", reference.name)
}

/// Resolves the authentication block.
///
/// Absent blocks, empty modes and unknown modes all resolve to anonymous.
/// In oauth mode a supplied OAuth block must list at least one valid provider;
/// a missing OAuth block is accepted and yields no providers.
///
/// # Errors
///
/// Returns a validation error describing the first invalid provider.
pub fn resolve_auth(spec: Option<&AuthSpec>) -> Result<AuthConfig, ConfigError> {
    let Some(spec) = spec else {
        return Ok(anonymous());
    };

    let mode = AuthMode::parse(&spec.mode);
    if mode == AuthMode::Anonymous {
        if !spec.mode.is_empty() && spec.mode != "anonymous" {
            warn!("Unrecognized auth mode {:?}, using anonymous", spec.mode);
        }
        return Ok(anonymous());
    }

    let Some(oauth) = &spec.oauth else {
        warn!("Auth mode is oauth but no oauth block is configured; no token issuers will be accepted");
        return Ok(AuthConfig {
            mode,
            oauth: None,
        });
    };

    Ok(AuthConfig {
        mode,
        oauth: Some(resolve_oauth(oauth)?),
    })
}

const fn anonymous() -> AuthConfig {
    AuthConfig {
        mode: AuthMode::Anonymous,
        oauth: None,
    }
}

fn resolve_oauth(spec: &OAuthSpec) -> Result<OAuthConfig, ConfigError> {
    if spec.providers.is_empty() {
        return Err(ConfigError::validation(
            "at least one OAuth provider is required in oauth mode",
            "authConfig.oauth.providers",
        ));
    }

    let mut seen = HashSet::new();
    let mut providers = Vec::with_capacity(spec.providers.len());

    for (i, provider) in spec.providers.iter().enumerate() {
        let resolved = resolve_provider(provider, i)?;
        if !seen.insert(resolved.name.clone()) {
            return Err(ConfigError::DuplicateName {
                resource_type: String::from("OAuth provider"),
                name: resolved.name,
            });
        }
        providers.push(resolved);
    }

    debug!("Resolved {} OAuth providers", providers.len());

    Ok(OAuthConfig {
        resource_url: spec.resource_url.clone(),
        scopes_supported: spec.scopes_supported.clone(),
        realm: spec.realm.clone(),
        providers,
    })
}

fn resolve_provider(spec: &OAuthProviderSpec, index: usize) -> Result<OAuthProviderConfig, ConfigError> {
    let field = format!("authConfig.oauth.providers[{index}]");

    if spec.name.is_empty() {
        return Err(ConfigError::validation("OAuth provider name is required", format!("{field}.name")));
    }
    if spec.issuer_url.is_empty() {
        return Err(ConfigError::validation(
            format!("OAuth provider {:?}: issuer URL is required", spec.name),
            format!("{field}.issuerUrl"),
        ));
    }
    if spec.audience.is_empty() {
        return Err(ConfigError::validation(
            format!("OAuth provider {:?}: audience is required", spec.name),
            format!("{field}.audience"),
        ));
    }

    let client_secret_file = spec
        .client_secret_ref
        .as_ref()
        .map(|r| secret_file_path(r, DEFAULT_CLIENT_SECRET_KEY))
        .unwrap_or_default();

    let ca_cert_path = literal_or(&spec.ca_cert_path, || {
        spec.ca_cert_ref.as_ref().map(|r| cert_file_path(r, DEFAULT_CA_CERT_KEY))
    });

    let auth_token_file = literal_or(&spec.auth_token_file, || {
        spec.auth_token_ref
            .as_ref()
            .map(|r| secret_file_path(r, DEFAULT_AUTH_TOKEN_KEY))
    });

    Ok(OAuthProviderConfig {
        name: spec.name.clone(),
        issuer_url: spec.issuer_url.clone(),
        jwks_url: spec.jwks_url.clone(),
        audience: spec.audience.clone(),
        client_id: spec.client_id.clone(),
        client_secret_file,
        ca_cert_path,
        auth_token_file,
        introspection_url: spec.introspection_url.clone(),
        allow_private_ip: spec.allow_private_ip,
    })
}

/// Literal paths win over reference-based resolution.
fn literal_or(literal: &str, from_ref: impl FnOnce() -> Option<String>) -> String {
    if literal.is_empty() {
        from_ref().unwrap_or_default()
    } else {
        literal.to_string()
    }
}
