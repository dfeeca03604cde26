//! PostgreSQL password file support.
//!
//! The registry server reads database credentials from a pgpass file with one
//! line per account. The file lives in a generated secret and is mounted into
//! the API container with `PGPASSFILE` pointing at it.

use crate::config::DatabaseConfig;

use super::builder::{PodOption, compose, with_env_var, with_volume, with_volume_mount};
use super::types::{EnvVar, KeyToPath, SecretVolumeSource, Volume, VolumeMount};

/// Key of the pgpass document inside its secret.
pub const PGPASS_SECRET_KEY: &str = ".pgpass";

/// Path the pgpass file is mounted at.
pub const PGPASS_MOUNT_PATH: &str = "/home/app/.pgpass";

/// Volume holding the pgpass secret.
pub const PGPASS_VOLUME_NAME: &str = "db-pgpass";

/// File mode of the mounted pgpass file; libpq ignores group or world readable files.
pub const PGPASS_FILE_MODE: u32 = 0o600;

/// Returns the name of the generated pgpass secret of a registry.
#[must_use]
pub fn pgpass_secret_name(registry_name: &str) -> String {
    format!("{registry_name}-db-pgpass")
}

/// Renders the pgpass document: one `host:port:database:user:password` line
/// for the operational user, then one for the migration user.
#[must_use]
pub fn render_pgpass(db: &DatabaseConfig, app_password: &str, migration_password: &str) -> String {
    let line = |user: &str, password: &str| {
        format!(
            "{}:{}:{}:{}:{}\n",
            escape(&db.host),
            db.port,
            escape(&db.database),
            escape(user),
            escape(password)
        )
    };

    let mut out = line(&db.user, app_password);
    out.push_str(&line(&db.migration_user, migration_password));
    out
}

/// Colons and backslashes are field separators in pgpass and must be escaped.
fn escape(field: &str) -> String {
    field.replace('\\', "\\\\").replace(':', "\\:")
}

/// Mounts the pgpass secret into a container and sets `PGPASSFILE`.
#[must_use]
pub fn with_pgpass_mount(container_name: &str, secret_name: &str) -> PodOption {
    compose(vec![
        with_volume(Volume::from_secret(
            PGPASS_VOLUME_NAME,
            SecretVolumeSource {
                secret_name: secret_name.to_string(),
                items: vec![KeyToPath {
                    key: String::from(PGPASS_SECRET_KEY),
                    path: String::from(PGPASS_SECRET_KEY),
                }],
                default_mode: Some(PGPASS_FILE_MODE),
            },
        )),
        with_volume_mount(
            container_name,
            VolumeMount {
                name: String::from(PGPASS_VOLUME_NAME),
                mount_path: String::from(PGPASS_MOUNT_PATH),
                read_only: true,
                sub_path: String::from(PGPASS_SECRET_KEY),
            },
        ),
        with_env_var(container_name, EnvVar::literal("PGPASSFILE", PGPASS_MOUNT_PATH)),
    ])
}
