//! Manifest parser for loading registry specs.
//!
//! This module handles loading the registry manifest from YAML files and
//! environment variables, with proper precedence and error handling.

use crate::error::{ConfigError, Result, SynthError};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::spec::RegistryManifest;

/// Environment variable overriding the manifest namespace.
pub const NAMESPACE_ENV_VAR: &str = "REGISTRY_SYNTH_NAMESPACE";

/// Parser for registry manifests.
#[derive(Debug, Default)]
pub struct SpecParser {
    /// Base path for resolving the `.env` file.
    base_path: Option<PathBuf>,
}

impl SpecParser {
    /// Creates a new manifest parser.
    #[must_use]
    pub const fn new() -> Self {
        Self { base_path: None }
    }

    /// Sets the base path used to locate the `.env` file.
    #[must_use]
    pub fn with_base_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.base_path = Some(path.into());
        self
    }

    /// Loads a manifest from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_file(&self, path: impl AsRef<Path>) -> Result<RegistryManifest> {
        let path = path.as_ref();
        info!("Loading registry manifest from: {}", path.display());

        if !path.exists() {
            return Err(SynthError::Config(ConfigError::FileNotFound {
                path: path.to_path_buf(),
            }));
        }

        let content = std::fs::read_to_string(path).map_err(|e| {
            SynthError::Config(ConfigError::ParseError {
                message: format!("Failed to read file: {e}"),
                location: Some(path.display().to_string()),
            })
        })?;

        self.parse_yaml(&content, Some(path))
    }

    /// Parses a manifest from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the YAML is invalid.
    pub fn parse_yaml(&self, content: &str, source: Option<&Path>) -> Result<RegistryManifest> {
        debug!("Parsing registry manifest");

        let manifest: RegistryManifest = serde_yaml::from_str(content).map_err(|e| {
            let location = source.map(|p| p.display().to_string());
            SynthError::Config(ConfigError::ParseError {
                message: format!("YAML parse error: {e}"),
                location,
            })
        })?;

        debug!(
            "Parsed manifest for registry {} with {} sources",
            manifest.name(),
            manifest.spec.registries.len()
        );
        Ok(manifest)
    }

    /// Loads a manifest with environment variable overrides.
    ///
    /// `REGISTRY_SYNTH_NAMESPACE` replaces the manifest namespace.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_with_env(&self, path: impl AsRef<Path>) -> Result<RegistryManifest> {
        let mut manifest = self.load_file(path)?;
        Self::apply_env_overrides(&mut manifest, std::env::var(NAMESPACE_ENV_VAR).ok());
        Ok(manifest)
    }

    fn apply_env_overrides(manifest: &mut RegistryManifest, namespace: Option<String>) {
        if let Some(namespace) = namespace.filter(|ns| !ns.is_empty()) {
            debug!("Overriding metadata.namespace from environment");
            manifest.metadata.namespace = namespace;
        }
    }

    /// Loads the .env file if present.
    ///
    /// # Errors
    ///
    /// Returns an error if the .env file exists but cannot be loaded.
    pub fn load_dotenv(&self) -> Result<()> {
        let env_path = self
            .base_path
            .as_ref()
            .map_or_else(|| PathBuf::from(".env"), |p| p.join(".env"));

        if env_path.exists() {
            info!("Loading environment from: {}", env_path.display());
            dotenvy::from_path(&env_path).map_err(|e| {
                SynthError::Config(ConfigError::ParseError {
                    message: format!("Failed to load .env file: {e}"),
                    location: Some(env_path.display().to_string()),
                })
            })?;
        } else {
            debug!(".env file not found at: {}", env_path.display());
        }

        Ok(())
    }
}

/// Default manifest file names to search for.
pub const DEFAULT_SPEC_FILES: &[&str] = &["registry.yaml", "registry.yml", "registry-synth.yaml"];

/// Finds the manifest file in the given directory or its parents.
///
/// # Errors
///
/// Returns an error if no manifest file is found.
pub fn find_spec_file(start_dir: impl AsRef<Path>) -> Result<PathBuf> {
    let start = start_dir.as_ref();
    let mut current = start.to_path_buf();

    loop {
        for filename in DEFAULT_SPEC_FILES {
            let spec_path = current.join(filename);
            if spec_path.exists() {
                info!("Found registry manifest: {}", spec_path.display());
                return Ok(spec_path);
            }
        }

        if !current.pop() {
            break;
        }
    }

    Err(SynthError::Config(ConfigError::FileNotFound {
        path: start.join(DEFAULT_SPEC_FILES[0]),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const FULL_MANIFEST: &str = r#"
apiVersion: registry.dev/v1alpha1
kind: Registry
metadata:
  name: tools
  namespace: mcp
  uid: 6f1c2b7e-0000-4000-8000-000000000001
spec:
  displayName: Tool registry
  registries:
    - name: primary
      configMapRef:
        name: primary-data
        key: registry.json
      syncPolicy:
        interval: 5m
    - name: upstream
      format: upstream
      git:
        repository: https://github.com/example/registry.git
        branch: main
        path: data/registry.json
      filter:
        tags:
          include: ["prod"]
  databaseConfig:
    host: db.internal
  authConfig:
    mode: oauth
    oauth:
      resourceUrl: https://registry.example.com
      providers:
        - name: corp
          issuerUrl: https://sso.example.com
          audience: registry
  podTemplateSpec:
    spec:
      serviceAccountName: registry-reader
"#;

    #[test]
    fn test_parse_minimal_manifest() {
        let yaml = r"
metadata:
  name: tools
spec:
  registries: []
";
        let manifest = SpecParser::new().parse_yaml(yaml, None).expect("parse");

        assert_eq!(manifest.name(), "tools");
        assert_eq!(manifest.namespace(), "default");
        assert_eq!(manifest.kind, "Registry");
        assert!(manifest.spec.registries.is_empty());
    }

    #[test]
    fn test_parse_full_manifest() {
        let manifest = SpecParser::new().parse_yaml(FULL_MANIFEST, None).expect("parse");

        assert_eq!(manifest.namespace(), "mcp");
        assert_eq!(manifest.spec.registries.len(), 2);
        assert!(manifest.spec.registries[0].config_map_ref.is_some());
        let git = manifest.spec.registries[1].git.as_ref().expect("git");
        assert_eq!(git.branch, "main");
        assert_eq!(
            manifest.spec.database_config.as_ref().map(|d| d.host.as_str()),
            Some("db.internal")
        );

        let template = manifest.user_pod_template().expect("template").expect("present");
        assert_eq!(template.spec.service_account_name, "registry-reader");
    }

    #[test]
    fn test_parse_error_carries_location() {
        let err = SpecParser::new()
            .parse_yaml("metadata: [", Some(Path::new("registry.yaml")))
            .expect_err("should fail");

        match err {
            SynthError::Config(ConfigError::ParseError { location, .. }) => {
                assert_eq!(location.as_deref(), Some("registry.yaml"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_load_missing_file() {
        let dir = TempDir::new().expect("tempdir");
        let err = SpecParser::new()
            .load_file(dir.path().join("absent.yaml"))
            .expect_err("should fail");

        assert!(matches!(err, SynthError::Config(ConfigError::FileNotFound { .. })));
    }

    #[test]
    fn test_namespace_override() {
        let mut manifest = SpecParser::new().parse_yaml(FULL_MANIFEST, None).expect("parse");

        SpecParser::apply_env_overrides(&mut manifest, Some(String::new()));
        assert_eq!(manifest.namespace(), "mcp");

        SpecParser::apply_env_overrides(&mut manifest, Some(String::from("staging")));
        assert_eq!(manifest.namespace(), "staging");
    }

    #[test]
    fn test_find_spec_file_walks_parents() {
        let dir = TempDir::new().expect("tempdir");
        let nested = dir.path().join("a").join("b");
        std::fs::create_dir_all(&nested).expect("mkdir");
        std::fs::write(dir.path().join("registry.yaml"), FULL_MANIFEST).expect("write");

        let found = find_spec_file(&nested).expect("find");
        assert_eq!(found, dir.path().join("registry.yaml"));

        let loaded = SpecParser::new().load_file(&found).expect("load");
        assert_eq!(loaded.name(), "tools");
    }
}
