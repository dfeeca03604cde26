//! Output formatting for CLI commands.
//!
//! This module provides formatting utilities for displaying
//! information to the user in various formats.

use colored::Colorize;
use std::fmt::Write;
use tabled::{Table, Tabled};

use crate::config::{Config, ConfigHasher, SourceConfig, SourceKind};
use crate::error::Result;
use crate::persist::{Artifact, UpsertOutcome};
use crate::pod::PodTemplateSpec;

use super::commands::OutputFormat;

/// Output formatter for CLI.
#[derive(Debug)]
pub struct OutputFormatter {
    /// Output format.
    format: OutputFormat,
}

/// Source row for table display.
#[derive(Tabled)]
struct SourceRow {
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Type")]
    kind: String,
    #[tabled(rename = "Format")]
    format: String,
    #[tabled(rename = "Location")]
    location: String,
    #[tabled(rename = "Sync")]
    sync: String,
}

impl From<&SourceConfig> for SourceRow {
    fn from(source: &SourceConfig) -> Self {
        let location = match &source.source {
            SourceKind::File(file) => file.path.clone(),
            SourceKind::Git(git) => format!("{}@{} ({})", git.repository, git.reference.value(), git.path),
            SourceKind::Api(api) => api.endpoint.clone(),
            SourceKind::Kubernetes(_) => String::from("-"),
        };

        Self {
            name: source.name.clone(),
            kind: source.source.kind_name().to_string(),
            format: source.format.clone(),
            location: OutputFormatter::truncate(&location, 60),
            sync: source
                .sync_policy
                .as_ref()
                .map_or_else(|| String::from("-"), |p| p.interval.clone()),
        }
    }
}

impl OutputFormatter {
    /// Creates a new output formatter.
    #[must_use]
    pub const fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Formats the summary of a resolved configuration.
    #[must_use]
    pub fn format_validation(&self, config: &Config, checksum: &str) -> String {
        match self.format {
            OutputFormat::Json => {
                let json = serde_json::json!({
                    "valid": true,
                    "registryName": config.registry_name,
                    "artifactName": config.artifact_name(),
                    "checksum": checksum,
                    "sources": config.source_names(),
                    "auth": config.auth.as_ref().map(|a| a.mode.to_string()),
                });
                serde_json::to_string_pretty(&json).unwrap_or_default()
            }
            OutputFormat::Text => {
                let mut output = format!("{} Registry manifest is valid\n\n", "✓".green());
                let _ = writeln!(output, "   Registry: {}", config.registry_name);
                let _ = writeln!(output, "   Artifact: {}", config.artifact_name());
                let _ = writeln!(output, "   Checksum: {}", ConfigHasher::new().short_hash(checksum));
                if let Some(auth) = &config.auth {
                    let _ = writeln!(output, "   Auth: {}", auth.mode);
                }
                output.push('\n');
                output.push_str(&Self::format_sources(config));
                output
            }
        }
    }

    /// Formats a rendered configuration document and its checksum.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn format_render(&self, config: &Config, checksum: &str) -> Result<String> {
        Ok(match self.format {
            OutputFormat::Json => {
                let json = serde_json::json!({
                    "checksum": checksum,
                    "config": config,
                });
                serde_json::to_string_pretty(&json).unwrap_or_default()
            }
            OutputFormat::Text => format!("# checksum: {checksum}\n{}", config.to_yaml()?),
        })
    }

    /// Formats a Pod template.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn format_pod(&self, template: &PodTemplateSpec) -> Result<String> {
        match self.format {
            OutputFormat::Json => Ok(serde_json::to_string_pretty(template).unwrap_or_default()),
            OutputFormat::Text => template.to_yaml(),
        }
    }

    /// Formats the outcome of an upsert.
    #[must_use]
    pub fn format_upsert(&self, outcome: &UpsertOutcome, backend: &str) -> String {
        let artifact = outcome.artifact();
        match self.format {
            OutputFormat::Json => {
                let json = serde_json::json!({
                    "outcome": outcome.to_string(),
                    "backend": backend,
                    "key": artifact.key(),
                    "resourceVersion": artifact.metadata.resource_version,
                    "checksum": artifact.checksum(),
                });
                serde_json::to_string_pretty(&json).unwrap_or_default()
            }
            OutputFormat::Text => {
                let status = match outcome {
                    UpsertOutcome::Created(_) => format!("{} created", "+".green()),
                    UpsertOutcome::Updated(_) => format!("{} updated", "~".yellow()),
                    UpsertOutcome::Unchanged(_) => format!("{} unchanged", "=".dimmed()),
                };
                format!(
                    "{status} {} ({backend}, version {})\n",
                    artifact.key(),
                    artifact.metadata.resource_version
                )
            }
        }
    }

    /// Formats a stored artifact.
    #[must_use]
    pub fn format_artifact(&self, artifact: &Artifact) -> String {
        match self.format {
            OutputFormat::Json => serde_json::to_string_pretty(artifact).unwrap_or_default(),
            OutputFormat::Text => {
                let meta = &artifact.metadata;
                let mut output = format!("\n{} Artifact: {}\n\n", "■".cyan(), artifact.key());

                let _ = writeln!(output, "   UID: {}", meta.uid);
                let _ = writeln!(output, "   Version: {}", meta.resource_version);
                if let Some(created) = meta.creation_timestamp {
                    let _ = writeln!(output, "   Created: {}", created.format("%Y-%m-%d %H:%M:%S"));
                }
                if let Some(checksum) = artifact.checksum() {
                    let _ = writeln!(output, "   Checksum: {}", ConfigHasher::new().short_hash(checksum));
                }
                for owner in &meta.owner_references {
                    let _ = writeln!(output, "   Owner: {} {} ({})", owner.kind, owner.name, owner.uid);
                }

                for (key, value) in &artifact.data {
                    let _ = write!(output, "\n--- {key}\n{value}");
                    if !value.ends_with('\n') {
                        output.push('\n');
                    }
                }

                output
            }
        }
    }

    /// Formats a message about a missing artifact.
    #[must_use]
    pub fn format_missing(&self, key: &str) -> String {
        match self.format {
            OutputFormat::Json => {
                let json = serde_json::json!({ "key": key, "found": false });
                serde_json::to_string_pretty(&json).unwrap_or_default()
            }
            OutputFormat::Text => format!("{} No artifact found at {key}\n", "⚠".yellow()),
        }
    }

    /// Formats the result of a delete.
    #[must_use]
    pub fn format_delete(&self, key: &str, deleted: bool) -> String {
        match self.format {
            OutputFormat::Json => {
                let json = serde_json::json!({ "key": key, "deleted": deleted });
                serde_json::to_string_pretty(&json).unwrap_or_default()
            }
            OutputFormat::Text if deleted => format!("{} Deleted {key}\n", "✓".green()),
            OutputFormat::Text => self.format_missing(key),
        }
    }

    /// Formats the sources of a configuration as a table.
    fn format_sources(config: &Config) -> String {
        let rows: Vec<SourceRow> = config.registries.iter().map(SourceRow::from).collect();
        let mut output = Table::new(rows).to_string();
        output.push('\n');
        output
    }

    /// Truncates a string to a maximum number of characters.
    fn truncate(s: &str, max_len: usize) -> String {
        if s.chars().count() <= max_len {
            s.to_string()
        } else {
            let head: String = s.chars().take(max_len.saturating_sub(3)).collect();
            format!("{head}...")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{FileSource, SyncPolicy};

    fn config() -> Config {
        Config {
            registry_name: String::from("reg"),
            registries: vec![SourceConfig {
                name: String::from("primary"),
                format: String::from("toolhive"),
                source: SourceKind::File(FileSource {
                    path: String::from("/config/registry/primary/registry.json"),
                }),
                sync_policy: Some(SyncPolicy {
                    interval: String::from("5m"),
                }),
                filter: None,
            }],
            database: None,
            auth: None,
        }
    }

    #[test]
    fn test_truncate() {
        assert_eq!(OutputFormatter::truncate("short", 10), "short");
        assert_eq!(OutputFormatter::truncate("a-very-long-value", 8), "a-ver...");
    }

    #[test]
    fn test_validation_text_lists_sources() {
        let output = OutputFormatter::new(OutputFormat::Text).format_validation(&config(), "0123456789abcdef");
        assert!(output.contains("reg-registry-server-config"));
        assert!(output.contains("primary"));
        assert!(output.contains("5m"));
        assert!(output.contains("01234567"));
    }

    #[test]
    fn test_render_json_embeds_checksum() {
        let output = OutputFormatter::new(OutputFormat::Json)
            .format_render(&config(), "abc")
            .expect("render");
        let value: serde_json::Value = serde_json::from_str(&output).expect("json");
        assert_eq!(value["checksum"], "abc");
        assert_eq!(value["config"]["registryName"], "reg");
    }
}
