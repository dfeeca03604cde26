//! CLI command definitions.
//!
//! This module defines all CLI commands and their arguments using clap.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::error::{ConfigError, Result};

/// Environment variable naming the S3 bucket.
const BUCKET_ENV: &str = "REGISTRY_SYNTH_BUCKET";

/// Registry synth - Registry API server configuration and Pod template synthesizer.
#[derive(Parser, Debug)]
#[command(name = "registry-synth")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to the registry manifest.
    #[arg(short, long, global = true, env = "REGISTRY_SYNTH_SPEC")]
    pub file: Option<PathBuf>,

    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output format (text, json).
    #[arg(long, global = true, default_value = "text")]
    pub output: OutputFormat,

    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    pub log_json: bool,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Validate the registry manifest.
    Validate,

    /// Render the server configuration and its checksum.
    Render {
        /// Print only the checksum.
        #[arg(long)]
        checksum_only: bool,
    },

    /// Render the registry API Pod template.
    Pod {
        /// Registry API image (defaults to `REGISTRY_API_IMAGE`).
        #[arg(long)]
        image: Option<String>,
    },

    /// Persist the server configuration artifact.
    Apply {
        /// Store options.
        #[command(flatten)]
        store: StoreArgs,
    },

    /// Show the stored server configuration artifact.
    Show {
        /// Store options.
        #[command(flatten)]
        store: StoreArgs,
    },

    /// Delete the stored server configuration artifact.
    Delete {
        /// Skip confirmation prompt.
        #[arg(short, long)]
        yes: bool,

        /// Store options.
        #[command(flatten)]
        store: StoreArgs,
    },
}

/// Artifact store selection.
#[derive(Args, Debug, Clone)]
pub struct StoreArgs {
    /// Store backend.
    #[arg(long, default_value = "local", env = "REGISTRY_SYNTH_STORE")]
    pub store: StoreBackend,

    /// Directory of the local store (defaults to `.registry-synth` next to the manifest).
    #[arg(long, env = "REGISTRY_SYNTH_STATE_DIR")]
    pub state_dir: Option<PathBuf>,

    /// S3 bucket of the s3 store.
    #[arg(long, env = BUCKET_ENV)]
    pub bucket: Option<String>,

    /// S3 key prefix.
    #[arg(long, env = "REGISTRY_SYNTH_PREFIX")]
    pub prefix: Option<String>,

    /// AWS region.
    #[arg(long, env = "AWS_REGION")]
    pub region: Option<String>,

    /// Maximum write attempts on conflict.
    #[arg(long, default_value = "5")]
    pub max_attempts: u32,
}

impl StoreArgs {
    /// Returns the S3 bucket.
    ///
    /// # Errors
    ///
    /// Returns an error if neither `--bucket` nor `REGISTRY_SYNTH_BUCKET` is set.
    pub fn require_bucket(&self) -> Result<&str> {
        self.bucket
            .as_deref()
            .filter(|b| !b.trim().is_empty())
            .ok_or_else(|| {
                ConfigError::MissingEnvVar {
                    name: String::from(BUCKET_ENV),
                }
                .into()
            })
    }
}

/// Store backend options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum StoreBackend {
    /// In-process store, discarded on exit.
    Memory,
    /// JSON files on the local filesystem.
    #[default]
    Local,
    /// AWS S3 with conditional writes.
    S3,
}

/// Output format options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output.
    #[default]
    Text,
    /// JSON output for scripting.
    Json,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_apply_parses_store_flags() {
        let cli = Cli::try_parse_from([
            "registry-synth",
            "-f",
            "registry.yaml",
            "apply",
            "--store",
            "s3",
            "--bucket",
            "configs",
            "--max-attempts",
            "3",
        ])
        .expect("should parse");

        assert_eq!(cli.file, Some(PathBuf::from("registry.yaml")));
        let Commands::Apply { store } = cli.command else {
            panic!("expected apply");
        };
        assert_eq!(store.store, StoreBackend::S3);
        assert_eq!(store.bucket.as_deref(), Some("configs"));
        assert_eq!(store.max_attempts, 3);
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["registry-synth", "render", "--output", "json", "--verbose"])
            .expect("should parse");

        assert_eq!(cli.output, OutputFormat::Json);
        assert!(cli.verbose);
        assert!(matches!(cli.command, Commands::Render { checksum_only: false }));
    }

    #[test]
    fn test_s3_store_requires_a_bucket() {
        let mut args = StoreArgs {
            store: StoreBackend::S3,
            state_dir: None,
            bucket: None,
            prefix: None,
            region: None,
            max_attempts: 5,
        };

        let err = args.require_bucket().expect_err("no bucket");
        assert!(matches!(
            err,
            crate::error::SynthError::Config(ConfigError::MissingEnvVar { ref name }) if name == BUCKET_ENV
        ));

        args.bucket = Some(String::from("  "));
        assert!(args.require_bucket().is_err());

        args.bucket = Some(String::from("configs"));
        assert_eq!(args.require_bucket().expect("bucket"), "configs");
    }
}
