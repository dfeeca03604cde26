//! Registry synth CLI entrypoint.
//!
//! This is the main entrypoint for the registry-synth command-line tool.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use registry_synth::cli::{Cli, Commands, OutputFormatter, StoreArgs, StoreBackend};
use registry_synth::config::{Config, ConfigResolver, RegistryManifest, SpecParser, find_spec_file};
use registry_synth::error::Result;
use registry_synth::persist::{
    ArtifactStore, ConfigPersister, LocalArtifactStore, MemoryArtifactStore, RetryPolicy, S3ArtifactStore,
};
use registry_synth::pod::{registry_api_image, synthesize_pod_template};

use clap::Parser;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

/// Default local store directory, relative to the manifest.
const LOCAL_STORE_DIR: &str = ".registry-synth";

/// Main entrypoint.
fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize logging
    init_logging(cli.verbose, cli.log_json);

    // Run async runtime
    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Failed to create async runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(run(cli)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

/// Initializes the logging system.
///
/// `RUST_LOG` takes precedence over the verbosity flag.
fn init_logging(verbose: bool, json: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);

    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// Main async entry point.
async fn run(cli: Cli) -> Result<()> {
    let formatter = OutputFormatter::new(cli.output);
    let spec_file = resolve_spec_path(cli.file.as_ref())?;
    let manifest = load_manifest(&spec_file)?;

    match cli.command {
        Commands::Validate => cmd_validate(&manifest, &formatter),
        Commands::Render { checksum_only } => cmd_render(&manifest, checksum_only, &formatter),
        Commands::Pod { image } => cmd_pod(&manifest, image, &formatter),
        Commands::Apply { store } => {
            let store = open_store(&store, &spec_file).await?;
            cmd_apply(&manifest, store, &formatter).await
        }
        Commands::Show { store } => {
            let store = open_store(&store, &spec_file).await?;
            cmd_show(&manifest, store, &formatter).await
        }
        Commands::Delete { yes, store } => {
            let store = open_store(&store, &spec_file).await?;
            cmd_delete(&manifest, yes, store, &formatter).await
        }
    }
}

/// Validate the manifest.
fn cmd_validate(manifest: &RegistryManifest, formatter: &OutputFormatter) -> Result<()> {
    let config = resolve_config(manifest)?;
    let checksum = config.to_checksum()?;

    // A malformed Pod override fails validation as well
    manifest.user_pod_template()?;

    eprintln!("{}", formatter.format_validation(&config, &checksum));
    Ok(())
}

/// Render the server configuration.
fn cmd_render(manifest: &RegistryManifest, checksum_only: bool, formatter: &OutputFormatter) -> Result<()> {
    let config = resolve_config(manifest)?;
    let checksum = config.to_checksum()?;

    if checksum_only {
        println!("{checksum}");
    } else {
        print!("{}", formatter.format_render(&config, &checksum)?);
    }
    Ok(())
}

/// Render the Pod template.
fn cmd_pod(manifest: &RegistryManifest, image: Option<String>, formatter: &OutputFormatter) -> Result<()> {
    let config = resolve_config(manifest)?;
    let checksum = config.to_checksum()?;
    let image = image.unwrap_or_else(registry_api_image);

    let template = synthesize_pod_template(manifest, &checksum, &image)?;
    print!("{}", formatter.format_pod(&template)?);
    Ok(())
}

/// Persist the server configuration artifact.
async fn cmd_apply(
    manifest: &RegistryManifest,
    persister: ConfigPersister<Box<dyn ArtifactStore>>,
    formatter: &OutputFormatter,
) -> Result<()> {
    let config = resolve_config(manifest)?;

    let outcome = persister
        .persist_config(&config, manifest.namespace(), &manifest.owner_reference())
        .await?;

    eprintln!("{}", formatter.format_upsert(&outcome, persister.store().backend_type()));
    Ok(())
}

/// Show the stored artifact.
async fn cmd_show(
    manifest: &RegistryManifest,
    persister: ConfigPersister<Box<dyn ArtifactStore>>,
    formatter: &OutputFormatter,
) -> Result<()> {
    let config = resolve_config(manifest)?;
    let name = config.artifact_name();

    match persister.get(manifest.namespace(), &name).await? {
        Some(artifact) => print!("{}", formatter.format_artifact(&artifact)),
        None => eprintln!("{}", formatter.format_missing(&format!("{}/{name}", manifest.namespace()))),
    }
    Ok(())
}

/// Delete the stored artifact.
async fn cmd_delete(
    manifest: &RegistryManifest,
    auto_approve: bool,
    persister: ConfigPersister<Box<dyn ArtifactStore>>,
    formatter: &OutputFormatter,
) -> Result<()> {
    let config = resolve_config(manifest)?;
    let name = config.artifact_name();
    let key = format!("{}/{name}", manifest.namespace());

    // Confirm
    if !auto_approve {
        eprint!("Delete artifact {key}? [y/N]: ");
        std::io::stderr().flush()?;

        let mut input = String::new();
        std::io::stdin().read_line(&mut input)?;

        if !input.trim().eq_ignore_ascii_case("y") {
            eprintln!("Delete cancelled.");
            return Ok(());
        }
    }

    let deleted = persister.delete(manifest.namespace(), &name).await?;
    eprintln!("{}", formatter.format_delete(&key, deleted));
    Ok(())
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Resolves the manifest file path.
fn resolve_spec_path(spec_path: Option<&PathBuf>) -> Result<PathBuf> {
    spec_path.map_or_else(|| find_spec_file("."), |path| Ok(path.clone()))
}

/// Returns the directory holding the manifest.
fn spec_dir(spec_file: &Path) -> &Path {
    spec_file
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."))
}

/// Loads `.env` next to the manifest, then the manifest itself.
fn load_manifest(spec_file: &Path) -> Result<RegistryManifest> {
    debug!("Loading registry manifest from: {}", spec_file.display());

    let parser = SpecParser::new().with_base_path(spec_dir(spec_file));
    parser.load_dotenv()?;
    parser.load_with_env(spec_file)
}

/// Resolves the manifest into the server configuration.
fn resolve_config(manifest: &RegistryManifest) -> Result<Config> {
    let config = ConfigResolver::new().resolve(manifest)?;
    info!(
        "Resolved {} source(s) for registry {}",
        config.registries.len(),
        config.registry_name
    );
    Ok(config)
}

/// Opens the selected artifact store.
async fn open_store(args: &StoreArgs, spec_file: &Path) -> Result<ConfigPersister<Box<dyn ArtifactStore>>> {
    let store: Box<dyn ArtifactStore> = match args.store {
        StoreBackend::Memory => Box::new(MemoryArtifactStore::new()),
        StoreBackend::Local => {
            let path = args
                .state_dir
                .clone()
                .unwrap_or_else(|| spec_dir(spec_file).join(LOCAL_STORE_DIR));
            Box::new(LocalArtifactStore::with_base_dir(path))
        }
        StoreBackend::S3 => {
            let bucket = args.require_bucket()?;
            Box::new(S3ArtifactStore::new(bucket, args.prefix.as_deref(), args.region.as_deref()).await?)
        }
    };

    debug!("Using {} artifact store", store.backend_type());
    Ok(ConfigPersister::new(store).with_policy(RetryPolicy::with_max_attempts(args.max_attempts)))
}
