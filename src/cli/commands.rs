//! Command handlers for the DANDI manifest CLI
//!
//! These coordinate between CLI arguments, configuration and the core
//! application functionality.

use std::collections::HashSet;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn};

use crate::app::{read_manifest, write_manifest, ArchiveClient, GirderClient, ManifestBuilder, ManifestEntry};
use crate::auth::{setup_api_key, show_auth_status, verify_api_key};
use crate::cli::{AuthAction, AuthArgs, ConfigAction, ConfigArgs, GenerateArgs, InspectArgs};
use crate::config::AppConfig;
use crate::errors::{AppError, Result};

/// Spinner shown during network phases, hidden in quiet mode
fn spinner(message: impl Into<String>, quiet: bool) -> ProgressBar {
    if quiet {
        return ProgressBar::hidden();
    }

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["◐", "◓", "◑", "◒", "●"]),
    );
    spinner.set_message(message.into());
    spinner.enable_steady_tick(Duration::from_millis(120));
    spinner
}

/// Handle the generate command
///
/// Authenticates, resolves the dataset root, walks it and writes the manifest.
/// The file is written only after the whole traversal succeeded.
pub async fn handle_generate(args: GenerateArgs, mut config: AppConfig, quiet: bool) -> Result<()> {
    let start_time = Instant::now();

    config
        .archive
        .apply_overrides(args.dataset, args.api_url, args.namespace);
    if let Some(dir) = args.output_dir {
        config.output.directory = dir;
    }

    let settings = config.archive_settings()?;
    let client_config = config.client.to_runtime_config();
    info!(
        "Generating manifest for {} from {}",
        settings.resource_path(),
        settings.api_url
    );

    let progress = spinner("Authenticating with the DANDI archive...", quiet);
    let client = match GirderClient::from_env(settings.api_url.clone(), &client_config).await {
        Ok(client) => client,
        Err(e) => {
            progress.finish_and_clear();
            return Err(e.into());
        }
    };

    progress.set_message(format!("Resolving {}...", settings.resource_path()));
    let root = match client.resolve_resource_id(&settings.resource_path()).await {
        Ok(root) => root,
        Err(e) => {
            progress.finish_and_clear();
            return Err(e.into());
        }
    };
    info!("Dataset {} resolved to folder {}", settings.dataset, root);

    progress.set_message(format!("Listing files of dataset {}...", settings.dataset));
    let manifest = ManifestBuilder::new(&client).build(&root).await;
    progress.finish_and_clear();
    let manifest = manifest?;

    let stats = manifest.stats();
    info!(
        "Traversal finished in {:?}: {} subjects, {} files",
        start_time.elapsed(),
        stats.subjects,
        stats.entries
    );

    if args.dry_run {
        println!(
            "Dry run - {} files in {} subject folders ({} without md5); nothing written",
            stats.entries, stats.subjects, stats.missing_checksums
        );
        return Ok(());
    }

    let destination = settings.manifest_path();
    write_manifest(&manifest, &destination).await?;

    if !quiet {
        println!(
            "Wrote {} entries ({} without md5) to {}",
            stats.entries,
            stats.missing_checksums,
            destination.display()
        );
    }
    Ok(())
}

/// Summary of a manifest file's contents
#[derive(Debug, Default, PartialEq, Eq)]
pub struct InspectSummary {
    pub entries: usize,
    pub missing_checksums: usize,
    pub duplicate_names: usize,
}

impl InspectSummary {
    pub fn from_entries(entries: &[ManifestEntry]) -> Self {
        let mut seen = HashSet::new();
        let mut summary = Self {
            entries: entries.len(),
            ..Default::default()
        };

        for entry in entries {
            if entry.checksum.is_empty() {
                summary.missing_checksums += 1;
            }
            if !seen.insert(entry.name.as_str()) {
                summary.duplicate_names += 1;
            }
        }
        summary
    }
}

/// Handle the inspect command
pub async fn handle_inspect(args: InspectArgs) -> Result<()> {
    let entries = read_manifest(&args.file).await?;
    let summary = InspectSummary::from_entries(&entries);

    println!("Manifest: {}", args.file.display());
    println!("{}", "─".repeat(40));
    println!("{:<24} {:>15}", "Files", summary.entries);
    println!("{:<24} {:>15}", "Without md5", summary.missing_checksums);
    println!("{:<24} {:>15}", "Duplicate names", summary.duplicate_names);

    if summary.missing_checksums > 0 {
        warn!(
            "{} entries in {} have no checksum",
            summary.missing_checksums,
            args.file.display()
        );
    }
    Ok(())
}

/// Handle authentication commands
pub async fn handle_auth(args: AuthArgs, config: AppConfig) -> Result<()> {
    let api_url = config.api_url()?;
    let client_config = config.client.to_runtime_config();

    match args.action {
        AuthAction::Setup { force } => {
            setup_api_key(&api_url, &client_config, force).await?;
        }
        AuthAction::Verify => {
            if verify_api_key(&api_url, &client_config).await? {
                println!("✅ API key verified successfully");
            } else {
                println!("❌ API key rejected by {}", api_url);
                return Err(AppError::generic("API key verification failed"));
            }
        }
        AuthAction::Status => {
            show_auth_status(&api_url, &client_config).await?;
        }
    }

    Ok(())
}

/// Handle configuration commands
pub async fn handle_config(args: ConfigArgs, config: AppConfig) -> Result<()> {
    match args.action {
        ConfigAction::Init { force, path } => {
            let path: PathBuf = match path {
                Some(path) => path,
                None => AppConfig::get_default_config_path()?,
            };

            if AppConfig::write_default(&path, force).await? {
                println!("📁 Created configuration file: {}", path.display());
            } else {
                println!(
                    "Configuration file already exists: {} (use --force to overwrite)",
                    path.display()
                );
            }
        }
        ConfigAction::Show => {
            let rendered = toml::to_string_pretty(&config)
                .map_err(|e| AppError::generic(format!("Failed to render configuration: {e}")))?;
            print!("{rendered}");
        }
    }

    Ok(())
}
