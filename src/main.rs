//! DANDI Manifest CLI application
//!
//! Command-line interface for listing every file of a DANDI archive dataset
//! into a CSV manifest of names, checksums and download URLs.

use std::process;

use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use dandi_manifest::cli::{
    handle_auth, handle_config, handle_generate, handle_inspect, Cli, Commands,
};
use dandi_manifest::config::{AppConfig, LoggingConfig};
use dandi_manifest::errors::Result;

#[tokio::main]
async fn main() {
    let result = run().await;

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

/// Main application logic
async fn run() -> Result<()> {
    // A missing .env file is not an error
    dotenv::dotenv().ok();

    let cli = Cli::parse_args();
    let config = AppConfig::load(cli.global.config.clone()).await?;

    init_logging(&cli, &config.logging);

    info!("DANDI Manifest v{} starting", env!("CARGO_PKG_VERSION"));

    let quiet = cli.global.quiet;
    match cli.command {
        Commands::Generate(args) => {
            info!("Executing generate command");
            handle_generate(args, config, quiet).await
        }
        Commands::Inspect(args) => {
            info!("Executing inspect command");
            handle_inspect(args).await
        }
        Commands::Auth(args) => {
            info!("Executing auth command");
            handle_auth(args, config).await
        }
        Commands::Config(args) => {
            info!("Executing config command");
            handle_config(args, config).await
        }
    }
}

/// Initialize logging from CLI flags, falling back to the configured level
fn init_logging(cli: &Cli, logging: &LoggingConfig) {
    let level = cli
        .log_level()
        .map(|level| level.to_string().to_lowercase())
        .unwrap_or_else(|| logging.level.clone());

    let mut filter = EnvFilter::from_default_env();
    match format!("dandi_manifest={}", level).parse() {
        Ok(directive) => filter = filter.add_directive(directive),
        Err(e) => eprintln!("Ignoring invalid log level '{}': {}", level, e),
    }

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_level(cli.global.very_verbose)
        .with_writer(std::io::stderr)
        .init();

    if cli.global.very_verbose {
        info!("Very verbose logging enabled");
    } else if cli.global.verbose {
        info!("Verbose logging enabled");
    }
}
