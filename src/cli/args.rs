//! Command-line argument parsing
//!
//! Defines the CLI structure using clap derive macros: manifest generation,
//! manifest inspection, credential management and configuration.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// DANDI Manifest - list every file of a dataset with its checksum and download URL
#[derive(Parser, Debug)]
#[command(
    name = "dandi_manifest",
    version,
    about = "Generate CSV download manifests for DANDI archive datasets",
    long_about = "Walks the subject folders of a DANDI dataset and writes a CSV manifest
(name, md5, download_url) with one row per file."
)]
pub struct Cli {
    /// Global options
    #[command(flatten)]
    pub global: GlobalArgs,

    /// Subcommands
    #[command(subcommand)]
    pub command: Commands,
}

/// Global arguments available to all subcommands
#[derive(Args, Debug)]
pub struct GlobalArgs {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Very verbose logging (debug level)
    #[arg(long, global = true)]
    pub very_verbose: bool,

    /// Quiet mode - suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Configuration file path
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Generate the manifest for a dataset
    Generate(GenerateArgs),

    /// Summarize an existing manifest file
    Inspect(InspectArgs),

    /// Manage the archive API key
    Auth(AuthArgs),

    /// Manage the configuration file
    Config(ConfigArgs),
}

/// Arguments for the generate command
#[derive(Args, Debug, Clone, Default)]
pub struct GenerateArgs {
    /// Dataset identifier (e.g. "000023")
    #[arg(short, long, value_name = "ID")]
    pub dataset: Option<String>,

    /// Archive REST API base URL
    #[arg(long, value_name = "URL")]
    pub api_url: Option<String>,

    /// Namespace the dataset is resolved under
    #[arg(long, value_name = "NS")]
    pub namespace: Option<String>,

    /// Directory to write the manifest into
    #[arg(short, long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Build the manifest and report totals without writing a file
    #[arg(long)]
    pub dry_run: bool,
}

/// Arguments for the inspect command
#[derive(Args, Debug)]
pub struct InspectArgs {
    /// Manifest file to read
    #[arg(value_name = "FILE")]
    pub file: PathBuf,
}

/// Arguments for authentication management
#[derive(Args, Debug)]
pub struct AuthArgs {
    #[command(subcommand)]
    pub action: AuthAction,
}

/// Authentication actions
#[derive(Subcommand, Debug)]
pub enum AuthAction {
    /// Store an API key in .env
    Setup {
        /// Replace an existing key without asking
        #[arg(short, long)]
        force: bool,
    },

    /// Check the current API key against the archive
    Verify,

    /// Show authentication status
    Status,
}

/// Arguments for configuration management
#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

/// Configuration actions
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Write a default configuration file
    Init {
        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,

        /// Destination (defaults to the user config directory)
        #[arg(value_name = "FILE")]
        path: Option<PathBuf>,
    },

    /// Print the effective configuration
    Show,
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Logging level selected by flags, if any
    pub fn log_level(&self) -> Option<tracing::Level> {
        if self.global.quiet {
            Some(tracing::Level::ERROR)
        } else if self.global.very_verbose {
            Some(tracing::Level::DEBUG)
        } else if self.global.verbose {
            Some(tracing::Level::INFO)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_parsing() {
        let cli = Cli::try_parse_from([
            "dandi_manifest",
            "generate",
            "--dataset",
            "000023",
            "--api-url",
            "https://host/api/v1",
            "-o",
            "out",
        ])
        .unwrap();

        match cli.command {
            Commands::Generate(args) => {
                assert_eq!(args.dataset.as_deref(), Some("000023"));
                assert_eq!(args.api_url.as_deref(), Some("https://host/api/v1"));
                assert_eq!(args.output_dir, Some(PathBuf::from("out")));
                assert!(args.namespace.is_none());
                assert!(!args.dry_run);
            }
            other => panic!("Expected generate command, got {:?}", other),
        }
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli =
            Cli::try_parse_from(["dandi_manifest", "auth", "status", "--very-verbose"]).unwrap();
        assert!(cli.global.very_verbose);
        assert!(matches!(
            cli.command,
            Commands::Auth(AuthArgs {
                action: AuthAction::Status
            })
        ));
    }

    #[test]
    fn test_inspect_requires_file() {
        assert!(Cli::try_parse_from(["dandi_manifest", "inspect"]).is_err());
    }

    #[test]
    fn test_log_level() {
        let cli_quiet = Cli {
            global: GlobalArgs {
                verbose: false,
                very_verbose: false,
                quiet: true,
                config: None,
            },
            command: Commands::Auth(AuthArgs {
                action: AuthAction::Status,
            }),
        };

        let cli_verbose = Cli {
            global: GlobalArgs {
                verbose: true,
                very_verbose: false,
                quiet: false,
                config: None,
            },
            command: Commands::Config(ConfigArgs {
                action: ConfigAction::Show,
            }),
        };

        let cli_default = Cli {
            global: GlobalArgs {
                verbose: false,
                very_verbose: false,
                quiet: false,
                config: None,
            },
            command: Commands::Generate(GenerateArgs::default()),
        };

        assert_eq!(cli_quiet.log_level(), Some(tracing::Level::ERROR));
        assert_eq!(cli_verbose.log_level(), Some(tracing::Level::INFO));
        assert_eq!(cli_default.log_level(), None);
    }
}
