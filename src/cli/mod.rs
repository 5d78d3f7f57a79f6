//! Command-line interface components
//!
//! Argument parsing and the command handlers that drive the manifest
//! pipeline, credential management and configuration.

pub mod args;
pub mod commands;

pub use args::{
    AuthAction, AuthArgs, Cli, Commands, ConfigAction, ConfigArgs, GenerateArgs, GlobalArgs,
    InspectArgs,
};
pub use commands::{handle_auth, handle_config, handle_generate, handle_inspect, InspectSummary};
