//! Command-line signer: loads a key and instrument snapshot from config and
//! prints signed exchange requests as JSON.

pub mod commands;
pub mod config;
pub mod error;

pub use commands::{execute, Command, CommandOutput};
pub use config::{CliConfig, CONFIG_ENV_VAR, DEFAULT_CONFIG_PATH};
pub use error::{CliError, CliResult};
