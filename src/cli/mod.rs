//! CLI module
//!
//! Provides:
//! - Argument parsing (clap derive)
//! - Configuration assembly from file, environment and flags
//! - One-shot `ask` mode for scripted use

pub mod args;
pub mod dispatch;

// Re-exports
pub use args::{parse_args, Args, AskArgs, Mode};
pub use dispatch::{render_transcript, run_ask, ExitCode};

use askdb_core::SessionError;

/// CLI errors
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Invalid arguments: {0}")]
    InvalidArgs(String),

    #[error("Missing required argument: {0}")]
    MissingArgument(String),

    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Exit codes (deterministic)
pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_FAILURE: i32 = 1;
pub const EXIT_CONFIG_ERROR: i32 = 2;

/// Result type for CLI operations
pub type Result<T> = std::result::Result<T, Error>;
