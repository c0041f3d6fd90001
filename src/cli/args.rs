//! CLI argument parsing
//!
//! Grammar:
//! ```text
//! askdb [--config PATH] [--base-url URL] [--api-key KEY] [--log-file PATH] [MODE]
//!
//! MODES:
//!   (no mode)       → TUI mode
//!   tui             → TUI mode
//!   ask <question>  → one-shot: authorize, connect, ask, optionally execute
//! ```

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use askdb_core::{ConfigOverrides, ConnectionMode, Credentials};

use crate::cli::{Error, Result};

/// Parsed CLI arguments
#[derive(Debug, Clone, PartialEq, Eq, Parser)]
#[command(name = "askdb", version, about = "Ask your database questions in plain language")]
pub struct Args {
    /// Configuration file (default: <config dir>/askdb/config.toml)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Base URL of the text-to-SQL service
    #[arg(long, global = true, value_name = "URL")]
    pub base_url: Option<String>,

    /// API key submitted on start-up
    #[arg(long, global = true, value_name = "KEY")]
    pub api_key: Option<String>,

    /// Log file (default: askdb.log in the temp directory)
    #[arg(long, global = true, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    #[command(subcommand)]
    pub mode: Option<Mode>,
}

/// CLI modes
#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum Mode {
    /// Interactive terminal UI (default)
    Tui,

    /// Ask one question and print the transcript
    Ask(AskArgs),
}

/// Arguments of the one-shot `ask` mode
#[derive(Debug, Clone, PartialEq, Eq, clap::Args)]
pub struct AskArgs {
    /// The question, in plain language
    #[arg(required = true, num_args = 1..)]
    pub question: Vec<String>,

    /// Connection string; replaces the individual connection fields
    #[arg(
        long,
        value_name = "URL",
        conflicts_with_all = ["engine", "host", "port", "user", "password", "database"]
    )]
    pub connection_string: Option<String>,

    /// Database engine (postgresql or mysql)
    #[arg(long)]
    pub engine: Option<String>,

    #[arg(long)]
    pub host: Option<String>,

    #[arg(long)]
    pub port: Option<String>,

    #[arg(long)]
    pub user: Option<String>,

    #[arg(long)]
    pub password: Option<String>,

    #[arg(long)]
    pub database: Option<String>,

    /// Execute the generated query when it looks runnable
    #[arg(long)]
    pub execute: bool,

    /// Print the transcript as JSON
    #[arg(long)]
    pub json: bool,
}

impl Args {
    /// Flags that take precedence over file and environment configuration
    pub fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            base_url: self.base_url.clone(),
            log_file: self.log_file.clone(),
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode.clone().unwrap_or(Mode::Tui)
    }
}

impl AskArgs {
    /// The question words joined back into one string
    pub fn question(&self) -> String {
        self.question.join(" ")
    }

    /// Copy the connection flags into `credentials`
    pub fn apply_to(&self, credentials: &mut Credentials) -> Result<()> {
        if let Some(ref url) = self.connection_string {
            credentials.mode = ConnectionMode::ConnectionString;
            credentials.connection_string = url.clone();
            return Ok(());
        }

        credentials.mode = ConnectionMode::Fields;
        let fields = [
            ("engine", &self.engine),
            ("host", &self.host),
            ("port", &self.port),
            ("user", &self.user),
            ("password", &self.password),
            ("database", &self.database),
        ];
        for (name, value) in fields {
            if let Some(value) = value {
                credentials.set_field(name, value)?;
            }
        }
        Ok(())
    }
}

/// Parse CLI arguments (first item is the program name)
pub fn parse_args<I, T>(args: I) -> Result<Args>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    Args::try_parse_from(args).map_err(|e| Error::InvalidArgs(e.to_string()))
}
