//! askdb: terminal client for a natural-language-to-SQL service
//!
//! Connect to a database through the service, ask questions in plain
//! language, review the generated SQL and run it.

pub mod cli;
pub mod controller;
pub mod logging;
pub mod ui;

// Re-export the controller surface for convenience
pub use controller::{Completion, Controller, Scheduler, Timings};
