//! Terminal interface
//!
//! The UI is a thin surface over the controller:
//! - Key events edit the input buffer or submit it
//! - Submitted input is parsed into a `Command` and handled
//! - Each frame drains controller completions, then renders a view of
//!   the session
//!
//! Input model:
//! - Plain text → natural-language question
//! - Commands start with '/': /key, /auth, /mode, /url, /set, /connect,
//!   /run, /refresh, /reset, /help, /quit

pub mod handlers;
pub mod input;
pub mod state;
pub mod view;

// Re-exports
pub use input::{parse_command, render_help, Command};
pub use state::{App, AppState};
pub use view::render;
