//! Command parsing for the TUI
//!
//! INPUT ROUTING:
//! A) COMMAND: input starts with "/"
//!    - Session control: /key, /auth, /mode, /url, /set, /connect
//!    - Query control: /run, /refresh, /reset
//!    - /help, /quit
//!
//! B) QUESTION: anything else
//!    - Sent to the service as a natural-language question
//!
//! EXIT HANDLING:
//! - /quit, /q, /exit work at any time, even while a call is outstanding
//! - Ctrl+C exits immediately

use askdb_core::ConnectionMode;

/// Parsed command result
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    None,
    Quit,                 // /quit, /q, /exit
    Help,                 // /help
    Key(String),          // /key <api-key>
    Auth,                 // /auth
    Mode(ConnectionMode), // /mode fields|url
    Url(String),          // /url <connection-string>
    Set { field: String, value: String }, // /set <field> <value>
    Connect,              // /connect
    Run,                  // /run
    Refresh,              // /refresh
    Reset,                // /reset
    Ask(String),          // Default: natural-language question
}

/// Parse command input string into Command
///
/// # Examples
/// ```
/// use askdb::ui::input::{parse_command, Command};
///
/// assert_eq!(parse_command("/quit"), Command::Quit);
/// assert_eq!(parse_command("/q"), Command::Quit);
/// assert_eq!(parse_command("/run"), Command::Run);
/// assert_eq!(
///     parse_command("/set database shop"),
///     Command::Set { field: "database".to_string(), value: "shop".to_string() }
/// );
///
/// // Questions (no "/")
/// assert_eq!(
///     parse_command("show me all users"),
///     Command::Ask("show me all users".to_string())
/// );
/// ```
pub fn parse_command(input: &str) -> Command {
    let input = input.trim();
    if input.is_empty() {
        return Command::None;
    }

    if !input.starts_with('/') {
        return Command::Ask(input.to_string());
    }

    let rest = &input[1..];

    // "/" alone, or "/ quit", is not a command
    if rest.is_empty() || rest.starts_with(' ') || rest.starts_with('\t') {
        return Command::None;
    }

    let parts: Vec<&str> = rest.splitn(2, |c: char| [' ', '\t'].contains(&c)).collect();
    let arg = parts.get(1).map(|s| s.trim()).filter(|s| !s.is_empty());

    match (parts[0], arg) {
        // Exit commands take no arguments
        ("quit" | "q" | "exit", None) => Command::Quit,
        ("help" | "h", _) => Command::Help,
        ("key", Some(key)) => Command::Key(key.to_string()),
        ("auth", None) => Command::Auth,
        ("mode", Some("fields" | "form")) => Command::Mode(ConnectionMode::Fields),
        ("mode", Some("url" | "string")) => Command::Mode(ConnectionMode::ConnectionString),
        ("url", Some(url)) => Command::Url(url.to_string()),
        ("set", Some(args)) => parse_set(args),
        ("connect", None) => Command::Connect,
        ("run" | "execute", None) => Command::Run,
        ("refresh", None) => Command::Refresh,
        ("reset", None) => Command::Reset,
        _ => Command::None,
    }
}

/// `<field> <value>`; the value may contain spaces and may be empty only
/// when quoted as ""
fn parse_set(args: &str) -> Command {
    let mut split = args.splitn(2, |c: char| c.is_whitespace());
    let field = split.next().unwrap_or_default();
    let value = split.next().map(str::trim).unwrap_or_default();

    if field.is_empty() || value.is_empty() {
        return Command::None;
    }
    let value = if value == "\"\"" { "" } else { value };
    Command::Set {
        field: field.to_string(),
        value: value.to_string(),
    }
}

/// Render help text for the TUI
pub fn render_help() -> String {
    r#"askdb: ask your database questions in plain language

GETTING STARTED:
    /key <api-key>      Enter your API key
    /auth               Submit the API key
    /set <field> <val>  Set engine, host, port, user, password, database
    /mode fields|url    Use the fields or a single connection string
    /url <string>       Set the connection string
    /connect            Connect to the database

ASKING:
    Type a question (no "/" prefix) and press Enter
    /run, Ctrl+R        Execute the generated query
    /refresh            Reload the table list
    /reset              Forget the session and start over

KEYBOARD SHORTCUTS:
    Up/Down             Scroll transcript 1 line
    PageUp/PageDown     Scroll transcript 10 lines
    Home/End            Jump to top/bottom
    Esc                 Clear input, close help
    Ctrl+C              Exit immediately

    /help               Show this help
    /quit, /q, /exit    Quit
"#
    .to_string()
}
