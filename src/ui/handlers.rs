//! TUI command handlers
//!
//! Maps parsed commands onto controller operations. Rejections are
//! already narrated in the session log where the session wants them;
//! here they only update the one-line status hint.

use askdb_core::{ConnectionMode, SessionError};

use crate::ui::input::{parse_command, Command};
use crate::ui::state::App;

/// Parse and run whatever is in the input buffer
pub fn submit_input(app: &mut App) {
    let input = app.take_input();
    let cmd = parse_command(&input);

    if cmd == Command::None && input.trim_start().starts_with('/') {
        app.set_status(format!(
            "Unknown command or missing argument: {} (type /help)",
            input.trim()
        ));
        return;
    }
    execute_command(app, cmd);
}

/// Execute parsed command
pub fn execute_command(app: &mut App, cmd: Command) {
    app.clear_status();

    match cmd {
        Command::Quit => app.quit(),
        Command::Help => app.toggle_help(),
        Command::Key(key) => {
            app.controller.set_api_key(&key);
            app.set_status("API key entered; /auth to submit it");
        }
        Command::Auth => {
            let result = app.controller.authorize();
            report(app, result);
        }
        Command::Mode(mode) => {
            app.controller.set_connection_mode(mode);
            app.set_status(match mode {
                ConnectionMode::Fields => "Using connection fields",
                ConnectionMode::ConnectionString => "Using connection string",
            });
        }
        Command::Url(url) => {
            app.controller.set_connection_string(&url);
            app.controller
                .set_connection_mode(ConnectionMode::ConnectionString);
            app.set_status("Connection string set");
        }
        Command::Set { field, value } => {
            let result = app.controller.set_field(&field, &value);
            match result {
                // Values are not echoed: one of them is a password
                Ok(()) => app.set_status(format!("{} updated", field)),
                Err(err) => report(app, Err(err)),
            }
        }
        Command::Connect => {
            let result = app.controller.connect();
            report(app, result);
        }
        Command::Run => {
            let result = app.controller.execute();
            report(app, result);
        }
        Command::Refresh => {
            let result = app.controller.refresh_schema();
            report(app, result);
        }
        Command::Reset => {
            app.controller.reset();
            app.scroll_to_end();
        }
        Command::Ask(question) => {
            let result = app.controller.ask(&question);
            if result.is_ok() {
                app.scroll_to_end();
            }
            report(app, result);
        }
        Command::None => {
            // Empty input, ignore
        }
    }
}

fn report(app: &mut App, result: askdb_core::Result<()>) {
    let Err(err) = result else {
        return;
    };
    let status = match err {
        SessionError::Busy(op) => format!("Busy: waiting for {} to finish", op),
        SessionError::PreconditionFailed(reason) => format!("Not available: {}", reason),
        SessionError::InvalidInput(reason) => format!("Invalid input: {}", reason),
    };
    app.set_status(status);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::{Controller, Timings};
    use askdb_api::{Call, FakeService};
    use askdb_core::{ConnectionState, DbEngine};
    use std::sync::Arc;

    fn app_with(fake: Arc<FakeService>) -> App {
        App::new(Controller::new(fake, Timings::default()))
    }

    fn submit(app: &mut App, text: &str) {
        app.input_buffer = text.to_string();
        submit_input(app);
    }

    #[tokio::test]
    async fn test_key_then_auth_authorizes() {
        let fake = Arc::new(FakeService::new());
        let mut app = app_with(fake.clone());

        submit(&mut app, "/key sk-abc");
        submit(&mut app, "/auth");
        app.controller.settle().await;

        assert_eq!(
            app.controller.session().auth_state(),
            ConnectionState::Connected
        );
        assert_eq!(fake.calls(), vec![Call::Authorize("sk-abc".to_string())]);
    }

    #[test]
    fn test_set_updates_fields_without_echoing_value() {
        let mut app = app_with(Arc::new(FakeService::new()));

        submit(&mut app, "/set engine mysql");
        submit(&mut app, "/set password hunter2");

        let credentials = &app.controller.session().credentials;
        assert_eq!(credentials.fields.engine, DbEngine::Mysql);
        assert_eq!(credentials.fields.password, "hunter2");
        assert_eq!(app.status(), Some("password updated"));
    }

    #[test]
    fn test_set_unknown_field_reports_status() {
        let mut app = app_with(Arc::new(FakeService::new()));
        submit(&mut app, "/set colour blue");
        assert!(app.status().unwrap().starts_with("Invalid input"));
    }

    #[test]
    fn test_url_switches_mode() {
        let mut app = app_with(Arc::new(FakeService::new()));
        submit(&mut app, "/url mysql+pymysql://u:p@h/db");

        let credentials = &app.controller.session().credentials;
        assert_eq!(credentials.mode, ConnectionMode::ConnectionString);
        assert_eq!(credentials.connection_string, "mysql+pymysql://u:p@h/db");
    }

    #[test]
    fn test_run_without_pending_query_is_silent() {
        let fake = Arc::new(FakeService::new());
        let mut app = app_with(fake.clone());
        let before = app.controller.session().log().len();

        submit(&mut app, "/run");

        assert_eq!(app.controller.session().log().len(), before);
        assert_eq!(fake.call_count(), 0);
        assert!(app.status().unwrap().starts_with("Not available"));
    }

    #[test]
    fn test_connect_before_auth_is_rejected() {
        let fake = Arc::new(FakeService::new());
        let mut app = app_with(fake.clone());

        submit(&mut app, "/connect");

        assert_eq!(fake.call_count(), 0);
        assert_eq!(
            app.controller.session().db_state(),
            ConnectionState::Disconnected
        );
    }

    #[test]
    fn test_unknown_command_sets_status() {
        let mut app = app_with(Arc::new(FakeService::new()));
        submit(&mut app, "/frobnicate");
        assert!(app.status().unwrap().contains("/frobnicate"));
        assert!(app.input_buffer.is_empty());
    }

    #[test]
    fn test_quit_and_help() {
        let mut app = app_with(Arc::new(FakeService::new()));
        submit(&mut app, "/help");
        assert!(app.help_visible());
        submit(&mut app, "/q");
        assert_eq!(app.state(), crate::ui::AppState::Quitting);
    }
}
