//! One-shot `ask` mode
//!
//! Drives the same controller as the TUI, step by step, waiting for each
//! step to settle before deciding on the next one. The transcript is
//! printed at the end; any `error` message makes the run fail.

use std::io::Write;

use tracing::info;

use askdb_core::{MessageKind, MessageLog};

use crate::cli::{AskArgs, Error, Result, EXIT_FAILURE, EXIT_SUCCESS};
use crate::controller::Controller;

/// Exit code wrapper for CLI operations
pub type ExitCode = i32;

/// Run the one-shot flow and print the transcript to stdout
pub async fn run_ask(
    controller: &mut Controller,
    api_key: Option<&str>,
    args: &AskArgs,
) -> Result<ExitCode> {
    let api_key =
        api_key.ok_or_else(|| Error::MissingArgument("--api-key is required".to_string()))?;
    let mut credentials = controller.session().credentials.clone();
    args.apply_to(&mut credentials)?;
    controller.set_credentials(credentials);

    drive(controller, api_key, &args.question(), args.execute).await;

    let mut stdout = std::io::stdout().lock();
    render_transcript(controller.session().log(), args.json, &mut stdout)?;
    stdout.flush()?;

    Ok(exit_code(controller.session().log()))
}

/// Each step only runs when the previous one left the session where it
/// expects to be; failures are already narrated in the log.
async fn drive(controller: &mut Controller, api_key: &str, question: &str, execute: bool) {
    controller.set_api_key(api_key);
    if controller.authorize().is_err() {
        return;
    }
    controller.settle().await;
    if !controller.session().auth_state().is_connected() {
        return;
    }

    if controller.connect().is_err() {
        return;
    }
    // Includes the delayed schema fetch
    controller.settle().await;
    if !controller.session().is_ready() {
        return;
    }

    if controller.ask(question).is_err() {
        return;
    }
    controller.settle().await;

    if execute && controller.session().has_pending_query() {
        if controller.execute().is_err() {
            return;
        }
        // Includes a schema refresh after structural statements
        controller.settle().await;
    }
    info!("one-shot run finished");
}

/// 1 when the transcript contains an error message
pub fn exit_code(log: &MessageLog) -> ExitCode {
    if log.count_kind(MessageKind::Error) > 0 {
        EXIT_FAILURE
    } else {
        EXIT_SUCCESS
    }
}

/// Print the transcript, one entry per message (or as a JSON array)
pub fn render_transcript<W: Write>(log: &MessageLog, json: bool, out: &mut W) -> Result<()> {
    if json {
        let messages: Vec<_> = log.iter().collect();
        serde_json::to_writer_pretty(&mut *out, &messages)?;
        writeln!(out)?;
        return Ok(());
    }

    for message in log {
        writeln!(
            out,
            "[{}] {:<9} {}",
            message.time_label(),
            message.kind.label(),
            message.text
        )?;
        if let Some(ref explanation) = message.payload.explanation {
            writeln!(out, "            explanation: {}", explanation)?;
        }
        if let Some(ref rows) = message.payload.rows {
            for row in rows {
                writeln!(out, "            {}", row)?;
            }
        }
    }
    Ok(())
}
