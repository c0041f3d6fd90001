//! Panel rendering for the TUI
//!
//! Layout:
//! - Header (top): API key and database status, database name
//! - Transcript (left, 70%): the session's message log
//! - Side panel (right, 30%): connection form while disconnected, table
//!   list once connected, help when toggled
//! - Input bar (bottom): input buffer and status hint

use ratatui::style::Stylize;
use ratatui::{
    backend::Backend,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame, Terminal,
};

use askdb_core::{
    ConnectionMode, ConnectionState, Message, MessageKind, QueryPhase, SessionState,
};

use crate::ui::input::render_help;
use crate::ui::state::{App, AppState};

/// Rows shown per result message before eliding the rest
const MAX_RESULT_ROWS: usize = 20;

/// Render the main UI
pub fn render<B: Backend>(terminal: &mut Terminal<B>, app: &App) -> std::io::Result<()> {
    terminal.draw(|f| draw(f, app))?;
    Ok(())
}

fn draw(f: &mut Frame, app: &App) {
    let session = app.controller.session();

    // Vertical split: header, main area, input bar
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(0),
            Constraint::Length(3),
        ])
        .split(f.area());

    let main_chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(70), Constraint::Percentage(30)])
        .split(chunks[1]);

    render_header(f, session, chunks[0]);
    render_transcript(f, app, main_chunks[0]);

    if app.help_visible() {
        render_help_panel(f, main_chunks[1]);
    } else if session.db_state().is_connected() {
        render_tables_panel(f, session, main_chunks[1]);
    } else {
        render_connection_panel(f, session, main_chunks[1]);
    }

    render_input_bar(f, app, chunks[2]);
}

fn state_color(state: ConnectionState) -> Color {
    match state {
        ConnectionState::Disconnected => Color::DarkGray,
        ConnectionState::Connecting => Color::Yellow,
        ConnectionState::Connected => Color::Green,
        ConnectionState::Error => Color::Red,
    }
}

fn state_label(state: ConnectionState) -> &'static str {
    match state {
        ConnectionState::Disconnected => "disconnected",
        ConnectionState::Connecting => "connecting...",
        ConnectionState::Connected => "connected",
        ConnectionState::Error => "error",
    }
}

fn kind_style(kind: MessageKind) -> Style {
    match kind {
        MessageKind::System => Style::default().fg(Color::DarkGray),
        MessageKind::User => Style::default().fg(Color::Cyan),
        MessageKind::Assistant => Style::default().fg(Color::Yellow),
        MessageKind::Success => Style::default().fg(Color::Green),
        MessageKind::Error => Style::default().fg(Color::Red),
        MessageKind::Warning => Style::default().fg(Color::LightYellow),
        MessageKind::Sql => Style::default().fg(Color::Magenta),
        MessageKind::Result => Style::default().fg(Color::White),
    }
}

/// Header with both lifecycles
fn render_header(f: &mut Frame, session: &SessionState, area: Rect) {
    let auth = session.auth_state();
    let db = session.db_state();

    let mut spans = vec![
        Span::styled("API key: ", Style::default().fg(Color::DarkGray)),
        Span::styled(state_label(auth), Style::default().fg(state_color(auth))),
        Span::styled("  |  ", Style::default().fg(Color::DarkGray)),
        Span::styled("Database: ", Style::default().fg(Color::DarkGray)),
        Span::styled(state_label(db), Style::default().fg(state_color(db))),
    ];
    if db.is_connected() {
        spans.push(Span::styled(
            format!(" ({})", session.credentials.database_label()),
            Style::default().fg(Color::Cyan),
        ));
    }

    let paragraph = Paragraph::new(Line::from(spans)).block(
        Block::default()
            .title(" askdb ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Blue)),
    );
    f.render_widget(paragraph, area);
}

/// Transcript lines for the whole log, plus a processing line while busy
pub fn transcript_lines(session: &SessionState) -> Vec<Line<'static>> {
    let mut lines = Vec::new();
    for message in session.log() {
        push_message(&mut lines, message);
    }

    if session.is_busy() {
        let text = match session.phase() {
            QueryPhase::Asking => "Generating query...",
            QueryPhase::Executing => "Running query...",
            _ => "Processing...",
        };
        lines.push(Line::from(Span::styled(
            text,
            Style::default().fg(Color::Yellow).italic(),
        )));
    }
    lines
}

fn push_message(lines: &mut Vec<Line<'static>>, message: &Message) {
    let style = kind_style(message.kind);
    let mut text_lines = message.text.lines();

    let first = text_lines.next().unwrap_or_default().to_string();
    lines.push(Line::from(vec![
        Span::styled(
            format!("[{}] ", message.time_label()),
            Style::default().fg(Color::DarkGray),
        ),
        Span::styled(format!("{}: ", message.kind.label()), style.bold()),
        Span::styled(first, style),
    ]));
    for rest in text_lines {
        lines.push(Line::from(Span::styled(format!("    {}", rest), style)));
    }

    match message.kind {
        MessageKind::Sql => {
            if let Some(ref explanation) = message.payload.explanation {
                lines.push(Line::from(Span::styled(
                    format!("    {}", explanation),
                    Style::default().fg(Color::Gray).italic(),
                )));
            }
            let (hint, color) = if message.is_executable() {
                ("    Press Ctrl+R or type /run to execute", Color::Green)
            } else {
                ("    This does not look like runnable SQL", Color::DarkGray)
            };
            lines.push(Line::from(Span::styled(hint, Style::default().fg(color))));
        }
        MessageKind::Result => {
            if let Some(ref rows) = message.payload.rows {
                push_rows(lines, rows);
            }
        }
        _ => {}
    }
}

fn push_rows(lines: &mut Vec<Line<'static>>, rows: &[serde_json::Value]) {
    if rows.is_empty() {
        lines.push(Line::from(Span::styled(
            "    (no rows)",
            Style::default().fg(Color::DarkGray),
        )));
        return;
    }
    for row in rows.iter().take(MAX_RESULT_ROWS) {
        let pretty = serde_json::to_string_pretty(row).unwrap_or_else(|_| row.to_string());
        for line in pretty.lines() {
            lines.push(Line::from(Span::styled(
                format!("    {}", line),
                Style::default().fg(Color::White),
            )));
        }
    }
    if rows.len() > MAX_RESULT_ROWS {
        lines.push(Line::from(Span::styled(
            format!("    ... ({} more rows)", rows.len() - MAX_RESULT_ROWS),
            Style::default().fg(Color::DarkGray),
        )));
    }
}

fn render_transcript(f: &mut Frame, app: &App, area: Rect) {
    let lines = transcript_lines(app.controller.session());
    let inner_width = area.width.saturating_sub(2);
    let visible_rows = (area.height as usize).saturating_sub(2);

    // Rows after wrapping, not logical lines
    let paragraph = Paragraph::new(lines).wrap(Wrap { trim: false });
    let total_rows = paragraph.line_count(inner_width);
    let top = scroll_top(total_rows, visible_rows, app.scroll_offset());

    let title = if app.autoscroll_enabled() {
        " Transcript ".to_string()
    } else {
        format!(" Transcript (scrolled +{}) ", app.scroll_offset())
    };

    let paragraph = paragraph
        .block(Block::default().title(title).borders(Borders::ALL))
        .scroll((u16::try_from(top).unwrap_or(u16::MAX), 0));

    f.render_widget(paragraph, area);
}

/// First visible row; `offset` counts rows back from the bottom
fn scroll_top(total_rows: usize, visible_rows: usize, offset: usize) -> usize {
    let max_top = total_rows.saturating_sub(visible_rows);
    max_top - offset.min(max_top)
}

fn field_line(label: &str, value: String) -> Line<'static> {
    Line::from(vec![
        Span::styled(format!("{:<10}", label), Style::default().fg(Color::DarkGray)),
        Span::styled(value, Style::default().fg(Color::White)),
    ])
}

/// Connection form (read-only view; edited with /set, /url, /mode)
fn render_connection_panel(f: &mut Frame, session: &SessionState, area: Rect) {
    let credentials = &session.credentials;
    let mut lines = vec![field_line(
        "API key",
        if credentials.has_api_key() {
            "entered".to_string()
        } else {
            "not set (/key)".to_string()
        },
    )];
    lines.push(Line::from(""));

    match credentials.mode {
        ConnectionMode::Fields => {
            let fields = &credentials.fields;
            lines.push(Line::from(Span::styled(
                "Connection fields",
                Style::default().fg(Color::Cyan).bold(),
            )));
            lines.push(field_line("engine", fields.engine.to_string()));
            lines.push(field_line("host", fields.host.clone()));
            lines.push(field_line("port", fields.port.clone()));
            lines.push(field_line("user", fields.user.clone()));
            lines.push(field_line("password", "*".repeat(fields.password.chars().count())));
            lines.push(field_line("database", fields.database.clone()));
        }
        ConnectionMode::ConnectionString => {
            lines.push(Line::from(Span::styled(
                "Connection string",
                Style::default().fg(Color::Cyan).bold(),
            )));
            let shown = if credentials.connection_string.is_empty() {
                "not set (/url)".to_string()
            } else {
                format!("{} characters", credentials.connection_string.chars().count())
            };
            lines.push(field_line("url", shown));
        }
    }

    lines.push(Line::from(""));
    let next = if !session.auth_state().is_connected() {
        "Next: /key <api-key>, then /auth"
    } else {
        "Next: /connect"
    };
    lines.push(Line::from(Span::styled(next, Style::default().fg(Color::Yellow))));

    let border = state_color(session.db_state());
    let paragraph = Paragraph::new(lines)
        .block(
            Block::default()
                .title(" Connection ")
                .borders(Borders::ALL)
                .border_style(Style::default().fg(border)),
        )
        .wrap(Wrap { trim: false });
    f.render_widget(paragraph, area);
}

fn render_tables_panel(f: &mut Frame, session: &SessionState, area: Rect) {
    let schema = session.schema();
    let mut lines: Vec<Line> = if schema.is_empty() {
        vec![Line::from(Span::styled(
            "No tables loaded",
            Style::default().fg(Color::DarkGray),
        ))]
    } else {
        schema
            .iter()
            .map(|table| Line::from(Span::styled(table.clone(), Style::default().fg(Color::Cyan))))
            .collect()
    };
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        "/refresh to reload",
        Style::default().fg(Color::DarkGray),
    )));

    let paragraph = Paragraph::new(lines)
        .block(
            Block::default()
                .title(format!(" Tables ({}) ", schema.len()))
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Green)),
        )
        .wrap(Wrap { trim: false });
    f.render_widget(paragraph, area);
}

fn render_help_panel(f: &mut Frame, area: Rect) {
    let lines: Vec<Line> = render_help().lines().map(|l| Line::from(l.to_string())).collect();
    let paragraph = Paragraph::new(lines)
        .block(
            Block::default()
                .title(" Help (Esc to close) ")
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Cyan)),
        )
        .wrap(Wrap { trim: false });
    f.render_widget(paragraph, area);
}

/// Input bar; the status hint takes the title slot
fn render_input_bar(f: &mut Frame, app: &App, area: Rect) {
    let busy = app.state() == AppState::Busy;

    let title = match (app.status(), app.controller.session().busy()) {
        (Some(status), _) => format!(" {} ", status),
        (None, Some(op)) => format!(" Waiting for {}... ", op.name()),
        (None, None) => " Ask a question, or /help ".to_string(),
    };

    let border_style = if busy {
        Style::default().fg(Color::Yellow)
    } else {
        Style::default()
    };

    let paragraph = Paragraph::new(Line::from(vec![
        Span::styled("> ", Style::default().fg(Color::Cyan)),
        Span::raw(app.input_buffer.clone()),
    ]))
    .block(
        Block::default()
            .title(title)
            .borders(Borders::ALL)
            .border_style(border_style),
    )
    .alignment(Alignment::Left);

    f.render_widget(paragraph, area);
}
