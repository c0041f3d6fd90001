//! Application state for the TUI
//!
//! State is split between:
//! - Session state, owned by the controller (connections, schema, log)
//! - Transient UI state (input buffer, scroll, status hint, help panel)

use crate::controller::Controller;

/// Top-level state used for key routing and rendering
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppState {
    /// Idle, accepting input
    Running,
    /// A call is outstanding; input is still editable
    Busy,
    Quitting,
}

/// Main application state
#[derive(Debug)]
pub struct App {
    pub controller: Controller,
    /// Current input buffer
    pub input_buffer: String,
    should_quit: bool,
    /// Transcript scroll offset (0 = bottom/latest, higher = further back)
    scroll_offset: usize,
    /// Whether the transcript follows the latest message
    autoscroll_enabled: bool,
    /// One-line hint shown under the input (rejections, usage errors)
    status: Option<String>,
    help_visible: bool,
}

impl App {
    pub fn new(controller: Controller) -> Self {
        App {
            controller,
            input_buffer: String::new(),
            should_quit: false,
            scroll_offset: 0,
            autoscroll_enabled: true,
            status: None,
            help_visible: false,
        }
    }

    /// Get current application state
    pub fn state(&self) -> AppState {
        if self.should_quit {
            AppState::Quitting
        } else if self.controller.session().is_busy() {
            AppState::Busy
        } else {
            AppState::Running
        }
    }

    pub fn handle_char(&mut self, c: char) {
        self.input_buffer.push(c);
    }

    pub fn handle_backspace(&mut self) {
        self.input_buffer.pop();
    }

    /// Take the input buffer, leaving it empty
    pub fn take_input(&mut self) -> String {
        std::mem::take(&mut self.input_buffer)
    }

    pub fn quit(&mut self) {
        self.should_quit = true;
    }

    /// Apply completions that arrived since the last frame
    ///
    /// Returns true when anything changed.
    pub fn process_completions(&mut self) -> bool {
        let applied = self.controller.try_process();
        if applied > 0 && self.autoscroll_enabled {
            self.scroll_offset = 0;
        }
        applied > 0
    }

    // Status line

    pub fn set_status(&mut self, status: impl Into<String>) {
        self.status = Some(status.into());
    }

    pub fn clear_status(&mut self) {
        self.status = None;
    }

    pub fn status(&self) -> Option<&str> {
        self.status.as_deref()
    }

    // Help panel

    pub fn toggle_help(&mut self) {
        self.help_visible = !self.help_visible;
    }

    pub fn hide_help(&mut self) {
        self.help_visible = false;
    }

    pub fn help_visible(&self) -> bool {
        self.help_visible
    }

    // Transcript scroll

    pub fn autoscroll_enabled(&self) -> bool {
        self.autoscroll_enabled
    }

    pub fn scroll_offset(&self) -> usize {
        self.scroll_offset
    }

    /// Scroll up by N lines (disables autoscroll)
    pub fn scroll_up(&mut self, lines: usize) {
        self.autoscroll_enabled = false;
        // The renderer clamps to the real line count
        self.scroll_offset = self.scroll_offset.saturating_add(lines);
    }

    /// Scroll down by N lines (re-enables autoscroll at the bottom)
    pub fn scroll_down(&mut self, lines: usize) {
        if self.scroll_offset > lines {
            self.scroll_offset -= lines;
        } else {
            self.scroll_to_end();
        }
    }

    pub fn scroll_to_end(&mut self) {
        self.scroll_offset = 0;
        self.autoscroll_enabled = true;
    }
}
