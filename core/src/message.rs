//! Message log: append-only narration of the session
//!
//! Everything the user sees goes through here: system notices, their own
//! questions, generated SQL, results, errors and warnings.
//!
//! Messages are immutable once appended. Corrections are new messages.
//! The only way to drop history is `reseed`, which the session uses on reset.

use chrono::{DateTime, Local};
use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

/// Message discriminant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    System,
    User,
    Assistant,
    Success,
    Error,
    Warning,
    Sql,
    Result,
}

impl MessageKind {
    /// Short label used by the transcript renderer and plain-text output
    pub fn label(&self) -> &'static str {
        match self {
            MessageKind::System => "system",
            MessageKind::User => "you",
            MessageKind::Assistant => "assistant",
            MessageKind::Success => "ok",
            MessageKind::Error => "error",
            MessageKind::Warning => "warning",
            MessageKind::Sql => "sql",
            MessageKind::Result => "result",
        }
    }
}

/// Kind-specific data carried alongside the display text
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Payload {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub can_execute: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rows: Option<Vec<Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub natural_language_answer: Option<String>,
}

/// A message that has not been appended yet (no id, no timestamp)
#[derive(Debug, Clone, PartialEq)]
pub struct Draft {
    pub kind: MessageKind,
    pub text: String,
    pub payload: Payload,
}

impl Draft {
    pub fn new(kind: MessageKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            text: text.into(),
            payload: Payload::default(),
        }
    }

    pub fn system(text: impl Into<String>) -> Self {
        Self::new(MessageKind::System, text)
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self::new(MessageKind::User, text)
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self::new(MessageKind::Assistant, text)
    }

    pub fn success(text: impl Into<String>) -> Self {
        Self::new(MessageKind::Success, text)
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self::new(MessageKind::Error, text)
    }

    pub fn warning(text: impl Into<String>) -> Self {
        Self::new(MessageKind::Warning, text)
    }

    /// Generated SQL, shown verbatim with its validity verdict
    pub fn sql(query: &str, explanation: Option<String>, can_execute: bool) -> Self {
        Self {
            kind: MessageKind::Sql,
            text: format!("Generated SQL Query:\n{}", query),
            payload: Payload {
                explanation,
                can_execute,
                query: Some(query.to_string()),
                ..Payload::default()
            },
        }
    }

    /// Execution result; `text` is the natural-language answer when there is one
    pub fn result(
        text: impl Into<String>,
        rows: Option<Vec<Value>>,
        natural_language_answer: Option<String>,
    ) -> Self {
        Self {
            kind: MessageKind::Result,
            text: text.into(),
            payload: Payload {
                rows,
                natural_language_answer,
                ..Payload::default()
            },
        }
    }
}

/// An appended, immutable message
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Message {
    pub id: Uuid,
    pub kind: MessageKind,
    pub text: String,
    pub timestamp: DateTime<Local>,
    #[serde(flatten)]
    pub payload: Payload,
}

impl Message {
    fn stamp(draft: Draft) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind: draft.kind,
            text: draft.text,
            timestamp: Local::now(),
            payload: draft.payload,
        }
    }

    /// Clock time shown next to the message
    pub fn time_label(&self) -> String {
        self.timestamp.format("%H:%M:%S").to_string()
    }

    /// True for SQL messages whose query passed the validity heuristic
    pub fn is_executable(&self) -> bool {
        self.kind == MessageKind::Sql && self.payload.can_execute
    }
}

/// Append-only message sequence
#[derive(Debug, Clone, Default)]
pub struct MessageLog {
    messages: Vec<Message>,
}

impl MessageLog {
    /// Create a log holding a single seed message
    pub fn seeded(seed: Draft) -> Self {
        let mut log = Self::default();
        log.reseed(seed);
        log
    }

    /// Stamp the draft with the current time and insert it at the end
    pub fn append(&mut self, draft: Draft) -> &Message {
        let message = Message::stamp(draft);
        tracing::debug!(kind = ?message.kind, id = %message.id, "message appended");
        self.messages.push(message);
        &self.messages[self.messages.len() - 1]
    }

    /// Replace the whole log with a one-element seed
    pub fn reseed(&mut self, seed: Draft) {
        self.messages.clear();
        self.messages.push(Message::stamp(seed));
    }

    /// Read-only view in append order; call again to restart
    pub fn iter(&self) -> std::slice::Iter<'_, Message> {
        self.messages.iter()
    }

    /// Messages appended after the first `n`
    pub fn since(&self, n: usize) -> &[Message] {
        &self.messages[n.min(self.messages.len())..]
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Number of messages of the given kind
    pub fn count_kind(&self, kind: MessageKind) -> usize {
        self.messages.iter().filter(|m| m.kind == kind).count()
    }
}

impl<'a> IntoIterator for &'a MessageLog {
    type Item = &'a Message;
    type IntoIter = std::slice::Iter<'a, Message>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
