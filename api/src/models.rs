//! Wire models and per-endpoint decoders
//!
//! The service places fields inconsistently (sometimes under `data`,
//! sometimes top-level, sometimes under a different name). Each endpoint
//! gets exactly one decoder that walks an ordered fallback chain over the
//! loosely typed envelope, so the rest of the client sees one stable shape.

use serde::Serialize;
use serde_json::Value;

use crate::error::{error_text, Result, ServiceError};

/// Endpoint paths relative to the service base URL
pub mod endpoints {
    pub const AUTHORIZE: &str = "set-api-key/";
    pub const CONNECT: &str = "connect-db/";
    pub const SCHEMA: &str = "get-tables/";
    pub const ASK: &str = "ask-db/";
    pub const EXECUTE: &str = "execute-db/";
}

#[derive(Debug, Clone, Serialize)]
pub struct AuthorizeRequest<'a> {
    pub api_key: &'a str,
}

#[derive(Debug, Clone, Serialize)]
pub struct AskRequest<'a> {
    pub question: &'a str,
}

/// Successful connect
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConnectReply {
    /// Service greeting, if any
    pub message: Option<String>,
    /// Tables listed in the connect response (the client still fetches the
    /// schema separately)
    pub tables: Option<Vec<String>>,
}

/// Outcome of an ask
#[derive(Debug, Clone, PartialEq)]
pub enum AskReply {
    /// Conversational answer, no SQL generated
    SmallTalk(String),
    /// Generated text (not yet validated)
    Sql {
        query: String,
        explanation: Option<String>,
    },
}

/// Successful execute
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExecuteReply {
    pub rows: Option<Vec<Value>>,
    pub natural_language_answer: Option<String>,
}

/// Parse a 2xx body; empty bodies decode to `null`
pub fn parse_body(text: &str) -> Result<Value> {
    if text.trim().is_empty() {
        return Ok(Value::Null);
    }
    Ok(serde_json::from_str(text)?)
}

fn non_null<'a>(body: &'a Value, key: &str) -> Option<&'a Value> {
    body.get(key).filter(|v| !v.is_null())
}

fn non_empty_str(value: Option<&Value>) -> Option<String> {
    value
        .and_then(Value::as_str)
        .filter(|s| !s.trim().is_empty())
        .map(str::to_string)
}

/// First non-empty string along `path` alternatives, e.g. `[["data","query"], ["query"]]`
fn first_text(body: &Value, paths: &[&[&str]]) -> Option<String> {
    paths.iter().find_map(|path| {
        let mut cursor = Some(body);
        for key in path.iter() {
            cursor = cursor.and_then(|v| v.get(*key));
        }
        non_empty_str(cursor)
    })
}

/// A 2xx envelope that nonetheless reports failure
///
/// `error` must be `true` or a non-empty string, and there must be no
/// `data` payload.
fn rejection(body: &Value) -> Option<ServiceError> {
    if non_null(body, "data").is_some() {
        return None;
    }
    let flagged = match body.get("error") {
        Some(Value::Bool(true)) => true,
        Some(Value::String(s)) => !s.trim().is_empty(),
        _ => false,
    };
    if !flagged {
        return None;
    }
    let text = error_text(body).unwrap_or_else(|| "Unknown error".to_string());
    Some(ServiceError::Rejected(text))
}

fn rows_of(value: &Value) -> Option<Vec<Value>> {
    match value {
        Value::Null => None,
        Value::Array(items) => Some(items.clone()),
        other => Some(vec![other.clone()]),
    }
}

pub fn decode_authorize(body: &Value) -> Result<()> {
    match rejection(body) {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

pub fn decode_connect(body: &Value) -> Result<ConnectReply> {
    if let Some(err) = rejection(body) {
        return Err(err);
    }
    let tables = non_null(body, "data")
        .and_then(|data| data.get("tables"))
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        });
    Ok(ConnectReply {
        message: non_empty_str(body.get("message")),
        tables,
    })
}

/// `{ data: { tables: [..] } }`, anything else is a failure
pub fn decode_schema(body: &Value) -> Result<Vec<String>> {
    let tables = non_null(body, "data")
        .and_then(|data| data.get("tables"))
        .and_then(Value::as_array);

    match tables {
        Some(items) => Ok(items
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect()),
        None => {
            let text = first_text(body, &[&["error"], &["message"]])
                .unwrap_or_else(|| "Unknown error".to_string());
            Err(ServiceError::Rejected(text))
        }
    }
}

/// Small talk when only a message and no data is present; otherwise SQL
/// from `data.query`, falling back to `query`
pub fn decode_ask(body: &Value) -> Result<AskReply> {
    if let Some(err) = rejection(body) {
        return Err(err);
    }

    let has_query = first_text(body, &[&["query"]]).is_some();
    if non_null(body, "data").is_none() && !has_query {
        if let Some(message) = non_empty_str(body.get("message")) {
            return Ok(AskReply::SmallTalk(message));
        }
    }

    let query = first_text(body, &[&["data", "query"], &["query"]]).unwrap_or_default();
    let explanation = first_text(body, &[&["explanation"], &["data", "explanation"]]);
    Ok(AskReply::Sql { query, explanation })
}

/// Rows from `data.rows`, `data.result` or `result`; answer from
/// `data.nl_answer`, `data.naturalLanguageAnswer` or `nl_answer`
pub fn decode_execute(body: &Value) -> Result<ExecuteReply> {
    if let Some(err) = rejection(body) {
        return Err(err);
    }

    let data = non_null(body, "data");
    let rows = data
        .and_then(|d| non_null(d, "rows").or_else(|| non_null(d, "result")))
        .or_else(|| non_null(body, "result"))
        .and_then(rows_of);
    let natural_language_answer = first_text(
        body,
        &[
            &["data", "nl_answer"],
            &["data", "naturalLanguageAnswer"],
            &["nl_answer"],
            &["naturalLanguageAnswer"],
        ],
    );

    Ok(ExecuteReply {
        rows,
        natural_language_answer,
    })
}
