//! Text heuristics applied to service output
//!
//! All matching is case-insensitive substring matching. These are
//! heuristics: false negatives (e.g. `TRUNCATE` not triggering a schema
//! refresh) are accepted.

/// Phrases the service uses when it declines to produce SQL
pub const DISCLAIMERS: &[&str] = &["don't have enough knowledge", "i don't know", "cannot"];

/// Statement keywords that mark generated text as executable
pub const STATEMENT_KEYWORDS: &[&str] = &[
    "select", "insert", "update", "delete", "create", "alter", "drop", "show", "describe",
    "explain",
];

/// Statements that change table structure and warrant a schema refresh
pub const STRUCTURAL_PHRASES: &[&str] =
    &["create table", "drop table", "alter table", "rename table"];

/// Marker for errors caused by a missing, expired or invalid API key
pub const CREDENTIAL_MARKER: &str = "api key";

fn contains_any(haystack: &str, needles: &[&str]) -> bool {
    let lower = haystack.to_lowercase();
    needles.iter().any(|needle| lower.contains(needle))
}

/// SQL-validity heuristic
///
/// `s` is valid iff it is non-empty, contains no disclaimer and contains at
/// least one statement keyword.
///
/// ```
/// use askdb_core::heuristics::is_valid_sql;
///
/// assert!(is_valid_sql("SELECT * FROM t"));
/// assert!(!is_valid_sql("I don't know"));
/// assert!(!is_valid_sql(""));
/// assert!(!is_valid_sql("FOO BAR"));
/// ```
pub fn is_valid_sql(s: &str) -> bool {
    !s.trim().is_empty() && !contains_any(s, DISCLAIMERS) && contains_any(s, STATEMENT_KEYWORDS)
}

/// True when executing `sql` may have changed the table list
pub fn is_structural_change(sql: &str) -> bool {
    contains_any(sql, STRUCTURAL_PHRASES)
}

/// True when a remote error message points at the credential
pub fn is_credential_failure(message: &str) -> bool {
    contains_any(message, &[CREDENTIAL_MARKER])
}
