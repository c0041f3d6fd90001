//! Session state: the two connection lifecycles, schema and pending query
//!
//! State is split between:
//! - AuthState: lifecycle of the API key
//! - DbState: lifecycle of the database connection
//! - Schema: table names from the last successful fetch
//! - PendingQuery: the single SQL statement eligible for execution
//! - Busy flag: the operation currently awaiting the service (if any)
//!
//! Every transition narrates itself into the message log. All operations
//! are synchronous; the network lives in the controller.

use tracing::{info, warn};

use crate::credentials::Credentials;
use crate::error::{Result, SessionError};
use crate::message::{Draft, MessageLog};

const INITIAL_SEED: &str =
    "Database Terminal initialized. Please connect to your database and set your API key.";
const RESET_SEED: &str =
    "Connection reset. Please connect to your database and set your API key.";

/// Lifecycle of one connection (API key or database)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    Error,
}

impl ConnectionState {
    pub fn is_connected(&self) -> bool {
        matches!(self, ConnectionState::Connected)
    }
}

/// Operations that hold the busy flag while awaiting the service
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Authorize,
    Connect,
    Ask,
    Execute,
}

impl Operation {
    pub fn name(&self) -> &'static str {
        match self {
            Operation::Authorize => "authorize",
            Operation::Connect => "connect",
            Operation::Ask => "ask",
            Operation::Execute => "execute",
        }
    }
}

/// Position in the query lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QueryPhase {
    #[default]
    Idle,
    Asking,
    SmallTalk,
    SqlGenerated { valid: bool },
    Executing,
    ResultReady,
}

/// Why a schema fetch was issued; only changes the wording of messages
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaOrigin {
    /// First fetch after a successful connect
    Initial,
    /// Manual or automatic refresh
    Refresh,
}

/// Client-side session state
///
/// Cloning yields an immutable snapshot for renderers and tests.
#[derive(Debug, Clone)]
pub struct SessionState {
    auth: ConnectionState,
    db: ConnectionState,
    /// Editable at any time, including while an operation is outstanding
    pub credentials: Credentials,
    schema: Vec<String>,
    pending_query: String,
    busy: Option<Operation>,
    phase: QueryPhase,
    log: MessageLog,
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionState {
    pub fn new() -> Self {
        Self {
            auth: ConnectionState::Disconnected,
            db: ConnectionState::Disconnected,
            credentials: Credentials::default(),
            schema: Vec::new(),
            pending_query: String::new(),
            busy: None,
            phase: QueryPhase::Idle,
            log: MessageLog::seeded(Draft::system(INITIAL_SEED)),
        }
    }

    pub fn auth_state(&self) -> ConnectionState {
        self.auth
    }

    pub fn db_state(&self) -> ConnectionState {
        self.db
    }

    pub fn schema(&self) -> &[String] {
        &self.schema
    }

    pub fn pending_query(&self) -> &str {
        &self.pending_query
    }

    pub fn has_pending_query(&self) -> bool {
        !self.pending_query.is_empty()
    }

    pub fn busy(&self) -> Option<Operation> {
        self.busy
    }

    pub fn is_busy(&self) -> bool {
        self.busy.is_some()
    }

    pub fn phase(&self) -> QueryPhase {
        self.phase
    }

    pub fn log(&self) -> &MessageLog {
        &self.log
    }

    /// Both lifecycles connected: questions may be asked
    pub fn is_ready(&self) -> bool {
        self.auth.is_connected() && self.db.is_connected()
    }

    /// Append a message to the log
    pub fn narrate(&mut self, draft: Draft) {
        self.log.append(draft);
    }

    pub fn set_phase(&mut self, phase: QueryPhase) {
        self.phase = phase;
    }

    /// Take the busy flag for `op`
    pub fn acquire(&mut self, op: Operation) -> Result<()> {
        if let Some(current) = self.busy {
            warn!(requested = op.name(), outstanding = current.name(), "rejected: busy");
            return Err(SessionError::Busy(current.name().to_string()));
        }
        self.busy = Some(op);
        Ok(())
    }

    pub fn release(&mut self) {
        self.busy = None;
    }

    pub fn begin_authorize(&mut self) -> Result<()> {
        if !self.credentials.has_api_key() {
            self.narrate(Draft::warning("Please enter a valid API key"));
            return Err(SessionError::InvalidInput("API key is blank".to_string()));
        }
        self.auth = ConnectionState::Connecting;
        self.narrate(Draft::system("Setting API key..."));
        info!("authorizing");
        Ok(())
    }

    pub fn complete_authorize(&mut self, success: bool, detail: &str) {
        if success {
            self.auth = ConnectionState::Connected;
            self.narrate(Draft::success("API key set successfully"));
            info!("authorized");
        } else {
            self.auth = ConnectionState::Error;
            self.narrate(Draft::error(format!("Failed to set API key: {}", detail)));
            warn!(detail, "authorization failed");
        }
    }

    /// Downgrade AuthState after a credential failure on any path
    pub fn invalidate_credential(&mut self) {
        self.auth = ConnectionState::Error;
    }

    pub fn begin_connect(&mut self) -> Result<()> {
        if !self.auth.is_connected() {
            self.narrate(Draft::warning("Please set your API key first"));
            return Err(SessionError::PreconditionFailed(
                "API key is not set".to_string(),
            ));
        }
        self.db = ConnectionState::Connecting;
        self.narrate(Draft::system("Initializing database connection..."));
        info!("connecting to database");
        Ok(())
    }

    /// Finish a connect attempt
    ///
    /// A successful reply that arrives after the credential was invalidated
    /// still ends in `Error`: DbState never reaches `Connected` without a
    /// connected AuthState.
    pub fn complete_connect(&mut self, success: bool, detail: &str) {
        if success && self.auth.is_connected() {
            self.db = ConnectionState::Connected;
            let text = format!(
                "Successfully connected to {}",
                self.credentials.database_label()
            );
            self.narrate(Draft::success(text));
            info!("database connected");
        } else {
            self.db = ConnectionState::Error;
            let detail = if success {
                "API key is no longer valid"
            } else {
                detail
            };
            self.narrate(Draft::error(format!("Connection failed: {}", detail)));
            warn!(detail, "database connection failed");
        }
    }

    /// Fold a schema fetch result into the session
    pub fn replace_schema(
        &mut self,
        result: std::result::Result<Vec<String>, String>,
        origin: SchemaOrigin,
    ) {
        match result {
            Ok(tables) => {
                let summary = format!("Found {} tables: {}", tables.len(), tables.join(", "));
                info!(count = tables.len(), ?origin, "schema replaced");
                self.schema = tables;
                match origin {
                    SchemaOrigin::Initial => {
                        self.narrate(Draft::success(format!("Database ready! {}", summary)));
                        self.narrate(Draft::system(
                            "You can now ask questions about your database in natural language.",
                        ));
                    }
                    SchemaOrigin::Refresh => {
                        self.narrate(Draft::success(format!("Tables refreshed! {}", summary)));
                    }
                }
            }
            Err(detail) => {
                let verb = match origin {
                    SchemaOrigin::Initial => "fetch",
                    SchemaOrigin::Refresh => "refresh",
                };
                warn!(%detail, ?origin, "schema fetch failed");
                self.narrate(Draft::error(format!("Failed to {} tables: {}", verb, detail)));
            }
        }
    }

    /// Replace the pending query; pass `""` to clear it
    pub fn set_pending_query(&mut self, sql: &str) {
        self.pending_query = sql.to_string();
    }

    /// Back to initial values, with a reset seed in the log
    pub fn reset(&mut self) {
        self.auth = ConnectionState::Disconnected;
        self.db = ConnectionState::Disconnected;
        self.schema.clear();
        self.pending_query.clear();
        self.busy = None;
        self.phase = QueryPhase::Idle;
        self.credentials.api_key.clear();
        self.log.reseed(Draft::system(RESET_SEED));
        info!("session reset");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::MessageKind;

    fn authorized() -> SessionState {
        let mut session = SessionState::new();
        session.credentials.api_key = "sk-abc".to_string();
        session.begin_authorize().unwrap();
        session.complete_authorize(true, "");
        session
    }

    #[test]
    fn test_new_session_is_disconnected_with_seed() {
        let session = SessionState::new();
        assert_eq!(session.auth_state(), ConnectionState::Disconnected);
        assert_eq!(session.db_state(), ConnectionState::Disconnected);
        assert!(session.schema().is_empty());
        assert!(!session.has_pending_query());
        assert_eq!(session.log().len(), 1);
        assert_eq!(session.log().last().unwrap().kind, MessageKind::System);
    }

    #[test]
    fn test_blank_api_key_is_rejected_without_state_change() {
        for key in ["", "   ", "\t\n"] {
            let mut session = SessionState::new();
            session.credentials.api_key = key.to_string();

            let result = session.begin_authorize();
            assert!(matches!(result, Err(SessionError::InvalidInput(_))));
            assert_eq!(session.auth_state(), ConnectionState::Disconnected);
            assert_eq!(session.log().last().unwrap().kind, MessageKind::Warning);
        }
    }

    #[test]
    fn test_authorize_lifecycle() {
        let mut session = SessionState::new();
        session.credentials.api_key = "sk-abc".to_string();

        session.begin_authorize().unwrap();
        assert_eq!(session.auth_state(), ConnectionState::Connecting);

        session.complete_authorize(false, "bad key");
        assert_eq!(session.auth_state(), ConnectionState::Error);
        let last = session.log().last().unwrap();
        assert_eq!(last.kind, MessageKind::Error);
        assert!(last.text.contains("bad key"));

        session.begin_authorize().unwrap();
        session.complete_authorize(true, "");
        assert_eq!(session.auth_state(), ConnectionState::Connected);
        assert_eq!(session.log().last().unwrap().kind, MessageKind::Success);
    }

    #[test]
    fn test_connect_requires_authorization() {
        for auth in [
            ConnectionState::Disconnected,
            ConnectionState::Connecting,
            ConnectionState::Error,
        ] {
            let mut session = SessionState::new();
            session.auth = auth;

            let result = session.begin_connect();
            assert!(matches!(result, Err(SessionError::PreconditionFailed(_))));
            assert_eq!(session.db_state(), ConnectionState::Disconnected);
            assert_eq!(session.log().last().unwrap().kind, MessageKind::Warning);
        }
    }

    #[test]
    fn test_connect_lifecycle() {
        let mut session = authorized();
        session.credentials.fields.database = "shop".to_string();

        session.begin_connect().unwrap();
        assert_eq!(session.db_state(), ConnectionState::Connecting);

        session.complete_connect(true, "");
        assert_eq!(session.db_state(), ConnectionState::Connected);
        assert_eq!(
            session.log().last().unwrap().text,
            "Successfully connected to shop"
        );
        assert!(session.is_ready());
    }

    #[test]
    fn test_connect_success_after_credential_loss_is_an_error() {
        let mut session = authorized();
        session.begin_connect().unwrap();
        session.invalidate_credential();

        session.complete_connect(true, "");
        assert_eq!(session.db_state(), ConnectionState::Error);
    }

    #[test]
    fn test_replace_schema_initial_and_refresh() {
        let mut session = authorized();
        session.replace_schema(
            Ok(vec!["users".to_string(), "orders".to_string()]),
            SchemaOrigin::Initial,
        );
        assert_eq!(session.schema(), ["users", "orders"]);
        assert_eq!(session.log().count_kind(MessageKind::Success), 2);
        let success = session
            .log()
            .iter()
            .filter(|m| m.kind == MessageKind::Success)
            .last()
            .unwrap();
        assert!(success.text.contains("Found 2 tables: users, orders"));

        session.replace_schema(Ok(vec!["users".to_string()]), SchemaOrigin::Refresh);
        assert_eq!(session.schema(), ["users"]);
        assert!(session.log().last().unwrap().text.starts_with("Tables refreshed!"));
    }

    #[test]
    fn test_failed_schema_fetch_keeps_tables() {
        let mut session = authorized();
        session.replace_schema(Ok(vec!["users".to_string()]), SchemaOrigin::Initial);
        session.replace_schema(Err("timeout".to_string()), SchemaOrigin::Refresh);

        assert_eq!(session.schema(), ["users"]);
        let last = session.log().last().unwrap();
        assert_eq!(last.kind, MessageKind::Error);
        assert_eq!(last.text, "Failed to refresh tables: timeout");
    }

    #[test]
    fn test_busy_flag_is_single_flight() {
        let mut session = SessionState::new();
        session.acquire(Operation::Ask).unwrap();
        assert_eq!(session.busy(), Some(Operation::Ask));

        let err = session.acquire(Operation::Execute).unwrap_err();
        assert_eq!(err, SessionError::Busy("ask".to_string()));

        session.release();
        assert!(session.acquire(Operation::Execute).is_ok());
    }

    #[test]
    fn test_reset_is_idempotent() {
        let mut session = authorized();
        session.begin_connect().unwrap();
        session.complete_connect(true, "");
        session.replace_schema(Ok(vec!["users".to_string()]), SchemaOrigin::Initial);
        session.set_pending_query("SELECT * FROM users");
        session.acquire(Operation::Execute).unwrap();

        session.reset();
        let once = session.clone();
        session.reset();

        for s in [&once, &session] {
            assert_eq!(s.auth_state(), ConnectionState::Disconnected);
            assert_eq!(s.db_state(), ConnectionState::Disconnected);
            assert!(s.schema().is_empty());
            assert_eq!(s.pending_query(), "");
            assert!(!s.is_busy());
            assert_eq!(s.phase(), QueryPhase::Idle);
            assert_eq!(s.log().len(), 1);
            assert!(s.credentials.api_key.is_empty());
        }
        assert_eq!(
            once.log().last().unwrap().text,
            session.log().last().unwrap().text
        );
    }

    #[test]
    fn test_reset_keeps_connection_fields() {
        let mut session = authorized();
        session.credentials.fields.database = "shop".to_string();
        session.reset();
        assert_eq!(session.credentials.fields.database, "shop");
    }
}
