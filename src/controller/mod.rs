//! Interaction controller
//!
//! Orchestrates the query lifecycle on top of `SessionState`:
//! - Checks preconditions synchronously and narrates the outcome
//! - Issues remote calls as spawned tasks holding the busy flag
//! - Folds completions back into the session, one at a time
//!
//! Completions travel over an unbounded channel tagged with the session
//! epoch. `reset()` bumps the epoch and aborts every task and timer, so a
//! late reply can never touch a fresh session.

pub mod scheduler;

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tracing::{debug, info, warn};

use askdb_api::{AskReply, ConnectReply, ExecuteReply, ServiceError, Text2SqlService};
use askdb_core::heuristics;
use askdb_core::{
    ClientConfig, ConnectionMode, Credentials, Draft, Operation, QueryPhase, Result, SchemaOrigin,
    SessionError, SessionState,
};

pub use scheduler::Scheduler;

const ASK_CREDENTIAL_HINT: &str = "Please check your API key and set it again if needed.";
const EXECUTE_CREDENTIAL_HINT: &str =
    "Your API key might be invalid. Please reset and set a valid API key.";
const NOT_READY_HINT: &str = "Please connect to your database and set your API key first";

/// Delays for the fire-and-forget follow-ups
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timings {
    /// Connect success → initial schema fetch
    pub settle_delay: Duration,
    /// Structural execute → automatic schema refresh
    pub refresh_delay: Duration,
}

impl Default for Timings {
    fn default() -> Self {
        Self {
            settle_delay: Duration::from_millis(500),
            refresh_delay: Duration::from_millis(1500),
        }
    }
}

impl From<&ClientConfig> for Timings {
    fn from(config: &ClientConfig) -> Self {
        Self {
            settle_delay: config.settle_delay(),
            refresh_delay: config.refresh_delay(),
        }
    }
}

/// Outcome of a background task
#[derive(Debug)]
pub enum Completion {
    Authorized(std::result::Result<(), ServiceError>),
    Connected(std::result::Result<ConnectReply, ServiceError>),
    /// The settle delay after a connect elapsed
    SettleElapsed,
    Schema {
        origin: SchemaOrigin,
        result: std::result::Result<Vec<String>, ServiceError>,
    },
    Answered(std::result::Result<AskReply, ServiceError>),
    Executed {
        /// The pending query at the time execute was issued
        query: String,
        result: std::result::Result<ExecuteReply, ServiceError>,
    },
    /// The refresh delay after a structural statement elapsed
    RefreshDue,
}

impl Completion {
    fn name(&self) -> &'static str {
        match self {
            Completion::Authorized(_) => "authorized",
            Completion::Connected(_) => "connected",
            Completion::SettleElapsed => "settle_elapsed",
            Completion::Schema { .. } => "schema",
            Completion::Answered(_) => "answered",
            Completion::Executed { .. } => "executed",
            Completion::RefreshDue => "refresh_due",
        }
    }
}

#[derive(Debug)]
struct Envelope {
    epoch: u64,
    completion: Completion,
}

/// Drives one client session
pub struct Controller {
    session: SessionState,
    service: Arc<dyn Text2SqlService>,
    timings: Timings,
    epoch: u64,
    /// Tasks of the current epoch whose completion has not been applied
    outstanding: usize,
    tx: UnboundedSender<Envelope>,
    rx: UnboundedReceiver<Envelope>,
    scheduler: Scheduler,
}

impl Controller {
    pub fn new(service: Arc<dyn Text2SqlService>, timings: Timings) -> Self {
        let (tx, rx) = unbounded_channel();
        info!(service = service.name(), "controller created");
        Self {
            session: SessionState::new(),
            service,
            timings,
            epoch: 0,
            outstanding: 0,
            tx,
            rx,
            scheduler: Scheduler::new(),
        }
    }

    pub fn session(&self) -> &SessionState {
        &self.session
    }

    /// Immutable copy for renderers
    pub fn snapshot(&self) -> SessionState {
        self.session.clone()
    }

    pub fn timings(&self) -> Timings {
        self.timings
    }

    /// Tasks whose completion is still to be applied
    pub fn outstanding(&self) -> usize {
        self.outstanding
    }

    // =========================================================================
    // Credential editing (allowed while an operation is outstanding)
    // =========================================================================

    pub fn set_api_key(&mut self, key: &str) {
        self.session.credentials.api_key = key.to_string();
    }

    pub fn set_connection_mode(&mut self, mode: ConnectionMode) {
        self.session.credentials.mode = mode;
    }

    pub fn set_connection_string(&mut self, value: &str) {
        self.session.credentials.connection_string = value.to_string();
    }

    pub fn set_field(&mut self, name: &str, value: &str) -> Result<()> {
        self.session.credentials.set_field(name, value)
    }

    /// Replace every credential at once
    pub fn set_credentials(&mut self, credentials: Credentials) {
        self.session.credentials = credentials;
    }

    // =========================================================================
    // Operations
    // =========================================================================

    /// Submit the API key
    pub fn authorize(&mut self) -> Result<()> {
        self.session.acquire(Operation::Authorize)?;
        if let Err(err) = self.session.begin_authorize() {
            self.session.release();
            return Err(err);
        }

        let service = self.service.clone();
        let api_key = self.session.credentials.api_key.trim().to_string();
        self.spawn(async move { Completion::Authorized(service.authorize(&api_key).await) });
        Ok(())
    }

    /// Open the database connection from the active credential mode
    pub fn connect(&mut self) -> Result<()> {
        self.session.acquire(Operation::Connect)?;
        if let Err(err) = self.session.begin_connect() {
            self.session.release();
            return Err(err);
        }

        let service = self.service.clone();
        let payload = self.session.credentials.payload();
        self.spawn(async move { Completion::Connected(service.connect(&payload).await) });
        Ok(())
    }

    /// Ask a natural-language question
    ///
    /// Blank input is ignored without a message. Asking before both
    /// lifecycles are connected narrates a warning.
    pub fn ask(&mut self, question: &str) -> Result<()> {
        if question.trim().is_empty() {
            return Err(SessionError::InvalidInput("question is blank".to_string()));
        }
        // Checked before readiness: a reconnect in flight clears it
        if let Some(current) = self.session.busy() {
            debug!(outstanding = current.name(), "ask rejected: busy");
            return Err(SessionError::Busy(current.name().to_string()));
        }
        if !self.session.is_ready() {
            self.session.narrate(Draft::warning(NOT_READY_HINT));
            return Err(SessionError::PreconditionFailed(
                "not connected".to_string(),
            ));
        }
        self.session.acquire(Operation::Ask)?;

        self.session.set_pending_query("");
        self.session.set_phase(QueryPhase::Asking);
        self.session.narrate(Draft::user(question));
        self.session.narrate(Draft::system("Processing your question..."));
        info!("question submitted");

        let service = self.service.clone();
        let question = question.to_string();
        self.spawn(async move { Completion::Answered(service.ask(&question).await) });
        Ok(())
    }

    /// Execute the pending query
    ///
    /// Without a pending query, or while busy, this is a silent no-op.
    pub fn execute(&mut self) -> Result<()> {
        if !self.session.has_pending_query() {
            debug!("execute ignored: no pending query");
            return Err(SessionError::PreconditionFailed(
                "no pending query".to_string(),
            ));
        }
        self.session.acquire(Operation::Execute)?;

        self.session.set_phase(QueryPhase::Executing);
        self.session.narrate(Draft::system("Executing SQL query..."));
        info!("executing pending query");

        let service = self.service.clone();
        let query = self.session.pending_query().to_string();
        self.spawn(async move {
            let result = service.execute().await;
            Completion::Executed { query, result }
        });
        Ok(())
    }

    /// Re-fetch the table list; silent no-op unless the database is connected
    pub fn refresh_schema(&mut self) -> Result<()> {
        if !self.session.db_state().is_connected() {
            debug!("refresh ignored: database not connected");
            return Err(SessionError::PreconditionFailed(
                "database not connected".to_string(),
            ));
        }
        self.spawn_schema_fetch(SchemaOrigin::Refresh);
        Ok(())
    }

    /// Tear down the session: cancel every task and timer, reseed the log
    pub fn reset(&mut self) {
        self.scheduler.cancel_all();
        self.epoch += 1;
        self.outstanding = 0;
        self.session.reset();
        info!(epoch = self.epoch, "controller reset");
    }

    // =========================================================================
    // Completion processing
    // =========================================================================

    /// Apply every completion that has already arrived; never blocks
    ///
    /// Returns the number of completions applied to the current session.
    pub fn try_process(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(envelope) = self.rx.try_recv() {
            if self.apply(envelope) {
                applied += 1;
            }
        }
        applied
    }

    /// Wait until no task of the current session is outstanding
    ///
    /// Follow-ups scheduled while processing (schema fetches, refreshes)
    /// are awaited too.
    pub async fn settle(&mut self) {
        self.try_process();
        while self.outstanding > 0 {
            match self.rx.recv().await {
                Some(envelope) => {
                    self.apply(envelope);
                }
                None => break,
            }
        }
    }

    fn spawn<F>(&mut self, task: F)
    where
        F: std::future::Future<Output = Completion> + Send + 'static,
    {
        let tx = self.tx.clone();
        let epoch = self.epoch;
        self.outstanding += 1;
        self.scheduler.spawn(async move {
            let completion = task.await;
            // The receiver lives as long as the controller
            let _ = tx.send(Envelope { epoch, completion });
        });
    }

    fn schedule(&mut self, delay: Duration, completion: Completion) {
        let tx = self.tx.clone();
        let epoch = self.epoch;
        self.outstanding += 1;
        self.scheduler.schedule(delay, async move {
            let _ = tx.send(Envelope { epoch, completion });
        });
    }

    fn spawn_schema_fetch(&mut self, origin: SchemaOrigin) {
        let service = self.service.clone();
        self.spawn(async move {
            let result = service.fetch_schema().await;
            Completion::Schema { origin, result }
        });
    }

    /// Returns false for completions of an earlier epoch
    fn apply(&mut self, envelope: Envelope) -> bool {
        if envelope.epoch != self.epoch {
            debug!(
                completion = envelope.completion.name(),
                epoch = envelope.epoch,
                "dropping stale completion"
            );
            return false;
        }
        self.outstanding = self.outstanding.saturating_sub(1);
        debug!(completion = envelope.completion.name(), "applying completion");

        match envelope.completion {
            Completion::Authorized(result) => self.on_authorized(result),
            Completion::Connected(result) => self.on_connected(result),
            Completion::SettleElapsed => self.on_settle_elapsed(),
            Completion::Schema { origin, result } => self.on_schema(origin, result),
            Completion::Answered(result) => self.on_answered(result),
            Completion::Executed { query, result } => self.on_executed(&query, result),
            Completion::RefreshDue => self.on_refresh_due(),
        }
        true
    }

    fn on_authorized(&mut self, result: std::result::Result<(), ServiceError>) {
        self.session.release();
        match result {
            Ok(()) => self.session.complete_authorize(true, ""),
            Err(err) => {
                self.session.complete_authorize(false, &err.to_string());
                if err.is_credential_failure() {
                    self.session.narrate(Draft::warning(ASK_CREDENTIAL_HINT));
                }
            }
        }
    }

    fn on_connected(&mut self, result: std::result::Result<ConnectReply, ServiceError>) {
        self.session.release();
        match result {
            Ok(reply) => {
                if let Some(message) = reply.message.as_deref() {
                    debug!(message, "connect reply");
                }
                self.session.complete_connect(true, "");
                if self.session.db_state().is_connected() {
                    self.schedule(self.timings.settle_delay, Completion::SettleElapsed);
                }
            }
            Err(err) => {
                self.session.complete_connect(false, &err.to_string());
                if err.is_credential_failure() {
                    self.credential_lost(ASK_CREDENTIAL_HINT);
                }
            }
        }
    }

    fn on_settle_elapsed(&mut self) {
        if !self.session.db_state().is_connected() {
            return;
        }
        self.session.narrate(Draft::system("Fetching database schema..."));
        self.spawn_schema_fetch(SchemaOrigin::Initial);
    }

    fn on_schema(
        &mut self,
        origin: SchemaOrigin,
        result: std::result::Result<Vec<String>, ServiceError>,
    ) {
        match result {
            Ok(tables) => self.session.replace_schema(Ok(tables), origin),
            Err(err) => {
                self.session.replace_schema(Err(err.to_string()), origin);
                if err.is_credential_failure() {
                    self.credential_lost(ASK_CREDENTIAL_HINT);
                }
            }
        }
    }

    fn on_answered(&mut self, result: std::result::Result<AskReply, ServiceError>) {
        self.session.release();
        match result {
            Ok(AskReply::SmallTalk(message)) => {
                self.session.set_pending_query("");
                self.session.narrate(Draft::assistant(message));
                self.session.set_phase(QueryPhase::SmallTalk);
            }
            Ok(AskReply::Sql { query, explanation }) => {
                let valid = heuristics::is_valid_sql(&query);
                self.session.narrate(Draft::sql(&query, explanation, valid));
                self.session
                    .set_pending_query(if valid { query.as_str() } else { "" });
                self.session.set_phase(QueryPhase::SqlGenerated { valid });
                info!(valid, "query generated");
            }
            Err(err) => {
                self.session.set_phase(QueryPhase::Idle);
                if err.is_credential_failure() {
                    self.session
                        .narrate(Draft::error(format!("API Key Error: {}", err)));
                    self.credential_lost(ASK_CREDENTIAL_HINT);
                } else {
                    self.session
                        .narrate(Draft::error(format!("Failed to generate query: {}", err)));
                }
                warn!(error = %err, "ask failed");
            }
        }
    }

    fn on_executed(&mut self, query: &str, result: std::result::Result<ExecuteReply, ServiceError>) {
        self.session.release();
        match result {
            Ok(reply) => {
                let text = reply
                    .natural_language_answer
                    .clone()
                    .unwrap_or_else(|| "Query executed successfully".to_string());
                self.session.narrate(Draft::result(
                    text,
                    reply.rows,
                    reply.natural_language_answer,
                ));
                self.session.set_phase(QueryPhase::ResultReady);
                info!("query executed");

                if heuristics::is_structural_change(query) {
                    info!("structural statement executed, refreshing schema");
                    self.schedule(self.timings.refresh_delay, Completion::RefreshDue);
                }
            }
            Err(err) => {
                // The query stays pending so it can be retried
                self.session
                    .set_phase(QueryPhase::SqlGenerated { valid: true });
                if err.is_credential_failure() {
                    self.session
                        .narrate(Draft::error(format!("API Key Error: {}", err)));
                    self.credential_lost(EXECUTE_CREDENTIAL_HINT);
                } else {
                    self.session
                        .narrate(Draft::error(format!("Execution failed: {}", err)));
                }
                warn!(error = %err, "execute failed");
            }
        }
    }

    fn on_refresh_due(&mut self) {
        if self.session.db_state().is_connected() {
            self.spawn_schema_fetch(SchemaOrigin::Refresh);
        }
    }

    fn credential_lost(&mut self, hint: &str) {
        self.session.invalidate_credential();
        self.session.narrate(Draft::warning(hint));
    }
}

impl std::fmt::Debug for Controller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Controller")
            .field("service", &self.service.name())
            .field("epoch", &self.epoch)
            .field("outstanding", &self.outstanding)
            .field("busy", &self.session.busy())
            .finish()
    }
}
