//! Fake service for testing
//!
//! Returns scripted responses instead of making HTTP calls and records
//! every call it receives.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;

use askdb_core::ConnectPayload;

use crate::error::{Result, ServiceError};
use crate::models::{AskReply, ConnectReply, ExecuteReply};
use crate::service::Text2SqlService;

/// A call received by the fake
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Authorize(String),
    Connect(ConnectPayload),
    FetchSchema,
    Ask(String),
    Execute,
}

#[derive(Debug, Default)]
struct Script {
    authorize: VecDeque<Result<()>>,
    connect: VecDeque<Result<ConnectReply>>,
    schema: VecDeque<Result<Vec<String>>>,
    ask: VecDeque<Result<AskReply>>,
    execute: VecDeque<Result<ExecuteReply>>,
    calls: Vec<Call>,
}

/// Scripted service
///
/// Responses are consumed in FIFO order per operation. With nothing
/// scripted, authorize/connect/execute succeed with empty replies, the
/// schema is empty, and ask fails.
#[derive(Debug, Default)]
pub struct FakeService {
    script: Mutex<Script>,
}

impl FakeService {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_script<T>(&self, f: impl FnOnce(&mut Script) -> T) -> T {
        // A poisoned lock only means another test thread panicked
        let mut guard = self
            .script
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        f(&mut guard)
    }

    pub fn push_authorize(&self, result: Result<()>) -> &Self {
        self.with_script(|s| s.authorize.push_back(result));
        self
    }

    pub fn push_connect(&self, result: Result<ConnectReply>) -> &Self {
        self.with_script(|s| s.connect.push_back(result));
        self
    }

    pub fn push_schema(&self, result: Result<Vec<String>>) -> &Self {
        self.with_script(|s| s.schema.push_back(result));
        self
    }

    pub fn push_ask(&self, result: Result<AskReply>) -> &Self {
        self.with_script(|s| s.ask.push_back(result));
        self
    }

    pub fn push_execute(&self, result: Result<ExecuteReply>) -> &Self {
        self.with_script(|s| s.execute.push_back(result));
        self
    }

    /// Every call received so far, in order
    pub fn calls(&self) -> Vec<Call> {
        self.with_script(|s| s.calls.clone())
    }

    pub fn call_count(&self) -> usize {
        self.with_script(|s| s.calls.len())
    }

    fn record(&self, call: Call) {
        self.with_script(|s| s.calls.push(call));
    }
}

#[async_trait]
impl Text2SqlService for FakeService {
    async fn authorize(&self, api_key: &str) -> Result<()> {
        self.record(Call::Authorize(api_key.to_string()));
        self.with_script(|s| s.authorize.pop_front()).unwrap_or(Ok(()))
    }

    async fn connect(&self, payload: &ConnectPayload) -> Result<ConnectReply> {
        self.record(Call::Connect(payload.clone()));
        self.with_script(|s| s.connect.pop_front())
            .unwrap_or_else(|| Ok(ConnectReply::default()))
    }

    async fn fetch_schema(&self) -> Result<Vec<String>> {
        self.record(Call::FetchSchema);
        self.with_script(|s| s.schema.pop_front())
            .unwrap_or_else(|| Ok(Vec::new()))
    }

    async fn ask(&self, question: &str) -> Result<AskReply> {
        self.record(Call::Ask(question.to_string()));
        self.with_script(|s| s.ask.pop_front()).unwrap_or_else(|| {
            Err(ServiceError::Transport(
                "FakeService: no scripted ask response".to_string(),
            ))
        })
    }

    async fn execute(&self) -> Result<ExecuteReply> {
        self.record(Call::Execute);
        self.with_script(|s| s.execute.pop_front())
            .unwrap_or_else(|| Ok(ExecuteReply::default()))
    }

    fn name(&self) -> &str {
        "fake"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fake_service_returns_scripted_responses_in_order() {
        let fake = FakeService::new();
        fake.push_ask(Ok(AskReply::SmallTalk("first".to_string())))
            .push_ask(Ok(AskReply::SmallTalk("second".to_string())));

        assert_eq!(fake.ask("a").await.unwrap(), AskReply::SmallTalk("first".to_string()));
        assert_eq!(fake.ask("b").await.unwrap(), AskReply::SmallTalk("second".to_string()));
        assert!(fake.ask("c").await.is_err());
    }

    #[tokio::test]
    async fn test_fake_service_records_calls() {
        let fake = FakeService::new();
        fake.authorize("sk-abc").await.unwrap();
        fake.fetch_schema().await.unwrap();
        fake.execute().await.unwrap();

        assert_eq!(
            fake.calls(),
            vec![
                Call::Authorize("sk-abc".to_string()),
                Call::FetchSchema,
                Call::Execute
            ]
        );
    }

    #[tokio::test]
    async fn test_fake_service_scripted_error() {
        let fake = FakeService::new();
        fake.push_authorize(Err(ServiceError::Transport("refused".to_string())));

        let err = fake.authorize("sk-abc").await.unwrap_err();
        assert_eq!(err.to_string(), "refused");
        assert!(fake.authorize("sk-abc").await.is_ok());
    }
}
