//! Service boundary
//!
//! Abstraction over the remote natural-language-to-SQL service so the
//! controller can be driven by `HttpService` in production and by
//! `FakeService` in tests.

use async_trait::async_trait;

use askdb_core::ConnectPayload;

use crate::error::Result;
use crate::models::{AskReply, ConnectReply, ExecuteReply};

/// The five remote operations
///
/// Implementations must associate all calls with one remote session
/// (cookies or equivalent).
#[async_trait]
pub trait Text2SqlService: Send + Sync {
    /// Validate and store the API key
    async fn authorize(&self, api_key: &str) -> Result<()>;

    /// Open the database connection described by `payload`
    async fn connect(&self, payload: &ConnectPayload) -> Result<ConnectReply>;

    /// List table names of the connected database
    async fn fetch_schema(&self) -> Result<Vec<String>>;

    /// Translate a question into SQL (or answer conversationally)
    async fn ask(&self, question: &str) -> Result<AskReply>;

    /// Run the last generated query; the service keeps track of which one
    async fn execute(&self) -> Result<ExecuteReply>;

    /// Name for logging
    fn name(&self) -> &str;
}
