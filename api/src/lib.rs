//! askdb API Module
//!
//! Client side of the natural-language-to-SQL service:
//! - `Text2SqlService`: the five remote operations
//! - `HttpService`: reqwest implementation sharing one cookie-backed session
//! - `FakeService`: scripted implementation for tests
//! - per-endpoint decoders that turn loosely shaped JSON into stable replies

pub mod error;
pub mod fake;
pub mod http;
pub mod models;
pub mod service;

pub use error::{Result, ServiceError};
pub use fake::{Call, FakeService};
pub use http::HttpService;
pub use models::{AskReply, ConnectReply, ExecuteReply};
pub use service::Text2SqlService;
