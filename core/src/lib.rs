//! askdb Core Module
//!
//! Client-resident state model for talking to a database through a
//! natural-language-to-SQL service:
//! - Message log (everything shown to the user, append-only)
//! - Session state (API key and database lifecycles, schema, pending query)
//! - Credentials (structured fields or connection string)
//! - Heuristics applied to service output
//! - Client configuration
//!
//! Nothing in this crate performs I/O beyond reading configuration.

pub mod config;
pub mod credentials;
pub mod error;
pub mod heuristics;
pub mod message;
pub mod session;

pub use config::{ClientConfig, ConfigOverrides};
pub use credentials::{ConnectPayload, ConnectionFields, ConnectionMode, Credentials, DbEngine};
pub use error::{Result, SessionError};
pub use message::{Draft, Message, MessageKind, MessageLog, Payload};
pub use session::{ConnectionState, Operation, QueryPhase, SchemaOrigin, SessionState};
