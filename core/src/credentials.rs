//! Credentials: API key plus the two ways of describing a database
//!
//! Both connection descriptions are kept in memory so the user can toggle
//! between them without losing input. Only the active one is ever sent.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{Result, SessionError};

/// Database engines the service can build a connection URL for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DbEngine {
    #[default]
    Postgresql,
    Mysql,
}

impl fmt::Display for DbEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DbEngine::Postgresql => write!(f, "postgresql"),
            DbEngine::Mysql => write!(f, "mysql"),
        }
    }
}

impl FromStr for DbEngine {
    type Err = SessionError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "postgresql" | "postgres" | "pg" => Ok(DbEngine::Postgresql),
            "mysql" => Ok(DbEngine::Mysql),
            other => Err(SessionError::InvalidInput(format!(
                "Unsupported database type '{}'. Use 'mysql' or 'postgresql'.",
                other
            ))),
        }
    }
}

/// Which description is active
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionMode {
    #[default]
    Fields,
    ConnectionString,
}

/// Structured connection description
#[derive(Clone, PartialEq, Eq)]
pub struct ConnectionFields {
    pub engine: DbEngine,
    pub host: String,
    /// Kept as text: it is forwarded as typed
    pub port: String,
    pub user: String,
    pub password: String,
    pub database: String,
}

impl Default for ConnectionFields {
    fn default() -> Self {
        Self {
            engine: DbEngine::Postgresql,
            host: "localhost".to_string(),
            port: "5432".to_string(),
            user: String::new(),
            password: String::new(),
            database: String::new(),
        }
    }
}

impl fmt::Debug for ConnectionFields {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionFields")
            .field("engine", &self.engine)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("database", &self.database)
            .finish()
    }
}

/// Body of the connect request, built from the active mode only
#[derive(Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ConnectPayload {
    ConnectionString {
        connection_string: String,
    },
    Fields {
        db_type: DbEngine,
        host: String,
        port: String,
        user: String,
        password: String,
        database: String,
    },
}

impl fmt::Debug for ConnectPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectPayload::ConnectionString { .. } => {
                f.write_str("ConnectPayload::ConnectionString(<redacted>)")
            }
            ConnectPayload::Fields {
                db_type,
                host,
                port,
                database,
                ..
            } => write!(
                f,
                "ConnectPayload::Fields({}://{}:{}/{})",
                db_type, host, port, database
            ),
        }
    }
}

/// Mutable credential record
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    pub api_key: String,
    pub mode: ConnectionMode,
    pub fields: ConnectionFields,
    pub connection_string: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("api_key", &if self.api_key.is_empty() { "" } else { "<set>" })
            .field("mode", &self.mode)
            .field("fields", &self.fields)
            .field(
                "connection_string",
                &if self.connection_string.is_empty() { "" } else { "<set>" },
            )
            .finish()
    }
}

impl Credentials {
    /// Build the connect body from the active mode's fields
    pub fn payload(&self) -> ConnectPayload {
        match self.mode {
            ConnectionMode::ConnectionString => ConnectPayload::ConnectionString {
                connection_string: self.connection_string.clone(),
            },
            ConnectionMode::Fields => ConnectPayload::Fields {
                db_type: self.fields.engine,
                host: self.fields.host.clone(),
                port: self.fields.port.clone(),
                user: self.fields.user.clone(),
                password: self.fields.password.clone(),
                database: self.fields.database.clone(),
            },
        }
    }

    /// Set a structured field by name
    ///
    /// Names: `engine` (alias `db_type`), `host`, `port`, `user` (alias
    /// `username`), `password`, `database` (alias `db`).
    pub fn set_field(&mut self, name: &str, value: &str) -> Result<()> {
        match name.trim().to_lowercase().as_str() {
            "engine" | "db_type" | "type" => self.fields.engine = value.parse()?,
            "host" => self.fields.host = value.to_string(),
            "port" => self.fields.port = value.to_string(),
            "user" | "username" => self.fields.user = value.to_string(),
            "password" => self.fields.password = value.to_string(),
            "database" | "db" => self.fields.database = value.to_string(),
            other => {
                return Err(SessionError::InvalidInput(format!(
                    "Unknown connection field '{}'",
                    other
                )))
            }
        }
        Ok(())
    }

    /// Name shown in status lines once connected
    pub fn database_label(&self) -> &str {
        if self.fields.database.trim().is_empty() {
            "database"
        } else {
            &self.fields.database
        }
    }

    pub fn has_api_key(&self) -> bool {
        !self.api_key.trim().is_empty()
    }
}
