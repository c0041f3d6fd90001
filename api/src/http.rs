//! Real HTTP service client using reqwest
//!
//! One `reqwest::Client` with a cookie store per instance, so every call
//! lands in the same remote session.

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

use askdb_core::ConnectPayload;

use crate::error::{Result, ServiceError};
use crate::models::{self, endpoints, AskReply, ConnectReply, ExecuteReply};
use crate::service::Text2SqlService;

/// HTTP implementation of [`Text2SqlService`]
#[derive(Debug, Clone)]
pub struct HttpService {
    client: reqwest::Client,
    base_url: String,
}

impl HttpService {
    /// Create a client for `base_url` with the given per-request timeout
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .cookie_store(true)
            .timeout(timeout)
            .build()
            .map_err(|e| ServiceError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    /// Send a request; non-2xx statuses become `ServiceError::Status`
    async fn send(&self, request: reqwest::RequestBuilder, path: &str) -> Result<String> {
        let response = request.send().await.map_err(|e| {
            warn!(path, error = %e, "request failed");
            ServiceError::from(e)
        })?;

        let status = response.status();
        let body = response.text().await?;
        debug!(path, status = status.as_u16(), body_len = body.len(), "response");

        if !status.is_success() {
            return Err(ServiceError::from_response(status.as_u16(), &body));
        }
        Ok(body)
    }

    async fn post<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<String> {
        debug!(path, "POST");
        let request = self.client.post(self.url(path)).json(body);
        self.send(request, path).await
    }

    async fn get(&self, path: &str) -> Result<String> {
        debug!(path, "GET");
        let request = self.client.get(self.url(path));
        self.send(request, path).await
    }
}

#[async_trait]
impl Text2SqlService for HttpService {
    async fn authorize(&self, api_key: &str) -> Result<()> {
        let body = self
            .post(endpoints::AUTHORIZE, &models::AuthorizeRequest { api_key })
            .await?;
        // Any 2xx counts; only an explicit error envelope is a failure
        let value = models::parse_body(&body).unwrap_or(Value::Null);
        models::decode_authorize(&value)
    }

    async fn connect(&self, payload: &ConnectPayload) -> Result<ConnectReply> {
        let body = self.post(endpoints::CONNECT, payload).await?;
        models::decode_connect(&models::parse_body(&body)?)
    }

    async fn fetch_schema(&self) -> Result<Vec<String>> {
        let body = self.get(endpoints::SCHEMA).await?;
        models::decode_schema(&models::parse_body(&body)?)
    }

    async fn ask(&self, question: &str) -> Result<AskReply> {
        let body = self
            .post(endpoints::ASK, &models::AskRequest { question })
            .await?;
        models::decode_ask(&models::parse_body(&body)?)
    }

    async fn execute(&self) -> Result<ExecuteReply> {
        let body = self.post(endpoints::EXECUTE, &serde_json::json!({})).await?;
        models::decode_execute(&models::parse_body(&body)?)
    }

    fn name(&self) -> &str {
        "http"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_trailing_slash_is_normalized() {
        let service = HttpService::new("http://localhost:8000/", Duration::from_secs(1)).unwrap();
        assert_eq!(service.base_url(), "http://localhost:8000");
        assert_eq!(service.url(endpoints::ASK), "http://localhost:8000/ask-db/");
    }
}
