//! HTTP transport implementation.
//!
//! This module provides an HTTP-based transport for the sync engine.
//! The actual HTTP client is abstracted via a trait so tests can record
//! requests and script responses without a network.

use crate::config::SyncConfig;
use crate::error::{SyncError, SyncResult};
use crate::session::SessionProvider;
use crate::transport::{ChatTransport, Endpoint, Method};
use async_trait::async_trait;
use chatsync_protocol::{
    decode_envelope, Chat, ChatId, CreateChatRequest, SendMessageRequest, SendMessageResponse,
    StatusUpdateRequest,
};
use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// A request handed to an [`HttpClient`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    /// HTTP method.
    pub method: Method,
    /// Absolute URL.
    pub url: String,
    /// Header name/value pairs.
    pub headers: Vec<(String, String)>,
    /// JSON body, if any.
    pub body: Option<Vec<u8>>,
}

impl HttpRequest {
    /// Returns the first header value with the given name (case-insensitive).
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// A response returned by an [`HttpClient`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    /// Status code.
    pub status: u16,
    /// Raw body.
    pub body: Vec<u8>,
}

impl HttpResponse {
    /// Returns true for 2xx statuses.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// HTTP client abstraction.
///
/// Implement this trait to provide the actual HTTP transport. An `Err` means
/// the request never produced a response (connection refused, timeout).
#[async_trait]
pub trait HttpClient: Send + Sync {
    /// Executes one request.
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, String>;
}

/// [`HttpClient`] backed by `reqwest`.
#[derive(Debug, Clone)]
pub struct ReqwestClient {
    inner: reqwest::Client,
}

impl ReqwestClient {
    /// Creates a client with the given request timeout.
    pub fn new(timeout: Duration) -> SyncResult<Self> {
        let inner = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SyncError::Config(format!("failed to build http client: {e}")))?;
        Ok(Self { inner })
    }
}

#[async_trait]
impl HttpClient for ReqwestClient {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, String> {
        let method = match request.method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
            Method::Delete => reqwest::Method::DELETE,
        };

        let mut builder = self.inner.request(method, &request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder.send().await.map_err(|e| e.to_string())?;
        let status = response.status().as_u16();
        let body = response.bytes().await.map_err(|e| e.to_string())?;
        Ok(HttpResponse {
            status,
            body: body.to_vec(),
        })
    }
}

/// HTTP-based chat transport.
///
/// Every request carries the session's bearer token and a JSON body; every
/// response is unwrapped from its `{ success, data, error }` envelope.
pub struct HttpTransport<C: HttpClient> {
    config: SyncConfig,
    client: C,
    session: Arc<dyn SessionProvider>,
    last_error: RwLock<Option<String>>,
}

impl HttpTransport<ReqwestClient> {
    /// Creates a transport backed by `reqwest`, honouring the configured timeout.
    pub fn with_reqwest(config: SyncConfig, session: Arc<dyn SessionProvider>) -> SyncResult<Self> {
        config.validate()?;
        let client = ReqwestClient::new(config.request_timeout)?;
        Ok(Self::new(config, client, session))
    }
}

impl<C: HttpClient> HttpTransport<C> {
    /// Creates a new HTTP transport.
    pub fn new(config: SyncConfig, client: C, session: Arc<dyn SessionProvider>) -> Self {
        Self {
            config,
            client,
            session,
            last_error: RwLock::new(None),
        }
    }

    /// Returns the base URL.
    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }

    /// Returns the last transport-level error message.
    pub fn last_error(&self) -> Option<String> {
        self.last_error.read().clone()
    }

    fn set_error(&self, err: &str) {
        *self.last_error.write() = Some(err.to_string());
    }

    fn clear_error(&self) {
        *self.last_error.write() = None;
    }

    async fn send(&self, endpoint: Endpoint, body: Option<Vec<u8>>) -> SyncResult<Vec<u8>> {
        let token = self.session.token().ok_or(SyncError::Unauthenticated)?;

        let headers = vec![
            ("Authorization".to_string(), format!("Bearer {token}")),
            ("Accept".to_string(), "application/json".to_string()),
            ("Content-Type".to_string(), "application/json".to_string()),
        ];

        let request = HttpRequest {
            method: endpoint.method(),
            url: self.config.endpoint(&endpoint.path()),
            headers,
            body,
        };

        debug!(%endpoint, "sending request");
        let response = self.client.execute(request).await.map_err(|e| {
            self.set_error(&e);
            warn!(%endpoint, error = %e, "request failed");
            SyncError::transport_retryable(e)
        })?;
        self.clear_error();

        if response.status == 401 {
            warn!(%endpoint, "credential rejected, signing out");
            self.session.logout();
            return Err(SyncError::AuthenticationFailed(
                rejection_message(&response.body).unwrap_or_else(|| "unauthorized".into()),
            ));
        }

        if !response.is_success() {
            let detail = rejection_message(&response.body).unwrap_or_default();
            let message = format!("{endpoint} returned HTTP {}: {detail}", response.status);
            return Err(if response.status >= 500 {
                SyncError::transport_retryable(message)
            } else {
                SyncError::transport_fatal(message)
            });
        }

        debug!(%endpoint, status = response.status, "response received");
        Ok(response.body)
    }

    async fn call<T: DeserializeOwned + Send>(
        &self,
        endpoint: Endpoint,
        body: Option<Vec<u8>>,
    ) -> SyncResult<T> {
        let raw = self.send(endpoint, body).await?;
        Ok(decode_envelope::<T>(&raw)?.into_result()?)
    }
}

fn encode<T: Serialize>(body: &T) -> SyncResult<Vec<u8>> {
    serde_json::to_vec(body).map_err(|e| SyncError::Decode(format!("failed to encode request: {e}")))
}

fn rejection_message(body: &[u8]) -> Option<String> {
    decode_envelope::<serde_json::Value>(body)
        .ok()
        .and_then(|envelope| envelope.error)
}

#[async_trait]
impl<C: HttpClient> ChatTransport for HttpTransport<C> {
    async fn list_chats(&self) -> SyncResult<Vec<Chat>> {
        self.call(Endpoint::ListChats, None).await
    }

    async fn get_chat(&self, chat_id: ChatId) -> SyncResult<Chat> {
        self.call(Endpoint::GetChat(chat_id), None).await
    }

    async fn send_message(
        &self,
        chat_id: ChatId,
        request: &SendMessageRequest,
    ) -> SyncResult<SendMessageResponse> {
        self.call(Endpoint::SendMessage(chat_id), Some(encode(request)?))
            .await
    }

    async fn update_status(
        &self,
        chat_id: ChatId,
        request: &StatusUpdateRequest,
    ) -> SyncResult<Chat> {
        self.call(Endpoint::UpdateStatus(chat_id), Some(encode(request)?))
            .await
    }

    async fn create_chat(&self, request: &CreateChatRequest) -> SyncResult<Chat> {
        self.call(Endpoint::CreateChat, Some(encode(request)?)).await
    }

    async fn deactivate_chat(&self, chat_id: ChatId) -> SyncResult<()> {
        let raw = self.send(Endpoint::DeactivateChat(chat_id), None).await?;
        if raw.iter().all(u8::is_ascii_whitespace) {
            return Ok(());
        }
        decode_envelope::<serde_json::Value>(&raw)?.into_unit()?;
        Ok(())
    }
}
