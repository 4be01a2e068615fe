//! Client entry point, builder and namespace accessors.

use crate::config::{ConfigOptions, TransportConfig};
use crate::dispatch::{Dispatcher, RequestDescriptor};
use crate::error::Error;
use crate::resources::{Billing, Chat, Embeddings, Models};
use crate::stream::EventStream;
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

/// Main client for the API.
///
/// Cheap to clone; clones share the connection pool and configuration.
#[derive(Clone)]
pub struct Client {
    http: reqwest::Client,
    dispatcher: Dispatcher,
    config: Arc<TransportConfig>,
}

/// Builder for Client.
pub struct ClientBuilder {
    options: ConfigOptions,
    http_builder: reqwest::ClientBuilder,
}

impl ClientBuilder {
    /// Create a new client builder.
    pub fn new() -> Self {
        Self {
            options: ConfigOptions::default(),
            http_builder: reqwest::Client::builder()
                .pool_max_idle_per_host(10)
                .pool_idle_timeout(Duration::from_secs(90))
                .tcp_nodelay(true),
        }
    }

    /// Set the API key. Falls back to `AI_RELAY_API_KEY`.
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.options.api_key = Some(key.into());
        self
    }

    /// Set the base URL. Falls back to `AI_RELAY_BASE_URL`.
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.options.base_url = Some(url.into());
        self
    }

    /// Set the per-attempt timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.options.timeout = Some(timeout);
        self
    }

    /// Set how many times a failed attempt may be retried.
    pub fn max_retries(mut self, retries: u32) -> Self {
        self.options.max_retries = Some(retries);
        self
    }

    /// Build the client, validating configuration before any network activity.
    pub fn build(self) -> Result<Client, Error> {
        let config = self.options.resolve()?;
        let http = self
            .http_builder
            .build()
            .map_err(|e| Error::config(format!("failed to create HTTP client: {e}")))?;

        Ok(Client {
            dispatcher: Dispatcher::new(http.clone()),
            http,
            config: Arc::new(config),
        })
    }
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl Client {
    /// Create a client from environment variables.
    pub fn from_env() -> Result<Self, Error> {
        ClientBuilder::new().build()
    }

    /// Create a new client builder.
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    /// Resolved transport settings.
    pub fn config(&self) -> &TransportConfig {
        &self.config
    }

    /// Chat completions.
    pub fn chat(&self) -> Chat<'_> {
        Chat::new(self)
    }

    /// Embeddings.
    pub fn embeddings(&self) -> Embeddings<'_> {
        Embeddings::new(self)
    }

    /// Model listing.
    pub fn models(&self) -> Models<'_> {
        Models::new(self)
    }

    /// Account billing.
    pub fn billing(&self) -> Billing<'_> {
        Billing::new(self)
    }

    /// Send an arbitrary request with retry and return the raw JSON body.
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<Value, Error> {
        self.dispatcher
            .dispatch(&RequestDescriptor::new(method, path, body), &self.config)
            .await
    }

    /// Prepare a lazy SSE stream against `path`. Nothing is sent until the
    /// first event is pulled.
    pub fn stream_events(&self, path: &str, body: Value) -> EventStream {
        EventStream::new(self.http.clone(), Arc::clone(&self.config), path, body)
    }

    /// Dispatch and decode into `T`.
    pub(crate) async fn call<T: DeserializeOwned>(
        &self,
        request: RequestDescriptor,
        what: &str,
    ) -> Result<T, Error> {
        let value = self.dispatcher.dispatch(&request, &self.config).await?;
        serde_json::from_value(value).map_err(|e| Error::decode(what, &e))
    }
}

/// Serialize a request payload for the wire.
pub(crate) fn to_body<T: Serialize>(payload: &T, what: &str) -> Result<Value, Error> {
    serde_json::to_value(payload).map_err(|e| Error::encode(what, &e))
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
