//! Request dispatch with bounded retry and error classification.

use crate::config::TransportConfig;
use crate::error::Error;
use bytes::Bytes;
use reqwest::header::{HeaderMap, RETRY_AFTER, USER_AGENT};
use reqwest::{Method, StatusCode};
use serde_json::Value;
use std::time::Duration;
use tokio::time::{sleep, timeout};
use tracing::{debug, warn};

/// Sent as `User-Agent` on every request.
pub const CLIENT_ID: &str = concat!("ai-relay-sdk-rust/", env!("CARGO_PKG_VERSION"));

/// Response header carrying the server's correlation id.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Statuses that are retried while attempts remain.
pub const RETRYABLE_STATUSES: [u16; 5] = [429, 500, 502, 503, 504];

const BASE_BACKOFF: Duration = Duration::from_millis(500);
const FALLBACK_MESSAGE: &str = "Request failed";

/// One call to make: verb, server-relative path and optional JSON body.
#[derive(Debug, Clone)]
pub struct RequestDescriptor {
    pub method: Method,
    pub path: String,
    pub body: Option<Value>,
}

impl RequestDescriptor {
    pub fn new(method: Method, path: impl Into<String>, body: Option<Value>) -> Self {
        Self {
            method,
            path: path.into(),
            body,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path, None)
    }

    pub fn post(path: impl Into<String>, body: Value) -> Self {
        Self::new(Method::POST, path, Some(body))
    }
}

/// A fully-read HTTP response.
struct Reply {
    status: StatusCode,
    headers: HeaderMap,
    body: Bytes,
}

/// Executes logical calls: attempt, classify, back off, retry.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    http: reqwest::Client,
}

impl Dispatcher {
    pub fn new(http: reqwest::Client) -> Self {
        Self { http }
    }

    /// Run one logical call and return the decoded JSON body.
    ///
    /// Attempts are strictly sequential. Each one gets a fresh timer of
    /// `config.timeout()` covering send and body read; the sleep between
    /// attempts is not timed. At most `max_retries + 1` attempts are made.
    pub async fn dispatch(
        &self,
        request: &RequestDescriptor,
        config: &TransportConfig,
    ) -> Result<Value, Error> {
        let url = config.url(&request.path);
        let mut attempt: u32 = 0;

        loop {
            debug!(method = %request.method, url = %url, attempt, "sending request");

            let reply = match timeout(config.timeout(), self.attempt(&url, request, config)).await {
                Ok(Ok(reply)) => reply,
                Ok(Err(e)) => return Err(Error::transport(&e)),
                Err(_) => return Err(Error::timeout()),
            };

            if reply.status.is_success() {
                return serde_json::from_slice(&reply.body).map_err(|e| {
                    Error::api(
                        reply.status.as_u16(),
                        format!("invalid JSON in response body: {e}"),
                    )
                });
            }

            let status = reply.status.as_u16();
            if is_retryable_status(status) && attempt < config.max_retries() {
                let delay = retry_delay(attempt, parse_retry_after(&reply.headers));
                warn!(
                    status,
                    attempt,
                    delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                    "retrying request"
                );
                sleep(delay).await;
                attempt += 1;
                continue;
            }

            return Err(error_from_response(status, &reply.headers, &reply.body));
        }
    }

    async fn attempt(
        &self,
        url: &str,
        request: &RequestDescriptor,
        config: &TransportConfig,
    ) -> Result<Reply, reqwest::Error> {
        let mut builder = authorized(&self.http, request.method.clone(), url, config);
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await?;
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes().await?;

        Ok(Reply {
            status,
            headers,
            body,
        })
    }
}

/// Request builder with bearer auth and the client identifier attached.
pub(crate) fn authorized(
    http: &reqwest::Client,
    method: Method,
    url: &str,
    config: &TransportConfig,
) -> reqwest::RequestBuilder {
    http.request(method, url)
        .bearer_auth(config.api_key())
        .header(USER_AGENT, CLIENT_ID)
}

/// Whether a status may be retried at all.
#[inline]
pub fn is_retryable_status(status: u16) -> bool {
    RETRYABLE_STATUSES.contains(&status)
}

/// Delay before the retry that follows `attempt`.
///
/// A server-sent `retry-after` always wins; otherwise `500ms * 2^attempt`.
pub fn retry_delay(attempt: u32, retry_after: Option<Duration>) -> Duration {
    retry_after.unwrap_or_else(|| BASE_BACKOFF.saturating_mul(2u32.saturating_pow(attempt)))
}

/// Parse a `retry-after` header given in (possibly fractional) seconds.
pub fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
    let raw = headers.get(RETRY_AFTER)?.to_str().ok()?;
    let secs: f64 = raw.trim().parse().ok()?;
    Duration::try_from_secs_f64(secs).ok()
}

/// Message from an error envelope: `error.message`, or `error` when it is a
/// plain string.
fn error_message(envelope: &Value) -> String {
    match envelope.get("error") {
        Some(Value::String(message)) => message.clone(),
        Some(Value::Object(error)) => error
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or(FALLBACK_MESSAGE)
            .to_string(),
        _ => FALLBACK_MESSAGE.to_string(),
    }
}

/// Convert a non-2xx response into the matching error kind.
fn error_from_response(status: u16, headers: &HeaderMap, body: &[u8]) -> Error {
    let envelope: Value =
        serde_json::from_slice(body).unwrap_or_else(|_| Value::Object(serde_json::Map::new()));
    let message = error_message(&envelope);
    let request_id = headers
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    match status {
        401 => Error::Authentication {
            message,
            request_id,
        },
        429 => Error::RateLimited {
            message,
            retry_after: parse_retry_after(headers),
            request_id,
        },
        402 => Error::InsufficientCredits {
            message,
            request_id,
        },
        _ => Error::Api {
            status,
            message,
            request_id,
        },
    }
}
