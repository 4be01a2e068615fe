use std::time::Duration;
use thiserror::Error;

/// Every failure the client can raise.
///
/// Variants map one-to-one onto how the server (or the local transport)
/// failed, so callers can branch with a single `match`.
#[derive(Error, Debug)]
pub enum Error {
    /// Credential rejected (401). Never retried.
    #[error("authentication failed: {message}")]
    Authentication {
        message: String,
        request_id: Option<String>,
    },

    /// Rate limited (429) after retries ran out. `retry_after` is the server's hint.
    #[error("rate limited: {message}")]
    RateLimited {
        message: String,
        retry_after: Option<Duration>,
        request_id: Option<String>,
    },

    /// Account has no credits left (402). Never retried.
    #[error("insufficient credits: {message}")]
    InsufficientCredits {
        message: String,
        request_id: Option<String>,
    },

    /// Any other failed call.
    ///
    /// Status 408 is synthesized for a local timeout and 0 for a transport
    /// failure or an SSE buffer overflow.
    #[error("api error ({status}): {message}")]
    Api {
        status: u16,
        message: String,
        request_id: Option<String>,
    },

    /// Library-level failure: bad configuration, undecodable payloads, or a
    /// streaming request the server refused.
    #[error("{message}")]
    Client {
        message: String,
        status: Option<u16>,
    },
}

impl Error {
    /// Create a generic API error from status and message.
    pub fn api(status: u16, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            message: message.into(),
            request_id: None,
        }
    }

    /// Create a configuration error. These are raised before any network activity.
    pub fn config(message: impl Into<String>) -> Self {
        Self::client(message)
    }

    /// Create a status-less client error, e.g. for a handle used out of order.
    pub fn client(message: impl Into<String>) -> Self {
        Self::Client {
            message: message.into(),
            status: None,
        }
    }

    /// The per-attempt timer fired.
    pub(crate) fn timeout() -> Self {
        Self::api(408, "Request timed out")
    }

    /// The request never produced a response.
    pub(crate) fn transport(err: &reqwest::Error) -> Self {
        if err.is_timeout() {
            return Self::timeout();
        }
        Self::api(0, format!("Network error: {err}"))
    }

    /// A request payload could not be turned into JSON.
    pub(crate) fn encode(what: &str, err: &serde_json::Error) -> Self {
        Self::Client {
            message: format!("failed to encode {what}: {err}"),
            status: None,
        }
    }

    /// A JSON value did not have the shape of the expected response type.
    pub(crate) fn decode(what: &str, err: &serde_json::Error) -> Self {
        Self::Client {
            message: format!("failed to decode {what}: {err}"),
            status: None,
        }
    }

    /// HTTP status associated with this error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Authentication { .. } => Some(401),
            Error::RateLimited { .. } => Some(429),
            Error::InsufficientCredits { .. } => Some(402),
            Error::Api { status, .. } => Some(*status),
            Error::Client { status, .. } => *status,
        }
    }

    /// Server-assigned request id, when the response carried one.
    pub fn request_id(&self) -> Option<&str> {
        match self {
            Error::Authentication { request_id, .. }
            | Error::RateLimited { request_id, .. }
            | Error::InsufficientCredits { request_id, .. }
            | Error::Api { request_id, .. } => request_id.as_deref(),
            Error::Client { .. } => None,
        }
    }

    /// Human-readable message without the kind prefix.
    pub fn message(&self) -> &str {
        match self {
            Error::Authentication { message, .. }
            | Error::RateLimited { message, .. }
            | Error::InsufficientCredits { message, .. }
            | Error::Api { message, .. }
            | Error::Client { message, .. } => message,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_per_kind() {
        let auth = Error::Authentication {
            message: "bad key".into(),
            request_id: Some("req_1".into()),
        };
        assert_eq!(auth.status(), Some(401));
        assert_eq!(auth.request_id(), Some("req_1"));

        let limited = Error::RateLimited {
            message: "slow down".into(),
            retry_after: Some(Duration::from_secs(3)),
            request_id: None,
        };
        assert_eq!(limited.status(), Some(429));
        assert_eq!(limited.request_id(), None);

        assert_eq!(Error::api(503, "down").status(), Some(503));
        assert_eq!(Error::config("missing key").status(), None);
    }

    #[test]
    fn test_synthesized_timeout() {
        let err = Error::timeout();
        assert_eq!(err.status(), Some(408));
        assert_eq!(err.message(), "Request timed out");
    }

    #[test]
    fn test_display() {
        assert_eq!(Error::api(500, "boom").to_string(), "api error (500): boom");
        assert_eq!(Error::config("missing API key").to_string(), "missing API key");
    }
}
