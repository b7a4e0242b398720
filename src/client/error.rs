use std::error::Error as StdError;

use crate::domain::ValidationError;
use crate::domain::sanitize::scrub_error_message;

const UNEXPECTED_MESSAGE: &str = "An unexpected error occurred";

/// Coarse classification of a [`SmsGateError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Validation,
    Authentication,
    InsufficientBalance,
    QuotaExceeded,
    Network,
    Api,
    Parse,
    Unexpected,
}

#[derive(Debug, thiserror::Error)]
/// Errors returned by [`SmsGateClient`](crate::SmsGateClient) and
/// [`OAuth2Client`](crate::OAuth2Client).
///
/// Every variant has a fixed retryability, except [`SmsGateError::Api`] which
/// is retryable only for server errors (`status >= 500`).
pub enum SmsGateError {
    /// A domain constructor or the payload sanitizer rejected the input.
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Credentials were rejected (HTTP 401 or an OAuth2 error response).
    #[error("authentication failed: {message}")]
    Authentication {
        message: String,
        status: Option<u16>,
        body: Option<String>,
    },

    /// The account cannot pay for the request (HTTP 402).
    #[error("insufficient balance: {message}")]
    InsufficientBalance { message: String, body: Option<String> },

    /// Too many requests, either locally (rate limiter) or remotely (HTTP 429).
    #[error("quota exceeded: {message}")]
    QuotaExceeded { message: String, body: Option<String> },

    /// No response was received (DNS, TLS, connect failure, timeout).
    #[error("network error: {0}")]
    Network(#[source] Box<dyn StdError + Send + Sync>),

    /// Any other gateway failure, including `status: "error"` on HTTP 200.
    #[error("API error: {message}")]
    Api {
        message: String,
        status: Option<u16>,
        body: Option<String>,
    },

    /// A response was received but its body could not be read or did not
    /// have the expected shape.
    #[error("parse error: {0}")]
    Parse(#[source] Box<dyn StdError + Send + Sync>),

    /// Failure outside the request/response exchange itself.
    #[error("unexpected error: {0}")]
    Unexpected(#[source] Box<dyn StdError + Send + Sync>),
}

impl SmsGateError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::Authentication { .. } => ErrorKind::Authentication,
            Self::InsufficientBalance { .. } => ErrorKind::InsufficientBalance,
            Self::QuotaExceeded { .. } => ErrorKind::QuotaExceeded,
            Self::Network(_) => ErrorKind::Network,
            Self::Api { .. } => ErrorKind::Api,
            Self::Parse(_) => ErrorKind::Parse,
            Self::Unexpected(_) => ErrorKind::Unexpected,
        }
    }

    /// HTTP status associated with the error, falling back to the kind's default.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Validation(_) => Some(400),
            Self::Authentication { status, .. } => status.or(Some(401)),
            Self::InsufficientBalance { .. } => Some(402),
            Self::QuotaExceeded { .. } => Some(429),
            Self::Api { status, .. } => *status,
            Self::Network(_) | Self::Parse(_) | Self::Unexpected(_) => None,
        }
    }

    /// Raw response body, when one was received.
    pub fn raw_response(&self) -> Option<&str> {
        match self {
            Self::Authentication { body, .. }
            | Self::InsufficientBalance { body, .. }
            | Self::QuotaExceeded { body, .. }
            | Self::Api { body, .. } => body.as_deref(),
            _ => None,
        }
    }

    pub fn is_retryable(&self) -> bool {
        match self {
            Self::QuotaExceeded { .. } | Self::Network(_) => true,
            Self::Api { status, .. } => status.is_some_and(|status| status >= 500),
            Self::Validation(_)
            | Self::Authentication { .. }
            | Self::InsufficientBalance { .. }
            | Self::Parse(_)
            | Self::Unexpected(_) => false,
        }
    }

    /// Message safe to show to end users or write to logs.
    ///
    /// Credential-looking `key=value` pairs are masked and the text is capped
    /// at 500 characters. Unexpected failures never expose their internals.
    pub fn user_message(&self) -> String {
        match self {
            Self::Unexpected(_) => UNEXPECTED_MESSAGE.to_owned(),
            Self::Authentication { message, .. }
            | Self::InsufficientBalance { message, .. }
            | Self::QuotaExceeded { message, .. }
            | Self::Api { message, .. } => scrub_error_message(message),
            other => scrub_error_message(&other.to_string()),
        }
    }

    /// Map a non-2xx HTTP response to the matching error kind.
    pub(crate) fn from_http_status(status: u16, body: String) -> Self {
        let message = response_message(&body).unwrap_or_else(|| default_message(status));
        let body = if body.trim().is_empty() {
            None
        } else {
            Some(body)
        };
        match status {
            401 => Self::Authentication {
                message,
                status: Some(status),
                body,
            },
            402 => Self::InsufficientBalance { message, body },
            429 => Self::QuotaExceeded { message, body },
            _ => Self::Api {
                message,
                status: Some(status),
                body,
            },
        }
    }

    pub(crate) fn from_reqwest(err: reqwest::Error) -> Self {
        if err.is_builder() {
            Self::Unexpected(Box::new(err))
        } else {
            Self::Network(Box::new(err))
        }
    }

    /// The status line arrived but reading the body failed.
    pub(crate) fn unreadable_body(err: impl StdError + Send + Sync + 'static) -> Self {
        Self::Parse(Box::new(err))
    }

    pub(crate) fn rate_limited() -> Self {
        Self::QuotaExceeded {
            message: "Rate limit exceeded. Please try again later.".to_owned(),
            body: None,
        }
    }
}

/// Pull a human-readable message out of an error body.
fn response_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    ["message", "error_description", "error"]
        .iter()
        .find_map(|key| value.get(key)?.as_str())
        .map(str::to_owned)
}

fn default_message(status: u16) -> String {
    match status {
        401 => "Invalid API key or authentication failed".to_owned(),
        402 => "Insufficient balance to complete this request".to_owned(),
        429 => "Rate limit exceeded. Please try again later.".to_owned(),
        _ => format!("request failed with HTTP status {status}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unreadable_body_is_a_parse_error_not_a_network_error() {
        let err = SmsGateError::unreadable_body(std::io::Error::new(
            std::io::ErrorKind::UnexpectedEof,
            "body truncated",
        ));
        assert_eq!(err.kind(), ErrorKind::Parse);
        assert!(!err.is_retryable());
        assert_eq!(err.status_code(), None);
    }

    #[test]
    fn http_status_maps_to_specific_kinds() {
        let cases = [
            (401, ErrorKind::Authentication, false),
            (402, ErrorKind::InsufficientBalance, false),
            (429, ErrorKind::QuotaExceeded, true),
            (400, ErrorKind::Api, false),
            (404, ErrorKind::Api, false),
            (500, ErrorKind::Api, true),
            (503, ErrorKind::Api, true),
        ];
        for (status, kind, retryable) in cases {
            let err = SmsGateError::from_http_status(status, String::new());
            assert_eq!(err.kind(), kind, "status {status}");
            assert_eq!(err.is_retryable(), retryable, "status {status}");
            assert_eq!(err.status_code(), Some(status));
        }
    }

    #[test]
    fn http_status_prefers_body_message_and_keeps_raw_body() {
        let body = r#"{"status":"error","message":"Invalid sender ID"}"#.to_owned();
        let err = SmsGateError::from_http_status(422, body.clone());
        assert_eq!(err.user_message(), "Invalid sender ID");
        assert_eq!(err.raw_response(), Some(body.as_str()));

        let err = SmsGateError::from_http_status(401, "   ".to_owned());
        assert_eq!(err.raw_response(), None);
        assert_eq!(
            err.user_message(),
            "Invalid API key or authentication failed"
        );
    }

    #[test]
    fn validation_defaults_to_bad_request_and_is_final() {
        let err = SmsGateError::from(ValidationError::Empty { field: "message" });
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(err.status_code(), Some(400));
        assert!(!err.is_retryable());
    }

    #[test]
    fn network_and_parse_retryability() {
        let io = std::io::Error::new(std::io::ErrorKind::TimedOut, "timed out");
        assert!(SmsGateError::Network(Box::new(io)).is_retryable());

        let parse = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err = SmsGateError::Parse(Box::new(parse));
        assert!(!err.is_retryable());
        assert_eq!(err.status_code(), None);
    }

    #[test]
    fn user_message_scrubs_secrets_and_hides_unexpected_details() {
        let err = SmsGateError::Api {
            message: "upstream rejected token=abc123 for key=xyz".to_owned(),
            status: Some(500),
            body: None,
        };
        assert_eq!(
            err.user_message(),
            "upstream rejected token=*** for key=***"
        );

        let io = std::io::Error::other("internal stack detail");
        let err = SmsGateError::Unexpected(Box::new(io));
        assert_eq!(err.user_message(), "An unexpected error occurred");
    }
}
