//! Europe PMC search client and its error type.
//!
//! [`EuropePmcClient`] is a thin layer of query builders over the
//! [`RequestExecutor`](crate::utils::RequestExecutor): every operation
//! validates its arguments, builds the endpoint path and query parameters,
//! and hands the request to the executor, which takes care of rate limiting,
//! retries and body decoding.
//!
//! Arguments are always checked before any network traffic, so an
//! [`ClientError::InvalidArgument`] or [`ClientError::UnsupportedOperation`]
//! never costs a rate permit.

mod europe_pmc;
mod source;

pub use europe_pmc::{EuropePmcClient, DEFAULT_USER_AGENT};
pub use source::{DataSource, SourceCapabilities};

/// Errors surfaced by the client, the executor and the disambiguator
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Missing or malformed input, detected before any request is sent
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Non-retryable HTTP status (4xx other than 429)
    #[error("HTTP {status}: {body}")]
    HttpStatus { status: u16, body: String },

    /// HTTP 429 on every attempt
    #[error("Rate limited by the remote service after {attempts} attempts")]
    RateLimitedExhausted { attempts: u32, body: String },

    /// 5xx on the final attempt
    #[error("Server error {status} after {attempts} attempts: {body}")]
    ServerErrorExhausted {
        status: u16,
        attempts: u32,
        body: String,
    },

    /// Connection, DNS, timeout or body-read failure on the final attempt
    #[error("Request failed after {attempts} attempts: {message}")]
    Network { attempts: u32, message: String },

    /// The operation is not available for the requested data source
    #[error("Unsupported operation: {0}")]
    UnsupportedOperation(String),

    /// The response body could not be decoded
    #[error("Parse error: {0}")]
    Parse(String),

    /// The caller-supplied deadline passed before the call completed
    #[error("Deadline exceeded")]
    DeadlineExceeded,

    /// Invalid client configuration
    #[error("Configuration error: {0}")]
    Config(String),
}

impl ClientError {
    /// HTTP status carried by the error, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::HttpStatus { status, .. }
            | ClientError::ServerErrorExhausted { status, .. } => Some(*status),
            ClientError::RateLimitedExhausted { .. } => Some(429),
            _ => None,
        }
    }

    /// Number of attempts made before giving up, for exhausted-retry errors
    pub fn attempts(&self) -> Option<u32> {
        match self {
            ClientError::RateLimitedExhausted { attempts, .. }
            | ClientError::ServerErrorExhausted { attempts, .. }
            | ClientError::Network { attempts, .. } => Some(*attempts),
            _ => None,
        }
    }

    /// Whether the error was produced by argument validation alone
    pub fn is_caller_error(&self) -> bool {
        matches!(
            self,
            ClientError::InvalidArgument(_) | ClientError::UnsupportedOperation(_)
        )
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(err: serde_json::Error) -> Self {
        ClientError::Parse(format!("JSON: {}", err))
    }
}

impl From<quick_xml::Error> for ClientError {
    fn from(err: quick_xml::Error) -> Self {
        ClientError::Parse(format!("XML: {}", err))
    }
}

impl From<url::ParseError> for ClientError {
    fn from(err: url::ParseError) -> Self {
        ClientError::InvalidArgument(format!("URL: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_accessor() {
        let err = ClientError::HttpStatus {
            status: 404,
            body: "not found".to_string(),
        };
        assert_eq!(err.status(), Some(404));
        assert_eq!(err.attempts(), None);

        let err = ClientError::RateLimitedExhausted {
            attempts: 3,
            body: String::new(),
        };
        assert_eq!(err.status(), Some(429));
        assert_eq!(err.attempts(), Some(3));
    }

    #[test]
    fn test_network_error_carries_attempts() {
        let err = ClientError::Network {
            attempts: 2,
            message: "connection reset".to_string(),
        };
        assert_eq!(err.attempts(), Some(2));
        assert!(err.to_string().contains("connection reset"));
        assert!(!err.is_caller_error());
    }

    #[test]
    fn test_caller_errors() {
        assert!(ClientError::InvalidArgument("x".into()).is_caller_error());
        assert!(ClientError::UnsupportedOperation("x".into()).is_caller_error());
        assert!(!ClientError::DeadlineExceeded.is_caller_error());
    }
}
