//! Retry utilities with exponential backoff for resilient API calls.

use reqwest::StatusCode;
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;

use crate::client::ClientError;

/// Configuration for retry behavior
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryConfig {
    /// Total number of attempts, including the first
    pub max_attempts: u32,
    /// Delay after the first failed attempt; doubles after each further one
    pub initial_delay: Duration,
    /// Maximum delay between retries
    pub max_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(60),
        }
    }
}

impl RetryConfig {
    pub fn max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    pub fn initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    pub fn max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Backoff after the failed attempt with zero-based index `attempt`
    pub fn delay_for(&self, attempt: u32) -> Duration {
        2u32.checked_pow(attempt)
            .and_then(|factor| self.initial_delay.checked_mul(factor))
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }
}

/// Failure of a single attempt that may succeed when repeated
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransientError {
    /// HTTP 429
    RateLimited { body: String },
    /// HTTP 5xx
    ServerError { status: u16, body: String },
    /// Connection, DNS, timeout or body-read failure
    Network(String),
}

impl TransientError {
    /// Classify a non-success status; `None` means the status is permanent
    pub fn from_status(status: StatusCode, body: &str) -> Option<Self> {
        if status == StatusCode::TOO_MANY_REQUESTS {
            Some(TransientError::RateLimited {
                body: body.to_string(),
            })
        } else if status.is_server_error() {
            Some(TransientError::ServerError {
                status: status.as_u16(),
                body: body.to_string(),
            })
        } else {
            None
        }
    }

    /// Describe a transport-level reqwest failure
    pub fn from_reqwest_error(err: &reqwest::Error) -> Self {
        let kind = if err.is_timeout() {
            "timeout"
        } else if err.is_connect() {
            "connect"
        } else if err.is_body() || err.is_decode() {
            "body"
        } else {
            "request"
        };
        TransientError::Network(format!("{} error: {}", kind, err))
    }

    /// Convert into the error returned once the attempt budget is spent
    pub fn into_exhausted(self, attempts: u32) -> ClientError {
        match self {
            TransientError::RateLimited { body } => {
                ClientError::RateLimitedExhausted { attempts, body }
            }
            TransientError::ServerError { status, body } => ClientError::ServerErrorExhausted {
                status,
                attempts,
                body,
            },
            TransientError::Network(message) => ClientError::Network { attempts, message },
        }
    }
}

/// Why one attempt failed
#[derive(Debug)]
pub enum AttemptError {
    /// Worth repeating while attempts remain
    Transient(TransientError),
    /// Returned to the caller immediately
    Permanent(ClientError),
}

impl From<ClientError> for AttemptError {
    fn from(err: ClientError) -> Self {
        AttemptError::Permanent(err)
    }
}

impl From<TransientError> for AttemptError {
    fn from(err: TransientError) -> Self {
        AttemptError::Transient(err)
    }
}

/// Bookkeeping for one logical call across its attempts
#[derive(Debug, Clone)]
pub struct RetryState {
    config: RetryConfig,
    attempts: u32,
    last_error: Option<TransientError>,
    next_delay: Option<Duration>,
}

impl RetryState {
    pub fn new(config: RetryConfig) -> Self {
        Self {
            config,
            attempts: 0,
            last_error: None,
            next_delay: None,
        }
    }

    /// Attempts that have failed so far
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn last_error(&self) -> Option<&TransientError> {
        self.last_error.as_ref()
    }

    pub fn next_delay(&self) -> Option<Duration> {
        self.next_delay
    }

    /// Record a transient failure.
    ///
    /// Returns the delay before the next attempt, or `None` when no attempts
    /// remain.
    pub fn record(&mut self, error: TransientError) -> Option<Duration> {
        self.attempts += 1;
        self.last_error = Some(error);
        self.next_delay = (self.attempts < self.config.max_attempts.max(1))
            .then(|| self.config.delay_for(self.attempts - 1));
        self.next_delay
    }

    /// The error describing an exhausted budget
    pub fn into_error(self) -> ClientError {
        match self.last_error {
            Some(error) => error.into_exhausted(self.attempts),
            None => ClientError::Network {
                attempts: self.attempts,
                message: "no attempt was made".to_string(),
            },
        }
    }
}

/// Execute an async operation with retry logic
///
/// The operation is called at most `config.max_attempts` times. Transient
/// failures are retried after an exponential backoff; there is no sleep after
/// the final attempt. Permanent failures are returned as-is.
pub async fn with_retry<T, F, Fut>(config: RetryConfig, mut operation: F) -> Result<T, ClientError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, AttemptError>>,
{
    let mut state = RetryState::new(config);

    loop {
        match operation().await {
            Ok(result) => {
                if state.attempts() > 0 {
                    tracing::debug!(
                        "Operation succeeded on attempt {} after {} transient failures",
                        state.attempts() + 1,
                        state.attempts()
                    );
                }
                return Ok(result);
            }
            Err(AttemptError::Permanent(error)) => return Err(error),
            Err(AttemptError::Transient(error)) => {
                tracing::debug!(
                    "Transient error on attempt {}: {:?}",
                    state.attempts() + 1,
                    error
                );

                match state.record(error) {
                    Some(delay) => {
                        tracing::debug!("Retrying in {:?}", delay);
                        sleep(delay).await;
                    }
                    None => {
                        let error = state.into_error();
                        tracing::warn!("Giving up: {}", error);
                        return Err(error);
                    }
                }
            }
        }
    }
}
