//! Utility modules supporting the client.
//!
//! - [`RequestExecutor`]: rate-limited, retrying HTTP execution with body decoding
//! - [`RateLimiter`]: process-wide request pacing
//! - [`RetryConfig`], [`with_retry`]: exponential backoff for transient failures
//! - [`xml_to_value`]: XML bodies as nested mappings
//! - [`AuthorDisambiguator`]: fuzzy author name matching
//! - [`QueryBuilder`], [`apply_filters`]: query string construction
//! - [`validate_identifier`], [`validate_date`], [`validate_base_url`]: input checks
//!
//! # Retry with Backoff
//!
//! ```rust,no_run
//! use europepmc_client::utils::{with_retry, AttemptError, RetryConfig, TransientError};
//!
//! # async fn fetch() -> Result<String, String> { Ok("data".to_string()) }
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = RetryConfig::default().max_attempts(3);
//! let data = with_retry(config, || async {
//!     fetch()
//!         .await
//!         .map_err(|e| AttemptError::Transient(TransientError::Network(e)))
//! })
//! .await?;
//! # Ok(())
//! # }
//! ```
//!
//! # Author Disambiguation
//!
//! ```rust
//! use europepmc_client::utils::AuthorDisambiguator;
//!
//! let disambiguator = AuthorDisambiguator::new();
//! let matches = disambiguator
//!     .match_authors("Jennifer A. Doudna", &["Doudna JA", "John Smith"], 70)
//!     .unwrap();
//! assert_eq!(matches.len(), 1);
//! assert_eq!(matches[0].candidate, "Doudna JA");
//! ```

pub mod disambiguation;
pub mod fuzzy;
mod http;
mod query;
mod rate_limit;
mod retry;
mod validate;
mod xml;

pub use disambiguation::{extract_initials, normalize_name, AuthorDisambiguator};
pub use http::{decode_body, with_deadline, ApiRequest, RequestExecutor};
pub use query::{apply_filters, author_query, quote, QueryBuilder};
pub use rate_limit::{RateLimiter, DEFAULT_BURST};
pub use retry::{with_retry, AttemptError, RetryConfig, RetryState, TransientError};
pub use validate::{validate_base_url, validate_date, validate_identifier};
pub use xml::xml_to_value;
