//! # Europe PMC Client
//!
//! An async client for the Europe PMC REST API with client-side rate
//! limiting, retries with exponential backoff, and fuzzy author
//! disambiguation.
//!
//! ## Architecture
//!
//! The library is organized into several modules:
//!
//! - [`client`]: The [`EuropePmcClient`] operations and the [`ClientError`] type
//! - [`models`]: Queries, normalized responses and publication records
//! - [`utils`]: Request execution, rate limiting, retry, XML decoding and
//!   author disambiguation
//! - [`config`]: Client configuration and configuration files
//!
//! ## Example
//!
//! ```rust,no_run
//! use europepmc_client::{EuropePmcClient, SearchQuery};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), europepmc_client::ClientError> {
//! let client = EuropePmcClient::new()?;
//! let page = client.search_page(&SearchQuery::new("CRISPR").page_size(10)).await?;
//! for publication in &page.publications {
//!     println!("{}", publication.title);
//! }
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
pub mod models;
pub mod utils;

// Re-export commonly used types
pub use client::{ClientError, DataSource, EuropePmcClient};
pub use config::ClientConfig;
pub use models::{
    AuthorSearch, PageOptions, PublicationRecord, RawResponse, ResultType, SearchFilters,
    SearchPage, SearchQuery, SortBy,
};
pub use utils::AuthorDisambiguator;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
