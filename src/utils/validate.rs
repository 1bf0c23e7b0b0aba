//! Input validation for identifiers, dates and base URLs.
//!
//! Record identifiers are interpolated into endpoint paths, so anything that
//! could change the path (separators, traversal, whitespace, query syntax)
//! is rejected before a request is built.

use chrono::NaiveDate;
use regex::Regex;
use std::sync::OnceLock;
use url::Url;

use crate::client::ClientError;

fn identifier_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[A-Za-z0-9][A-Za-z0-9._-]*$").expect("identifier pattern is valid")
    })
}

/// Validate a record identifier such as `31010933` or `PMC3257301`.
///
/// Returns the trimmed identifier.
pub fn validate_identifier(id: &str) -> Result<&str, ClientError> {
    let id = id.trim();

    if id.is_empty() {
        return Err(ClientError::InvalidArgument(
            "identifier must not be empty".to_string(),
        ));
    }

    if id.contains("..") {
        return Err(ClientError::InvalidArgument(format!(
            "path traversal in identifier: {:?}",
            id
        )));
    }

    if !identifier_pattern().is_match(id) {
        return Err(ClientError::InvalidArgument(format!(
            "identifier contains disallowed characters: {:?}",
            id
        )));
    }

    Ok(id)
}

/// Parse a `YYYY-MM-DD` calendar date
pub fn validate_date(date: &str) -> Result<NaiveDate, ClientError> {
    NaiveDate::parse_from_str(date.trim(), "%Y-%m-%d").map_err(|_| {
        ClientError::InvalidArgument(format!("expected a YYYY-MM-DD date, got {:?}", date))
    })
}

/// Parse a service base URL, accepting only http and https.
///
/// The returned URL always ends with `/` so that relative endpoint paths
/// join beneath it.
pub fn validate_base_url(base_url: &str) -> Result<Url, ClientError> {
    let mut url = Url::parse(base_url.trim())
        .map_err(|e| ClientError::Config(format!("invalid base URL {:?}: {}", base_url, e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ClientError::Config(format!(
            "base URL must use http or https, got {:?}",
            url.scheme()
        )));
    }
    if url.query().is_some() || url.fragment().is_some() {
        return Err(ClientError::Config(format!(
            "base URL must not carry a query or fragment: {:?}",
            base_url
        )));
    }

    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}
