//! Europe PMC query string construction.

use crate::client::ClientError;
use crate::models::SearchFilters;
use crate::utils::validate::validate_date;

/// Field holding the first publication date
pub const DATE_FIELD: &str = "FIRST_PDATE";

/// Builds a query from clauses joined with `AND`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryBuilder {
    clauses: Vec<String>,
}

impl QueryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a raw clause; blank clauses are ignored
    pub fn term(mut self, clause: impl AsRef<str>) -> Self {
        let clause = clause.as_ref().trim();
        if !clause.is_empty() {
            self.clauses.push(clause.to_string());
        }
        self
    }

    /// Add `FIELD:"value"`
    pub fn field(self, field: &str, value: &str) -> Self {
        let clause = format!("{}:{}", field, quote(value.trim()));
        self.term(clause)
    }

    /// Add `FIELD:Y`
    pub fn flag(self, field: &str) -> Self {
        let clause = format!("{}:Y", field);
        self.term(clause)
    }

    /// Add `FIELD:[from TO to]`, with `*` for an open end
    pub fn range(self, field: &str, from: Option<&str>, to: Option<&str>) -> Self {
        let clause = format!(
            "{}:[{} TO {}]",
            field,
            from.unwrap_or("*"),
            to.unwrap_or("*")
        );
        self.term(clause)
    }

    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    pub fn build(&self) -> String {
        self.clauses.join(" AND ")
    }
}

/// Wrap a value in double quotes, escaping embedded quotes
pub fn quote(value: &str) -> String {
    format!("\"{}\"", value.replace('"', "\\\""))
}

/// Query for publications by one author, optionally narrowed by extra terms
pub fn author_query(author_name: &str, additional_terms: Option<&str>) -> String {
    QueryBuilder::new()
        .field("AUTH", author_name)
        .term(additional_terms.unwrap_or_default())
        .build()
}

/// Append the filter clauses to a base query.
///
/// Dates must be `YYYY-MM-DD` and the range must not be reversed.
pub fn apply_filters(query: &str, filters: &SearchFilters) -> Result<String, ClientError> {
    if query.trim().is_empty() {
        return Err(ClientError::InvalidArgument(
            "query must not be empty".to_string(),
        ));
    }

    let from = filters
        .publication_date_from
        .as_deref()
        .map(validate_date)
        .transpose()?;
    let to = filters
        .publication_date_to
        .as_deref()
        .map(validate_date)
        .transpose()?;

    if let (Some(from), Some(to)) = (from, to) {
        if from > to {
            return Err(ClientError::InvalidArgument(format!(
                "publication date range is reversed: {} is after {}",
                from, to
            )));
        }
    }

    let mut builder = QueryBuilder::new().term(query);
    if let Some(from) = from {
        builder = builder.range(DATE_FIELD, Some(&from.format("%Y-%m-%d").to_string()), None);
    }
    if let Some(to) = to {
        builder = builder.range(DATE_FIELD, None, Some(&to.format("%Y-%m-%d").to_string()));
    }
    if let Some(journal) = filters.journal.as_deref().filter(|j| !j.trim().is_empty()) {
        builder = builder.field("JOURNAL", journal);
    }
    if filters.open_access_only {
        builder = builder.flag("OPEN_ACCESS");
    }
    if filters.has_full_text {
        builder = builder.flag("HAS_FT");
    }

    Ok(builder.build())
}
