//! Search request and response models.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

use crate::client::ClientError;
use crate::models::response::{as_sequence, scalar_string, scalar_u64};
use crate::models::{DisambiguatedPublication, PublicationRecord, RawResponse};

/// Largest page size the service accepts
pub const MAX_PAGE_SIZE: u32 = 1000;

/// Page size used when none is given
pub const DEFAULT_PAGE_SIZE: u32 = 25;

/// Cursor mark that starts a cursor walk
pub const INITIAL_CURSOR_MARK: &str = "*";

/// Clamp a requested page size into `1..=MAX_PAGE_SIZE`
pub fn clamp_page_size(page_size: u32) -> u32 {
    page_size.clamp(1, MAX_PAGE_SIZE)
}

/// Verbosity of returned records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResultType {
    /// Identifiers only
    IdList,
    /// Key metadata
    #[default]
    Lite,
    /// Full metadata including author lists, MeSH terms and abstracts
    Core,
}

impl ResultType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResultType::IdList => "idlist",
            ResultType::Lite => "lite",
            ResultType::Core => "core",
        }
    }
}

impl fmt::Display for ResultType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResultType {
    type Err = ClientError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "idlist" => Ok(ResultType::IdList),
            "lite" => Ok(ResultType::Lite),
            "core" => Ok(ResultType::Core),
            other => Err(ClientError::InvalidArgument(format!(
                "unknown result type: {:?} (expected idlist, lite or core)",
                other
            ))),
        }
    }
}

/// Sort key for search results
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortBy {
    /// Service default ordering; sends no sort parameter
    Relevance,
    /// Most recent publication first
    Date,
    /// Most cited first
    Cited,
    /// Raw sort expression passed through untouched (e.g. `"FIRST_PDATE_D asc"`)
    #[serde(untagged)]
    Custom(String),
}

impl SortBy {
    /// Value of the `sort` query parameter, if one should be sent
    pub fn as_param(&self) -> Option<&str> {
        match self {
            SortBy::Relevance => None,
            SortBy::Date => Some("P_PDATE_D desc"),
            SortBy::Cited => Some("CITED desc"),
            SortBy::Custom(expr) => Some(expr.as_str()),
        }
    }
}

impl FromStr for SortBy {
    type Err = ClientError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        match trimmed.to_ascii_lowercase().as_str() {
            "" => Err(ClientError::InvalidArgument("empty sort key".to_string())),
            "relevance" => Ok(SortBy::Relevance),
            "date" => Ok(SortBy::Date),
            "cited" => Ok(SortBy::Cited),
            _ => Ok(SortBy::Custom(trimmed.to_string())),
        }
    }
}

/// Search query parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchQuery {
    /// Free text or field-qualified query (`AUTH:"Watt FM" AND JOURNAL:"Nature"`)
    pub query: String,

    /// Record verbosity
    pub result_type: ResultType,

    /// Requested page size; clamped when sent
    pub page_size: u32,

    /// Opaque continuation token from a previous page
    pub cursor_mark: Option<String>,

    /// Sort key
    pub sort: Option<SortBy>,

    /// Whether the service should expand synonyms
    pub synonym: bool,
}

impl Default for SearchQuery {
    fn default() -> Self {
        Self {
            query: String::new(),
            result_type: ResultType::default(),
            page_size: DEFAULT_PAGE_SIZE,
            cursor_mark: None,
            sort: None,
            synonym: true,
        }
    }
}

impl SearchQuery {
    /// Create a new search query
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            ..Default::default()
        }
    }

    pub fn result_type(mut self, result_type: ResultType) -> Self {
        self.result_type = result_type;
        self
    }

    pub fn page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn cursor_mark(mut self, cursor: impl Into<String>) -> Self {
        self.cursor_mark = Some(cursor.into());
        self
    }

    pub fn sort(mut self, sort: SortBy) -> Self {
        self.sort = Some(sort);
        self
    }

    pub fn synonym(mut self, synonym: bool) -> Self {
        self.synonym = synonym;
        self
    }

    /// Page size actually sent to the service
    pub fn effective_page_size(&self) -> u32 {
        clamp_page_size(self.page_size)
    }

    /// Reject queries that cannot be sent
    pub fn validate(&self) -> Result<(), ClientError> {
        if self.query.trim().is_empty() {
            return Err(ClientError::InvalidArgument(
                "query must not be empty".to_string(),
            ));
        }
        if matches!(&self.cursor_mark, Some(cursor) if cursor.is_empty()) {
            return Err(ClientError::InvalidArgument(
                "cursor mark must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Query parameters for the `search` endpoint
    pub fn to_params(&self) -> Vec<(String, String)> {
        let mut params = vec![
            ("query".to_string(), self.query.clone()),
            ("resultType".to_string(), self.result_type.to_string()),
            ("pageSize".to_string(), self.effective_page_size().to_string()),
            ("format".to_string(), "json".to_string()),
            ("synonym".to_string(), self.synonym.to_string()),
        ];

        if let Some(cursor) = &self.cursor_mark {
            params.push(("cursorMark".to_string(), cursor.clone()));
        }

        if let Some(sort) = self.sort.as_ref().and_then(SortBy::as_param) {
            params.push(("sort".to_string(), sort.to_string()));
        }

        params
    }
}

/// Paging options for citation and reference lookups
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageOptions {
    pub page_size: u32,
    pub cursor_mark: Option<String>,
}

impl Default for PageOptions {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            cursor_mark: None,
        }
    }
}

impl PageOptions {
    pub fn new(page_size: u32) -> Self {
        Self {
            page_size,
            cursor_mark: None,
        }
    }

    pub fn cursor_mark(mut self, cursor: impl Into<String>) -> Self {
        self.cursor_mark = Some(cursor.into());
        self
    }

    pub fn to_params(&self) -> Vec<(String, String)> {
        let mut params = vec![
            ("pageSize".to_string(), clamp_page_size(self.page_size).to_string()),
            ("format".to_string(), "json".to_string()),
        ];
        if let Some(cursor) = &self.cursor_mark {
            params.push(("cursorMark".to_string(), cursor.clone()));
        }
        params
    }
}

/// Filters for advanced search
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchFilters {
    /// Earliest first-publication date, `YYYY-MM-DD`
    pub publication_date_from: Option<String>,

    /// Latest first-publication date, `YYYY-MM-DD`
    pub publication_date_to: Option<String>,

    /// Journal title
    pub journal: Option<String>,

    #[serde(default)]
    pub open_access_only: bool,

    #[serde(default)]
    pub has_full_text: bool,
}

impl SearchFilters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn published_from(mut self, date: impl Into<String>) -> Self {
        self.publication_date_from = Some(date.into());
        self
    }

    pub fn published_to(mut self, date: impl Into<String>) -> Self {
        self.publication_date_to = Some(date.into());
        self
    }

    pub fn journal(mut self, journal: impl Into<String>) -> Self {
        self.journal = Some(journal.into());
        self
    }

    pub fn open_access_only(mut self, yes: bool) -> Self {
        self.open_access_only = yes;
        self
    }

    pub fn has_full_text(mut self, yes: bool) -> Self {
        self.has_full_text = yes;
        self
    }

    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

/// Author search with disambiguation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthorSearch {
    /// Target author, e.g. `"Fiona Watt"`
    pub author_name: String,

    /// Extra query terms ANDed onto the author clause
    pub additional_terms: Option<String>,

    /// Maximum number of publications returned after disambiguation
    pub page_size: u32,

    /// Minimum match score (0-100)
    pub threshold: u8,
}

impl AuthorSearch {
    /// Default threshold for author searches
    pub const DEFAULT_THRESHOLD: u8 = 90;

    pub fn new(author_name: impl Into<String>) -> Self {
        Self {
            author_name: author_name.into(),
            additional_terms: None,
            page_size: DEFAULT_PAGE_SIZE,
            threshold: Self::DEFAULT_THRESHOLD,
        }
    }

    pub fn additional_terms(mut self, terms: impl Into<String>) -> Self {
        self.additional_terms = Some(terms.into());
        self
    }

    pub fn page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn threshold(mut self, threshold: u8) -> Self {
        self.threshold = threshold;
        self
    }
}

/// One page of search results in a stable output schema
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchPage {
    /// Total hits reported by the service for the whole query
    pub hit_count: u64,

    /// Token for the next page; pass back verbatim
    pub next_cursor_mark: Option<String>,

    /// Request echo returned by the service
    pub request: Value,

    pub publications: Vec<PublicationRecord>,
}

impl SearchPage {
    /// Parse the search envelope out of a normalized response
    pub fn from_response(response: &RawResponse) -> Result<Self, ClientError> {
        if response.text_content().is_some() {
            return Err(ClientError::Parse(format!(
                "expected a JSON or XML search envelope, got {:?}",
                response.content_type()
            )));
        }
        Self::from_value(response.body())
    }

    /// Parse a search envelope, unwrapping the XML `responseWrapper` root
    pub fn from_value(value: &Value) -> Result<Self, ClientError> {
        let envelope = value.get("responseWrapper").unwrap_or(value);
        if !envelope.is_object() {
            return Err(ClientError::Parse(
                "search envelope is not an object".to_string(),
            ));
        }

        let publications = as_sequence(
            envelope
                .get("resultList")
                .and_then(|list| list.get("result")),
        )
        .into_iter()
        .map(PublicationRecord::from_value)
        .collect();

        Ok(Self {
            hit_count: scalar_u64(envelope.get("hitCount")).unwrap_or(0),
            next_cursor_mark: scalar_string(envelope.get("nextCursorMark")),
            request: envelope.get("request").cloned().unwrap_or(Value::Null),
            publications,
        })
    }
}

/// Result of an advanced search: the page plus how the query was assembled
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AdvancedSearchResult {
    pub original_query: String,
    pub applied_filters: SearchFilters,
    pub final_query: String,
    #[serde(flatten)]
    pub page: SearchPage,
}

/// Result of an author search after disambiguation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuthorSearchResult {
    pub query: String,
    pub author_searched: String,
    pub disambiguation_threshold: u8,
    /// Records returned by the service before disambiguation
    pub total_found: usize,
    /// Records kept after disambiguation and truncation
    pub after_disambiguation: usize,
    pub publications: Vec<DisambiguatedPublication>,
}
