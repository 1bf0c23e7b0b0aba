//! Core data models for queries, responses and publication records.

mod publication;
pub mod response;
mod search;

pub use publication::{
    AuthorMatch, AuthorRecord, DisambiguatedPublication, JournalInfo, PublicationRecord,
};
pub use response::{as_sequence, ContentKind, RawResponse};
pub use search::{
    clamp_page_size, AdvancedSearchResult, AuthorSearch, AuthorSearchResult, PageOptions,
    ResultType, SearchFilters, SearchPage, SearchQuery, SortBy, DEFAULT_PAGE_SIZE,
    INITIAL_CURSOR_MARK, MAX_PAGE_SIZE,
};
