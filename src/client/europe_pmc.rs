//! Europe PMC REST client.

use async_stream::try_stream;
use futures_util::Stream;

use super::{ClientError, DataSource};
use crate::config::ClientConfig;
use crate::models::{
    clamp_page_size, AdvancedSearchResult, AuthorSearch, AuthorSearchResult, PageOptions,
    PublicationRecord, RawResponse, ResultType, SearchFilters, SearchPage, SearchQuery,
    INITIAL_CURSOR_MARK,
};
use crate::utils::{
    apply_filters, author_query, validate_identifier, ApiRequest, AuthorDisambiguator,
    RequestExecutor,
};

/// User agent sent when none is configured
pub const DEFAULT_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// Data type that needs no path suffix on detail lookups
const CORE_DATA_TYPE: &str = "core";

/// Client for the Europe PMC REST API
///
/// Cloning is cheap; clones share one rate limiter and connection pool, so
/// the configured rate holds across all of them.
#[derive(Debug, Clone)]
pub struct EuropePmcClient {
    config: ClientConfig,
    executor: RequestExecutor,
    disambiguator: AuthorDisambiguator,
}

impl EuropePmcClient {
    /// Create a client for the production endpoint with default settings
    pub fn new() -> Result<Self, ClientError> {
        Self::with_config(ClientConfig::default())
    }

    /// Create a client from a configuration, validating it first
    pub fn with_config(config: ClientConfig) -> Result<Self, ClientError> {
        let executor = RequestExecutor::new(&config)?;
        Ok(Self {
            config,
            executor,
            disambiguator: AuthorDisambiguator::default(),
        })
    }

    pub fn with_disambiguator(mut self, disambiguator: AuthorDisambiguator) -> Self {
        self.disambiguator = disambiguator;
        self
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn executor(&self) -> &RequestExecutor {
        &self.executor
    }

    pub fn disambiguator(&self) -> &AuthorDisambiguator {
        &self.disambiguator
    }

    /// Run a search and return the normalized body
    pub async fn search(&self, query: &SearchQuery) -> Result<RawResponse, ClientError> {
        let request = search_request(query)?;
        self.executor.execute(&request).await
    }

    /// Run a search and parse the result envelope
    pub async fn search_page(&self, query: &SearchQuery) -> Result<SearchPage, ClientError> {
        let response = self.search(query).await?;
        SearchPage::from_response(&response)
    }

    /// Search with filters appended to the query
    pub async fn advanced_search(
        &self,
        query: &SearchQuery,
        filters: &SearchFilters,
    ) -> Result<AdvancedSearchResult, ClientError> {
        let final_query = apply_filters(&query.query, filters)?;

        let filtered = SearchQuery {
            query: final_query.clone(),
            ..query.clone()
        };
        let page = self.search_page(&filtered).await?;

        Ok(AdvancedSearchResult {
            original_query: query.query.clone(),
            applied_filters: filters.clone(),
            final_query,
            page,
        })
    }

    /// Search publications by author and keep those whose authors match.
    ///
    /// Fetches twice the requested page size so that disambiguation still
    /// leaves a full page, then truncates to the requested size.
    pub async fn search_author_publications(
        &self,
        search: &AuthorSearch,
    ) -> Result<AuthorSearchResult, ClientError> {
        self.disambiguator
            .validate(&search.author_name, search.threshold)?;

        let query = author_query(search.author_name.trim(), search.additional_terms.as_deref());
        let page_size = clamp_page_size(search.page_size);
        let fetch = SearchQuery::new(query.clone())
            .result_type(ResultType::Lite)
            .page_size(page_size.saturating_mul(2));

        let page = self.search_page(&fetch).await?;
        let total_found = page.publications.len();

        let mut publications = self.disambiguator.filter_publications(
            &search.author_name,
            &page.publications,
            search.threshold,
        )?;
        publications.truncate(page_size as usize);

        tracing::debug!(
            author = %search.author_name,
            total_found,
            kept = publications.len(),
            "Author search complete"
        );

        Ok(AuthorSearchResult {
            query,
            author_searched: search.author_name.clone(),
            disambiguation_threshold: search.threshold,
            total_found,
            after_disambiguation: publications.len(),
            publications,
        })
    }

    /// Fetch one record; `data_type` other than `core` is appended to the path
    pub async fn get_publication_details(
        &self,
        source: DataSource,
        id: &str,
        data_type: Option<&str>,
    ) -> Result<RawResponse, ClientError> {
        let request = details_request(source, id, data_type)?;
        self.executor.execute(&request).await
    }

    /// Records citing the given record
    pub async fn get_citations(
        &self,
        source: DataSource,
        id: &str,
        page: &PageOptions,
    ) -> Result<RawResponse, ClientError> {
        let request = record_request(source, id, Some("citations"))?.params(page.to_params());
        self.executor.execute(&request).await
    }

    /// Records cited by the given record
    pub async fn get_references(
        &self,
        source: DataSource,
        id: &str,
        page: &PageOptions,
    ) -> Result<RawResponse, ClientError> {
        let request = record_request(source, id, Some("references"))?.params(page.to_params());
        self.executor.execute(&request).await
    }

    /// Cross-references to external databases
    pub async fn get_database_links(
        &self,
        source: DataSource,
        id: &str,
    ) -> Result<RawResponse, ClientError> {
        let request = record_request(source, id, Some("databaseLinks"))?.param("format", "json");
        self.executor.execute(&request).await
    }

    /// Full text XML; PubMed Central only
    pub async fn get_full_text_xml(
        &self,
        source: DataSource,
        id: &str,
    ) -> Result<RawResponse, ClientError> {
        if !source.supports_full_text() {
            return Err(ClientError::UnsupportedOperation(format!(
                "full text is only available for {}, not {}",
                DataSource::Pmc,
                source
            )));
        }

        let request = record_request(source, id, Some("fullTextXML"))?;
        self.executor.execute(&request).await
    }

    /// Supplementary file listing; PubMed Central only
    pub async fn get_supplementary_files(
        &self,
        source: DataSource,
        id: &str,
    ) -> Result<RawResponse, ClientError> {
        if !source.supports_supplementary_files() {
            return Err(ClientError::UnsupportedOperation(format!(
                "supplementary files are only available for {}, not {}",
                DataSource::Pmc,
                source
            )));
        }

        let request = record_request(source, id, Some("supplementaryFiles"))?;
        self.executor.execute(&request).await
    }

    /// Stream every record matching `query`, following cursor marks.
    ///
    /// Starts from the query's cursor mark, or `*` when it has none. Ends when
    /// a page is empty or the cursor stops advancing; the first error ends
    /// the stream.
    pub fn search_stream(
        &self,
        query: SearchQuery,
    ) -> impl Stream<Item = Result<PublicationRecord, ClientError>> + '_ {
        try_stream! {
            query.validate()?;

            let mut query = query;
            if query.cursor_mark.is_none() {
                query.cursor_mark = Some(INITIAL_CURSOR_MARK.to_string());
            }

            loop {
                let page = self.search_page(&query).await?;
                let exhausted = page.publications.is_empty();

                for record in page.publications {
                    yield record;
                }

                match page.next_cursor_mark {
                    Some(next) if !exhausted && query.cursor_mark.as_deref() != Some(next.as_str()) => {
                        query.cursor_mark = Some(next);
                    }
                    _ => break,
                }
            }
        }
    }
}

fn search_request(query: &SearchQuery) -> Result<ApiRequest, ClientError> {
    query.validate()?;
    Ok(ApiRequest::get("search").params(query.to_params()))
}

/// `{source}/{id}[/{suffix}]`
fn record_request(
    source: DataSource,
    id: &str,
    suffix: Option<&str>,
) -> Result<ApiRequest, ClientError> {
    let id = validate_identifier(id)?;
    let endpoint = match suffix {
        Some(suffix) => format!("{}/{}/{}", source.code(), id, suffix),
        None => format!("{}/{}", source.code(), id),
    };
    Ok(ApiRequest::get(endpoint))
}

fn details_request(
    source: DataSource,
    id: &str,
    data_type: Option<&str>,
) -> Result<ApiRequest, ClientError> {
    let data_type = data_type
        .map(str::trim)
        .filter(|data_type| !data_type.is_empty() && *data_type != CORE_DATA_TYPE)
        .map(validate_identifier)
        .transpose()?;

    Ok(record_request(source, id, data_type)?.param("format", "json"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SortBy;

    fn param<'a>(request: &'a ApiRequest, key: &str) -> Option<&'a str> {
        request
            .params
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    #[test]
    fn test_search_request_params() {
        let query = SearchQuery::new("malaria")
            .result_type(ResultType::Core)
            .page_size(5000)
            .sort(SortBy::Date)
            .cursor_mark("AoE=");

        let request = search_request(&query).unwrap();
        assert_eq!(request.endpoint, "search");
        assert_eq!(param(&request, "query"), Some("malaria"));
        assert_eq!(param(&request, "resultType"), Some("core"));
        assert_eq!(param(&request, "pageSize"), Some("1000"));
        assert_eq!(param(&request, "format"), Some("json"));
        assert_eq!(param(&request, "cursorMark"), Some("AoE="));
        assert_eq!(param(&request, "sort"), Some("P_PDATE_D desc"));
    }

    #[test]
    fn test_search_request_rejects_empty_query() {
        assert!(matches!(
            search_request(&SearchQuery::new("  ")),
            Err(ClientError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_record_request_paths() {
        let request = record_request(DataSource::Med, "31010933", Some("citations")).unwrap();
        assert_eq!(request.endpoint, "MED/31010933/citations");

        let request = record_request(DataSource::Pmc, " PMC3257301 ", None).unwrap();
        assert_eq!(request.endpoint, "PMC/PMC3257301");

        assert!(record_request(DataSource::Med, "../search", None).is_err());
        assert!(record_request(DataSource::Med, "", None).is_err());
    }

    #[test]
    fn test_details_request_data_type() {
        let request = details_request(DataSource::Med, "123", None).unwrap();
        assert_eq!(request.endpoint, "MED/123");

        let request = details_request(DataSource::Med, "123", Some("core")).unwrap();
        assert_eq!(request.endpoint, "MED/123");

        let request = details_request(DataSource::Med, "123", Some("lite")).unwrap();
        assert_eq!(request.endpoint, "MED/123/lite");
        assert_eq!(param(&request, "format"), Some("json"));

        assert!(details_request(DataSource::Med, "123", Some("a/b")).is_err());
    }

    #[tokio::test]
    async fn test_full_text_rejected_for_non_pmc() {
        let client = EuropePmcClient::new().unwrap();
        for source in DataSource::ALL {
            if source == DataSource::Pmc {
                continue;
            }
            let result = client.get_full_text_xml(source, "123").await;
            assert!(matches!(result, Err(ClientError::UnsupportedOperation(_))));

            let result = client.get_supplementary_files(source, "123").await;
            assert!(matches!(result, Err(ClientError::UnsupportedOperation(_))));
        }
    }

    #[tokio::test]
    async fn test_author_search_validates_before_sending() {
        let client = EuropePmcClient::new().unwrap();

        let result = client
            .search_author_publications(&AuthorSearch::new("   "))
            .await;
        assert!(matches!(result, Err(ClientError::InvalidArgument(_))));

        let result = client
            .search_author_publications(&AuthorSearch::new("Fiona Watt").threshold(101))
            .await;
        assert!(matches!(result, Err(ClientError::InvalidArgument(_))));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = ClientConfig::default().requests_per_second(-1.0);
        assert!(matches!(
            EuropePmcClient::with_config(config),
            Err(ClientError::Config(_))
        ));
    }

    #[test]
    fn test_default_user_agent() {
        assert!(DEFAULT_USER_AGENT.starts_with("europepmc-client/"));
    }
}
