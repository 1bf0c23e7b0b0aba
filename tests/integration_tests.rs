//! Integration tests for the Europe PMC client
//!
//! These tests run the client against a local mockito server and verify
//! request construction, retry behaviour, body decoding and pagination.

use europepmc_client::models::ContentKind;
use europepmc_client::utils::ApiRequest;
use europepmc_client::{
    AuthorSearch, ClientConfig, ClientError, DataSource, EuropePmcClient, PageOptions,
    SearchFilters, SearchPage, SearchQuery,
};
use futures_util::StreamExt;
use mockito::{Matcher, Server};
use serde_json::json;
use std::time::Duration;
use tokio::time::Instant;
use tokio_test::{assert_err, assert_ok};

/// Client pointed at the mock server, with fast pacing and backoff
fn test_client(base_url: &str) -> EuropePmcClient {
    let config = ClientConfig::default()
        .base_url(base_url)
        .requests_per_second(1000.0)
        .backoff_base(Duration::from_millis(1));
    EuropePmcClient::with_config(config).unwrap()
}

fn search_body() -> String {
    json!({
        "version": "6.9",
        "hitCount": 2,
        "nextCursorMark": "AoIIQ==",
        "request": {"queryString": "malaria", "pageSize": 2},
        "resultList": {
            "result": [
                {
                    "id": "31010933",
                    "source": "MED",
                    "pmid": "31010933",
                    "title": "Malaria vaccines",
                    "authorString": "Watt FM, Smith J.",
                    "journalTitle": "Lancet",
                    "firstPublicationDate": "2019-04-18",
                    "isOpenAccess": "Y"
                },
                {
                    "id": "PMC3257301",
                    "source": "PMC",
                    "pmcid": "PMC3257301",
                    "title": "Parasite biology",
                    "authorList": {"author": [{"fullName": "Doudna JA"}]}
                }
            ]
        }
    })
    .to_string()
}

#[tokio::test]
async fn test_search_parses_json_envelope() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/search")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("query".into(), "malaria".into()),
            Matcher::UrlEncoded("resultType".into(), "lite".into()),
            Matcher::UrlEncoded("pageSize".into(), "2".into()),
            Matcher::UrlEncoded("format".into(), "json".into()),
        ]))
        .with_status(200)
        .with_header("content-type", "application/json;charset=UTF-8")
        .with_body(search_body())
        .expect(1)
        .create_async()
        .await;

    let client = test_client(&server.url());
    let page = client
        .search_page(&SearchQuery::new("malaria").page_size(2))
        .await
        .unwrap();

    mock.assert_async().await;
    assert_eq!(page.hit_count, 2);
    assert_eq!(page.next_cursor_mark.as_deref(), Some("AoIIQ=="));
    assert_eq!(page.publications.len(), 2);
    assert_eq!(page.publications[0].title, "Malaria vaccines");
    assert_eq!(page.publications[0].author_names(), vec!["Watt FM", "Smith J"]);
    assert!(page.publications[0].is_open_access);
    assert_eq!(page.publications[1].author_names(), vec!["Doudna JA"]);
    assert_eq!(page.request["queryString"], "malaria");
}

#[tokio::test]
async fn test_xml_response_normalized() {
    let mut server = Server::new_async().await;
    let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
<responseWrapper>
    <hitCount>1</hitCount>
    <nextCursorMark>AoE=</nextCursorMark>
    <resultList>
        <result>
            <id>1</id>
            <source>MED</source>
            <title>Only result</title>
            <authorList><author><fullName>Watt FM</fullName></author></authorList>
        </result>
    </resultList>
</responseWrapper>"#;
    let _mock = server
        .mock("GET", "/search")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_header("content-type", "application/xml")
        .with_body(xml)
        .create_async()
        .await;

    let client = test_client(&server.url());
    let response = client.search(&SearchQuery::new("x")).await.unwrap();
    assert_eq!(response.kind(), ContentKind::Xml);
    assert_eq!(response.body()["responseWrapper"]["hitCount"], "1");

    let page = SearchPage::from_response(&response).unwrap();
    assert_eq!(page.hit_count, 1);
    assert_eq!(page.publications.len(), 1);
    assert_eq!(page.publications[0].author_names(), vec!["Watt FM"]);
}

#[tokio::test]
async fn test_text_response_wrapped() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("GET", "/MED/123")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_header("content-type", "text/html")
        .with_body("<html>maintenance</html>")
        .create_async()
        .await;

    let client = test_client(&server.url());
    let response = client
        .get_publication_details(DataSource::Med, "123", None)
        .await
        .unwrap();

    assert_eq!(response.kind(), ContentKind::Text);
    assert_eq!(
        response.body(),
        &json!({"content": "<html>maintenance</html>", "content_type": "text/html"})
    );
}

#[tokio::test]
async fn test_not_found_is_not_retried() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/MED/999/citations")
        .match_query(Matcher::Any)
        .with_status(404)
        .with_body("no such record")
        .expect(1)
        .create_async()
        .await;

    let client = test_client(&server.url());
    let result = client
        .get_citations(DataSource::Med, "999", &PageOptions::default())
        .await;

    mock.assert_async().await;
    match result {
        Err(ClientError::HttpStatus { status, body }) => {
            assert_eq!(status, 404);
            assert_eq!(body, "no such record");
        }
        other => panic!("unexpected result: {:?}", other),
    }
}

#[tokio::test]
async fn test_server_errors_exhaust_retries() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/search")
        .match_query(Matcher::Any)
        .with_status(503)
        .with_body("unavailable")
        .expect(3)
        .create_async()
        .await;

    let client = test_client(&server.url());
    let result = client.search(&SearchQuery::new("malaria")).await;

    mock.assert_async().await;
    let err = assert_err!(result);
    assert!(matches!(
        err,
        ClientError::ServerErrorExhausted {
            status: 503,
            attempts: 3,
            ..
        }
    ));
    assert_eq!(err.status(), Some(503));
}

#[tokio::test]
async fn test_rate_limited_then_success() {
    let mut server = Server::new_async().await;
    let limited = server
        .mock("GET", "/search")
        .match_query(Matcher::Any)
        .with_status(429)
        .with_body("slow down")
        .expect(1)
        .create_async()
        .await;
    let ok = server
        .mock("GET", "/search")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(search_body())
        .expect(1)
        .create_async()
        .await;

    let client = test_client(&server.url());
    let page = assert_ok!(client.search_page(&SearchQuery::new("malaria")).await);

    limited.assert_async().await;
    ok.assert_async().await;
    assert_eq!(page.publications.len(), 2);
}

#[tokio::test]
async fn test_connection_refused_reports_attempts() {
    // Nothing listens on port 1
    let client = test_client("http://127.0.0.1:1");
    let result = client.search(&SearchQuery::new("malaria")).await;

    match result {
        Err(ClientError::Network { attempts, .. }) => assert_eq!(attempts, 3),
        other => panic!("unexpected result: {:?}", other),
    }
}

#[tokio::test]
async fn test_invalid_json_is_not_retried() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/search")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body("{truncated")
        .expect(1)
        .create_async()
        .await;

    let client = test_client(&server.url());
    let result = client.search(&SearchQuery::new("malaria")).await;

    mock.assert_async().await;
    assert!(matches!(result, Err(ClientError::Parse(_))));
}

#[tokio::test]
async fn test_full_text_for_non_pmc_sends_nothing() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", Matcher::Any)
        .expect(0)
        .create_async()
        .await;

    let client = test_client(&server.url());
    let result = client.get_full_text_xml(DataSource::Med, "31010933").await;

    assert!(matches!(result, Err(ClientError::UnsupportedOperation(_))));
    mock.assert_async().await;
}

#[tokio::test]
async fn test_full_text_for_pmc() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/PMC3257301/fullTextXML")
        .with_status(200)
        .with_header("content-type", "application/xml")
        .with_body(r#"<article article-type="research-article"><front><article-meta><title-group><article-title>Title</article-title></title-group></article-meta></front></article>"#)
        .expect(1)
        .create_async()
        .await;

    let client = test_client(&server.url());
    let response = client
        .get_full_text_xml(DataSource::Pmc, "PMC3257301")
        .await
        .unwrap();

    mock.assert_async().await;
    let article = &response.body()["article"];
    assert_eq!(article["@article-type"], "research-article");
    assert_eq!(
        article["front"]["article-meta"]["title-group"]["article-title"],
        "Title"
    );
}

#[tokio::test]
async fn test_invalid_identifier_sends_nothing() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", Matcher::Any)
        .expect(0)
        .create_async()
        .await;

    let client = test_client(&server.url());
    let result = client.get_database_links(DataSource::Med, "../search").await;

    assert!(matches!(result, Err(ClientError::InvalidArgument(_))));
    mock.assert_async().await;
}

#[tokio::test]
async fn test_references_clamp_page_size() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/MED/31010933/references")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("pageSize".into(), "1000".into()),
            Matcher::UrlEncoded("cursorMark".into(), "AoE=".into()),
            Matcher::UrlEncoded("format".into(), "json".into()),
        ]))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"hitCount": 0, "referenceList": {"reference": []}}"#)
        .expect(1)
        .create_async()
        .await;

    let client = test_client(&server.url());
    let page = PageOptions::new(5000).cursor_mark("AoE=");
    let response = client
        .get_references(DataSource::Med, "31010933", &page)
        .await
        .unwrap();

    mock.assert_async().await;
    assert_eq!(response.get("hitCount"), Some(&json!(0)));
}

#[tokio::test]
async fn test_advanced_search_builds_query() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/search")
        .match_query(Matcher::UrlEncoded(
            "query".into(),
            r#"CRISPR AND FIRST_PDATE:[2020-01-01 TO *] AND OPEN_ACCESS:Y"#.into(),
        ))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(search_body())
        .expect(1)
        .create_async()
        .await;

    let client = test_client(&server.url());
    let filters = SearchFilters::new()
        .published_from("2020-01-01")
        .open_access_only(true);
    let result = client
        .advanced_search(&SearchQuery::new("CRISPR"), &filters)
        .await
        .unwrap();

    mock.assert_async().await;
    assert_eq!(result.original_query, "CRISPR");
    assert_eq!(
        result.final_query,
        "CRISPR AND FIRST_PDATE:[2020-01-01 TO *] AND OPEN_ACCESS:Y"
    );
    assert_eq!(result.page.publications.len(), 2);
}

#[tokio::test]
async fn test_author_search_disambiguates() {
    let mut server = Server::new_async().await;
    let body = json!({
        "hitCount": 4,
        "resultList": {"result": [
            {"id": "1", "source": "MED", "title": "Unrelated", "authorString": "Smith J, Jones K."},
            {"id": "2", "source": "MED", "title": "Cas9", "authorString": "Doudna JA, Charpentier E."},
            {"id": "3", "source": "MED", "title": "CRISPR review", "authorString": "Jennifer Doudna."},
            {"id": "4", "source": "MED", "title": "Editing", "authorString": "J. A. Doudna, Smith J."}
        ]}
    });
    let mock = server
        .mock("GET", "/search")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("query".into(), r#"AUTH:"Jennifer A. Doudna""#.into()),
            Matcher::UrlEncoded("resultType".into(), "lite".into()),
            Matcher::UrlEncoded("pageSize".into(), "4".into()),
        ]))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(body.to_string())
        .expect(1)
        .create_async()
        .await;

    let client = test_client(&server.url());
    let search = AuthorSearch::new("Jennifer A. Doudna")
        .page_size(2)
        .threshold(70);
    let result = client.search_author_publications(&search).await.unwrap();

    mock.assert_async().await;
    assert_eq!(result.total_found, 4);
    assert_eq!(result.after_disambiguation, 2);
    assert_eq!(result.disambiguation_threshold, 70);

    let ids: Vec<&str> = result
        .publications
        .iter()
        .map(|p| p.publication.id.as_deref().unwrap_or_default())
        .collect();
    assert_eq!(ids, vec!["3", "4"]);
    assert_eq!(result.publications[0].best_match_score, 100);
    assert_eq!(result.publications[1].best_match_score, 99);
}

#[tokio::test]
async fn test_search_stream_follows_cursor() {
    let mut server = Server::new_async().await;

    let page = |cursor: &str, next: &str, ids: &[&str]| {
        let results: Vec<_> = ids
            .iter()
            .map(|id| json!({"id": id, "source": "MED", "title": format!("Paper {}", id)}))
            .collect();
        (
            cursor.to_string(),
            json!({
                "hitCount": 3,
                "nextCursorMark": next,
                "resultList": {"result": results}
            })
            .to_string(),
        )
    };

    let mut mocks = Vec::new();
    for (cursor, body) in [
        page("*", "AAA", &["1", "2"]),
        page("AAA", "BBB", &["3"]),
        page("BBB", "BBB", &[]),
    ] {
        let mock = server
            .mock("GET", "/search")
            .match_query(Matcher::UrlEncoded("cursorMark".into(), cursor))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(body)
            .expect(1)
            .create_async()
            .await;
        mocks.push(mock);
    }

    let client = test_client(&server.url());
    let records: Vec<_> = client
        .search_stream(SearchQuery::new("malaria").page_size(2))
        .collect()
        .await;

    for mock in &mocks {
        mock.assert_async().await;
    }
    let ids: Vec<String> = records
        .into_iter()
        .map(|record| record.unwrap().id.unwrap_or_default())
        .collect();
    assert_eq!(ids, vec!["1", "2", "3"]);
}

#[tokio::test]
async fn test_deadline_cancels_backoff() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("GET", "/search")
        .match_query(Matcher::Any)
        .with_status(503)
        .create_async()
        .await;

    let config = ClientConfig::default()
        .base_url(server.url())
        .backoff_base(Duration::from_secs(10));
    let client = EuropePmcClient::with_config(config).unwrap();

    let start = Instant::now();
    let request = ApiRequest::get("search").param("query", "malaria");
    let result = client
        .executor()
        .execute_until(&request, start + Duration::from_millis(200))
        .await;

    assert!(matches!(result, Err(ClientError::DeadlineExceeded)));
    assert!(start.elapsed() < Duration::from_secs(5));
}

#[tokio::test]
async fn test_post_request_sends_json_body() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/searchPOST")
        .match_body(Matcher::Json(json!({"query": "malaria", "pageSize": 10})))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(search_body())
        .expect(1)
        .create_async()
        .await;

    let client = test_client(&server.url());
    let request = ApiRequest::post("searchPOST", json!({"query": "malaria", "pageSize": 10}));
    let response = client.executor().execute(&request).await.unwrap();

    mock.assert_async().await;
    assert_eq!(response.kind(), ContentKind::Json);
}

#[tokio::test]
async fn test_concurrent_calls_share_one_client() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/search")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(search_body())
        .expect(5)
        .create_async()
        .await;

    let client = test_client(&server.url());
    let tasks: Vec<_> = (0..5)
        .map(|i| {
            let client = client.clone();
            tokio::spawn(async move {
                client
                    .search_page(&SearchQuery::new(format!("query {}", i)))
                    .await
            })
        })
        .collect();

    for task in tasks {
        let page = task.await.unwrap().unwrap();
        assert_eq!(page.publications.len(), 2);
    }
    mock.assert_async().await;
}
