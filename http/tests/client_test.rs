//! Integration tests for the OData HTTP client against a mock server

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)] // Test code can use unwrap/expect/panic

use odata_source_core::fetch::{FetchError, ResourceFetcher};
use odata_source_core::filter::{FilterSet, Predicate};
use odata_source_core::pagination::{PaginationSource, Paginator};
use odata_source_core::sort::{SingleSort, SortBinding, SortDirection};
use odata_source_http::ODataHttpClient;
use odata_source_runtime::{DataSource, DataSourceConfig};
use odata_source_testing::helpers::wait_for;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Product {
    #[serde(rename = "ID")]
    id: u32,
    name: String,
    rating: u8,
}

fn products_body(count: u64) -> serde_json::Value {
    json!({
        "@odata.context": "$metadata#Products",
        "@odata.count": count,
        "value": [
            { "ID": 1, "Name": "Milk", "Rating": 3 },
            { "ID": 2, "Name": "Vint soda", "Rating": 3 }
        ]
    })
}

#[tokio::test]
async fn decodes_odata_envelope() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/Products"))
        .and(header("accept", "application/json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(products_body(11)))
        .mount(&server)
        .await;

    let client = ODataHttpClient::new();
    let page = client
        .fetch_page::<Product>(&format!("{}/Products", server.uri()))
        .await
        .unwrap();

    assert_eq!(page.count, Some(11));
    assert_eq!(page.value.len(), 2);
    assert_eq!(page.value[1].name, "Vint soda");
}

#[tokio::test]
async fn error_status_carries_body() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(400)
                .set_body_string("The query specified in the URI is not valid."),
        )
        .mount(&server)
        .await;

    let error = ODataHttpClient::new()
        .fetch_page::<Product>(&format!("{}/Products", server.uri()))
        .await
        .unwrap_err();

    assert_eq!(
        error,
        FetchError::Status {
            status: 400,
            message: "The query specified in the URI is not valid.".to_string(),
        }
    );
}

#[tokio::test]
async fn malformed_body_is_a_decode_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "rows": [] })))
        .mount(&server)
        .await;

    let error = ODataHttpClient::new()
        .fetch_page::<Product>(&format!("{}/Products", server.uri()))
        .await
        .unwrap_err();

    assert!(matches!(error, FetchError::Decode(_)), "got {error:?}");
}

#[tokio::test]
async fn timeout_is_a_transport_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(products_body(2))
                .set_delay(Duration::from_millis(500)),
        )
        .mount(&server)
        .await;

    let client = ODataHttpClient::builder()
        .timeout(Duration::from_millis(50))
        .build()
        .unwrap();
    let error = client
        .fetch_page::<Product>(&format!("{}/Products", server.uri()))
        .await
        .unwrap_err();

    assert!(matches!(error, FetchError::Transport(_)), "got {error:?}");
}

#[tokio::test]
async fn bearer_token_is_sent() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(header("authorization", "Bearer secret"))
        .respond_with(ResponseTemplate::new(200).set_body_json(products_body(2)))
        .expect(1)
        .mount(&server)
        .await;

    let client = ODataHttpClient::builder().bearer_token("secret").build().unwrap();
    let fetcher: &dyn ResourceFetcher<Product> = &client;
    let page = fetcher.fetch(format!("{}/Products", server.uri())).await.unwrap();

    assert_eq!(page.value.len(), 2);
}

#[tokio::test]
async fn data_source_pages_through_server() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/Products"))
        .and(query_param("$top", "2"))
        .and(query_param("$skip", "0"))
        .and(query_param("$count", "true"))
        .and(query_param("$orderby", "Name asc"))
        .and(query_param("$filter", "(Rating eq 3)"))
        .respond_with(ResponseTemplate::new(200).set_body_json(products_body(9)))
        .expect(1)
        .mount(&server)
        .await;

    let paginator = Arc::new(Paginator::new(2).unwrap());
    let sort = Arc::new(SingleSort::new());
    sort.sort_by("Name", SortDirection::Ascending);

    let source: DataSource<Product> = DataSource::new(
        Arc::new(ODataHttpClient::new()),
        format!("{}/Products", server.uri()),
        DataSourceConfig::default(),
    );
    source.set_paginator(Some(paginator.clone()));
    source.set_sort(SortBinding::Single(sort)).unwrap();
    source.set_filters(Some(FilterSet::new(vec![Predicate::eq("Rating", 3)])));

    let mut connection = source.attach();
    let rows = connection.next_rows().await.unwrap();

    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].id, 1);
    assert_eq!(rows[0].rating, 3);
    assert_eq!(paginator.total_count(), 9);
    assert_eq!(paginator.page_count(), 5);
    wait_for(&mut source.loading(), |loading| !loading).await;
    assert!(source.errors().borrow().is_none());
}

#[tokio::test]
async fn server_failure_surfaces_on_errors() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503).set_body_string("unavailable"))
        .mount(&server)
        .await;

    let source: DataSource<Product> = DataSource::new(
        Arc::new(ODataHttpClient::new()),
        format!("{}/Products", server.uri()),
        DataSourceConfig::default(),
    );

    let mut connection = source.attach();
    let rows = connection.next_rows().await.unwrap();
    assert!(rows.is_empty());

    let error = wait_for(&mut source.errors(), Option::is_some).await.unwrap();
    assert_eq!(error.to_string(), "server returned status 503: unavailable");
}
