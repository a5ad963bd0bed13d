//! Integration tests for the DataSource pipeline
//!
//! Drives a DataSource through the MockFetcher and observes it only through
//! its public projections.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)] // Test code can use unwrap/expect/panic

use odata_source_core::fetch::{FetchError, ResourcePage};
use odata_source_core::filter::{FilterSet, Predicate};
use odata_source_core::pagination::{PaginationSource, Paginator};
use odata_source_core::sort::{MultiSort, SingleSort, SortBinding, SortDirection, SortKey, SortMode};
use odata_source_runtime::{DataSource, DataSourceConfig};
use odata_source_testing::helpers::{init_tracing, wait_for};
use odata_source_testing::MockFetcher;
use std::sync::Arc;
use std::time::Duration;

type Row = u32;

fn gated_source(config: DataSourceConfig) -> (Arc<MockFetcher<Row>>, DataSource<Row>) {
    init_tracing();
    let fetcher = Arc::new(MockFetcher::gated());
    let source = DataSource::new(fetcher.clone(), "/Products", config);
    (fetcher, source)
}

fn echo_source(config: DataSourceConfig) -> (Arc<MockFetcher<Row>>, DataSource<Row>) {
    init_tracing();
    let fetcher = Arc::new(MockFetcher::new(|_url| Ok(ResourcePage::with_count(vec![1, 2, 3], 3))));
    let source = DataSource::new(fetcher.clone(), "/Products", config);
    (fetcher, source)
}

async fn wait_for_rows(source: &DataSource<Row>, expected: &[Row]) {
    wait_for(&mut source.projections().subscribe_data(), |rows| {
        rows.as_deref() == Some(expected)
    })
    .await;
}

async fn settle() {
    tokio::time::sleep(Duration::from_millis(50)).await;
}

// ============================================================================
// Supersession
// ============================================================================

#[tokio::test]
async fn only_latest_fetch_is_reflected_when_newest_finishes_first() {
    let paginator = Arc::new(Paginator::new(10).unwrap());
    let (fetcher, source) = gated_source(DataSourceConfig::default());
    source.set_paginator(Some(paginator.clone()));

    let _connection = source.attach();
    fetcher.wait_for_requests(1).await;
    paginator.set_page_index(1);
    let requests = fetcher.wait_for_requests(2).await;
    assert!(requests[1].contains("%24skip=10"));

    assert!(fetcher.respond(1, Ok(ResourcePage::with_count(vec![20], 40))));
    wait_for_rows(&source, &[20]).await;
    wait_for(&mut source.loading(), |loading| !loading).await;

    // The older fetch completes late and is dropped.
    assert!(fetcher.respond(0, Ok(ResourcePage::with_count(vec![10], 99))));
    settle().await;

    assert_eq!(source.data().as_deref(), Some(&[20][..]));
    assert_eq!(paginator.total_count(), 40);
    assert!(!*source.loading().borrow());
}

#[tokio::test]
async fn stale_completion_does_not_end_loading() {
    let paginator = Arc::new(Paginator::new(10).unwrap());
    let (fetcher, source) = gated_source(DataSourceConfig::default());
    source.set_paginator(Some(paginator.clone()));

    let _connection = source.attach();
    fetcher.wait_for_requests(1).await;
    paginator.set_page_index(3);
    fetcher.wait_for_requests(2).await;

    assert!(fetcher.respond(0, Err(FetchError::transport("too late"))));
    settle().await;
    assert!(source.data().is_none());
    assert!(source.errors().borrow().is_none());
    assert!(*source.loading().borrow());

    assert!(fetcher.respond(1, Ok(ResourcePage::new(vec![30]))));
    wait_for_rows(&source, &[30]).await;
    wait_for(&mut source.loading(), |loading| !loading).await;
}

// ============================================================================
// Triggers
// ============================================================================

#[tokio::test]
async fn replacing_filters_fetches_exactly_once() {
    let (fetcher, source) = echo_source(DataSourceConfig::default());
    let _connection = source.attach();
    fetcher.wait_for_requests(1).await;
    wait_for(&mut source.loading(), |loading| !loading).await;

    source.set_filters(Some(FilterSet::new(vec![Predicate::contains("Name", "foo")])));
    let requests = fetcher.wait_for_requests(2).await;
    settle().await;

    assert_eq!(fetcher.request_count(), 2);
    assert_eq!(
        requests[1],
        "/Products?%24filter=%28contains%28Name%2C%27foo%27%29%29"
    );
}

#[tokio::test]
async fn back_to_back_changes_fetch_once_with_newest_filters() {
    let (fetcher, source) = echo_source(DataSourceConfig::default());
    let _connection = source.attach();
    fetcher.wait_for_requests(1).await;
    wait_for(&mut source.loading(), |loading| !loading).await;

    // No await in between: the pipeline sees one change.
    source.set_filters(Some(FilterSet::new(vec![Predicate::eq("Rating", 1)])));
    source.set_filters(Some(FilterSet::new(vec![Predicate::eq("Rating", 2)])));
    source.refresh();

    let requests = fetcher.wait_for_requests(2).await;
    settle().await;

    assert_eq!(fetcher.request_count(), 2);
    assert_eq!(requests[1], "/Products?%24filter=%28Rating+eq+2%29");
}

#[tokio::test]
async fn refresh_refetches_with_same_filters() {
    let filters = FilterSet::new(vec![Predicate::eq("Rating", 4)]);
    let (fetcher, source) = echo_source(DataSourceConfig::default());
    source.set_filters(Some(filters.clone()));

    let _connection = source.attach();
    fetcher.wait_for_requests(1).await;
    source.refresh();
    let requests = fetcher.wait_for_requests(2).await;

    assert_eq!(requests[0], requests[1]);
    assert!(source.filters().unwrap().ptr_eq(&filters));
}

#[tokio::test]
async fn empty_filter_set_sends_no_filter() {
    let (fetcher, source) = echo_source(DataSourceConfig::default());
    source.set_filters(Some(FilterSet::empty()));

    let _connection = source.attach();
    let requests = fetcher.wait_for_requests(1).await;
    assert_eq!(requests[0], "/Products");
}

#[tokio::test]
async fn grid_scenario_builds_expected_request() {
    let paginator = Arc::new(Paginator::new(10).unwrap());
    paginator.set_page_index(2);
    let sort = Arc::new(MultiSort::new());
    sort.set(vec![SortKey::new("Rating", SortDirection::Descending)]);

    let config = DataSourceConfig::default().with_sort_mode(SortMode::Multi);
    let (fetcher, source) = echo_source(config);
    source.set_paginator(Some(paginator));
    source.set_sort(SortBinding::Multi(sort)).unwrap();
    source.set_filters(Some(FilterSet::new(vec![Predicate::contains("Name", "foo")])));

    let _connection = source.attach();
    let requests = fetcher.wait_for_requests(1).await;
    assert_eq!(
        requests[0],
        "/Products?%24filter=%28contains%28Name%2C%27foo%27%29%29&%24orderby=Rating+desc\
         &%24top=10&%24skip=20&%24count=true"
    );
}

#[tokio::test]
async fn sort_change_refetches_and_cleared_sort_uses_initial_sort() {
    let sort = Arc::new(SingleSort::new());
    let config = DataSourceConfig::default().with_initial_sort(["Rating desc", "Name"]);
    let (fetcher, source) = echo_source(config);
    source.set_sort(SortBinding::Single(sort.clone())).unwrap();

    let _connection = source.attach();
    let requests = fetcher.wait_for_requests(1).await;
    assert_eq!(requests[0], "/Products?%24orderby=Rating+desc%2CName");

    sort.sort_by("Price", SortDirection::Ascending);
    let requests = fetcher.wait_for_requests(2).await;
    assert_eq!(requests[1], "/Products?%24orderby=Price+asc");

    sort.clear();
    let requests = fetcher.wait_for_requests(3).await;
    assert_eq!(requests[2], "/Products?%24orderby=Rating+desc%2CName");
}

#[tokio::test]
async fn first_page_sets_paging_options_and_total() {
    let paginator = Arc::new(Paginator::new(25).unwrap());
    let (fetcher, source) = echo_source(DataSourceConfig::default());
    source.set_paginator(Some(paginator.clone()));

    let _connection = source.attach();
    let requests = fetcher.wait_for_requests(1).await;
    assert_eq!(requests[0], "/Products?%24top=25&%24skip=0&%24count=true");

    wait_for_rows(&source, &[1, 2, 3]).await;
    assert_eq!(paginator.total_count(), 3);

    // Writing the total is not a page change.
    settle().await;
    assert_eq!(fetcher.request_count(), 1);
}

#[tokio::test]
async fn page_size_change_keeps_index() {
    let paginator = Arc::new(Paginator::new(10).unwrap());
    paginator.set_page_index(3);
    let (fetcher, source) = echo_source(DataSourceConfig::default());
    source.set_paginator(Some(paginator.clone()));

    let _connection = source.attach();
    fetcher.wait_for_requests(1).await;
    paginator.set_page_size(50).unwrap();
    let requests = fetcher.wait_for_requests(2).await;

    assert_eq!(requests[1], "/Products?%24top=50&%24skip=150&%24count=true");
}

#[tokio::test]
async fn select_and_expand_are_sent() {
    let config = DataSourceConfig::default()
        .with_select(["ID", "Name"])
        .with_expand(odata_source_core::query::Expand::fields(["Category"]));
    let (fetcher, source) = echo_source(config);

    let _connection = source.attach();
    let requests = fetcher.wait_for_requests(1).await;
    assert_eq!(requests[0], "/Products?%24select=ID%2CName&%24expand=Category");
}

// ============================================================================
// Failures
// ============================================================================

#[tokio::test]
async fn failure_then_refresh_clears_error_when_fetch_starts() {
    let (fetcher, source) = gated_source(DataSourceConfig::default());
    let _connection = source.attach();
    fetcher.wait_for_requests(1).await;

    assert!(fetcher.respond(0, Err(FetchError::transport("network down"))));
    let error = wait_for(&mut source.errors(), Option::is_some).await;
    assert_eq!(error.unwrap().to_string(), "network down");
    wait_for_rows(&source, &[]).await;
    wait_for(&mut source.loading(), |loading| !loading).await;

    source.refresh();
    fetcher.wait_for_requests(2).await;
    assert!(source.errors().borrow().is_none());
    assert!(*source.loading().borrow());

    assert!(fetcher.respond(1, Ok(ResourcePage::new(vec![5]))));
    wait_for_rows(&source, &[5]).await;
    assert!(source.errors().borrow().is_none());
}

#[tokio::test]
async fn failure_keeps_pipeline_running() {
    let paginator = Arc::new(Paginator::new(10).unwrap());
    let (fetcher, source) = gated_source(DataSourceConfig::default());
    source.set_paginator(Some(paginator.clone()));
    let _connection = source.attach();

    fetcher.wait_for_requests(1).await;
    assert!(fetcher.respond(0, Err(FetchError::transport("boom"))));
    wait_for(&mut source.errors(), Option::is_some).await;

    paginator.set_page_index(1);
    fetcher.wait_for_requests(2).await;
    assert!(fetcher.respond(1, Ok(ResourcePage::new(vec![11]))));
    wait_for_rows(&source, &[11]).await;
}

#[tokio::test]
async fn capability_flags_suppress_projections() {
    let config = DataSourceConfig::default()
        .with_loading_state(false)
        .with_error_state(false);
    let (fetcher, source) = gated_source(config);
    let _connection = source.attach();

    fetcher.wait_for_requests(1).await;
    assert!(!*source.loading().borrow());

    assert!(fetcher.respond(0, Err(FetchError::transport("network down"))));
    wait_for_rows(&source, &[]).await;
    assert!(source.errors().borrow().is_none());
    assert!(!*source.loading().borrow());
}

// ============================================================================
// Lifecycle
// ============================================================================

#[tokio::test]
async fn nothing_is_fetched_before_attach() {
    let (fetcher, source) = echo_source(DataSourceConfig::default());
    source.set_filters(Some(FilterSet::new(vec![Predicate::eq("Name", "Bread")])));
    source.refresh();
    settle().await;

    assert_eq!(fetcher.request_count(), 0);
    assert!(source.data().is_none());
}

#[tokio::test]
async fn two_consumers_share_one_pipeline() {
    let paginator = Arc::new(Paginator::new(10).unwrap());
    let (fetcher, source) = echo_source(DataSourceConfig::default());
    source.set_paginator(Some(paginator.clone()));

    let first = source.attach();
    let second = source.attach();
    fetcher.wait_for_requests(1).await;
    settle().await;
    assert_eq!(fetcher.request_count(), 1);

    // One consumer left: still running.
    drop(first);
    assert!(source.is_attached());
    paginator.set_page_index(1);
    fetcher.wait_for_requests(2).await;

    // Last consumer gone: torn down, page changes are ignored.
    second.detach();
    assert!(!source.is_attached());
    settle().await;
    paginator.set_page_index(2);
    settle().await;
    assert_eq!(fetcher.request_count(), 2);

    // Re-attaching starts a fresh pipeline with an initial fetch.
    let _third = source.attach();
    let requests = fetcher.wait_for_requests(3).await;
    assert!(requests[2].contains("%24skip=20"));
}

#[tokio::test]
async fn teardown_abandons_outstanding_fetch() {
    let (fetcher, source) = gated_source(DataSourceConfig::default());
    let connection = source.attach();
    fetcher.wait_for_requests(1).await;
    wait_for(&mut source.loading(), |loading| *loading).await;

    connection.detach();
    wait_for(&mut source.loading(), |loading| !loading).await;

    assert!(fetcher.respond(0, Ok(ResourcePage::new(vec![1]))));
    settle().await;
    assert!(source.data().is_none());
}

#[tokio::test]
async fn reattach_ignores_previous_instance_outcome() {
    let (fetcher, source) = gated_source(DataSourceConfig::default());
    let connection = source.attach();
    fetcher.wait_for_requests(1).await;
    connection.detach();

    let _connection = source.attach();
    fetcher.wait_for_requests(2).await;

    assert!(fetcher.respond(0, Ok(ResourcePage::new(vec![1]))));
    settle().await;
    assert!(source.data().is_none());

    assert!(fetcher.respond(1, Ok(ResourcePage::new(vec![2]))));
    wait_for_rows(&source, &[2]).await;
}

#[tokio::test]
async fn collaborators_apply_at_next_pipeline_start() {
    let paginator = Arc::new(Paginator::new(5).unwrap());
    let (fetcher, source) = echo_source(DataSourceConfig::default());

    let connection = source.attach();
    let requests = fetcher.wait_for_requests(1).await;
    assert_eq!(requests[0], "/Products");

    source.set_paginator(Some(paginator));
    source.refresh();
    let requests = fetcher.wait_for_requests(2).await;
    assert_eq!(requests[1], "/Products");

    connection.detach();
    let _connection = source.attach();
    let requests = fetcher.wait_for_requests(3).await;
    assert_eq!(requests[2], "/Products?%24top=5&%24skip=0&%24count=true");
}

#[tokio::test]
async fn connection_stream_replays_and_follows() {
    let (fetcher, source) = gated_source(DataSourceConfig::default());
    let connection = source.attach();
    fetcher.wait_for_requests(1).await;
    assert!(fetcher.respond(0, Ok(ResourcePage::new(vec![1]))));
    wait_for_rows(&source, &[1]).await;

    let mut rows = Box::pin(connection.into_stream());
    assert_eq!(&*futures::StreamExt::next(&mut rows).await.unwrap(), &[1]);

    source.refresh();
    fetcher.wait_for_requests(2).await;
    assert!(fetcher.respond(1, Ok(ResourcePage::new(vec![2]))));
    assert_eq!(&*futures::StreamExt::next(&mut rows).await.unwrap(), &[2]);

    drop(rows);
    assert!(!source.is_attached());
}
