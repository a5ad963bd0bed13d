//! # OData Source Testing
//!
//! Testing utilities for OData data sources.
//!
//! This crate provides:
//! - [`MockFetcher`]: a scripted or gated fetch collaborator
//! - [`ReducerTest`]: Given-When-Then driver for reducers
//! - Wait helpers for watch-based projections
//! - proptest strategies for collaborator state
//!
//! ## Example
//!
//! ```ignore
//! use odata_source_testing::{helpers, MockFetcher};
//!
//! #[tokio::test]
//! async fn first_page_is_fetched_on_attach() {
//!     let fetcher = Arc::new(MockFetcher::new(|_url| Ok(ResourcePage::with_count(vec![1, 2], 2))));
//!     let source = DataSource::new(fetcher.clone(), "/Products", DataSourceConfig::default());
//!
//!     let connection = source.attach();
//!     fetcher.wait_for_requests(1).await;
//!     helpers::wait_for(&mut source.loading(), |loading| !loading).await;
//! }
//! ```

/// Scripted fetch collaborator
pub mod mock_fetcher;


/// Test helpers and utilities
pub mod helpers {
    use std::time::Duration;
    use tokio::sync::watch;

    /// How long [`wait_for`] waits before failing the test.
    pub const WAIT_TIMEOUT: Duration = Duration::from_secs(5);

    /// Wait until the watched value satisfies `predicate` and return a copy.
    ///
    /// # Panics
    ///
    /// Panics if the value does not satisfy `predicate` within
    /// [`WAIT_TIMEOUT`], or if the sender is dropped first.
    #[allow(clippy::panic)] // Test helper
    pub async fn wait_for<V, F>(rx: &mut watch::Receiver<V>, predicate: F) -> V
    where
        V: Clone + std::fmt::Debug,
        F: FnMut(&V) -> bool,
    {
        let waited = tokio::time::timeout(WAIT_TIMEOUT, rx.wait_for(predicate))
            .await
            .map(|found| found.map(|value| value.clone()));
        match waited {
            Ok(Ok(value)) => value,
            Ok(Err(_)) => panic!("watched value was dropped while waiting"),
            Err(_) => panic!("timed out waiting, last value: {:?}", *rx.borrow()),
        }
    }

    /// Install a test-writer tracing subscriber honoring `RUST_LOG`.
    ///
    /// Safe to call from every test; only the first call installs it.
    pub fn init_tracing() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    }
}

/// Property-based testing utilities
pub mod properties {
    use odata_source_core::pagination::PaginationState;
    use odata_source_core::sort::{SortDirection, SortKey};
    use proptest::prelude::*;

    /// Valid paginator snapshots.
    pub fn pagination_state() -> impl Strategy<Value = PaginationState> {
        (0_u32..1_000, 1_u32..500).prop_map(|(index, size)| PaginationState::new(index, size))
    }

    /// Non-empty multi-column sorts over short property names.
    pub fn sort_keys() -> impl Strategy<Value = Vec<SortKey>> {
        prop::collection::vec(
            ("[A-Z][a-z]{1,8}", any::<bool>()).prop_map(|(field, ascending)| {
                let direction = if ascending {
                    SortDirection::Ascending
                } else {
                    SortDirection::Descending
                };
                SortKey::new(field, direction)
            }),
            1..4,
        )
    }

    /// A permutation of `0..len`, for completion orders of `len` fetches.
    pub fn completion_order(len: usize) -> impl Strategy<Value = Vec<usize>> {
        Just((0..len).collect::<Vec<_>>()).prop_shuffle()
    }
}

// Re-export commonly used items
pub use mock_fetcher::MockFetcher;
pub use reducer_test::{assertions, ReducerTest};
