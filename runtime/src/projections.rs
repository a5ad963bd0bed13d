//! The State Store.
//!
//! Four independently observable projections: `data`, `loading`, `last_error`
//! and `filters`. Each is a `tokio::sync::watch` channel, so every observer
//! sees the latest value on subscription and every later publication.
//!
//! Only the orchestrator writes `data`, `loading` and `last_error`. `filters`
//! is the one projection callers write, and writing it is what triggers a
//! re-fetch.

use odata_source_core::changes::{watch_with_current, ChangeStream};
use odata_source_core::fetch::{FetchError, Rows};
use odata_source_core::filter::FilterSet;
use std::fmt;
use std::sync::Arc;
use tokio::sync::watch;

struct Projections<T> {
    data: watch::Sender<Option<Rows<T>>>,
    loading: watch::Sender<bool>,
    last_error: watch::Sender<Option<FetchError>>,
    filters: watch::Sender<Option<FilterSet>>,
}

/// Shared handle to the observable projections.
///
/// Cloning is cheap; all clones publish to the same observers.
pub struct StateStore<T> {
    inner: Arc<Projections<T>>,
}

impl<T> StateStore<T> {
    /// Fresh projections: no data, not loading, no error, no filters.
    #[must_use]
    pub fn new() -> Self {
        let (data, _) = watch::channel(None);
        let (loading, _) = watch::channel(false);
        let (last_error, _) = watch::channel(None);
        let (filters, _) = watch::channel(None);

        Self {
            inner: Arc::new(Projections {
                data,
                loading,
                last_error,
                filters,
            }),
        }
    }

    /// Rows of the latest successful fetch, `None` before the first result.
    #[must_use]
    pub fn data(&self) -> Option<Rows<T>> {
        self.inner.data.borrow().clone()
    }

    /// Observe `data`.
    #[must_use]
    pub fn subscribe_data(&self) -> watch::Receiver<Option<Rows<T>>> {
        self.inner.data.subscribe()
    }

    /// Whether a fetch is outstanding.
    #[must_use]
    pub fn is_loading(&self) -> bool {
        *self.inner.loading.borrow()
    }

    /// Observe `loading`.
    #[must_use]
    pub fn loading(&self) -> watch::Receiver<bool> {
        self.inner.loading.subscribe()
    }

    /// Failure of the latest fetch, if it failed.
    #[must_use]
    pub fn last_error(&self) -> Option<FetchError> {
        self.inner.last_error.borrow().clone()
    }

    /// Observe `last_error`.
    #[must_use]
    pub fn errors(&self) -> watch::Receiver<Option<FetchError>> {
        self.inner.last_error.subscribe()
    }

    /// Current filter set.
    #[must_use]
    pub fn filters(&self) -> Option<FilterSet> {
        self.inner.filters.borrow().clone()
    }

    /// Observe `filters`.
    #[must_use]
    pub fn filtering(&self) -> watch::Receiver<Option<FilterSet>> {
        self.inner.filters.subscribe()
    }

    /// Replace the filter set.
    ///
    /// Always notifies, even when `filters` is equal to the current set.
    pub fn set_filters(&self, filters: Option<FilterSet>) {
        self.inner.filters.send_replace(filters);
    }

    /// Re-publish the current filter set as is.
    pub fn refresh(&self) {
        self.inner.filters.send_modify(|_| {});
    }

    /// Trigger stream for the filters projection.
    ///
    /// Emits once for the current value, then on every replacement.
    /// Replacements published before the stream is polled again collapse into
    /// one emission that reads the newest set.
    pub(crate) fn filter_changes(&self) -> ChangeStream {
        watch_with_current(self.inner.filters.subscribe())
    }

    pub(crate) fn publish_data(&self, rows: Rows<T>) {
        self.inner.data.send_replace(Some(rows));
    }

    pub(crate) fn set_loading(&self, loading: bool) {
        self.inner.loading.send_if_modified(|current| {
            let changed = *current != loading;
            *current = loading;
            changed
        });
    }

    pub(crate) fn set_last_error(&self, error: Option<FetchError>) {
        self.inner.last_error.send_if_modified(|current| {
            let changed = *current != error;
            *current = error;
            changed
        });
    }
}

impl<T> Default for StateStore<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for StateStore<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> fmt::Debug for StateStore<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateStore")
            .field("rows", &self.inner.data.borrow().as_ref().map(|rows| rows.len()))
            .field("loading", &self.is_loading())
            .field("last_error", &self.last_error())
            .field("filters", &self.filters())
            .finish()
    }
}
