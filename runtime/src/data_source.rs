//! The data source and its lifecycle.
//!
//! A [`DataSource`] owns the projections and the orchestrator Store. The
//! pipeline (trigger aggregation feeding the orchestrator) runs only while at
//! least one [`Connection`] is alive: the first [`DataSource::attach`] starts
//! it, dropping the last connection tears it down, and a later attach starts
//! a fresh instance.

use crate::config::DataSourceConfig;
use crate::orchestrator::{
    Bindings, DataSourceAction, OrchestratorEnvironment, OrchestratorReducer, OrchestratorState,
};
use crate::projections::StateStore;
use crate::store::Store;
use crate::triggers;
use async_stream::stream;
use futures::stream::{Stream, StreamExt};
use odata_source_core::changes::ChangeStream;
use odata_source_core::error::ConfigError;
use odata_source_core::fetch::{FetchError, ResourceFetcher, Rows};
use odata_source_core::filter::FilterSet;
use odata_source_core::pagination::PaginationSource;
use odata_source_core::sort::{SortBinding, SortMode};
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::{oneshot, watch};

fn lock<V>(mutex: &Mutex<V>) -> MutexGuard<'_, V> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

struct PipelineHandle {
    id: u64,
    shutdown: oneshot::Sender<()>,
}

#[derive(Default)]
struct Lifecycle {
    next_pipeline: u64,
    consumers: usize,
    active: Option<PipelineHandle>,
}

impl Lifecycle {
    /// Drop one consumer; at zero the running pipeline is told to stop.
    fn release(&mut self) {
        self.consumers = self.consumers.saturating_sub(1);
        if self.consumers > 0 {
            return;
        }
        if let Some(handle) = self.active.take() {
            tracing::debug!(pipeline = handle.id, "Last consumer detached, stopping pipeline");
            // Already finished if the receiver is gone.
            let _ = handle.shutdown.send(());
        }
    }
}

/// A remote list resource exposed as observable projections.
///
/// # Example
///
/// ```ignore
/// let source = DataSource::new(Arc::new(client), "https://host/odata/Products", config);
/// source.set_paginator(Some(paginator.clone()));
/// source.set_sort(SortBinding::Single(sort.clone()))?;
///
/// let mut connection = source.attach();
/// while let Some(rows) = connection.next_rows().await {
///     render(&rows);
/// }
/// ```
pub struct DataSource<T: Send + Sync + 'static> {
    store: Store<OrchestratorReducer<T>>,
    projections: StateStore<T>,
    bindings: Arc<Mutex<Bindings>>,
    lifecycle: Arc<Mutex<Lifecycle>>,
    sort_mode: SortMode,
}

impl<T> DataSource<T>
where
    T: Send + Sync + 'static,
{
    /// Data source fetching `resource_path` through `fetcher`.
    ///
    /// No request is made until the first [`attach`](Self::attach).
    #[must_use]
    pub fn new(
        fetcher: Arc<dyn ResourceFetcher<T>>,
        resource_path: impl Into<String>,
        config: DataSourceConfig,
    ) -> Self {
        let projections = StateStore::new();
        let sort_mode = config.sort_mode;
        let environment = OrchestratorEnvironment::new(fetcher, resource_path, config);
        let store = Store::new(
            OrchestratorState::new(projections.clone()),
            OrchestratorReducer::new(),
            environment,
        );

        Self {
            store,
            projections,
            bindings: Arc::new(Mutex::new(Bindings::default())),
            lifecycle: Arc::new(Mutex::new(Lifecycle::default())),
            sort_mode,
        }
    }

    /// Replace the pagination collaborator.
    ///
    /// Takes effect when the next pipeline instance starts.
    pub fn set_paginator(&self, paginator: Option<Arc<dyn PaginationSource>>) {
        lock(&self.bindings).paginator = paginator;
    }

    /// Replace the sort collaborator.
    ///
    /// Takes effect when the next pipeline instance starts.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::SortModeMismatch`] when the collaborator's shape
    /// is not the configured sort mode. Removing the collaborator with
    /// [`SortBinding::None`] is always accepted.
    pub fn set_sort(&self, sort: SortBinding) -> Result<(), ConfigError> {
        let actual = sort.mode();
        if actual != SortMode::None && actual != self.sort_mode {
            return Err(ConfigError::SortModeMismatch {
                expected: self.sort_mode,
                actual,
            });
        }
        lock(&self.bindings).sort = sort;
        Ok(())
    }

    /// Attach a consumer.
    ///
    /// Starts the pipeline if none is running. The pipeline stays up until
    /// every returned [`Connection`] is dropped.
    ///
    /// # Panics
    ///
    /// Starting the pipeline requires a Tokio runtime.
    pub fn attach(&self) -> Connection<T> {
        let mut lifecycle = lock(&self.lifecycle);
        lifecycle.consumers += 1;

        if lifecycle.active.is_none() {
            lifecycle.next_pipeline += 1;
            let id = lifecycle.next_pipeline;
            let bindings = lock(&self.bindings).clone();
            let trigger_stream = triggers::aggregate(self.projections.filter_changes(), &bindings);
            let (shutdown, shutdown_rx) = oneshot::channel();

            tracing::debug!(pipeline = id, ?bindings, "Starting pipeline");
            tokio::spawn(run_pipeline(
                self.store.clone(),
                id,
                bindings,
                trigger_stream,
                shutdown_rx,
            ));
            lifecycle.active = Some(PipelineHandle { id, shutdown });
        }

        Connection {
            rows: self.projections.subscribe_data(),
            lifecycle: Arc::clone(&self.lifecycle),
        }
    }

    /// Number of attached consumers.
    #[must_use]
    pub fn consumer_count(&self) -> usize {
        lock(&self.lifecycle).consumers
    }

    /// Whether a pipeline instance is running.
    #[must_use]
    pub fn is_attached(&self) -> bool {
        lock(&self.lifecycle).active.is_some()
    }

    /// Re-fetch with the current filter set.
    pub fn refresh(&self) {
        self.projections.refresh();
    }

    /// Current filter set.
    #[must_use]
    pub fn filters(&self) -> Option<FilterSet> {
        self.projections.filters()
    }

    /// Replace the filter set, triggering a fetch while attached.
    ///
    /// Changes made back to back, before the pipeline wakes up, are fetched
    /// once with the newest filter set.
    pub fn set_filters(&self, filters: Option<FilterSet>) {
        self.projections.set_filters(filters);
    }

    /// Observe the filter set.
    #[must_use]
    pub fn filtering(&self) -> watch::Receiver<Option<FilterSet>> {
        self.projections.filtering()
    }

    /// Rows of the latest applied fetch.
    #[must_use]
    pub fn data(&self) -> Option<Rows<T>> {
        self.projections.data()
    }

    /// Observe the loading flag.
    #[must_use]
    pub fn loading(&self) -> watch::Receiver<bool> {
        self.projections.loading()
    }

    /// Observe fetch failures. Cleared when the next fetch starts.
    #[must_use]
    pub fn errors(&self) -> watch::Receiver<Option<FetchError>> {
        self.projections.errors()
    }

    /// The underlying projections.
    #[must_use]
    pub const fn projections(&self) -> &StateStore<T> {
        &self.projections
    }
}

impl<T: Send + Sync + 'static> fmt::Debug for DataSource<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let lifecycle = lock(&self.lifecycle);
        f.debug_struct("DataSource")
            .field("sort_mode", &self.sort_mode)
            .field("consumers", &lifecycle.consumers)
            .field("pipeline", &lifecycle.active.as_ref().map(|p| p.id))
            .field("projections", &self.projections)
            .finish_non_exhaustive()
    }
}

async fn run_pipeline<T>(
    store: Store<OrchestratorReducer<T>>,
    pipeline: u64,
    bindings: Bindings,
    mut trigger_stream: ChangeStream,
    mut shutdown: oneshot::Receiver<()>,
) where
    T: Send + Sync + 'static,
{
    store
        .send(DataSourceAction::Attached { pipeline, bindings })
        .await;

    loop {
        tokio::select! {
            biased;
            _ = &mut shutdown => break,
            next = trigger_stream.next() => match next {
                Some(()) => store.send(DataSourceAction::Triggered { pipeline }).await,
                None => break,
            },
        }
    }

    store.send(DataSourceAction::Detached { pipeline }).await;
}

/// An attached consumer of a [`DataSource`].
///
/// Dropping the connection detaches it.
pub struct Connection<T> {
    rows: watch::Receiver<Option<Rows<T>>>,
    lifecycle: Arc<Mutex<Lifecycle>>,
}

impl<T> Connection<T>
where
    T: Send + Sync + 'static,
{
    /// Latest published rows, `None` before the first result.
    #[must_use]
    pub fn current(&self) -> Option<Rows<T>> {
        self.rows.borrow().clone()
    }

    /// Wait for the next published rows.
    ///
    /// Returns `None` once the data source is gone.
    pub async fn next_rows(&mut self) -> Option<Rows<T>> {
        self.rows.changed().await.ok()?;
        self.rows.borrow_and_update().clone()
    }

    /// Latest rows followed by every later publication.
    ///
    /// The stream keeps the connection attached until it is dropped.
    pub fn into_stream(mut self) -> impl Stream<Item = Rows<T>> + Send {
        stream! {
            let latest = self.rows.borrow_and_update().clone();
            if let Some(rows) = latest {
                yield rows;
            }
            while let Some(rows) = self.next_rows().await {
                yield rows;
            }
        }
    }

    /// Detach explicitly.
    pub fn detach(self) {
        drop(self);
    }
}

impl<T> Drop for Connection<T> {
    fn drop(&mut self) {
        lock(&self.lifecycle).release();
    }
}

impl<T> fmt::Debug for Connection<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("rows", &self.rows.borrow().as_ref().map(|rows| rows.len()))
            .finish_non_exhaustive()
    }
}
