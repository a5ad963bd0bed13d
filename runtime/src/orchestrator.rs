//! Request orchestration.
//!
//! The orchestrator is a [`Reducer`]: every trigger and every fetch completion
//! is one action, reduced under the Store's write lock. Supersession is a
//! generation counter. Each fetch carries the generation it was started
//! under, and a completion whose generation is no longer current is dropped.
//!
//! ```text
//!            Triggered                      FetchCompleted (current)
//!   Idle ─────────────────▶ Fetching ─────────────────────────────▶ Idle
//!                            │    ▲
//!                            └────┘ Triggered (supersedes)
//! ```

use crate::config::DataSourceConfig;
use crate::projections::StateStore;
use odata_source_core::effect::Effect;
use odata_source_core::fetch::{FetchOutcome, ResourceFetcher};
use odata_source_core::pagination::PaginationSource;
use odata_source_core::query::{QueryInput, QueryParams};
use odata_source_core::reducer::Reducer;
use odata_source_core::sort::SortBinding;
use odata_source_core::{smallvec, SmallVec};
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

/// Collaborators a pipeline instance reads from.
#[derive(Clone, Default)]
pub struct Bindings {
    /// Pagination collaborator, if any
    pub paginator: Option<Arc<dyn PaginationSource>>,
    /// Sort collaborator
    pub sort: SortBinding,
}

impl fmt::Debug for Bindings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bindings")
            .field("paginator", &self.paginator.as_ref().map(|p| p.snapshot()))
            .field("sort", &self.sort)
            .finish()
    }
}

/// Fetch phase.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    /// No fetch outstanding
    Idle,
    /// Waiting for the fetch started under `generation`
    Fetching {
        /// Generation of the outstanding fetch
        generation: u64,
    },
}

#[derive(Debug)]
struct ActivePipeline {
    id: u64,
    bindings: Bindings,
}

/// Orchestrator state.
#[derive(Debug)]
pub struct OrchestratorState<T> {
    projections: StateStore<T>,
    generation: u64,
    phase: Phase,
    latest_pipeline: u64,
    active: Option<ActivePipeline>,
}

impl<T> OrchestratorState<T> {
    /// Idle state publishing to `projections`.
    #[must_use]
    pub const fn new(projections: StateStore<T>) -> Self {
        Self {
            projections,
            generation: 0,
            phase: Phase::Idle,
            latest_pipeline: 0,
            active: None,
        }
    }

    /// Current generation. Only a completion carrying it is applied.
    #[must_use]
    pub const fn generation(&self) -> u64 {
        self.generation
    }

    /// Current fetch phase.
    #[must_use]
    pub const fn phase(&self) -> Phase {
        self.phase
    }

    /// Id of the running pipeline instance.
    #[must_use]
    pub fn active_pipeline(&self) -> Option<u64> {
        self.active.as_ref().map(|p| p.id)
    }

    /// Projections this state publishes to.
    #[must_use]
    pub const fn projections(&self) -> &StateStore<T> {
        &self.projections
    }

    fn is_active(&self, pipeline: u64) -> bool {
        self.active_pipeline() == Some(pipeline)
    }
}

/// Orchestrator actions.
pub enum DataSourceAction<T> {
    /// A pipeline instance started with these collaborators.
    Attached {
        /// Pipeline instance id
        pipeline: u64,
        /// Collaborators bound for the lifetime of the instance
        bindings: Bindings,
    },
    /// The aggregated trigger stream emitted.
    Triggered {
        /// Pipeline instance that observed the trigger
        pipeline: u64,
    },
    /// A fetch finished.
    FetchCompleted {
        /// Generation the fetch was started under
        generation: u64,
        /// What the fetch collaborator returned
        outcome: FetchOutcome<T>,
    },
    /// A pipeline instance was torn down.
    Detached {
        /// Pipeline instance id
        pipeline: u64,
    },
}

impl<T> fmt::Debug for DataSourceAction<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Attached { pipeline, bindings } => f
                .debug_struct("Attached")
                .field("pipeline", pipeline)
                .field("bindings", bindings)
                .finish(),
            Self::Triggered { pipeline } => {
                f.debug_struct("Triggered").field("pipeline", pipeline).finish()
            },
            Self::FetchCompleted {
                generation,
                outcome,
            } => {
                let outcome = match outcome {
                    FetchOutcome::Success { items, .. } => format!("Success({} rows)", items.len()),
                    FetchOutcome::Failure { error } => format!("Failure({error})"),
                };
                f.debug_struct("FetchCompleted")
                    .field("generation", generation)
                    .field("outcome", &outcome)
                    .finish()
            },
            Self::Detached { pipeline } => {
                f.debug_struct("Detached").field("pipeline", pipeline).finish()
            },
        }
    }
}

/// Injected dependencies of the orchestrator.
pub struct OrchestratorEnvironment<T> {
    fetcher: Arc<dyn ResourceFetcher<T>>,
    resource_path: String,
    config: DataSourceConfig,
}

impl<T> OrchestratorEnvironment<T> {
    /// Environment fetching from `resource_path` through `fetcher`.
    #[must_use]
    pub fn new(
        fetcher: Arc<dyn ResourceFetcher<T>>,
        resource_path: impl Into<String>,
        config: DataSourceConfig,
    ) -> Self {
        Self {
            fetcher,
            resource_path: resource_path.into(),
            config,
        }
    }

    /// Base path the query string is appended to.
    #[must_use]
    pub fn resource_path(&self) -> &str {
        &self.resource_path
    }

    /// Capability matrix and query options.
    #[must_use]
    pub const fn config(&self) -> &DataSourceConfig {
        &self.config
    }
}

/// The orchestrator reducer.
pub struct OrchestratorReducer<T> {
    _rows: PhantomData<fn() -> T>,
}

impl<T> OrchestratorReducer<T> {
    /// Create the reducer.
    #[must_use]
    pub const fn new() -> Self {
        Self { _rows: PhantomData }
    }
}

impl<T> Default for OrchestratorReducer<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Reducer for OrchestratorReducer<T>
where
    T: Send + Sync + 'static,
{
    type State = OrchestratorState<T>;
    type Action = DataSourceAction<T>;
    type Environment = OrchestratorEnvironment<T>;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        match action {
            DataSourceAction::Attached { pipeline, bindings } => {
                if pipeline <= state.latest_pipeline {
                    tracing::debug!(pipeline, "Ignoring attach of a replaced pipeline");
                    return smallvec![Effect::None];
                }

                state.latest_pipeline = pipeline;
                state.generation += 1;
                state.phase = Phase::Idle;
                state.active = Some(ActivePipeline { id: pipeline, bindings });

                tracing::debug!(pipeline, "Pipeline started");
                metrics::counter!("data_source.pipeline.started").increment(1);
                smallvec![Effect::None]
            },

            DataSourceAction::Triggered { pipeline } => {
                let Some(active) = state.active.as_ref().filter(|p| p.id == pipeline) else {
                    tracing::trace!(pipeline, "Ignoring trigger from inactive pipeline");
                    return smallvec![Effect::None];
                };

                if let Phase::Fetching { generation } = state.phase {
                    tracing::debug!(generation, "Superseding outstanding fetch");
                    metrics::counter!("data_source.fetch.superseded").increment(1);
                }

                let config = &env.config;
                let page = active.bindings.paginator.as_ref().map(|p| p.snapshot());
                let sort = active.bindings.sort.snapshot();
                let filters = state.projections.filters();
                let params = QueryParams::build(&QueryInput {
                    page,
                    sort: &sort,
                    initial_sort: config.initial_sort.as_deref(),
                    filters: filters.as_ref(),
                    select: config.select.as_deref(),
                    expand: config.expand.as_ref(),
                });
                let url = params.to_url(&env.resource_path);

                state.generation += 1;
                let generation = state.generation;
                state.phase = Phase::Fetching { generation };

                if config.with_loading_state {
                    state.projections.set_loading(true);
                }
                state.projections.set_last_error(None);

                tracing::debug!(generation, %url, "Fetch started");
                metrics::counter!("data_source.fetch.started").increment(1);

                let fetcher = Arc::clone(&env.fetcher);
                smallvec![Effect::future(async move {
                    let result = fetcher.fetch(url).await;
                    Some(DataSourceAction::FetchCompleted {
                        generation,
                        outcome: result.into(),
                    })
                })]
            },

            DataSourceAction::FetchCompleted {
                generation,
                outcome,
            } => {
                if state.phase != (Phase::Fetching { generation }) {
                    tracing::debug!(
                        generation,
                        current = state.generation,
                        "Discarding superseded fetch outcome"
                    );
                    return smallvec![Effect::None];
                }
                state.phase = Phase::Idle;

                match outcome {
                    FetchOutcome::Success { items, total_count } => {
                        tracing::debug!(
                            generation,
                            rows = items.len(),
                            total_count,
                            "Fetch succeeded"
                        );
                        metrics::counter!("data_source.fetch.succeeded").increment(1);

                        let paginator = state
                            .active
                            .as_ref()
                            .and_then(|p| p.bindings.paginator.as_ref());
                        if let (Some(paginator), Some(total)) = (paginator, total_count) {
                            paginator.set_total_count(total);
                        }
                        state.projections.publish_data(items);
                    },
                    FetchOutcome::Failure { error } => {
                        tracing::warn!(generation, error = %error, "Fetch failed");
                        metrics::counter!("data_source.fetch.failed").increment(1);

                        if env.config.with_error_state {
                            state.projections.set_last_error(Some(error));
                        }
                        state.projections.publish_data(Vec::new().into());
                    },
                }

                state.projections.set_loading(false);
                smallvec![Effect::None]
            },

            DataSourceAction::Detached { pipeline } => {
                if !state.is_active(pipeline) {
                    tracing::trace!(pipeline, "Ignoring detach of inactive pipeline");
                    return smallvec![Effect::None];
                }

                if let Phase::Fetching { generation } = state.phase {
                    tracing::debug!(generation, "Abandoning outstanding fetch");
                    state.projections.set_loading(false);
                }
                state.active = None;
                state.phase = Phase::Idle;
                state.generation += 1;

                tracing::debug!(pipeline, "Pipeline torn down");
                smallvec![Effect::None]
            },
        }
    }
}
