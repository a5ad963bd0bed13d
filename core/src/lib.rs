//! # OData Source Core
//!
//! Core traits and types for presenting a remote, paginated, sortable and
//! filterable list resource as a single stream of results.
//!
//! This crate provides the pure building blocks of the orchestration layer:
//!
//! - **Reducer / Effect**: the state machine abstraction executed by the
//!   `odata-source-runtime` Store
//! - **Query parameters**: [`query::QueryParams`] and the deterministic builder
//!   that turns pagination, sort and filter snapshots into a request
//! - **Wire format**: OData query-string serialization ([`odata`])
//! - **Collaborators**: traits for the pagination, sort, filter and fetch
//!   collaborators, plus watch-backed reference implementations
//!
//! ## Example
//!
//! ```
//! use odata_source_core::filter::{FilterSet, Predicate};
//! use odata_source_core::pagination::PaginationState;
//! use odata_source_core::query::{QueryInput, QueryParams};
//! use odata_source_core::sort::{SortDirection, SortKey, SortSpec};
//!
//! let page = PaginationState::new(2, 10);
//! let sort = SortSpec::Multi(vec![SortKey::new("Rating", SortDirection::Descending)]);
//! let filters = FilterSet::new(vec![Predicate::contains("Name", "foo")]);
//!
//! let params = QueryParams::build(&QueryInput {
//!     page: Some(page),
//!     sort: &sort,
//!     filters: Some(&filters),
//!     ..QueryInput::default()
//! });
//!
//! assert_eq!(params.top, Some(10));
//! assert_eq!(params.skip, Some(20));
//! assert_eq!(
//!     params.to_query_string(),
//!     "?%24filter=%28contains%28Name%2C%27foo%27%29%29&%24orderby=Rating+desc&%24top=10&%24skip=20&%24count=true"
//! );
//! ```

// Re-export commonly used types
pub use serde::{Deserialize, Serialize};
pub use smallvec::{smallvec, SmallVec};

/// Change notification streams shared by the collaborator traits
pub mod changes;

/// Error types for caller-contract violations
pub mod error;

/// Fetch collaborator trait and response types
pub mod fetch;

/// Filter predicates and filter sets
pub mod filter;

/// OData query-string serialization
pub mod odata;

/// Pagination collaborator trait and reference paginator
pub mod pagination;

/// Query parameters and the parameter builder
pub mod query;

/// Sort keys, sort collaborators and sort bindings
pub mod sort;

/// Reducer module - The core trait for orchestration logic
///
/// Reducers are pure functions: `(State, Action, Environment) → (State, Effects)`
///
/// They contain all state-machine logic and are deterministic and testable.
pub mod reducer {
    use super::effect::Effect;
    use smallvec::SmallVec;

    /// The Reducer trait - core abstraction for state transitions
    ///
    /// # Type Parameters
    ///
    /// - `State`: The state this reducer operates on
    /// - `Action`: The action type this reducer processes
    /// - `Environment`: The injected dependencies this reducer needs
    ///
    /// # Example
    ///
    /// ```ignore
    /// impl Reducer for OrchestratorReducer<Row> {
    ///     type State = OrchestratorState<Row>;
    ///     type Action = DataSourceAction<Row>;
    ///     type Environment = OrchestratorEnvironment<Row>;
    ///
    ///     fn reduce(
    ///         &self,
    ///         state: &mut Self::State,
    ///         action: Self::Action,
    ///         env: &Self::Environment,
    ///     ) -> SmallVec<[Effect<Self::Action>; 4]> {
    ///         match action {
    ///             DataSourceAction::Triggered { .. } => smallvec![/* fetch effect */],
    ///             _ => smallvec![Effect::None],
    ///         }
    ///     }
    /// }
    /// ```
    pub trait Reducer {
        /// The state type this reducer operates on
        type State;

        /// The action type this reducer processes
        type Action;

        /// The environment type with injected dependencies
        type Environment;

        /// Reduce an action into state changes and effects
        ///
        /// This function:
        /// 1. Updates state in place
        /// 2. Returns effect descriptions to be executed by the runtime
        fn reduce(
            &self,
            state: &mut Self::State,
            action: Self::Action,
            env: &Self::Environment,
        ) -> SmallVec<[Effect<Self::Action>; 4]>;
    }
}

/// Effect module - Side effect descriptions
///
/// Effects describe side effects to be performed by the runtime.
/// They are values, not execution.
pub mod effect {
    use std::future::Future;
    use std::pin::Pin;

    /// Effect type - describes a side effect to be executed
    ///
    /// Effects are NOT executed immediately. They are descriptions of what
    /// should happen, returned from reducers and executed by the Store runtime.
    pub enum Effect<Action> {
        /// No-op effect
        None,

        /// Arbitrary async computation
        ///
        /// Returns `Option<Action>` - if Some, the action is fed back into the reducer
        Future(Pin<Box<dyn Future<Output = Option<Action>> + Send>>),
    }

    // Manual Debug implementation since Future doesn't implement Debug
    impl<Action> std::fmt::Debug for Effect<Action> {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            match self {
                Effect::None => write!(f, "Effect::None"),
                Effect::Future(_) => write!(f, "Effect::Future(<future>)"),
            }
        }
    }

    impl<Action> Effect<Action> {
        /// Wrap an async block producing an optional feedback action
        #[must_use]
        pub fn future<F>(fut: F) -> Self
        where
            F: Future<Output = Option<Action>> + Send + 'static,
        {
            Effect::Future(Box::pin(fut))
        }

        /// Whether this effect does nothing
        #[must_use]
        pub const fn is_none(&self) -> bool {
            matches!(self, Effect::None)
        }
    }
}
