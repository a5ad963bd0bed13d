//! # OData Source Runtime
//!
//! Runtime for OData data sources.
//!
//! This crate turns the pure pieces from `odata-source-core` into a running
//! pipeline: page, sort and filter changes are merged into one trigger
//! stream, every trigger becomes exactly one request, and only the outcome of
//! the most recently started request reaches the observable projections.
//!
//! ## Core Components
//!
//! - **Store**: runs a reducer under a write lock and executes its effects
//! - **Orchestrator**: the reducer that builds requests and drops superseded outcomes
//! - **State Store**: the `data`, `loading`, `last_error` and `filters` projections
//! - **DataSource**: lazy, ref-counted pipeline lifecycle
//!
//! ## Example
//!
//! ```ignore
//! use odata_source_runtime::{DataSource, DataSourceConfig};
//!
//! let source = DataSource::new(
//!     Arc::new(client),
//!     "https://host/odata/Products",
//!     DataSourceConfig::default(),
//! );
//! source.set_paginator(Some(paginator));
//!
//! let mut connection = source.attach();
//! let rows = connection.next_rows().await;
//! ```

/// Capability matrix and query options
pub mod config;

/// The data source, its consumer connections and pipeline lifecycle
pub mod data_source;

/// The request orchestrator reducer
pub mod orchestrator;

/// Observable projections
pub mod projections;

/// The Store runtime
pub mod store;

mod triggers;

pub use config::DataSourceConfig;
pub use data_source::{Connection, DataSource};
pub use projections::StateStore;
pub use store::Store;
