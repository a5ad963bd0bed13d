//! Fetch collaborator abstraction.
//!
//! The orchestrator never talks to the network directly. It hands a fully
//! serialized request URL to a [`ResourceFetcher`] and maps the result into a
//! [`FetchOutcome`].
//!
//! # Implementations
//!
//! - `ODataHttpClient` (in `odata-source-http`): reqwest-based production client
//! - `MockFetcher` (in `odata-source-testing`): scripted and gated responses

use serde::{Deserialize, Serialize};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use thiserror::Error;

/// Materialized result rows, shared between all observers.
pub type Rows<T> = Arc<[T]>;

/// Failures reported by a fetch collaborator.
///
/// The orchestrator treats every variant the same way: it is a transport
/// failure whose detail is surfaced to observers verbatim.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    /// The request could not be completed.
    #[error("{0}")]
    Transport(String),

    /// The server answered with a non-success status.
    #[error("server returned status {status}: {message}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Response body or reason
        message: String,
    },

    /// The response body could not be decoded.
    #[error("response decoding failed: {0}")]
    Decode(String),
}

impl FetchError {
    /// Transport failure with the given detail.
    #[must_use]
    pub fn transport(detail: impl Into<String>) -> Self {
        Self::Transport(detail.into())
    }
}

/// One page of a list resource as returned by the server.
///
/// Deserializes the OData JSON envelope `{ "value": [...], "@odata.count": n }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourcePage<T> {
    /// Rows of the requested page
    pub value: Vec<T>,

    /// Total number of rows matching the query, when requested
    #[serde(rename = "@odata.count", default, skip_serializing_if = "Option::is_none")]
    pub count: Option<u64>,
}

impl<T> ResourcePage<T> {
    /// Page without a reported count.
    #[must_use]
    pub const fn new(value: Vec<T>) -> Self {
        Self { value, count: None }
    }

    /// Page with a server-reported total count.
    #[must_use]
    pub const fn with_count(value: Vec<T>, count: u64) -> Self {
        Self {
            value,
            count: Some(count),
        }
    }
}

/// Result of a single fetch as seen by the orchestrator.
#[derive(Debug)]
pub enum FetchOutcome<T> {
    /// The fetch returned rows.
    Success {
        /// Rows of the page
        items: Rows<T>,
        /// Server-reported total count
        total_count: Option<u64>,
    },
    /// The fetch failed.
    Failure {
        /// Collaborator-supplied detail
        error: FetchError,
    },
}

impl<T> Clone for FetchOutcome<T> {
    fn clone(&self) -> Self {
        match self {
            Self::Success { items, total_count } => Self::Success {
                items: Arc::clone(items),
                total_count: *total_count,
            },
            Self::Failure { error } => Self::Failure {
                error: error.clone(),
            },
        }
    }
}

impl<T> From<Result<ResourcePage<T>, FetchError>> for FetchOutcome<T> {
    fn from(result: Result<ResourcePage<T>, FetchError>) -> Self {
        match result {
            Ok(page) => Self::Success {
                items: page.value.into(),
                total_count: page.count,
            },
            Err(error) => Self::Failure { error },
        }
    }
}

/// Fetch collaborator: issues a GET for a fully built request URL.
///
/// # Dyn Compatibility
///
/// This trait uses explicit `Pin<Box<dyn Future>>` returns instead of `async fn`
/// so the orchestrator can hold it as `Arc<dyn ResourceFetcher<T>>` and move it
/// into fetch effects.
///
/// # Cancellation
///
/// Implementations are not required to support abort. Superseded requests run
/// to completion and their results are discarded by the orchestrator.
pub trait ResourceFetcher<T>: Send + Sync {
    /// Fetch one page of the resource at `url`.
    ///
    /// # Errors
    ///
    /// Returns a [`FetchError`] when the request fails, the server answers with
    /// an error status, or the body cannot be decoded.
    fn fetch(
        &self,
        url: String,
    ) -> Pin<Box<dyn Future<Output = Result<ResourcePage<T>, FetchError>> + Send + '_>>;
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)] // Test code can unwrap

    use super::*;

    #[test]
    fn page_deserializes_odata_envelope() {
        let json = r#"{"@odata.context":"ctx","@odata.count":42,"value":[1,2,3]}"#;
        let page: ResourcePage<u32> = serde_json::from_str(json).unwrap();
        assert_eq!(page, ResourcePage::with_count(vec![1, 2, 3], 42));
    }

    #[test]
    fn page_without_count() {
        let page: ResourcePage<String> = serde_json::from_str(r#"{"value":["a"]}"#).unwrap();
        assert_eq!(page.count, None);
        assert_eq!(page.value, vec!["a".to_string()]);
    }

    #[test]
    fn transport_error_displays_detail_verbatim() {
        assert_eq!(FetchError::transport("network down").to_string(), "network down");
    }

    #[test]
    fn outcome_from_result() {
        let ok: FetchOutcome<u8> = Ok(ResourcePage::with_count(vec![1], 9)).into();
        match ok {
            FetchOutcome::Success { items, total_count } => {
                assert_eq!(&*items, &[1]);
                assert_eq!(total_count, Some(9));
            }
            FetchOutcome::Failure { .. } => unreachable!("expected success"),
        }

        let failed: FetchOutcome<u8> = Err(FetchError::transport("boom")).into();
        assert!(matches!(
            failed,
            FetchOutcome::Failure { error } if error == FetchError::transport("boom")
        ));
    }
}
