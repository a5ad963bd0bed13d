//! Error types for the OData HTTP client

use thiserror::Error;

/// Errors raised while configuring an [`ODataHttpClient`](crate::ODataHttpClient).
///
/// Request failures are reported as
/// [`FetchError`](odata_source_core::fetch::FetchError) instead.
#[derive(Debug, Error)]
pub enum ClientError {
    /// A header value cannot be sent
    #[error("Invalid header value for {name}: {reason}")]
    InvalidHeader {
        /// Header name
        name: &'static str,
        /// Why the value was rejected
        reason: String,
    },

    /// The underlying HTTP client could not be built
    #[error("HTTP client construction failed: {0}")]
    Build(String),
}
