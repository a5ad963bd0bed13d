//! # OData Source HTTP
//!
//! Production fetch collaborator for OData data sources, built on reqwest.
//!
//! ## Example
//!
//! ```no_run
//! use odata_source_http::ODataHttpClient;
//! use serde::Deserialize;
//! use std::time::Duration;
//!
//! #[derive(Debug, Deserialize)]
//! #[serde(rename_all = "PascalCase")]
//! struct Product {
//!     id: u32,
//!     name: String,
//! }
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = ODataHttpClient::builder()
//!     .timeout(Duration::from_secs(10))
//!     .build()?;
//!
//! let page = client
//!     .fetch_page::<Product>("https://services.odata.org/V4/OData/OData.svc/Products?$top=5&$count=true")
//!     .await?;
//! println!("{} of {:?}", page.value.len(), page.count);
//! # Ok(())
//! # }
//! ```

/// reqwest-backed fetch collaborator and its builder
pub mod client;

/// Client construction errors
pub mod error;

// Re-export main types for convenience
pub use client::{ODataHttpClient, ODataHttpClientBuilder};
pub use error::ClientError;
