//! Environment-driven demo settings

use thiserror::Error;

/// Public OData V4 sample service.
pub const DEFAULT_RESOURCE_URL: &str = "https://services.odata.org/V4/OData/OData.svc/Products";

/// Invalid demo setting.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("{key} must be a positive integer, got {value:?}")]
pub struct DemoConfigError {
    /// Environment variable name
    pub key: &'static str,
    /// Rejected value
    pub value: String,
}

/// Settings of the products demo.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DemoConfig {
    /// Entity set to page through
    pub resource_url: String,
    /// Rows per page
    pub page_size: u32,
    /// `$orderby` tokens used while no sort is active
    pub initial_sort: Vec<String>,
    /// Number of pages to print
    pub pages: u32,
}

impl DemoConfig {
    /// Read `ODATA_RESOURCE_URL`, `ODATA_PAGE_SIZE`, `ODATA_INITIAL_SORT` and
    /// `ODATA_PAGES` from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`DemoConfigError`] when a numeric setting is not a positive
    /// integer.
    pub fn from_env() -> Result<Self, DemoConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`DemoConfig::from_env`] with a custom variable source.
    ///
    /// # Errors
    ///
    /// Returns [`DemoConfigError`] when a numeric setting is not a positive
    /// integer.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, DemoConfigError> {
        let positive = |key: &'static str, default: u32| -> Result<u32, DemoConfigError> {
            let Some(value) = lookup(key) else {
                return Ok(default);
            };
            let parsed = value.trim().parse::<u32>();
            match parsed {
                Ok(parsed) if parsed > 0 => Ok(parsed),
                _ => Err(DemoConfigError { key, value }),
            }
        };

        let initial_sort = lookup("ODATA_INITIAL_SORT")
            .unwrap_or_else(|| "Rating desc,Name".to_string())
            .split(',')
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .map(str::to_string)
            .collect();

        Ok(Self {
            resource_url: lookup("ODATA_RESOURCE_URL")
                .unwrap_or_else(|| DEFAULT_RESOURCE_URL.to_string()),
            page_size: positive("ODATA_PAGE_SIZE", 4)?,
            initial_sort,
            pages: positive("ODATA_PAGES", 3)?,
        })
    }
}
