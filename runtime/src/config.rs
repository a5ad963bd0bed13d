//! Data source configuration.
//!
//! One configuration type covers every variant of the data source: the
//! capability flags switch the loading and error projections on or off and
//! pick the sort shape, the remaining fields are passed to the query builder.

use odata_source_core::query::Expand;
use odata_source_core::sort::SortMode;

/// Capability matrix and query options of a [`DataSource`](crate::DataSource)
///
/// # Example
///
/// ```
/// use odata_source_core::sort::SortMode;
/// use odata_source_runtime::DataSourceConfig;
///
/// let config = DataSourceConfig::default()
///     .with_sort_mode(SortMode::Multi)
///     .with_initial_sort(["Rating desc", "Name"])
///     .with_select(["ID", "Name", "Rating"]);
///
/// assert!(config.with_loading_state);
/// assert_eq!(config.initial_sort.as_deref().map(<[String]>::len), Some(2));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct DataSourceConfig {
    /// Publish `loading` transitions
    pub with_loading_state: bool,
    /// Publish fetch failures on the error projection
    pub with_error_state: bool,
    /// Accepted sort collaborator shape
    pub sort_mode: SortMode,
    /// `$select` fields
    pub select: Option<Vec<String>>,
    /// Ordering used when the sort yields no usable column
    pub initial_sort: Option<Vec<String>>,
    /// `$expand` option
    pub expand: Option<Expand>,
}

impl DataSourceConfig {
    /// Enable or disable the loading projection
    #[must_use]
    pub const fn with_loading_state(mut self, enabled: bool) -> Self {
        self.with_loading_state = enabled;
        self
    }

    /// Enable or disable the error projection
    #[must_use]
    pub const fn with_error_state(mut self, enabled: bool) -> Self {
        self.with_error_state = enabled;
        self
    }

    /// Set the accepted sort shape
    #[must_use]
    pub const fn with_sort_mode(mut self, mode: SortMode) -> Self {
        self.sort_mode = mode;
        self
    }

    /// Set the selected properties
    #[must_use]
    pub fn with_select<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.select = Some(fields.into_iter().map(Into::into).collect());
        self
    }

    /// Set the fallback ordering, as `$orderby` tokens
    #[must_use]
    pub fn with_initial_sort<I, S>(mut self, tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.initial_sort = Some(tokens.into_iter().map(Into::into).collect());
        self
    }

    /// Set the expanded navigation properties
    #[must_use]
    pub fn with_expand(mut self, expand: Expand) -> Self {
        self.expand = Some(expand);
        self
    }
}

impl Default for DataSourceConfig {
    fn default() -> Self {
        Self {
            with_loading_state: true,
            with_error_state: true,
            sort_mode: SortMode::Single,
            select: None,
            initial_sort: None,
            expand: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_track_everything() {
        let config = DataSourceConfig::default();
        assert!(config.with_loading_state);
        assert!(config.with_error_state);
        assert_eq!(config.sort_mode, SortMode::Single);
        assert!(config.select.is_none());
        assert!(config.expand.is_none());
    }

    #[test]
    fn builders_compose() {
        let config = DataSourceConfig::default()
            .with_loading_state(false)
            .with_error_state(false)
            .with_sort_mode(SortMode::None)
            .with_expand(Expand::fields(["Category"]));

        assert!(!config.with_loading_state);
        assert!(!config.with_error_state);
        assert_eq!(config.sort_mode, SortMode::None);
        assert_eq!(config.expand, Some(Expand::fields(["Category"])));
    }
}
