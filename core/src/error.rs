//! Configuration errors.
//!
//! These are caller-contract violations. They are reported at assignment
//! time and never surface through the result stream.

use crate::sort::SortMode;
use thiserror::Error;

/// Errors raised when a data source is wired up inconsistently.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A sort collaborator of the wrong shape was assigned.
    ///
    /// For example a multi-column sort assigned to a data source configured
    /// for single-column sorting.
    #[error("sort collaborator shape {actual:?} does not match configured sort mode {expected:?}")]
    SortModeMismatch {
        /// Sort mode the data source was configured with
        expected: SortMode,
        /// Shape of the assigned collaborator
        actual: SortMode,
    },

    /// Page size must be at least one.
    #[error("page size must be greater than zero")]
    InvalidPageSize,
}
