//! Pagination.
//!
//! The page index and page size belong to the UI collaborator. The orchestrator
//! only reads them when a fetch starts and writes back the total count the
//! server reported.

use crate::changes::{watch_changes, ChangeStream};
use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;

/// Snapshot of a paginator.
///
/// `page_index` is interpreted against the current `page_size`; changing the
/// page size alone does not move the index.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaginationState {
    /// Zero-based page index
    pub page_index: u32,
    /// Rows per page
    pub page_size: u32,
    /// Total rows reported by the server
    pub total_count: u64,
}

impl PaginationState {
    /// First fetch state with no known total.
    #[must_use]
    pub const fn new(page_index: u32, page_size: u32) -> Self {
        Self {
            page_index,
            page_size,
            total_count: 0,
        }
    }

    /// Rows to skip to reach this page.
    #[must_use]
    pub const fn offset(&self) -> u64 {
        self.page_size as u64 * self.page_index as u64
    }
}

/// Pagination collaborator.
pub trait PaginationSource: Send + Sync {
    /// Current zero-based page index.
    fn page_index(&self) -> u32;

    /// Current page size.
    fn page_size(&self) -> u32;

    /// Store the server-reported total. Must not emit a page change.
    fn set_total_count(&self, total: u64);

    /// Total most recently stored.
    fn total_count(&self) -> u64;

    /// Notifications for every page change.
    fn changes(&self) -> ChangeStream;

    /// Snapshot of the current state.
    fn snapshot(&self) -> PaginationState {
        PaginationState {
            page_index: self.page_index(),
            page_size: self.page_size(),
            total_count: self.total_count(),
        }
    }
}

/// Reference paginator backed by a watch channel.
#[derive(Debug)]
pub struct Paginator {
    state: watch::Sender<PaginationState>,
}

impl Paginator {
    /// Paginator positioned on the first page.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidPageSize`] when `page_size` is zero.
    pub fn new(page_size: u32) -> Result<Self, ConfigError> {
        if page_size == 0 {
            return Err(ConfigError::InvalidPageSize);
        }
        let (state, _) = watch::channel(PaginationState::new(0, page_size));
        Ok(Self { state })
    }

    /// Move to `page_index` and notify.
    pub fn set_page_index(&self, page_index: u32) {
        self.state.send_modify(|s| s.page_index = page_index);
    }

    /// Change the page size and notify. The index is kept as is.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidPageSize`] when `page_size` is zero.
    pub fn set_page_size(&self, page_size: u32) -> Result<(), ConfigError> {
        if page_size == 0 {
            return Err(ConfigError::InvalidPageSize);
        }
        self.state.send_modify(|s| s.page_size = page_size);
        Ok(())
    }

    /// Move to `page_index` with `page_size` in one change.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidPageSize`] when `page_size` is zero.
    pub fn set_page(&self, page_index: u32, page_size: u32) -> Result<(), ConfigError> {
        if page_size == 0 {
            return Err(ConfigError::InvalidPageSize);
        }
        self.state.send_modify(|s| {
            s.page_index = page_index;
            s.page_size = page_size;
        });
        Ok(())
    }

    /// Number of pages implied by the stored total.
    #[must_use]
    pub fn page_count(&self) -> u64 {
        let state = *self.state.borrow();
        state.total_count.div_ceil(u64::from(state.page_size))
    }
}

impl PaginationSource for Paginator {
    fn page_index(&self) -> u32 {
        self.state.borrow().page_index
    }

    fn page_size(&self) -> u32 {
        self.state.borrow().page_size
    }

    fn set_total_count(&self, total: u64) {
        // Updated in place without waking receivers: a new total is not a page change.
        self.state.send_if_modified(|s| {
            s.total_count = total;
            false
        });
    }

    fn total_count(&self) -> u64 {
        self.state.borrow().total_count
    }

    fn changes(&self) -> ChangeStream {
        watch_changes(self.state.subscribe())
    }
}
