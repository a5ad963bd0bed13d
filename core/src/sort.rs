//! Sorting.
//!
//! A grid exposes one of two sort capabilities: a single active column with an
//! optional direction, or an ordered list of columns. The capability is bound
//! once, as a [`SortBinding`], when the pipeline starts; each fetch then takes
//! a [`SortSpec`] snapshot of the bound collaborator.

use crate::changes::{watch_changes, ChangeStream};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tokio::sync::watch;

/// Sort direction of one column.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SortDirection {
    /// `asc`
    #[serde(rename = "asc")]
    Ascending,
    /// `desc`
    #[serde(rename = "desc")]
    Descending,
}

impl SortDirection {
    /// Wire token for this direction.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ascending => "asc",
            Self::Descending => "desc",
        }
    }
}

impl fmt::Display for SortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One sorted column.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SortKey {
    /// Property name
    pub field: String,
    /// Direction
    pub direction: SortDirection,
}

impl SortKey {
    /// Create a sort key.
    #[must_use]
    pub fn new(field: impl Into<String>, direction: SortDirection) -> Self {
        Self {
            field: field.into(),
            direction,
        }
    }

    /// `field asc` / `field desc`
    #[must_use]
    pub fn token(&self) -> String {
        format!("{} {}", self.field, self.direction)
    }
}

/// Which sort capability a data source is configured for.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortMode {
    /// No sort collaborator is accepted.
    None,
    /// One active column.
    #[default]
    Single,
    /// Ordered list of columns.
    Multi,
}

/// Snapshot of the active sort at fetch-initiation time.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum SortSpec {
    /// No sort collaborator bound.
    #[default]
    None,
    /// Single-column sort; either part may be cleared.
    Single {
        /// Active column
        active: Option<String>,
        /// Direction, `None` when sorting is switched off
        direction: Option<SortDirection>,
    },
    /// Multi-column sort in precedence order.
    Multi(Vec<SortKey>),
}

impl SortSpec {
    /// Usable sort keys, in precedence order.
    ///
    /// A single-column sort without an active column or without a direction
    /// yields nothing.
    #[must_use]
    pub fn keys(&self) -> Vec<SortKey> {
        match self {
            Self::None => Vec::new(),
            Self::Single {
                active: Some(field),
                direction: Some(direction),
            } if !field.is_empty() => vec![SortKey::new(field.clone(), *direction)],
            Self::Single { .. } => Vec::new(),
            Self::Multi(keys) => keys.iter().filter(|k| !k.field.is_empty()).cloned().collect(),
        }
    }
}

/// Single-column sort collaborator.
pub trait SingleSortSource: Send + Sync {
    /// Active column, if any.
    fn active(&self) -> Option<String>;

    /// Current direction, `None` when sorting is switched off.
    fn direction(&self) -> Option<SortDirection>;

    /// Notifications for every sort change.
    fn changes(&self) -> ChangeStream;
}

/// Multi-column sort collaborator.
pub trait MultiSortSource: Send + Sync {
    /// Sorted columns in precedence order.
    fn sorted_by(&self) -> Vec<SortKey>;

    /// Notifications for every sort change.
    fn changes(&self) -> ChangeStream;
}

/// The sort collaborator bound to a pipeline.
#[derive(Clone, Default)]
pub enum SortBinding {
    /// No sort collaborator.
    #[default]
    None,
    /// Single-column collaborator.
    Single(Arc<dyn SingleSortSource>),
    /// Multi-column collaborator.
    Multi(Arc<dyn MultiSortSource>),
}

impl SortBinding {
    /// Shape of this binding.
    #[must_use]
    pub const fn mode(&self) -> SortMode {
        match self {
            Self::None => SortMode::None,
            Self::Single(_) => SortMode::Single,
            Self::Multi(_) => SortMode::Multi,
        }
    }

    /// Read the collaborator's current sort.
    #[must_use]
    pub fn snapshot(&self) -> SortSpec {
        match self {
            Self::None => SortSpec::None,
            Self::Single(sort) => SortSpec::Single {
                active: sort.active(),
                direction: sort.direction(),
            },
            Self::Multi(sort) => SortSpec::Multi(sort.sorted_by()),
        }
    }

    /// Change notifications of the bound collaborator, if any.
    #[must_use]
    pub fn changes(&self) -> Option<ChangeStream> {
        match self {
            Self::None => None,
            Self::Single(sort) => Some(sort.changes()),
            Self::Multi(sort) => Some(sort.changes()),
        }
    }
}

impl fmt::Debug for SortBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SortBinding::{:?}", self.mode())
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
struct SingleSortState {
    active: Option<String>,
    direction: Option<SortDirection>,
}

/// Reference single-column sort collaborator.
///
/// Every call to [`SingleSort::sort_by`] or [`SingleSort::clear`] emits a sort
/// change, like a header click in a grid.
#[derive(Debug)]
pub struct SingleSort {
    state: watch::Sender<SingleSortState>,
}

impl SingleSort {
    /// Unsorted collaborator.
    #[must_use]
    pub fn new() -> Self {
        let (state, _) = watch::channel(SingleSortState::default());
        Self { state }
    }

    /// Sort by `field` in `direction` and notify.
    pub fn sort_by(&self, field: impl Into<String>, direction: SortDirection) {
        let field = field.into();
        self.state.send_modify(|s| {
            s.active = Some(field);
            s.direction = Some(direction);
        });
    }

    /// Keep the active column but switch sorting off, and notify.
    pub fn clear(&self) {
        self.state.send_modify(|s| s.direction = None);
    }
}

impl Default for SingleSort {
    fn default() -> Self {
        Self::new()
    }
}

impl SingleSortSource for SingleSort {
    fn active(&self) -> Option<String> {
        self.state.borrow().active.clone()
    }

    fn direction(&self) -> Option<SortDirection> {
        self.state.borrow().direction
    }

    fn changes(&self) -> ChangeStream {
        watch_changes(self.state.subscribe())
    }
}

/// Reference multi-column sort collaborator.
#[derive(Debug)]
pub struct MultiSort {
    keys: watch::Sender<Vec<SortKey>>,
}

impl MultiSort {
    /// Unsorted collaborator.
    #[must_use]
    pub fn new() -> Self {
        let (keys, _) = watch::channel(Vec::new());
        Self { keys }
    }

    /// Replace the sorted columns and notify.
    pub fn set(&self, keys: Vec<SortKey>) {
        self.keys.send_replace(keys);
    }
}

impl Default for MultiSort {
    fn default() -> Self {
        Self::new()
    }
}

impl MultiSortSource for MultiSort {
    fn sorted_by(&self) -> Vec<SortKey> {
        self.keys.borrow().clone()
    }

    fn changes(&self) -> ChangeStream {
        watch_changes(self.keys.subscribe())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    #[test]
    fn single_without_direction_has_no_keys() {
        let spec = SortSpec::Single {
            active: Some("Name".into()),
            direction: None,
        };
        assert!(spec.keys().is_empty());

        let spec = SortSpec::Single {
            active: None,
            direction: Some(SortDirection::Ascending),
        };
        assert!(spec.keys().is_empty());
    }

    #[test]
    fn token_uses_direction_word() {
        assert_eq!(SortKey::new("Rating", SortDirection::Descending).token(), "Rating desc");
        assert_eq!(SortKey::new("Name", SortDirection::Ascending).token(), "Name asc");
    }

    #[test]
    fn binding_snapshot_reads_current_state() {
        let sort = Arc::new(SingleSort::new());
        let binding = SortBinding::Single(sort.clone());
        assert_eq!(binding.snapshot().keys(), vec![]);

        sort.sort_by("Price", SortDirection::Ascending);
        assert_eq!(
            binding.snapshot().keys(),
            vec![SortKey::new("Price", SortDirection::Ascending)]
        );

        sort.clear();
        assert_eq!(binding.snapshot().keys(), vec![]);
        assert_eq!(binding.mode(), SortMode::Single);
    }

    #[test]
    fn multi_keeps_precedence() {
        let sort = Arc::new(MultiSort::new());
        sort.set(vec![
            SortKey::new("Rating", SortDirection::Descending),
            SortKey::new("Name", SortDirection::Ascending),
        ]);
        let keys = SortBinding::Multi(sort).snapshot().keys();
        assert_eq!(keys[0].field, "Rating");
        assert_eq!(keys[1].field, "Name");
    }

    #[test]
    fn no_binding_has_no_changes() {
        assert!(SortBinding::None.changes().is_none());
        assert_eq!(SortBinding::None.snapshot(), SortSpec::None);
    }

    #[tokio::test]
    async fn sort_changes_notify() {
        let sort = SingleSort::new();
        let mut changes = sort.changes();
        sort.sort_by("Name", SortDirection::Ascending);
        assert_eq!(changes.next().await, Some(()));
    }
}
