//! Query parameters and the parameter builder.
//!
//! [`QueryParams::build`] is the only place that decides what a request looks
//! like. It is pure: the orchestrator takes collaborator snapshots at
//! fetch-initiation time and passes them in through [`QueryInput`].

use crate::filter::{FilterSet, Predicate};
use crate::pagination::PaginationState;
use crate::sort::{SortKey, SortSpec};
use serde::{Deserialize, Serialize};

/// Navigation properties to expand.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Expand {
    /// Plain list of navigation properties.
    Fields(Vec<String>),
    /// Navigation properties with nested query options.
    Nested(Vec<ExpandItem>),
}

impl Expand {
    /// Expand plain navigation properties.
    #[must_use]
    pub fn fields<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Fields(fields.into_iter().map(Into::into).collect())
    }
}

/// One expanded navigation property with its nested options.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ExpandItem {
    /// Navigation property
    pub field: String,
    /// Nested `$select`
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub select: Vec<String>,
    /// Nested `$filter`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<Predicate>,
    /// Nested `$orderby`
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub order_by: Vec<String>,
    /// Nested `$top`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top: Option<u32>,
    /// Nested `$expand`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expand: Option<Box<Expand>>,
}

impl ExpandItem {
    /// Expand `field` without options.
    #[must_use]
    pub fn new(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            ..Self::default()
        }
    }

    /// Restrict the expanded entity's properties.
    #[must_use]
    pub fn with_select<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.select = fields.into_iter().map(Into::into).collect();
        self
    }

    /// Filter the expanded collection.
    #[must_use]
    pub fn with_filter(mut self, filter: Predicate) -> Self {
        self.filter = Some(filter);
        self
    }

    /// Order the expanded collection.
    #[must_use]
    pub fn with_order_by<I, S>(mut self, tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.order_by = tokens.into_iter().map(Into::into).collect();
        self
    }

    /// Limit the expanded collection.
    #[must_use]
    pub const fn with_top(mut self, top: u32) -> Self {
        self.top = Some(top);
        self
    }

    /// Expand further from the expanded entity.
    #[must_use]
    pub fn with_expand(mut self, expand: Expand) -> Self {
        self.expand = Some(Box::new(expand));
        self
    }
}

/// Fully resolved request parameters.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryParams {
    /// Page size (`$top`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top: Option<u32>,
    /// Rows to skip (`$skip`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skip: Option<u64>,
    /// Ask the server for the total count (`$count=true`)
    #[serde(default)]
    pub count: bool,
    /// Selected properties (`$select`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub select: Option<Vec<String>>,
    /// Ordering tokens (`$orderby`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_by: Option<Vec<String>>,
    /// Filter expression (`$filter`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<Predicate>,
    /// Expanded navigation properties (`$expand`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expand: Option<Expand>,
}

/// Everything the builder reads.
#[derive(Clone, Copy, Debug)]
pub struct QueryInput<'a> {
    /// Paginator snapshot, `None` when no paginator is attached
    pub page: Option<PaginationState>,
    /// Sort snapshot
    pub sort: &'a SortSpec,
    /// Fallback ordering when the sort yields no usable column
    pub initial_sort: Option<&'a [String]>,
    /// Active filter set, `None` for no filtering at all
    pub filters: Option<&'a FilterSet>,
    /// Properties to select
    pub select: Option<&'a [String]>,
    /// Navigation properties to expand
    pub expand: Option<&'a Expand>,
}

static NO_SORT: SortSpec = SortSpec::None;

impl Default for QueryInput<'_> {
    fn default() -> Self {
        Self {
            page: None,
            sort: &NO_SORT,
            initial_sort: None,
            filters: None,
            select: None,
            expand: None,
        }
    }
}

impl QueryParams {
    /// Build request parameters from collaborator snapshots.
    ///
    /// - With a paginator, `$top`, `$skip` and `$count` are always set, even on
    ///   the first page.
    /// - An active sort with at least one usable column wins over
    ///   `initial_sort`; `initial_sort` is used verbatim otherwise.
    /// - A present filter set always becomes one top-level AND, even when it
    ///   holds one predicate or none.
    /// - `select` and `expand` pass through unchanged.
    #[must_use]
    pub fn build(input: &QueryInput<'_>) -> Self {
        let mut params = Self::default();

        if let Some(page) = input.page {
            params.top = Some(page.page_size);
            params.skip = Some(page.offset());
            params.count = true;
        }

        let keys = input.sort.keys();
        if !keys.is_empty() {
            params.order_by = Some(keys.iter().map(SortKey::token).collect());
        } else if let Some(initial) = input.initial_sort.filter(|s| !s.is_empty()) {
            params.order_by = Some(initial.to_vec());
        }

        params.select = input.select.map(<[String]>::to_vec);
        params.filter = input.filters.map(FilterSet::to_predicate);
        params.expand = input.expand.cloned();

        params
    }
}
