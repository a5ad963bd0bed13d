//! Filter predicates.
//!
//! A filter collaborator is anything implementing [`ODataFilter`]. The
//! orchestrator never inspects the predicate it returns; it only combines the
//! predicates of the active [`FilterSet`] under one logical AND and hands the
//! result to the serializer.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Comparison operators.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompareOp {
    /// `eq`
    Eq,
    /// `ne`
    Ne,
    /// `gt`
    Gt,
    /// `ge`
    Ge,
    /// `lt`
    Lt,
    /// `le`
    Le,
}

impl CompareOp {
    /// Wire token for this operator.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Eq => "eq",
            Self::Ne => "ne",
            Self::Gt => "gt",
            Self::Ge => "ge",
            Self::Lt => "lt",
            Self::Le => "le",
        }
    }
}

/// String functions usable as boolean predicates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StringFunction {
    /// `contains(field,value)`
    Contains,
    /// `startswith(field,value)`
    StartsWith,
    /// `endswith(field,value)`
    EndsWith,
}

impl StringFunction {
    /// Wire name of this function.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Contains => "contains",
            Self::StartsWith => "startswith",
            Self::EndsWith => "endswith",
        }
    }
}

/// Literal operand of a predicate.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Literal {
    /// `null`
    Null,
    /// `true` / `false`
    Bool(bool),
    /// Integer literal
    Int(i64),
    /// Floating point literal
    Float(f64),
    /// Quoted string literal
    String(String),
    /// Sent verbatim, e.g. GUID or date-time literals
    Raw(String),
}

impl Literal {
    /// Literal sent without quoting.
    #[must_use]
    pub fn raw(value: impl Into<String>) -> Self {
        Self::Raw(value.into())
    }
}

impl From<&str> for Literal {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for Literal {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<i64> for Literal {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<i32> for Literal {
    fn from(value: i32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<f64> for Literal {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<bool> for Literal {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

/// A structured predicate fragment.
///
/// Rendering to the wire format lives in [`crate::odata`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Predicate {
    /// All operands must hold. An empty list is no constraint at all.
    And(Vec<Predicate>),
    /// At least one operand must hold.
    Or(Vec<Predicate>),
    /// Negation.
    Not(Box<Predicate>),
    /// `field op value`
    Compare {
        /// Property path
        field: String,
        /// Operator
        op: CompareOp,
        /// Right-hand literal
        value: Literal,
    },
    /// `func(field,value)`
    Function {
        /// String function
        func: StringFunction,
        /// Property path
        field: String,
        /// Argument literal
        value: Literal,
    },
    /// Expression passed through verbatim.
    Raw(String),
}

impl Predicate {
    /// `field eq value`
    #[must_use]
    pub fn eq(field: impl Into<String>, value: impl Into<Literal>) -> Self {
        Self::compare(field, CompareOp::Eq, value)
    }

    /// `field op value`
    #[must_use]
    pub fn compare(field: impl Into<String>, op: CompareOp, value: impl Into<Literal>) -> Self {
        Self::Compare {
            field: field.into(),
            op,
            value: value.into(),
        }
    }

    /// `contains(field,value)`
    #[must_use]
    pub fn contains(field: impl Into<String>, value: impl Into<Literal>) -> Self {
        Self::function(StringFunction::Contains, field, value)
    }

    /// `func(field,value)`
    #[must_use]
    pub fn function(
        func: StringFunction,
        field: impl Into<String>,
        value: impl Into<Literal>,
    ) -> Self {
        Self::Function {
            func,
            field: field.into(),
            value: value.into(),
        }
    }

    /// Verbatim expression.
    #[must_use]
    pub fn raw(expression: impl Into<String>) -> Self {
        Self::Raw(expression.into())
    }

    /// Negate this predicate.
    #[must_use]
    pub fn negate(self) -> Self {
        Self::Not(Box::new(self))
    }
}

/// Filter collaborator.
///
/// Implementors produce a serializable predicate fragment on demand. The
/// fragment is requested every time a fetch is initiated, so a filter may
/// compute it from its own current state.
pub trait ODataFilter: Send + Sync + fmt::Debug {
    /// The predicate this filter currently contributes.
    fn to_predicate(&self) -> Predicate;
}

impl ODataFilter for Predicate {
    fn to_predicate(&self) -> Predicate {
        self.clone()
    }
}

/// The ordered set of active filters, combined with logical AND.
///
/// Cloning is cheap and preserves identity: [`FilterSet::ptr_eq`] tells two
/// handles to the same set apart from two equal but distinct sets.
#[derive(Clone)]
pub struct FilterSet(Arc<[Arc<dyn ODataFilter>]>);

impl FilterSet {
    /// Build a set from concrete filters.
    #[must_use]
    pub fn new<F>(filters: impl IntoIterator<Item = F>) -> Self
    where
        F: ODataFilter + 'static,
    {
        Self(
            filters
                .into_iter()
                .map(|f| Arc::new(f) as Arc<dyn ODataFilter>)
                .collect(),
        )
    }

    /// Build a set from shared filter handles.
    #[must_use]
    pub fn from_shared(filters: impl IntoIterator<Item = Arc<dyn ODataFilter>>) -> Self {
        Self(filters.into_iter().collect())
    }

    /// A set with no filters. Still produces a (vacuous) AND when built.
    #[must_use]
    pub fn empty() -> Self {
        Self(Arc::from(Vec::<Arc<dyn ODataFilter>>::new()))
    }

    /// Number of filters.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the set holds no filters.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate the filters in order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn ODataFilter>> {
        self.0.iter()
    }

    /// Whether both handles refer to the same set.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    /// All predicates wrapped in one top-level AND.
    #[must_use]
    pub fn to_predicate(&self) -> Predicate {
        Predicate::And(self.0.iter().map(|f| f.to_predicate()).collect())
    }
}

impl fmt::Debug for FilterSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.0.iter()).finish()
    }
}
