//! OData query-string serialization.
//!
//! Turns [`QueryParams`] into system query options:
//!
//! ```text
//! ?$select=..&$filter=..&$expand=..&$orderby=..&$top=..&$skip=..&$count=true
//! ```
//!
//! Empty logical groups render to nothing, so an empty AND produces no
//! `$filter` at all rather than a condition that matches nothing.

use crate::filter::{Literal, Predicate};
use crate::query::{Expand, ExpandItem, QueryParams};
use url::form_urlencoded;

impl Predicate {
    /// Render this predicate as a filter expression.
    ///
    /// Returns `None` when the predicate places no constraint.
    #[must_use]
    pub fn render(&self) -> Option<String> {
        match self {
            Self::And(parts) => render_group(parts, " and "),
            Self::Or(parts) => render_group(parts, " or "),
            Self::Not(inner) => inner.render().map(|expr| format!("not ({expr})")),
            Self::Compare { field, op, value } => {
                Some(format!("{field} {} {}", op.as_str(), render_literal(value)))
            }
            Self::Function { func, field, value } => {
                Some(format!("{}({field},{})", func.as_str(), render_literal(value)))
            }
            Self::Raw(expr) if expr.trim().is_empty() => None,
            Self::Raw(expr) => Some(expr.clone()),
        }
    }
}

fn render_group(parts: &[Predicate], separator: &str) -> Option<String> {
    let rendered: Vec<String> = parts
        .iter()
        .filter_map(Predicate::render)
        .map(|expr| format!("({expr})"))
        .collect();

    if rendered.is_empty() {
        None
    } else {
        Some(rendered.join(separator))
    }
}

fn render_literal(value: &Literal) -> String {
    match value {
        Literal::Null => "null".to_string(),
        Literal::Bool(b) => b.to_string(),
        Literal::Int(i) => i.to_string(),
        Literal::Float(f) => f.to_string(),
        Literal::String(s) => format!("'{}'", s.replace('\'', "''")),
        Literal::Raw(raw) => raw.clone(),
    }
}

impl Expand {
    /// Render as the value of `$expand`.
    #[must_use]
    pub fn render(&self) -> String {
        match self {
            Self::Fields(fields) => fields.join(","),
            Self::Nested(items) => items
                .iter()
                .map(ExpandItem::render)
                .collect::<Vec<_>>()
                .join(","),
        }
    }
}

impl ExpandItem {
    fn render(&self) -> String {
        let mut options = Vec::new();
        if !self.select.is_empty() {
            options.push(format!("$select={}", self.select.join(",")));
        }
        if let Some(filter) = self.filter.as_ref().and_then(Predicate::render) {
            options.push(format!("$filter={filter}"));
        }
        if !self.order_by.is_empty() {
            options.push(format!("$orderby={}", self.order_by.join(",")));
        }
        if let Some(top) = self.top {
            options.push(format!("$top={top}"));
        }
        if let Some(expand) = &self.expand {
            options.push(format!("$expand={}", expand.render()));
        }

        if options.is_empty() {
            self.field.clone()
        } else {
            format!("{}({})", self.field, options.join(";"))
        }
    }
}

impl QueryParams {
    /// System query options as unencoded name/value pairs, in wire order.
    #[must_use]
    pub fn to_query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();

        if let Some(select) = self.select.as_ref().filter(|s| !s.is_empty()) {
            pairs.push(("$select", select.join(",")));
        }
        if let Some(filter) = self.filter.as_ref().and_then(Predicate::render) {
            pairs.push(("$filter", filter));
        }
        if let Some(expand) = &self.expand {
            let rendered = expand.render();
            if !rendered.is_empty() {
                pairs.push(("$expand", rendered));
            }
        }
        if let Some(order_by) = self.order_by.as_ref().filter(|o| !o.is_empty()) {
            pairs.push(("$orderby", order_by.join(",")));
        }
        if let Some(top) = self.top {
            pairs.push(("$top", top.to_string()));
        }
        if let Some(skip) = self.skip {
            pairs.push(("$skip", skip.to_string()));
        }
        if self.count {
            pairs.push(("$count", "true".to_string()));
        }

        pairs
    }

    /// Form-encoded query string with a leading `?`, or `""` when there is
    /// nothing to send.
    #[must_use]
    pub fn to_query_string(&self) -> String {
        let pairs = self.to_query_pairs();
        if pairs.is_empty() {
            return String::new();
        }

        let mut serializer = form_urlencoded::Serializer::for_suffix(String::from("?"), 1);
        for (name, value) in &pairs {
            serializer.append_pair(name, value);
        }
        serializer.finish()
    }

    /// `resource_path` with this query appended.
    #[must_use]
    pub fn to_url(&self, resource_path: &str) -> String {
        format!("{resource_path}{}", self.to_query_string())
    }
}
