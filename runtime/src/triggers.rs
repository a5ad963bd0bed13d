//! Trigger aggregation.
//!
//! Merges filter replacements, page changes and sort changes into one
//! payload-free "re-fetch requested" stream. Only the collaborators present
//! when the pipeline starts are subscribed.

use crate::orchestrator::Bindings;
use futures::stream::{self, StreamExt};
use odata_source_core::changes::ChangeStream;

/// Merge `filters` with the change streams of the bound collaborators.
///
/// Every source is subscribed before this function returns, so a change made
/// right after it is never lost.
pub(crate) fn aggregate(filters: ChangeStream, bindings: &Bindings) -> ChangeStream {
    let mut sources = vec![filters];

    if let Some(paginator) = &bindings.paginator {
        sources.push(paginator.changes());
    }
    if let Some(sort) = bindings.sort.changes() {
        sources.push(sort);
    }

    tracing::trace!(sources = sources.len(), "Aggregating trigger sources");
    stream::select_all(sources).boxed()
}
