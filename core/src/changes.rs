//! Payload-free change notifications.
//!
//! Collaborators report "something changed" through a [`ChangeStream`]. Only
//! the occurrence matters: consumers re-read the collaborator's current state
//! when they act on a notification.

use async_stream::stream;
use futures::stream::Stream;
use std::pin::Pin;
use tokio::sync::watch;

/// A stream of change notifications without payload.
pub type ChangeStream = Pin<Box<dyn Stream<Item = ()> + Send>>;

/// Notifications for every value published on `rx` after this call.
///
/// The value current at subscription time is treated as already seen. The
/// stream ends when the sender is dropped. Values published between two
/// polls collapse into a single notification.
#[must_use]
pub fn watch_changes<V>(mut rx: watch::Receiver<V>) -> ChangeStream
where
    V: Send + Sync + 'static,
{
    Box::pin(stream! {
        while rx.changed().await.is_ok() {
            yield ();
        }
    })
}

/// Like [`watch_changes`] but emits once immediately for the current value.
#[must_use]
pub fn watch_with_current<V>(mut rx: watch::Receiver<V>) -> ChangeStream
where
    V: Send + Sync + 'static,
{
    Box::pin(stream! {
        yield ();
        while rx.changed().await.is_ok() {
            yield ();
        }
    })
}
