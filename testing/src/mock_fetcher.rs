//! Scripted fetch collaborator
//!
//! [`MockFetcher`] records every requested URL and answers in one of two
//! modes:
//!
//! - **Immediate**: a responder closure maps the URL to a result
//! - **Gated**: every request waits until the test releases it with
//!   [`MockFetcher::respond`], so completion order is fully controlled

use odata_source_core::fetch::{FetchError, ResourceFetcher, ResourcePage};
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::{oneshot, watch};

type Responder<T> = Box<dyn Fn(&str) -> Result<ResourcePage<T>, FetchError> + Send + Sync>;
type Gate<T> = oneshot::Sender<Result<ResourcePage<T>, FetchError>>;

enum Mode<T> {
    Immediate(Responder<T>),
    Gated(Mutex<HashMap<usize, Gate<T>>>),
}

/// How long [`MockFetcher::wait_for_requests`] waits before failing the test.
const WAIT_TIMEOUT: Duration = Duration::from_secs(5);

/// In-memory [`ResourceFetcher`] for tests.
///
/// # Example
///
/// ```
/// use odata_source_core::fetch::{ResourceFetcher, ResourcePage};
/// use odata_source_testing::MockFetcher;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let fetcher = MockFetcher::<u32>::gated();
/// let pending = fetcher.fetch("/Products?%24top=2".to_string());
///
/// // The request is logged at once and stays open until answered.
/// assert_eq!(fetcher.requests(), vec!["/Products?%24top=2"]);
/// assert!(fetcher.respond(0, Ok(ResourcePage::new(vec![1, 2]))));
/// assert_eq!(pending.await.unwrap().value, vec![1, 2]);
/// # }
/// ```
pub struct MockFetcher<T> {
    mode: Mode<T>,
    requests: watch::Sender<Vec<String>>,
}

fn lock<V>(mutex: &Mutex<V>) -> MutexGuard<'_, V> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl<T> MockFetcher<T> {
    /// Answer every request immediately with `responder(url)`.
    #[must_use]
    pub fn new<F>(responder: F) -> Self
    where
        F: Fn(&str) -> Result<ResourcePage<T>, FetchError> + Send + Sync + 'static,
    {
        Self {
            mode: Mode::Immediate(Box::new(responder)),
            requests: watch::channel(Vec::new()).0,
        }
    }

    /// Hold every request until [`respond`](Self::respond) is called for it.
    #[must_use]
    pub fn gated() -> Self {
        Self {
            mode: Mode::Gated(Mutex::new(HashMap::new())),
            requests: watch::channel(Vec::new()).0,
        }
    }

    /// URLs requested so far, in request order.
    #[must_use]
    pub fn requests(&self) -> Vec<String> {
        self.requests.borrow().clone()
    }

    /// Number of requests made so far.
    #[must_use]
    pub fn request_count(&self) -> usize {
        self.requests.borrow().len()
    }

    /// Wait until at least `count` requests were made and return them.
    ///
    /// # Panics
    ///
    /// Panics if fewer than `count` requests arrive within five seconds.
    #[allow(clippy::panic)] // Test helper
    pub async fn wait_for_requests(&self, count: usize) -> Vec<String> {
        let mut rx = self.requests.subscribe();
        let waited = tokio::time::timeout(WAIT_TIMEOUT, rx.wait_for(|r| r.len() >= count)).await;
        match waited {
            Ok(Ok(requests)) => requests.clone(),
            _ => panic!(
                "expected {count} requests, saw {}: {:?}",
                self.request_count(),
                self.requests()
            ),
        }
    }

    /// Release the gated request with zero-based `index` with `result`.
    ///
    /// Returns `false` when there is no such pending request, for example
    /// because it was already answered or the fetcher is not gated.
    pub fn respond(&self, index: usize, result: Result<ResourcePage<T>, FetchError>) -> bool {
        let Mode::Gated(gates) = &self.mode else {
            return false;
        };
        lock(gates)
            .remove(&index)
            .is_some_and(|gate| gate.send(result).is_ok())
    }

    fn record(&self, url: String) -> usize {
        let mut index = 0;
        self.requests.send_modify(|requests| {
            index = requests.len();
            requests.push(url);
        });
        index
    }
}

impl<T> ResourceFetcher<T> for MockFetcher<T>
where
    T: Send + 'static,
{
    fn fetch(
        &self,
        url: String,
    ) -> Pin<Box<dyn Future<Output = Result<ResourcePage<T>, FetchError>> + Send + '_>> {
        match &self.mode {
            Mode::Immediate(responder) => {
                let result = responder(&url);
                self.record(url);
                Box::pin(async move { result })
            },
            Mode::Gated(gates) => {
                let (gate, released) = oneshot::channel();
                {
                    // Gate is registered before the request becomes visible.
                    let mut gates = lock(gates);
                    let index = self.requests.borrow().len();
                    gates.insert(index, gate);
                    self.record(url);
                }
                Box::pin(async move {
                    released.await.unwrap_or_else(|_| {
                        Err(FetchError::transport("mock request was never answered"))
                    })
                })
            },
        }
    }
}
