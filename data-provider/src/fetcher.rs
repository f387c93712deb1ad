//! Generation-guarded fetching.
//!
//! Every fetch takes a [`FetchTicket`] from a [`GenerationCounter`]. A
//! response is applied only while its ticket is still the newest one and the
//! owner has not shut down, so a slow response can never overwrite the result
//! of a later request.

use parking_lot::RwLock;
use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct FetchTicket {
    generation: u64,
}

impl FetchTicket {
    pub fn generation(self) -> u64 {
        self.generation
    }
}

#[derive(Debug, Default)]
pub struct GenerationCounter {
    current: AtomicU64,
    closed: AtomicBool,
}

impl GenerationCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a request; every older ticket becomes stale.
    pub fn next(&self) -> FetchTicket {
        FetchTicket {
            generation: self.current.fetch_add(1, Ordering::SeqCst) + 1,
        }
    }

    pub fn is_current(&self, ticket: FetchTicket) -> bool {
        !self.is_closed() && self.current.load(Ordering::SeqCst) == ticket.generation
    }

    /// Make every outstanding ticket stale.
    pub fn invalidate(&self) {
        self.current.fetch_add(1, Ordering::SeqCst);
    }

    /// Permanently reject every ticket, past and future.
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        self.invalidate();
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

/// Result of one [`Fetcher::fetch`]
#[derive(Debug)]
pub enum FetchOutcome<E> {
    Applied,
    /// A newer fetch, a cancel or a shutdown happened meanwhile
    Superseded,
    Failed(E),
}

impl<E> FetchOutcome<E> {
    pub fn is_applied(&self) -> bool {
        matches!(self, Self::Applied)
    }
}

#[derive(Debug)]
struct FetchState<T> {
    value: Option<T>,
    loading: bool,
}

/// Latest value of one request stream with stale responses discarded.
#[derive(Debug, Clone)]
pub struct Fetcher<T> {
    state: Arc<RwLock<FetchState<T>>>,
    counter: Arc<GenerationCounter>,
}

impl<T> Fetcher<T> {
    pub fn new() -> Self {
        Self {
            state: Arc::new(RwLock::new(FetchState {
                value: None,
                loading: false,
            })),
            counter: Arc::new(GenerationCounter::new()),
        }
    }

    /// Await `request` and store its value if no newer fetch started. A
    /// failed request keeps the previous value.
    pub async fn fetch<F, E>(&self, request: F) -> FetchOutcome<E>
    where
        F: Future<Output = Result<T, E>>,
    {
        let ticket = self.counter.next();
        self.state.write().loading = true;

        let result = request.await;

        let mut state = self.state.write();
        if !self.counter.is_current(ticket) {
            debug!(generation = ticket.generation(), "Discarding superseded response");
            return FetchOutcome::Superseded;
        }
        state.loading = false;
        match result {
            Ok(value) => {
                state.value = Some(value);
                FetchOutcome::Applied
            }
            Err(e) => FetchOutcome::Failed(e),
        }
    }

    /// Drop whatever is in flight.
    pub fn cancel(&self) {
        self.counter.invalidate();
        self.state.write().loading = false;
    }

    /// Cancel and refuse all further updates.
    pub fn shutdown(&self) {
        self.counter.close();
        self.state.write().loading = false;
    }

    pub fn is_loading(&self) -> bool {
        self.state.read().loading
    }

    pub fn with_value<R>(&self, f: impl FnOnce(Option<&T>) -> R) -> R {
        f(self.state.read().value.as_ref())
    }
}

impl<T: Clone> Fetcher<T> {
    pub fn value(&self) -> Option<T> {
        self.state.read().value.clone()
    }
}

impl<T> Default for Fetcher<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::oneshot;

    #[test]
    fn test_counter_staleness() {
        let counter = GenerationCounter::new();
        let first = counter.next();
        assert!(counter.is_current(first));
        let second = counter.next();
        assert!(!counter.is_current(first));
        assert!(counter.is_current(second));
        counter.close();
        assert!(!counter.is_current(second));
        assert!(!counter.is_current(counter.next()));
    }

    #[tokio::test]
    async fn test_late_response_discarded() {
        let fetcher: Fetcher<&'static str> = Fetcher::new();
        let (slow_tx, slow_rx) = oneshot::channel::<&'static str>();

        let slow = {
            let fetcher = fetcher.clone();
            tokio::spawn(async move {
                fetcher
                    .fetch(async move { slow_rx.await.map_err(|_| "dropped") })
                    .await
            })
        };
        tokio::task::yield_now().await;
        while !fetcher.is_loading() {
            tokio::task::yield_now().await;
        }

        let fast = fetcher.fetch(async { Ok::<_, &str>("page 2") }).await;
        assert!(fast.is_applied());

        slow_tx.send("page 1").unwrap();
        assert!(matches!(slow.await.unwrap(), FetchOutcome::Superseded));
        assert_eq!(fetcher.value(), Some("page 2"));
    }

    #[tokio::test]
    async fn test_failure_keeps_previous_value() {
        let fetcher = Fetcher::new();
        fetcher.fetch(async { Ok::<_, String>(1) }).await;
        let outcome = fetcher.fetch(async { Err::<i32, _>("boom".to_string()) }).await;
        assert!(matches!(outcome, FetchOutcome::Failed(ref e) if e == "boom"));
        assert_eq!(fetcher.value(), Some(1));
        assert!(!fetcher.is_loading());
    }

    #[tokio::test]
    async fn test_shutdown_blocks_updates() {
        let fetcher = Fetcher::new();
        fetcher.shutdown();
        let outcome = fetcher.fetch(async { Ok::<_, String>(7) }).await;
        assert!(matches!(outcome, FetchOutcome::Superseded));
        assert_eq!(fetcher.value(), None);
    }
}
