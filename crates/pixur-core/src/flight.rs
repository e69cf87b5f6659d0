//! In-flight request coalescing.
//!
//! Concurrent callers of the same logical operation (fetching the XSRF token,
//! refreshing the auth token) share one request. The first caller starts it;
//! later callers join the pending future and receive the same result.

use crate::error::Result;
use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use std::future::Future;
use tokio::sync::Mutex;
use tracing::debug;

type SharedFlight<T> = Shared<BoxFuture<'static, Result<T>>>;

enum FlightState<T> {
    /// Nothing has run yet, or the last run failed.
    Idle,
    /// A request is running; joining callers clone the shared future.
    Pending { id: u64, flight: SharedFlight<T> },
    /// The last run succeeded.
    Ready(T),
}

struct Inner<T> {
    state: FlightState<T>,
    next_id: u64,
}

/// A single coalesced operation.
pub struct Coalesced<T> {
    name: &'static str,
    inner: Mutex<Inner<T>>,
}

impl<T> Coalesced<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Creates an idle operation. `name` only appears in logs.
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            inner: Mutex::new(Inner {
                state: FlightState::Idle,
                next_id: 0,
            }),
        }
    }

    /// Runs `start` unless a run is already pending, in which case the
    /// pending run is joined and `start` is never called.
    ///
    /// A previous `Ready` value is not reused; callers decide freshness
    /// before asking for a new run. On success the state becomes `Ready`,
    /// on failure `Idle`, so the next call issues a fresh request.
    pub async fn run<F, Fut>(&self, start: F) -> Result<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        let (id, flight) = {
            let mut inner = self.inner.lock().await;
            let pending = match &inner.state {
                FlightState::Pending { id, flight } => Some((*id, flight.clone())),
                _ => None,
            };
            match pending {
                Some(joined) => {
                    debug!(operation = self.name, "joining in-flight request");
                    joined
                }
                None => {
                    inner.next_id += 1;
                    let id = inner.next_id;
                    let flight = start().boxed().shared();
                    inner.state = FlightState::Pending {
                        id,
                        flight: flight.clone(),
                    };
                    debug!(operation = self.name, id, "starting request");
                    (id, flight)
                }
            }
        };

        let result = flight.await;

        let mut inner = self.inner.lock().await;
        if matches!(&inner.state, FlightState::Pending { id: current, .. } if *current == id) {
            inner.state = match &result {
                Ok(value) => FlightState::Ready(value.clone()),
                Err(_) => FlightState::Idle,
            };
        }
        result
    }

    /// Returns the value of the last successful run, if any.
    pub async fn last(&self) -> Option<T> {
        match &self.inner.lock().await.state {
            FlightState::Ready(value) => Some(value.clone()),
            _ => None,
        }
    }

    pub async fn is_pending(&self) -> bool {
        matches!(self.inner.lock().await.state, FlightState::Pending { .. })
    }

    /// Drops a `Ready` value. A pending run is left alone.
    pub async fn forget(&self) {
        let mut inner = self.inner.lock().await;
        if matches!(inner.state, FlightState::Ready(_)) {
            inner.state = FlightState::Idle;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PixurError;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counted(
        calls: Arc<AtomicUsize>,
        value: Result<u32>,
    ) -> impl FnOnce() -> BoxFuture<'static, Result<u32>> {
        move || {
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                tokio::task::yield_now().await;
                value
            }
            .boxed()
        }
    }

    #[tokio::test]
    async fn test_concurrent_callers_share_one_request() {
        let flight = Coalesced::new("test");
        let calls = Arc::new(AtomicUsize::new(0));

        let (a, b) = tokio::join!(
            flight.run(counted(calls.clone(), Ok(7))),
            flight.run(counted(calls.clone(), Ok(8)))
        );

        assert_eq!(a.unwrap(), 7);
        assert_eq!(b.unwrap(), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(flight.last().await, Some(7));
    }

    #[tokio::test]
    async fn test_sequential_runs_issue_new_requests() {
        let flight = Coalesced::new("test");
        let calls = Arc::new(AtomicUsize::new(0));

        flight.run(counted(calls.clone(), Ok(1))).await.unwrap();
        let second = flight.run(counted(calls.clone(), Ok(2))).await.unwrap();

        assert_eq!(second, 2);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_failure_is_shared_and_resets_to_idle() {
        let flight = Coalesced::new("test");
        let calls = Arc::new(AtomicUsize::new(0));
        let failure = Err(PixurError::transport("connection refused"));

        let (a, b) = tokio::join!(
            flight.run(counted(calls.clone(), failure.clone())),
            flight.run(counted(calls.clone(), Ok(3)))
        );

        assert_eq!(a, failure);
        assert_eq!(b, failure);
        assert!(!flight.is_pending().await);
        assert_eq!(flight.last().await, None);

        // No retry happened on its own; the next call starts over.
        assert_eq!(flight.run(counted(calls.clone(), Ok(4))).await.unwrap(), 4);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_forget_clears_ready_value() {
        let flight = Coalesced::new("test");
        let calls = Arc::new(AtomicUsize::new(0));

        flight.run(counted(calls.clone(), Ok(9))).await.unwrap();
        flight.forget().await;

        assert_eq!(flight.last().await, None);
    }
}
