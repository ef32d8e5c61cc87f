//! Singleflight for thumbnail generation.
//!
//! The first caller for a key becomes the leader and runs the work; callers
//! that arrive while it is running wait and receive a clone of the leader's
//! result. Entries are removed as soon as the leader finishes, so a later
//! call for the same key runs the work again.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::Notify;

/// Whether a caller ran the work or joined another caller's run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Leader,
    Follower,
}

/// State for one in-flight run.
struct InFlightState<T> {
    /// Notification for waiters
    notify: Notify,
    /// Result of the run (set when complete)
    result: Mutex<Option<T>>,
}

/// Coalesces concurrent runs that share a key.
pub struct InFlight<T> {
    in_flight: Mutex<HashMap<String, Arc<InFlightState<T>>>>,
}

/// Removes the leader's entry and wakes waiters, even if the leader's
/// future is dropped before it completes.
struct LeaderGuard<'a, T> {
    owner: &'a InFlight<T>,
    key: &'a str,
    state: Arc<InFlightState<T>>,
}

impl<T> Drop for LeaderGuard<'_, T> {
    fn drop(&mut self) {
        self.owner.entries().remove(self.key);
        self.state.notify.notify_waiters();
    }
}

fn lock<V>(mutex: &Mutex<V>) -> MutexGuard<'_, V> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl<T: Clone> InFlightState<T> {
    fn new() -> Self {
        Self {
            notify: Notify::new(),
            result: Mutex::new(None),
        }
    }

    fn finished(&self) -> Option<T> {
        lock(&self.result).clone()
    }
}

impl<T> InFlight<T> {
    pub fn new() -> Self {
        Self {
            in_flight: Mutex::new(HashMap::new()),
        }
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<String, Arc<InFlightState<T>>>> {
        lock(&self.in_flight)
    }

    /// Number of keys currently being worked on.
    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether `state` is still the registered run for `key`.
    fn is_current(&self, key: &str, state: &Arc<InFlightState<T>>) -> bool {
        self.entries()
            .get(key)
            .is_some_and(|current| Arc::ptr_eq(current, state))
    }
}

impl<T: Clone> InFlight<T> {
    /// Run `work` for `key`, or wait for the run already in progress.
    ///
    /// Map locks are only held inside synchronous blocks, so the returned
    /// future is `Send` whenever `work`'s future is.
    pub async fn run<F, Fut>(&self, key: &str, work: F) -> (T, Role)
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        let state = loop {
            let existing = {
                let mut entries = self.entries();
                match entries.get(key) {
                    Some(state) => Arc::clone(state),
                    None => {
                        let state = Arc::new(InFlightState::new());
                        entries.insert(key.to_string(), Arc::clone(&state));
                        break state;
                    }
                }
            };

            let notified = existing.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            // The leader stores its result before unregistering, and
            // unregisters before notifying. Checking both after `enable`
            // covers a leader that finished before we registered.
            if let Some(result) = existing.finished() {
                return (result, Role::Follower);
            }
            if self.is_current(key, &existing) {
                notified.await;
                if let Some(result) = existing.finished() {
                    return (result, Role::Follower);
                }
            }

            // Leader was dropped without a result; try again
        };

        let guard = LeaderGuard {
            owner: self,
            key,
            state: Arc::clone(&state),
        };

        let result = work().await;

        *lock(&state.result) = Some(result.clone());
        drop(guard);

        (result, Role::Leader)
    }
}

impl<T> Default for InFlight<T> {
    fn default() -> Self {
        Self::new()
    }
}
