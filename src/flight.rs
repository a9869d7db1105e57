//! Single-flight coalescing for async operations.
//!
//! DESIGN
//! ======
//! A flight is a spawned task wrapped in `futures::future::Shared`, so every
//! caller awaiting it observes the same value and the task keeps running even
//! if all of them are dropped. Locks guard only the slot bookkeeping and are
//! never held across an `.await`.

use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures::future::{BoxFuture, FutureExt, Shared};

/// Shareable handle to the result of a spawned operation.
pub type Flight<T> = Shared<BoxFuture<'static, T>>;

/// Spawn `fut` on the current runtime and return a shareable handle to its
/// result. A task that panics or is aborted yields `T::default()`.
pub fn launch<T, F>(fut: F) -> Flight<T>
where
    T: Clone + Default + Send + Sync + 'static,
    F: Future<Output = T> + Send + 'static,
{
    let handle = tokio::spawn(fut);
    async move {
        match handle.await {
            Ok(value) => value,
            Err(error) => {
                tracing::warn!(error = %error, "coalesced task did not complete");
                T::default()
            }
        }
    }
    .boxed()
    .shared()
}

pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

// =============================================================================
// SINGLE FLIGHT SLOT
// =============================================================================

struct Slot<T> {
    next_id: u64,
    current: Option<(u64, Flight<T>)>,
}

/// At most one operation in flight; concurrent callers join it. The slot
/// empties itself when the operation completes, so the next call starts fresh.
pub struct SingleFlight<T> {
    slot: Arc<Mutex<Slot<T>>>,
}

impl<T> SingleFlight<T>
where
    T: Clone + Default + Send + Sync + 'static,
{
    #[must_use]
    pub fn new() -> Self {
        Self { slot: Arc::new(Mutex::new(Slot { next_id: 0, current: None })) }
    }

    #[must_use]
    pub fn is_in_flight(&self) -> bool {
        lock(&self.slot).current.is_some()
    }

    /// Join the operation in flight, or start one with `start`.
    ///
    /// `start` is only invoked when nothing is in flight.
    pub fn run<F>(&self, start: impl FnOnce() -> F) -> Flight<T>
    where
        F: Future<Output = T> + Send + 'static,
    {
        let mut slot = lock(&self.slot);
        if let Some((_, flight)) = &slot.current {
            return flight.clone();
        }

        let id = slot.next_id;
        slot.next_id = slot.next_id.wrapping_add(1);
        let operation = start();
        let owner = Arc::clone(&self.slot);
        let flight = launch(async move {
            let value = operation.await;
            let mut slot = lock(&owner);
            if slot.current.as_ref().is_some_and(|(current, _)| *current == id) {
                slot.current = None;
            }
            value
        });
        slot.current = Some((id, flight.clone()));
        flight
    }
}

impl<T> Default for SingleFlight<T>
where
    T: Clone + Default + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "flight_test.rs"]
mod tests;
