//! # Refresh Timer
//!
//! A single cancellable one-shot task that fires the silent token refresh.
//!
//! ## Arming Rules
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  arm(d1)          arm(d2)             cancel()                          │
//! │    │                │                    │                              │
//! │    ▼                ▼                    ▼                              │
//! │  [task g1] ──abort──► [task g2] ──abort──► (empty)                      │
//! │                                                                         │
//! │  • At most one task is pending at any time.                            │
//! │  • A task removes itself from the slot before running its callback,    │
//! │    so the callback may re-arm without aborting itself.                 │
//! │  • A task that wakes up and finds another generation in the slot       │
//! │    returns without running.                                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Instant};
use tracing::debug;

struct Armed {
    generation: u64,
    due: Instant,
    handle: JoinHandle<()>,
}

type ArmedSlot = Arc<Mutex<Option<Armed>>>;

fn lock(slot: &Mutex<Option<Armed>>) -> MutexGuard<'_, Option<Armed>> {
    slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Holds at most one pending refresh task.
///
/// Must be used from within a Tokio runtime.
#[derive(Default)]
pub struct RefreshTimer {
    slot: ArmedSlot,
    generation: AtomicU64,
}

impl RefreshTimer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs `on_fire` after `delay`, cancelling whatever was pending.
    ///
    /// A zero delay still goes through the runtime: the callback runs on
    /// the spawned task, never inline.
    pub fn arm<F, Fut>(&self, delay: Duration, on_fire: F)
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let due = Instant::now() + delay;

        // The slot stays locked until the new task is stored, so a task
        // that wakes immediately still finds its own generation.
        let mut slot = lock(&self.slot);
        if let Some(previous) = slot.take() {
            previous.handle.abort();
            debug!(generation = previous.generation, "Refresh timer replaced");
        }

        let task_slot = Arc::clone(&self.slot);
        let handle = tokio::spawn(async move {
            sleep_until(due).await;
            {
                let mut slot = lock(&task_slot);
                if slot.as_ref().map(|armed| armed.generation) != Some(generation) {
                    return;
                }
                slot.take();
            }
            debug!(generation, "Refresh timer fired");
            on_fire().await;
        });

        *slot = Some(Armed {
            generation,
            due,
            handle,
        });
        debug!(generation, delay_ms = delay.as_millis() as u64, "Refresh timer armed");
    }

    /// Cancels the pending task. Returns true if one was pending.
    pub fn cancel(&self) -> bool {
        match lock(&self.slot).take() {
            Some(armed) => {
                armed.handle.abort();
                debug!(generation = armed.generation, "Refresh timer cancelled");
                true
            }
            None => false,
        }
    }

    pub fn is_armed(&self) -> bool {
        lock(&self.slot).is_some()
    }

    /// Time until the pending task fires, if one is pending.
    pub fn due_in(&self) -> Option<Duration> {
        lock(&self.slot)
            .as_ref()
            .map(|armed| armed.due.saturating_duration_since(Instant::now()))
    }
}

impl Drop for RefreshTimer {
    fn drop(&mut self) {
        if let Some(armed) = lock(&self.slot).take() {
            armed.handle.abort();
        }
    }
}

impl std::fmt::Debug for RefreshTimer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RefreshTimer")
            .field("armed", &self.is_armed())
            .field("due_in", &self.due_in())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn counter() -> (Arc<AtomicUsize>, impl Fn() -> Arc<AtomicUsize>) {
        let count = Arc::new(AtomicUsize::new(0));
        let handle = Arc::clone(&count);
        (count, move || Arc::clone(&handle))
    }

    #[tokio::test(start_paused = true)]
    async fn test_fires_once_after_delay() {
        let timer = RefreshTimer::new();
        let (fired, next) = counter();

        let hits = next();
        timer.arm(Duration::from_secs(30), move || async move {
            hits.fetch_add(1, Ordering::SeqCst);
        });
        assert!(timer.is_armed());
        assert_eq!(timer.due_in(), Some(Duration::from_secs(30)));

        tokio::time::sleep(Duration::from_secs(29)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert!(!timer.is_armed());
    }

    #[tokio::test(start_paused = true)]
    async fn test_rearm_cancels_previous() {
        let timer = RefreshTimer::new();
        let (first, next_first) = counter();
        let (second, next_second) = counter();

        let hits = next_first();
        timer.arm(Duration::from_secs(10), move || async move {
            hits.fetch_add(1, Ordering::SeqCst);
        });
        let hits = next_second();
        timer.arm(Duration::from_secs(20), move || async move {
            hits.fetch_add(1, Ordering::SeqCst);
        });

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(first.load(Ordering::SeqCst), 0);
        assert_eq!(second.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel() {
        let timer = RefreshTimer::new();
        let (fired, next) = counter();

        let hits = next();
        timer.arm(Duration::from_secs(5), move || async move {
            hits.fetch_add(1, Ordering::SeqCst);
        });
        assert!(timer.cancel());
        assert!(!timer.cancel());

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);
        assert_eq!(timer.due_in(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_callback_can_rearm() {
        let timer = Arc::new(RefreshTimer::new());
        let (fired, next) = counter();

        let hits = next();
        let inner = Arc::clone(&timer);
        timer.arm(Duration::from_secs(1), move || async move {
            hits.fetch_add(1, Ordering::SeqCst);
            let again = Arc::clone(&hits);
            inner.arm(Duration::from_secs(1), move || async move {
                again.fetch_add(1, Ordering::SeqCst);
            });
        });

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 2);
        assert!(!timer.is_armed());
    }
}
