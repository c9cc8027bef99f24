//! # Stale-Response Guard
//!
//! Keeps a list view from being overwritten by an answer to a question it
//! no longer asks.
//!
//! ## The Lost Update
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  t0  user types "ko"    → fetch A starts                               │
//! │  t1  user types "kopi"  → fetch B starts                               │
//! │  t2  B answers          → view shows "kopi" results                    │
//! │  t3  A answers (slow)   → view shows "ko" results   ✗ WRONG            │
//! │                                                                         │
//! │  With LatestRequest:                                                   │
//! │  t1  B starts → A is signalled and its future dropped → A yields None  │
//! │  t3  nothing arrives from A                                            │
//! │                                                                         │
//! │  cancel() does the same for the view going away (unmount).             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Dropping the superseded future drops the in-flight `reqwest` request,
//! which aborts it.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};
use tokio::sync::oneshot;
use tracing::debug;

/// Runs fetches so that only the most recent one may deliver a result.
///
/// ## Usage
/// ```rust,ignore
/// let guard = LatestRequest::new();
///
/// // Each keystroke:
/// if let Some(page) = guard.run(client.products().list(&query)).await {
///     render(page?);
/// }
///
/// // View closed:
/// guard.cancel();
/// ```
#[derive(Debug, Default)]
pub struct LatestRequest {
    generation: AtomicU64,
    cancel: Mutex<Option<oneshot::Sender<()>>>,
}

impl LatestRequest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs `fetch` unless superseded.
    ///
    /// ## Returns
    /// * `Some(output)` - `fetch` finished and is still the latest
    /// * `None` - a newer `run` started, or `cancel` was called, first
    pub async fn run<F, T>(&self, fetch: F) -> Option<T>
    where
        F: Future<Output = T>,
    {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let (tx, rx) = oneshot::channel();

        if let Some(previous) = self.slot().replace(tx) {
            let _ = previous.send(());
        }

        tokio::select! {
            biased;

            _ = rx => {
                debug!(generation, "Fetch superseded");
                None
            }
            output = fetch => {
                if self.generation.load(Ordering::SeqCst) == generation {
                    Some(output)
                } else {
                    debug!(generation, "Discarding stale response");
                    None
                }
            }
        }
    }

    /// Abandons whatever fetch is in flight.
    pub fn cancel(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        if let Some(pending) = self.slot().take() {
            let _ = pending.send(());
        }
    }

    /// Number of fetches started or cancelled so far.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    fn slot(&self) -> MutexGuard<'_, Option<oneshot::Sender<()>>> {
        // The slot only holds a sender, so a poisoned lock is still usable.
        self.cancel.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
