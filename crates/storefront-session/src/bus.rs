//! # Session Bus
//!
//! Tells other running instances that the stored token changed.
//!
//! ## Cross-Instance Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  Instance A                       Instance B                           │
//! │  ──────────                       ──────────                           │
//! │  login(token)                                                          │
//! │   ├── storage.set(token)                                               │
//! │   └── publish(TokenChanged{A}) ──► listener                            │
//! │                                    ├── origin == B? no                 │
//! │                                    ├── storage.load()                  │
//! │                                    └── Validating → Authenticated      │
//! │                                                                         │
//! │  logout()                                                              │
//! │   ├── storage.clear()                                                  │
//! │   └── publish(TokenCleared{A}) ──► Unauthenticated (RemovedElsewhere)  │
//! │                                                                         │
//! │  The signal carries no token: receivers re-read shared storage.        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::fmt;
use tokio::sync::broadcast;
use tracing::debug;
use uuid::Uuid;

/// Identifies one running session manager.
pub type InstanceId = Uuid;

/// Default number of signals a slow listener may fall behind by.
const DEFAULT_CAPACITY: usize = 16;

/// A change to the shared token storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionSignal {
    /// A new token was written; re-read storage and validate it.
    TokenChanged { origin: InstanceId },
    /// The token was removed; drop the session.
    TokenCleared { origin: InstanceId },
}

impl SessionSignal {
    /// The instance that published the signal.
    pub fn origin(&self) -> InstanceId {
        match self {
            SessionSignal::TokenChanged { origin } | SessionSignal::TokenCleared { origin } => {
                *origin
            }
        }
    }
}

/// Receiving end of a [`SessionBus`] subscription.
pub type SignalReceiver = broadcast::Receiver<SessionSignal>;

/// Cross-instance messaging used by the session manager.
///
/// Every published signal is delivered to every subscriber, including the
/// publisher; receivers ignore their own signals by `origin`.
pub trait SessionBus: Send + Sync + fmt::Debug {
    /// Sends `signal` to all subscribers. Never fails; a bus with no
    /// listeners drops the signal.
    fn publish(&self, signal: SessionSignal);

    /// Starts receiving signals published from now on.
    fn subscribe(&self) -> SignalReceiver;
}

/// In-process bus on a `tokio::sync::broadcast` channel.
///
/// Clones share the channel, so handing a clone to each manager connects
/// them like tabs of one browser.
#[derive(Clone)]
pub struct LocalBus {
    tx: broadcast::Sender<SessionSignal>,
}

impl LocalBus {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        LocalBus { tx }
    }
}

impl Default for LocalBus {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for LocalBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalBus")
            .field("subscribers", &self.tx.receiver_count())
            .finish()
    }
}

impl SessionBus for LocalBus {
    fn publish(&self, signal: SessionSignal) {
        if self.tx.send(signal).is_err() {
            debug!(?signal, "No session bus listeners");
        }
    }

    fn subscribe(&self) -> SignalReceiver {
        self.tx.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_clones_share_channel() {
        let bus = LocalBus::new();
        let other = bus.clone();
        let mut rx = other.subscribe();

        let origin = Uuid::new_v4();
        bus.publish(SessionSignal::TokenChanged { origin });

        let signal = rx.recv().await.unwrap();
        assert_eq!(signal.origin(), origin);
        assert!(matches!(signal, SessionSignal::TokenChanged { .. }));
    }

    #[test]
    fn test_publish_without_listeners_is_fine() {
        let bus = LocalBus::new();
        bus.publish(SessionSignal::TokenCleared {
            origin: Uuid::new_v4(),
        });
    }
}
