//! Cooperative cancellation.
//!
//! A [`CancellationTokenSource`] owns one token and flips it once. Holders
//! of the [`CancellationToken`] can poll it, subscribe a callback, or await
//! the transition. Nothing is ever interrupted; the cancelled side decides
//! when to stop.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tokio_util::sync::CancellationToken as CancelFlag;

type CancelCallback = Box<dyn FnOnce() + Send>;

#[derive(Default)]
struct Listeners {
    next_id: u64,
    callbacks: HashMap<u64, CancelCallback>,
}

struct TokenState {
    requested: CancelFlag,
    listeners: Mutex<Listeners>,
}

impl TokenState {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            requested: CancelFlag::new(),
            listeners: Mutex::new(Listeners::default()),
        })
    }

    fn is_requested(&self) -> bool {
        self.requested.is_cancelled()
    }

    fn cancel(&self) {
        let callbacks = {
            let mut listeners = self.listeners.lock();
            if self.requested.is_cancelled() {
                return;
            }
            self.requested.cancel();
            std::mem::take(&mut listeners.callbacks)
        };
        for (_, callback) in callbacks {
            callback();
        }
    }
}

/// Read side of a cancellation signal
#[derive(Clone)]
pub struct CancellationToken {
    state: Arc<TokenState>,
}

impl CancellationToken {
    /// A token that is never cancelled
    pub fn none() -> Self {
        Self {
            state: TokenState::new(),
        }
    }

    pub fn is_cancellation_requested(&self) -> bool {
        self.state.is_requested()
    }

    /// Run `callback` once when cancellation is requested.
    ///
    /// Fires immediately on the calling thread if the token is already
    /// cancelled.
    pub fn on_cancellation_requested<F>(&self, callback: F) -> Subscription
    where
        F: FnOnce() + Send + 'static,
    {
        let mut listeners = self.state.listeners.lock();
        if self.state.is_requested() {
            drop(listeners);
            callback();
            return Subscription { slot: None };
        }

        let id = listeners.next_id;
        listeners.next_id += 1;
        listeners.callbacks.insert(id, Box::new(callback));
        Subscription {
            slot: Some((Arc::clone(&self.state), id)),
        }
    }

    /// Resolves once cancellation has been requested
    pub async fn cancelled(&self) {
        self.state.requested.cancelled().await;
    }
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::none()
    }
}

impl fmt::Debug for CancellationToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CancellationToken")
            .field("is_cancellation_requested", &self.is_cancellation_requested())
            .finish()
    }
}

/// Owns a token and is the only way to cancel it
pub struct CancellationTokenSource {
    state: Arc<TokenState>,
}

impl CancellationTokenSource {
    pub fn new() -> Self {
        Self {
            state: TokenState::new(),
        }
    }

    pub fn token(&self) -> CancellationToken {
        CancellationToken {
            state: Arc::clone(&self.state),
        }
    }

    /// Request cancellation. Later calls do nothing.
    pub fn cancel(&self) {
        self.state.cancel();
    }

    pub fn is_cancellation_requested(&self) -> bool {
        self.state.is_requested()
    }

    /// Drop every pending subscription without cancelling
    pub fn dispose(self) {
        self.state.listeners.lock().callbacks.clear();
    }
}

impl Default for CancellationTokenSource {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for CancellationTokenSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CancellationTokenSource")
            .field("is_cancellation_requested", &self.is_cancellation_requested())
            .field("listeners", &self.state.listeners.lock().callbacks.len())
            .finish()
    }
}

/// Handle to a cancellation callback.
///
/// Dropping it keeps the callback registered; call
/// [`Subscription::dispose`] to remove it.
#[must_use = "dropping a subscription does not unsubscribe; call dispose() to remove it"]
pub struct Subscription {
    slot: Option<(Arc<TokenState>, u64)>,
}

impl Subscription {
    /// Remove the callback if it has not fired yet
    pub fn dispose(self) {
        if let Some((state, id)) = self.slot {
            state.listeners.lock().callbacks.remove(&id);
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.slot.as_ref().map(|(_, id)| *id))
            .finish()
    }
}
