use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::OnceLock;

use chrono::{DateTime, Utc};
use crossbeam_channel::{Sender, TrySendError};

use crate::error::WaitResult;
use crate::notification::NotificationKind;
use crate::service::CallbackHandle;

/// What happened to an outcome handed to [`WatcherContext::resolve`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Delivery {
    /// The outcome is in the delivery slot.
    Sent,
    /// The context was already resolved; nothing was sent.
    AlreadyResolved,
    /// The receiving side is gone.
    Abandoned,
}

/// State for one registered wait.
///
/// Read-only after registration apart from the callback handle (set once
/// the service accepts the subscription) and the resolved guard.
#[derive(Debug)]
pub(crate) struct WatcherContext {
    expected: NotificationKind,
    tx: Sender<WaitResult>,
    callback: OnceLock<CallbackHandle>,
    registered_at: DateTime<Utc>,
    resolved: AtomicBool,
}

impl WatcherContext {
    pub(crate) fn new(expected: NotificationKind, tx: Sender<WaitResult>) -> Self {
        Self {
            expected,
            tx,
            callback: OnceLock::new(),
            registered_at: Utc::now(),
            resolved: AtomicBool::new(false),
        }
    }

    pub(crate) const fn expected(&self) -> NotificationKind {
        self.expected
    }

    pub(crate) fn registered_at(&self) -> DateTime<Utc> {
        self.registered_at
    }

    pub(crate) fn callback(&self) -> Option<CallbackHandle> {
        self.callback.get().copied()
    }

    pub(crate) fn bind_callback(&self, handle: CallbackHandle) {
        let _ = self.callback.set(handle);
    }

    pub(crate) fn is_resolved(&self) -> bool {
        self.resolved.load(Ordering::Acquire)
    }

    /// Delivers `outcome` unless this context already resolved.
    ///
    /// Never blocks: the slot has capacity one and only the caller that flips
    /// the guard may send.
    pub(crate) fn resolve(&self, outcome: WaitResult) -> Delivery {
        if self.resolved.swap(true, Ordering::AcqRel) {
            return Delivery::AlreadyResolved;
        }

        match self.tx.try_send(outcome) {
            Ok(()) => Delivery::Sent,
            Err(TrySendError::Full(_)) => Delivery::AlreadyResolved,
            Err(TrySendError::Disconnected(_)) => Delivery::Abandoned,
        }
    }
}
