//! Dispatch engine.
//!
//! Every notification from the compute service enters here, on a thread the
//! crate does not own. Dispatch looks up the watcher, decides whether the
//! notification resolves the wait, and performs at most one non-blocking send.
//! It never blocks and never lets a panic escape.

use std::panic::{catch_unwind, AssertUnwindSafe};
#[cfg(test)]
use std::sync::atomic::AtomicBool;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{trace, warn};

use crate::error::{WaitError, WaitResult};
use crate::notification::NotificationKind;
use crate::status;

use super::context::Delivery;
use super::registry::{WatcherKey, WatcherRegistry};

/// Result of dispatching a single notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DispatchOutcome {
    /// An outcome was placed on the watcher's delivery channel.
    Delivered,
    /// No live watcher for the key.
    LookupMiss,
    /// The notification does not concern this wait; it stays pending.
    Ignored,
    /// The wait had already resolved; nothing was sent.
    Duplicate,
    /// The waiter was dropped before delivery.
    Abandoned,
    /// Dispatch panicked; the panic was contained.
    Panicked,
}

/// Decides how `kind` affects a wait for `expected`.
///
/// `None` leaves the wait pending.
#[must_use]
pub fn resolution_for(expected: NotificationKind, kind: NotificationKind, status: usize) -> Option<WaitResult> {
    if kind == expected {
        Some(status::translate(status))
    } else if kind == NotificationKind::SystemExited {
        Some(Err(WaitError::UnexpectedExit))
    } else if kind == NotificationKind::ServiceDisconnect {
        Some(Err(WaitError::ServiceDisconnected))
    } else {
        None
    }
}

/// Counters kept by the dispatch engine.
#[derive(Debug, Default)]
pub(crate) struct DispatchStats {
    delivered: AtomicU64,
    lookup_misses: AtomicU64,
    ignored: AtomicU64,
    duplicates: AtomicU64,
    abandoned: AtomicU64,
    panics: AtomicU64,
}

/// Point-in-time copy of the dispatch counters.
///
/// Each field counts dispatches that ended in the matching
/// [`DispatchOutcome`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchStatsSnapshot {
    /// [`DispatchOutcome::Delivered`].
    pub delivered: u64,
    /// [`DispatchOutcome::LookupMiss`].
    pub lookup_misses: u64,
    /// [`DispatchOutcome::Ignored`].
    pub ignored: u64,
    /// [`DispatchOutcome::Duplicate`].
    pub duplicates: u64,
    /// [`DispatchOutcome::Abandoned`].
    pub abandoned: u64,
    /// [`DispatchOutcome::Panicked`].
    pub panics: u64,
}

impl DispatchStats {
    fn record(&self, outcome: DispatchOutcome) {
        let counter = match outcome {
            DispatchOutcome::Delivered => &self.delivered,
            DispatchOutcome::LookupMiss => &self.lookup_misses,
            DispatchOutcome::Ignored => &self.ignored,
            DispatchOutcome::Duplicate => &self.duplicates,
            DispatchOutcome::Abandoned => &self.abandoned,
            DispatchOutcome::Panicked => &self.panics,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self) -> DispatchStatsSnapshot {
        DispatchStatsSnapshot {
            delivered: self.delivered.load(Ordering::Relaxed),
            lookup_misses: self.lookup_misses.load(Ordering::Relaxed),
            ignored: self.ignored.load(Ordering::Relaxed),
            duplicates: self.duplicates.load(Ordering::Relaxed),
            abandoned: self.abandoned.load(Ordering::Relaxed),
            panics: self.panics.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug)]
pub(crate) struct Dispatcher {
    registry: Arc<WatcherRegistry>,
    stats: DispatchStats,
    #[cfg(test)]
    fail_next: AtomicBool,
}

impl Dispatcher {
    pub(crate) fn new(registry: Arc<WatcherRegistry>) -> Self {
        Self {
            registry,
            stats: DispatchStats::default(),
            #[cfg(test)]
            fail_next: AtomicBool::new(false),
        }
    }

    /// Makes the next routed notification panic inside dispatch.
    #[cfg(test)]
    pub(crate) fn fail_next_dispatch(&self) {
        self.fail_next.store(true, Ordering::SeqCst);
    }

    pub(crate) fn stats(&self) -> DispatchStatsSnapshot {
        self.stats.snapshot()
    }

    /// Routes one notification. Contains any panic and reports it as
    /// [`DispatchOutcome::Panicked`].
    pub(crate) fn dispatch(
        &self,
        kind: NotificationKind,
        key: WatcherKey,
        status: usize,
        has_payload: bool,
    ) -> DispatchOutcome {
        let outcome = catch_unwind(AssertUnwindSafe(|| self.route(kind, key, status, has_payload)))
            .unwrap_or_else(|_| {
                warn!(%key, %kind, "panic contained in notification dispatch");
                DispatchOutcome::Panicked
            });
        self.stats.record(outcome);
        outcome
    }

    fn route(&self, kind: NotificationKind, key: WatcherKey, status: usize, has_payload: bool) -> DispatchOutcome {
        trace!(%key, %kind, status, has_payload, "dispatch notification");

        #[cfg(test)]
        if self.fail_next.swap(false, Ordering::SeqCst) {
            panic!("injected dispatch failure");
        }

        // Resolve under the registry read guard: once `close` has removed the
        // entry, no dispatch can still be sending to it.
        let routed = self.registry.with_live(key, |context| {
            let Some(result) = resolution_for(context.expected(), kind, status) else {
                return DispatchOutcome::Ignored;
            };
            match context.resolve(result) {
                Delivery::Sent => DispatchOutcome::Delivered,
                Delivery::AlreadyResolved => DispatchOutcome::Duplicate,
                Delivery::Abandoned => DispatchOutcome::Abandoned,
            }
        });

        routed.unwrap_or_else(|| {
            trace!(%key, %kind, "no live watcher");
            DispatchOutcome::LookupMiss
        })
    }

    /// Resolves every live watcher with [`WaitError::ServiceDisconnected`].
    pub(crate) fn disconnect_all(&self) -> usize {
        let mut delivered = 0;
        for (key, _) in self.registry.live() {
            if self.dispatch(NotificationKind::ServiceDisconnect, key, 0, false) == DispatchOutcome::Delivered {
                delivered += 1;
            }
        }
        delivered
    }
}
