//! The hub: one registry, one dispatch engine, one compute service.
//!
//! Collaborators call [`WatcherHub::open`] before triggering the operation
//! whose completion they want to observe, block on the returned [`Waiter`],
//! then close the [`WatcherHandle`].

use std::sync::Arc;

use crossbeam_channel::bounded;
use tracing::debug;

use crate::config::WatcherHubConfig;
use crate::error::{NotifyError, NotifyResult, WaitResult};
use crate::notification::NotificationKind;
use crate::service::{ComputeService, ObjectHandle};

use super::context::WatcherContext;
use super::dispatch::{DispatchOutcome, DispatchStatsSnapshot, Dispatcher};
use super::handle::WatcherHandle;
use super::registry::{WatcherInfo, WatcherKey, WatcherRegistry};
use super::waiter::Waiter;

/// Owns the watcher registry and routes service notifications to waiters.
#[derive(Debug)]
pub struct WatcherHub {
    cfg: WatcherHubConfig,
    registry: Arc<WatcherRegistry>,
    dispatcher: Dispatcher,
    service: Arc<dyn ComputeService>,
}

impl WatcherHub {
    /// Creates a hub bound to `service`.
    ///
    /// # Errors
    /// - `Config` if `cfg` fails validation
    pub fn new(cfg: WatcherHubConfig, service: Arc<dyn ComputeService>) -> NotifyResult<Arc<Self>> {
        cfg.validate()?;
        let registry = Arc::new(WatcherRegistry::new(cfg.first_key, cfg.initial_capacity));
        let dispatcher = Dispatcher::new(Arc::clone(&registry));
        Ok(Arc::new(Self {
            cfg,
            registry,
            dispatcher,
            service,
        }))
    }

    /// Configuration the hub was built with.
    #[must_use]
    pub const fn config(&self) -> &WatcherHubConfig {
        &self.cfg
    }

    /// Registers a watcher for `expected` on `target`.
    ///
    /// The watcher is live in the registry before the service subscription is
    /// made, so a notification racing the subscription is not lost.
    ///
    /// # Errors
    /// - `UnsupportedKind` for [`NotificationKind::Invalid`]
    /// - `Registration` if the service rejects the subscription; the registry
    ///   slot is released before returning
    pub fn open(
        self: &Arc<Self>,
        target: ObjectHandle,
        expected: NotificationKind,
    ) -> NotifyResult<(WatcherHandle, Waiter)> {
        if !expected.is_waitable() {
            return Err(NotifyError::UnsupportedKind { kind: expected });
        }

        let (tx, rx) = bounded::<WaitResult>(1);
        let context = Arc::new(WatcherContext::new(expected, tx));
        let key = self.registry.register(Arc::clone(&context))?;

        match self.service.register_callback(target, key) {
            Ok(callback) => context.bind_callback(callback),
            Err(err) => {
                self.registry.unregister(key);
                return Err(NotifyError::Registration {
                    key,
                    message: err.to_string(),
                });
            }
        }

        debug!(%key, %target, %expected, "watcher opened");

        let handle = WatcherHandle::new(Arc::downgrade(self), key, target, expected, self.cfg.close_on_drop);
        Ok((handle, Waiter::new(key, expected, rx)))
    }

    /// Unsubscribes the watcher and removes it from the registry.
    ///
    /// The registry entry is removed even when the service rejects the
    /// unsubscribe; that rejection is still reported.
    ///
    /// # Errors
    /// - `InvalidHandle` if the handle belongs to another hub or its entry is
    ///   already gone
    /// - `HandleClosed` if the handle was already closed
    /// - `Unregistration` if the service rejected the unsubscribe
    pub fn close(&self, handle: &WatcherHandle) -> NotifyResult<()> {
        let key = handle.key();
        if !handle.belongs_to(self) {
            return Err(NotifyError::InvalidHandle { key });
        }
        if handle.mark_closed() {
            return Err(NotifyError::HandleClosed { key });
        }

        let context = self
            .registry
            .lookup(key)
            .ok_or(NotifyError::InvalidHandle { key })?;

        let unsubscribed = match context.callback() {
            Some(callback) => self
                .service
                .unregister_callback(callback)
                .map_err(|err| NotifyError::Unregistration {
                    key,
                    message: err.to_string(),
                }),
            None => Ok(()),
        };

        self.registry.unregister(key);
        debug!(%key, resolved = context.is_resolved(), "watcher closed");
        unsubscribed
    }

    /// Dispatch entry point for decoded notifications.
    pub fn dispatch(
        &self,
        kind: NotificationKind,
        key: WatcherKey,
        status: usize,
        has_payload: bool,
    ) -> DispatchOutcome {
        self.dispatcher.dispatch(kind, key, status, has_payload)
    }

    /// Dispatch entry point for raw values as received from the service.
    pub fn dispatch_raw(&self, kind: u32, key: usize, status: usize, has_payload: bool) -> DispatchOutcome {
        self.dispatch(NotificationKind::from_raw(kind), WatcherKey::from_raw(key), status, has_payload)
    }

    /// Resolves every pending watcher with a lost-connection error.
    ///
    /// Returns the number of watchers that received the error.
    pub fn disconnect_all(&self) -> usize {
        let delivered = self.dispatcher.disconnect_all();
        debug!(delivered, "service disconnect broadcast");
        delivered
    }

    /// Dispatch counters since the hub was created.
    #[must_use]
    pub fn stats(&self) -> DispatchStatsSnapshot {
        self.dispatcher.stats()
    }

    /// Number of live watchers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.registry.len()
    }

    /// True when no watcher is live.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Live watchers ordered by key.
    #[must_use]
    pub fn snapshot(&self) -> Vec<WatcherInfo> {
        self.registry.snapshot()
    }

    /// Keys of live watchers in ascending order.
    #[must_use]
    pub fn keys(&self) -> Vec<WatcherKey> {
        self.registry.keys()
    }

    #[cfg(test)]
    pub(crate) fn fail_next_dispatch(&self) {
        self.dispatcher.fail_next_dispatch();
    }
}
