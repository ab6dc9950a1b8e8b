//! Watcher registry: numeric dispatch key -> watcher context.
//!
//! Lookups take the read lock and run concurrently; register and unregister
//! take the write lock. Key allocation happens under the write lock, so a
//! reader never observes a key whose context is not fully inserted.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{NotifyError, NotifyResult};
use crate::notification::NotificationKind;
use crate::service::CallbackHandle;

use super::context::WatcherContext;

/// Dispatch key correlating a native notification with its watcher.
///
/// Pointer-wide because the service hands it back through the callback's
/// context argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WatcherKey(usize);

impl WatcherKey {
    /// Wraps a raw callback number.
    #[must_use]
    pub const fn from_raw(raw: usize) -> Self {
        Self(raw)
    }

    /// The raw callback number.
    #[must_use]
    pub const fn as_raw(self) -> usize {
        self.0
    }
}

impl fmt::Display for WatcherKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "watcher#{}", self.0)
    }
}

/// Diagnostic view of one live watcher.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatcherInfo {
    /// Dispatch key.
    pub key: WatcherKey,
    /// Kind the watcher waits for.
    pub expected: NotificationKind,
    /// Service subscription, once accepted.
    pub callback: Option<CallbackHandle>,
    /// When the watcher entered the registry.
    pub registered_at: DateTime<Utc>,
    /// Whether an outcome has been sent.
    pub resolved: bool,
}

#[derive(Debug)]
struct RegistryState {
    next_key: usize,
    watchers: HashMap<WatcherKey, Arc<WatcherContext>>,
}

fn lock_err(context: &'static str) -> NotifyError {
    warn!(context, "watcher registry lock poisoned");
    NotifyError::internal(format!("poisoned lock: {context}"))
}

#[derive(Debug)]
pub(crate) struct WatcherRegistry {
    state: RwLock<RegistryState>,
}

impl WatcherRegistry {
    pub(crate) fn new(first_key: usize, capacity: usize) -> Self {
        Self {
            state: RwLock::new(RegistryState {
                next_key: first_key,
                watchers: HashMap::with_capacity(capacity),
            }),
        }
    }

    /// Read access that never fails: dispatch and diagnostics read through a
    /// poisoned lock.
    fn read(&self, context: &'static str) -> RwLockReadGuard<'_, RegistryState> {
        self.state.read().unwrap_or_else(|poisoned| {
            warn!(context, "watcher registry lock poisoned; reading through");
            poisoned.into_inner()
        })
    }

    fn write_recovering(&self, context: &'static str) -> RwLockWriteGuard<'_, RegistryState> {
        self.state.write().unwrap_or_else(|poisoned| {
            warn!(context, "watcher registry lock poisoned; writing through");
            poisoned.into_inner()
        })
    }

    /// Inserts `context` under the next unused key.
    pub(crate) fn register(&self, context: Arc<WatcherContext>) -> NotifyResult<WatcherKey> {
        let mut state = self.state.write().map_err(|_| lock_err("registry.register"))?;

        // Only reachable after the counter wraps; skip keys still in use.
        let mut raw = state.next_key;
        while state.watchers.contains_key(&WatcherKey(raw)) {
            raw = raw.wrapping_add(1);
            if raw == state.next_key {
                return Err(NotifyError::internal("watcher key space exhausted"));
            }
        }

        let key = WatcherKey(raw);
        state.next_key = raw.wrapping_add(1);
        state.watchers.insert(key, context);
        Ok(key)
    }

    /// Returns the context for a live key.
    pub(crate) fn lookup(&self, key: WatcherKey) -> Option<Arc<WatcherContext>> {
        self.read("registry.lookup").watchers.get(&key).cloned()
    }

    /// Runs `f` on the live context for `key` while holding the read lock.
    ///
    /// `unregister` cannot complete while `f` runs, so once a key is removed
    /// no in-flight call can still be acting on its context. `f` must not
    /// block.
    pub(crate) fn with_live<R>(
        &self,
        key: WatcherKey,
        f: impl FnOnce(&WatcherContext) -> R,
    ) -> Option<R> {
        let state = self.read("registry.with_live");
        state.watchers.get(&key).map(|ctx| f(ctx))
    }

    /// Removes the mapping for `key`. Removing an absent key is a no-op.
    ///
    /// Always succeeds: the entry is removed even through a poisoned lock, so
    /// a closed watcher never lingers.
    pub(crate) fn unregister(&self, key: WatcherKey) -> Option<Arc<WatcherContext>> {
        self.write_recovering("registry.unregister").watchers.remove(&key)
    }

    /// All live contexts, for broadcast delivery.
    pub(crate) fn live(&self) -> Vec<(WatcherKey, Arc<WatcherContext>)> {
        self.read("registry.live")
            .watchers
            .iter()
            .map(|(key, ctx)| (*key, Arc::clone(ctx)))
            .collect()
    }

    /// Live keys in ascending order.
    pub(crate) fn keys(&self) -> Vec<WatcherKey> {
        let mut keys: Vec<WatcherKey> = self
            .read("registry.keys")
            .watchers
            .keys()
            .copied()
            .collect();
        keys.sort_unstable();
        keys
    }

    pub(crate) fn len(&self) -> usize {
        self.read("registry.len").watchers.len()
    }

    #[cfg(test)]
    pub(crate) fn poison(self: &Arc<Self>) {
        let registry = Arc::clone(self);
        let _ = std::thread::spawn(move || {
            let _guard = registry.state.write().unwrap();
            panic!("poisoning watcher registry");
        })
        .join();
        assert!(self.state.is_poisoned());
    }

    pub(crate) fn snapshot(&self) -> Vec<WatcherInfo> {
        let mut out: Vec<WatcherInfo> = self
            .live()
            .into_iter()
            .map(|(key, ctx)| WatcherInfo {
                key,
                expected: ctx.expected(),
                callback: ctx.callback(),
                registered_at: ctx.registered_at(),
                resolved: ctx.is_resolved(),
            })
            .collect();
        out.sort_by_key(|info| info.key);
        out
    }
}
