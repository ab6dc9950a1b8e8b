//! Seam to the external compute service.
//!
//! The hub never talks to the native service directly. Hosts implement
//! [`ComputeService`] to subscribe the shared notification callback for a
//! system or process handle; [`SimulatedService`] is an in-process stand-in
//! used by tests and embedders that drive notifications themselves.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::notification::NotificationKind;
use crate::watcher::{DispatchOutcome, WatcherHub, WatcherKey};

/// Opaque reference to a native system or process object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObjectHandle(usize);

impl ObjectHandle {
    /// Wraps a raw native handle value.
    #[must_use]
    pub const fn from_raw(raw: usize) -> Self {
        Self(raw)
    }

    /// The raw native handle value.
    #[must_use]
    pub const fn as_raw(self) -> usize {
        self.0
    }
}

impl fmt::Display for ObjectHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "object:{:#x}", self.0)
    }
}

/// Handle to a callback subscription held by the compute service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CallbackHandle(usize);

impl CallbackHandle {
    /// Wraps a raw registration handle value.
    #[must_use]
    pub const fn from_raw(raw: usize) -> Self {
        Self(raw)
    }

    /// The raw registration handle value.
    #[must_use]
    pub const fn as_raw(self) -> usize {
        self.0
    }
}

impl fmt::Display for CallbackHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "callback:{:#x}", self.0)
    }
}

/// Errors reported by a [`ComputeService`] implementation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ServiceError {
    /// The service rejected the call with an HRESULT.
    #[error("compute service call failed with hresult {hresult:#010x}")]
    Rejected {
        #[allow(missing_docs)]
        hresult: u32,
    },

    /// The callback handle is not known to the service.
    #[error("unknown callback registration: {0}")]
    UnknownCallback(CallbackHandle),

    /// The service could not be reached.
    #[error("compute service unavailable: {0}")]
    Unavailable(String),
}

/// Subscribe and unsubscribe the shared notification callback.
///
/// # Contract
/// - `register_callback` binds `key` to `target` so that every later
///   notification for `target` reaches the dispatch entry point with `key`.
/// - `unregister_callback` must stop further notifications for the handle
///   before returning, or tolerate them arriving for a retired key.
pub trait ComputeService: Send + Sync + fmt::Debug {
    /// Subscribes the notification callback for `target`, correlated by `key`.
    ///
    /// # Errors
    /// - `Rejected` if the service refuses the subscription
    /// - `Unavailable` if the service cannot be reached
    fn register_callback(&self, target: ObjectHandle, key: WatcherKey) -> Result<CallbackHandle, ServiceError>;

    /// Removes a subscription previously returned by `register_callback`.
    ///
    /// # Errors
    /// - `UnknownCallback` if `handle` is not a live subscription
    /// - `Rejected` if the service refuses the call
    fn unregister_callback(&self, handle: CallbackHandle) -> Result<(), ServiceError>;
}

#[derive(Debug, Clone, Copy)]
struct Subscription {
    target: ObjectHandle,
    key: WatcherKey,
}

/// In-process compute service.
///
/// Records subscriptions and lets the host emit notifications for an object,
/// which are routed to every key subscribed on it.
#[derive(Debug, Default)]
pub struct SimulatedService {
    subscriptions: Mutex<HashMap<CallbackHandle, Subscription>>,
    next_handle: AtomicUsize,
    reject_registrations: AtomicBool,
    reject_unregistrations: AtomicBool,
}

impl SimulatedService {
    /// Creates a service that accepts every call.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes subsequent registrations fail with an access-denied HRESULT.
    pub fn reject_registrations(&self, reject: bool) {
        self.reject_registrations.store(reject, Ordering::Release);
    }

    /// Makes subsequent unregistrations fail with an access-denied HRESULT.
    pub fn reject_unregistrations(&self, reject: bool) {
        self.reject_unregistrations.store(reject, Ordering::Release);
    }

    /// Number of live subscriptions.
    #[must_use]
    pub fn subscription_count(&self) -> usize {
        self.subscriptions.lock().map_or(0, |subs| subs.len())
    }

    /// Keys subscribed on `target`, in ascending order.
    #[must_use]
    pub fn keys_for(&self, target: ObjectHandle) -> Vec<WatcherKey> {
        let Ok(subs) = self.subscriptions.lock() else {
            return Vec::new();
        };
        let mut keys: Vec<WatcherKey> = subs
            .values()
            .filter(|s| s.target == target)
            .map(|s| s.key)
            .collect();
        keys.sort_unstable();
        keys
    }

    /// Emits a notification for `target` to every subscribed key.
    pub fn emit(
        &self,
        hub: &WatcherHub,
        target: ObjectHandle,
        kind: NotificationKind,
        status: usize,
    ) -> Vec<DispatchOutcome> {
        self.keys_for(target)
            .into_iter()
            .map(|key| hub.dispatch(kind, key, status, false))
            .collect()
    }

    /// Emits a service disconnect to every subscription, regardless of target.
    pub fn disconnect(&self, hub: &WatcherHub) -> Vec<DispatchOutcome> {
        let keys: Vec<WatcherKey> = match self.subscriptions.lock() {
            Ok(subs) => subs.values().map(|s| s.key).collect(),
            Err(_) => return Vec::new(),
        };
        keys.into_iter()
            .map(|key| hub.dispatch(NotificationKind::ServiceDisconnect, key, 0, false))
            .collect()
    }
}

const E_ACCESSDENIED: u32 = 0x8007_0005;

impl ComputeService for SimulatedService {
    fn register_callback(&self, target: ObjectHandle, key: WatcherKey) -> Result<CallbackHandle, ServiceError> {
        if self.reject_registrations.load(Ordering::Acquire) {
            return Err(ServiceError::Rejected { hresult: E_ACCESSDENIED });
        }
        let handle = CallbackHandle::from_raw(self.next_handle.fetch_add(1, Ordering::Relaxed) + 1);
        let mut subs = self
            .subscriptions
            .lock()
            .map_err(|_| ServiceError::Unavailable("poisoned subscription table".to_string()))?;
        subs.insert(handle, Subscription { target, key });
        Ok(handle)
    }

    fn unregister_callback(&self, handle: CallbackHandle) -> Result<(), ServiceError> {
        if self.reject_unregistrations.load(Ordering::Acquire) {
            return Err(ServiceError::Rejected { hresult: E_ACCESSDENIED });
        }
        let mut subs = self
            .subscriptions
            .lock()
            .map_err(|_| ServiceError::Unavailable("poisoned subscription table".to_string()))?;
        subs.remove(&handle)
            .map(|_| ())
            .ok_or(ServiceError::UnknownCallback(handle))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_and_unregister() {
        let svc = SimulatedService::new();
        let target = ObjectHandle::from_raw(0x10);
        let h1 = svc.register_callback(target, WatcherKey::from_raw(1)).unwrap();
        let h2 = svc.register_callback(target, WatcherKey::from_raw(0)).unwrap();
        assert_ne!(h1, h2);
        assert_eq!(svc.subscription_count(), 2);
        assert_eq!(svc.keys_for(target), vec![WatcherKey::from_raw(0), WatcherKey::from_raw(1)]);

        svc.unregister_callback(h1).unwrap();
        assert_eq!(svc.subscription_count(), 1);
        assert_eq!(svc.unregister_callback(h1), Err(ServiceError::UnknownCallback(h1)));
    }

    #[test]
    fn test_keys_are_scoped_to_target() {
        let svc = SimulatedService::new();
        svc.register_callback(ObjectHandle::from_raw(1), WatcherKey::from_raw(5)).unwrap();
        assert!(svc.keys_for(ObjectHandle::from_raw(2)).is_empty());
    }

    #[test]
    fn test_rejections() {
        let svc = SimulatedService::new();
        svc.reject_registrations(true);
        let err = svc
            .register_callback(ObjectHandle::from_raw(1), WatcherKey::from_raw(0))
            .unwrap_err();
        assert!(err.to_string().contains("0x80070005"));
        svc.reject_registrations(false);

        let handle = svc
            .register_callback(ObjectHandle::from_raw(1), WatcherKey::from_raw(0))
            .unwrap();
        svc.reject_unregistrations(true);
        assert!(svc.unregister_callback(handle).is_err());
        assert_eq!(svc.subscription_count(), 1);
    }
}
