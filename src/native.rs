//! Native callback boundary.
//!
//! The compute service accepts one function pointer and calls it for every
//! notification, on its own threads. [`notification_callback`] is that
//! trampoline: it forwards to the hub bound with [`install`] and always
//! returns `0`. Nothing unwinds across it.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, PoisonError, RwLock, Weak};

use tracing::{trace, warn};

use crate::watcher::WatcherHub;

/// Signature of the compute service's notification callback.
pub type NotificationCallback = extern "system" fn(u32, usize, usize, *const u16) -> usize;

static ACTIVE_HUB: RwLock<Option<Weak<WatcherHub>>> = RwLock::new(None);

/// Binds the trampoline to `hub`, replacing any previous binding.
///
/// Only a weak reference is kept; dropping the hub unbinds it implicitly.
pub fn install(hub: &Arc<WatcherHub>) {
    let mut slot = ACTIVE_HUB.write().unwrap_or_else(PoisonError::into_inner);
    *slot = Some(Arc::downgrade(hub));
}

/// Unbinds the trampoline. Later notifications are dropped.
pub fn uninstall() {
    let mut slot = ACTIVE_HUB.write().unwrap_or_else(PoisonError::into_inner);
    *slot = None;
}

/// The hub currently bound to the trampoline, if it is still alive.
#[must_use]
pub fn installed() -> Option<Arc<WatcherHub>> {
    ACTIVE_HUB
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .as_ref()
        .and_then(Weak::upgrade)
}

/// Pointer to pass to the compute service when subscribing.
#[must_use]
pub fn callback_pointer() -> NotificationCallback {
    notification_callback
}

/// Entry point invoked by the compute service.
///
/// `callback_number` is the dispatch key supplied at subscription time. The
/// payload pointer is only checked for presence, never read.
pub extern "system" fn notification_callback(
    notification_type: u32,
    callback_number: usize,
    notification_status: usize,
    notification_data: *const u16,
) -> usize {
    let has_payload = !notification_data.is_null();
    let routed = catch_unwind(AssertUnwindSafe(|| match installed() {
        Some(hub) => {
            hub.dispatch_raw(notification_type, callback_number, notification_status, has_payload);
        }
        None => {
            trace!(notification_type, callback_number, "notification with no hub installed");
        }
    }));
    if routed.is_err() {
        warn!(notification_type, callback_number, "panic contained at native callback boundary");
    }
    0
}
