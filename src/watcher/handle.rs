use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Weak;

use tracing::warn;

use crate::error::{NotifyError, NotifyResult};
use crate::notification::NotificationKind;
use crate::service::ObjectHandle;

use super::hub::WatcherHub;
use super::registry::WatcherKey;

/// Caller-side handle to an open watcher.
///
/// Close it exactly once with [`WatcherHandle::close`] (or
/// [`WatcherHub::close`]). Dropping an open handle closes it best-effort when
/// the hub is configured with `close_on_drop`.
#[derive(Debug)]
pub struct WatcherHandle {
    hub: Weak<WatcherHub>,
    key: WatcherKey,
    target: ObjectHandle,
    expected: NotificationKind,
    close_on_drop: bool,
    closed: AtomicBool,
}

impl WatcherHandle {
    pub(crate) fn new(
        hub: Weak<WatcherHub>,
        key: WatcherKey,
        target: ObjectHandle,
        expected: NotificationKind,
        close_on_drop: bool,
    ) -> Self {
        Self {
            hub,
            key,
            target,
            expected,
            close_on_drop,
            closed: AtomicBool::new(false),
        }
    }

    /// Dispatch key of this watcher.
    #[must_use]
    pub const fn key(&self) -> WatcherKey {
        self.key
    }

    /// Object the watcher is subscribed on.
    #[must_use]
    pub const fn target(&self) -> ObjectHandle {
        self.target
    }

    /// Notification kind being waited for.
    #[must_use]
    pub const fn expected(&self) -> NotificationKind {
        self.expected
    }

    /// True once the handle has been closed.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Unregisters the watcher from the service and releases its registry slot.
    ///
    /// # Errors
    /// - `HandleClosed` if the handle was already closed
    /// - `InvalidHandle` if the owning hub no longer exists
    /// - `Unregistration` if the service rejected the unsubscribe
    pub fn close(&self) -> NotifyResult<()> {
        match self.hub.upgrade() {
            Some(hub) => hub.close(self),
            None if self.is_closed() => Err(NotifyError::HandleClosed { key: self.key }),
            None => Err(NotifyError::InvalidHandle { key: self.key }),
        }
    }

    pub(crate) fn belongs_to(&self, hub: &WatcherHub) -> bool {
        std::ptr::eq(self.hub.as_ptr(), hub)
    }

    /// Marks the handle closed. Returns true if it was already closed.
    pub(crate) fn mark_closed(&self) -> bool {
        self.closed.swap(true, Ordering::AcqRel)
    }
}

impl Drop for WatcherHandle {
    fn drop(&mut self) {
        if !self.close_on_drop || self.is_closed() {
            return;
        }
        let Some(hub) = self.hub.upgrade() else {
            return;
        };
        if let Err(err) = hub.close(self) {
            warn!(key = %self.key, error = %err, "failed to close dropped watcher handle");
        }
    }
}
