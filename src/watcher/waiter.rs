use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, TryRecvError};

use crate::error::{WaitError, WaitResult};
use crate::notification::NotificationKind;

use super::registry::WatcherKey;

/// Receiving end of a watcher's delivery channel.
///
/// Yields exactly one outcome. If the watcher is closed before an outcome
/// is delivered, the waiter observes [`WaitError::HandleClosed`].
#[derive(Debug)]
pub struct Waiter {
    key: WatcherKey,
    expected: NotificationKind,
    rx: Receiver<WaitResult>,
}

impl Waiter {
    pub(crate) fn new(key: WatcherKey, expected: NotificationKind, rx: Receiver<WaitResult>) -> Self {
        Self { key, expected, rx }
    }

    /// Key of the watcher feeding this waiter.
    #[must_use]
    pub const fn key(&self) -> WatcherKey {
        self.key
    }

    /// The notification kind this waiter is waiting for.
    #[must_use]
    pub const fn expected(&self) -> NotificationKind {
        self.expected
    }

    /// Blocks until the wait resolves.
    pub fn recv(&self) -> WaitResult {
        self.rx.recv().unwrap_or(Err(WaitError::HandleClosed))
    }

    /// Blocks until the wait resolves or `timeout` elapses.
    ///
    /// A timeout leaves the watcher registered; close its handle to abandon it.
    pub fn recv_timeout(&self, timeout: Duration) -> WaitResult {
        match self.rx.recv_timeout(timeout) {
            Ok(outcome) => outcome,
            Err(RecvTimeoutError::Timeout) => Err(WaitError::Timeout {
                duration_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
            }),
            Err(RecvTimeoutError::Disconnected) => Err(WaitError::HandleClosed),
        }
    }

    /// Returns the outcome if one has been delivered.
    pub fn try_recv(&self) -> Option<WaitResult> {
        match self.rx.try_recv() {
            Ok(outcome) => Some(outcome),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => Some(Err(WaitError::HandleClosed)),
        }
    }
}
