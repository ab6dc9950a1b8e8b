//! Error types for hcs-notify.
//!
//! Two families exist. [`WaitError`] is what a waiting caller receives on its
//! delivery channel when a wait resolves unsuccessfully. [`NotifyError`] is
//! returned synchronously by the hub's lifecycle calls (`open`, `close`).

use thiserror::Error;

use crate::notification::NotificationKind;
use crate::watcher::WatcherKey;

/// Outcome of a wait that did not succeed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WaitError {
    /// The expected notification arrived carrying a failure status.
    #[error("compute service reported failure (hresult {hresult:#010x}, code {code})")]
    Status {
        /// Raw HRESULT as delivered by the service.
        hresult: u32,
        /// Win32 code after HRESULT normalization.
        code: u32,
    },

    /// The watched system exited before the expected notification.
    #[error("unexpected container exit")]
    UnexpectedExit,

    /// The connection to the compute service was lost.
    #[error("lost communication with compute service")]
    ServiceDisconnected,

    /// The watcher was closed while the wait was still pending.
    #[error("the handle generating this notification has been closed")]
    HandleClosed,

    /// The caller's deadline elapsed before any outcome was delivered.
    #[error("timed out after {duration_ms}ms waiting for notification")]
    Timeout {
        #[allow(missing_docs)]
        duration_ms: u64,
    },
}

impl WaitError {
    /// Returns true if the failure came from a status code on the expected notification.
    #[must_use]
    pub const fn is_status(&self) -> bool {
        matches!(self, Self::Status { .. })
    }

    /// Returns true if no further notification can ever satisfy the wait.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        !matches!(self, Self::Timeout { .. })
    }

    /// Normalized Win32 code for status failures.
    #[must_use]
    pub const fn code(&self) -> Option<u32> {
        match self {
            Self::Status { code, .. } => Some(*code),
            _ => None,
        }
    }

    /// Converts a status failure into an OS error carrying the normalized code.
    #[must_use]
    pub fn to_io_error(&self) -> std::io::Error {
        match self {
            #[allow(clippy::cast_possible_wrap)]
            Self::Status { code, .. } => std::io::Error::from_raw_os_error(*code as i32),
            Self::Timeout { .. } => std::io::Error::new(std::io::ErrorKind::TimedOut, self.to_string()),
            other => std::io::Error::new(std::io::ErrorKind::Other, other.to_string()),
        }
    }
}

/// Result delivered to a waiter.
pub type WaitResult = Result<(), WaitError>;

/// Errors surfaced synchronously by watcher lifecycle operations.
#[derive(Debug, Error)]
pub enum NotifyError {
    /// The handle is not known to this hub.
    #[error("invalid watcher handle: {key}")]
    InvalidHandle {
        #[allow(missing_docs)]
        key: WatcherKey,
    },

    /// The handle was closed before.
    #[error("watcher handle {key} is already closed")]
    HandleClosed {
        #[allow(missing_docs)]
        key: WatcherKey,
    },

    /// The service refused the callback subscription.
    #[error("failed to register notification callback for {key}: {message}")]
    Registration {
        /// Key that was released again.
        key: WatcherKey,
        /// Service error text.
        message: String,
    },

    /// The service refused the unsubscribe. The watcher is still removed.
    #[error("failed to unregister notification callback for {key}: {message}")]
    Unregistration {
        /// Key that was removed.
        key: WatcherKey,
        /// Service error text.
        message: String,
    },

    /// The kind can never be delivered to a waiter.
    #[error("cannot wait for notification kind '{kind}'")]
    UnsupportedKind {
        #[allow(missing_docs)]
        kind: NotificationKind,
    },

    /// Configuration failed to parse or validate.
    #[error("invalid configuration: {reason}")]
    Config {
        #[allow(missing_docs)]
        reason: String,
    },

    /// Internal failure such as a poisoned registry lock.
    #[error("Internal error: {message}")]
    Internal {
        #[allow(missing_docs)]
        message: String,
    },
}

impl NotifyError {
    /// Creates an internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Returns true if this error points at a caller lifecycle bug.
    #[must_use]
    pub const fn is_handle_misuse(&self) -> bool {
        matches!(self, Self::InvalidHandle { .. } | Self::HandleClosed { .. })
    }

    /// Returns true if the compute service rejected the call.
    #[must_use]
    pub const fn is_service(&self) -> bool {
        matches!(self, Self::Registration { .. } | Self::Unregistration { .. })
    }
}

/// Result type alias for hub operations.
pub type NotifyResult<T> = Result<T, NotifyError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wait_error_messages() {
        assert_eq!(WaitError::UnexpectedExit.to_string(), "unexpected container exit");
        assert_eq!(
            WaitError::ServiceDisconnected.to_string(),
            "lost communication with compute service"
        );
        let msg = WaitError::Timeout { duration_ms: 250 }.to_string();
        assert!(msg.contains("250ms"));
    }

    #[test]
    fn test_status_error_carries_code() {
        let err = WaitError::Status {
            hresult: 0x8007_0005,
            code: 5,
        };
        assert!(err.is_status());
        assert!(err.is_terminal());
        assert_eq!(err.code(), Some(5));
        assert_eq!(err.to_io_error().raw_os_error(), Some(5));
        assert!(err.to_string().contains("0x80070005"));
    }

    #[test]
    fn test_non_status_errors_are_distinct() {
        assert!(!WaitError::UnexpectedExit.is_status());
        assert!(!WaitError::ServiceDisconnected.is_status());
        assert_ne!(WaitError::UnexpectedExit, WaitError::ServiceDisconnected);
        assert_eq!(WaitError::UnexpectedExit.code(), None);
    }

    #[test]
    fn test_timeout_is_not_terminal() {
        let err = WaitError::Timeout { duration_ms: 1 };
        assert!(!err.is_terminal());
        assert_eq!(err.to_io_error().kind(), std::io::ErrorKind::TimedOut);
    }

    #[test]
    fn test_notify_error_predicates() {
        let key = WatcherKey::from_raw(7);
        assert!(NotifyError::HandleClosed { key }.is_handle_misuse());
        assert!(NotifyError::InvalidHandle { key }.is_handle_misuse());
        let reg = NotifyError::Registration {
            key,
            message: "denied".to_string(),
        };
        assert!(reg.is_service());
        assert!(!reg.is_handle_misuse());
        assert!(reg.to_string().contains("denied"));
        assert!(NotifyError::internal("boom").to_string().contains("boom"));
    }
}
