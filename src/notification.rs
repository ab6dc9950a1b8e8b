//! Notification kinds emitted by the compute service.
//!
//! Raw values match the service's wire encoding: system notifications occupy
//! the low range, process notifications start at `0x0001_0000`, and the
//! channel-level disconnect sits at `0x0100_0000`.

use std::fmt;

use serde::{Deserialize, Serialize};

/// What happened, as reported by the compute service.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u32)]
pub enum NotificationKind {
    /// No notification / unrecognized raw value.
    #[default]
    Invalid = 0x0000_0000,
    /// The compute system stopped.
    SystemExited = 0x0000_0001,
    /// Asynchronous system creation finished.
    SystemCreateCompleted = 0x0000_0002,
    /// Asynchronous system start finished.
    SystemStartCompleted = 0x0000_0003,
    /// Asynchronous system pause finished.
    SystemPauseCompleted = 0x0000_0004,
    /// Asynchronous system resume finished.
    SystemResumeCompleted = 0x0000_0005,
    /// A process inside a compute system exited.
    ProcessExited = 0x0001_0000,
    /// The notification channel to the service itself was lost.
    ServiceDisconnect = 0x0100_0000,
}

/// Which family of objects a notification kind concerns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationScope {
    /// Lifecycle events of a compute system.
    System,
    /// Events of a single process.
    Process,
    /// The service connection as a whole.
    Channel,
    /// Not a real notification.
    None,
}

impl NotificationKind {
    /// All kinds, in wire order.
    pub const ALL: [Self; 8] = [
        Self::Invalid,
        Self::SystemExited,
        Self::SystemCreateCompleted,
        Self::SystemStartCompleted,
        Self::SystemPauseCompleted,
        Self::SystemResumeCompleted,
        Self::ProcessExited,
        Self::ServiceDisconnect,
    ];

    /// Decodes a raw wire value. Unknown values decode to [`NotificationKind::Invalid`].
    #[must_use]
    pub const fn from_raw(raw: u32) -> Self {
        match raw {
            0x0000_0001 => Self::SystemExited,
            0x0000_0002 => Self::SystemCreateCompleted,
            0x0000_0003 => Self::SystemStartCompleted,
            0x0000_0004 => Self::SystemPauseCompleted,
            0x0000_0005 => Self::SystemResumeCompleted,
            0x0001_0000 => Self::ProcessExited,
            0x0100_0000 => Self::ServiceDisconnect,
            _ => Self::Invalid,
        }
    }

    /// The raw wire value.
    #[must_use]
    pub const fn as_raw(self) -> u32 {
        self as u32
    }

    /// Object family this kind reports on.
    #[must_use]
    pub const fn scope(self) -> NotificationScope {
        match self {
            Self::SystemExited
            | Self::SystemCreateCompleted
            | Self::SystemStartCompleted
            | Self::SystemPauseCompleted
            | Self::SystemResumeCompleted => NotificationScope::System,
            Self::ProcessExited => NotificationScope::Process,
            Self::ServiceDisconnect => NotificationScope::Channel,
            Self::Invalid => NotificationScope::None,
        }
    }

    /// Returns true for kinds a caller may meaningfully wait on.
    #[must_use]
    pub const fn is_waitable(self) -> bool {
        !matches!(self, Self::Invalid)
    }
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Invalid => "invalid",
            Self::SystemExited => "system_exited",
            Self::SystemCreateCompleted => "system_create_completed",
            Self::SystemStartCompleted => "system_start_completed",
            Self::SystemPauseCompleted => "system_pause_completed",
            Self::SystemResumeCompleted => "system_resume_completed",
            Self::ProcessExited => "process_exited",
            Self::ServiceDisconnect => "service_disconnect",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_values_match_wire_encoding() {
        assert_eq!(NotificationKind::SystemExited.as_raw(), 0x1);
        assert_eq!(NotificationKind::SystemResumeCompleted.as_raw(), 0x5);
        assert_eq!(NotificationKind::ProcessExited.as_raw(), 0x0001_0000);
        assert_eq!(NotificationKind::ServiceDisconnect.as_raw(), 0x0100_0000);
        assert_eq!(NotificationKind::Invalid.as_raw(), 0);
    }

    #[test]
    fn test_from_raw_inverts_as_raw() {
        for kind in NotificationKind::ALL {
            assert_eq!(NotificationKind::from_raw(kind.as_raw()), kind);
        }
    }

    #[test]
    fn test_unknown_raw_is_invalid() {
        assert_eq!(NotificationKind::from_raw(0x6), NotificationKind::Invalid);
        assert_eq!(NotificationKind::from_raw(0x0002_0000), NotificationKind::Invalid);
        assert_eq!(NotificationKind::from_raw(u32::MAX), NotificationKind::Invalid);
        assert_eq!(NotificationKind::default(), NotificationKind::Invalid);
    }

    #[test]
    fn test_scopes() {
        assert_eq!(NotificationKind::SystemStartCompleted.scope(), NotificationScope::System);
        assert_eq!(NotificationKind::ProcessExited.scope(), NotificationScope::Process);
        assert_eq!(NotificationKind::ServiceDisconnect.scope(), NotificationScope::Channel);
        assert_eq!(NotificationKind::Invalid.scope(), NotificationScope::None);
        assert!(!NotificationKind::Invalid.is_waitable());
    }

    #[test]
    fn test_serde_snake_case() {
        let json = serde_json::to_string(&NotificationKind::ProcessExited).unwrap();
        assert_eq!(json, "\"process_exited\"");
        let back: NotificationKind = serde_json::from_str("\"system_start_completed\"").unwrap();
        assert_eq!(back, NotificationKind::SystemStartCompleted);
        assert_eq!(back.to_string(), "system_start_completed");
    }
}
