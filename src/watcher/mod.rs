//! Watcher registry, dispatch engine and handle lifecycle.
//!
//! A single dispatch entry point fans notifications out to many independent
//! waiters. Each waiter is keyed by a numeric dispatch key that the compute
//! service hands back with every notification.

/// Per-wait state and single-delivery guard.
mod context;
/// Notification routing.
pub mod dispatch;
/// Caller-side watcher handle.
pub mod handle;
/// Registry, dispatcher and service bound together.
pub mod hub;
/// Dispatch key to context mapping.
pub mod registry;
/// Receiving end of a delivery channel.
pub mod waiter;

pub use dispatch::{resolution_for, DispatchOutcome, DispatchStatsSnapshot};
pub use handle::WatcherHandle;
pub use hub::WatcherHub;
pub use registry::{WatcherInfo, WatcherKey};
pub use waiter::Waiter;
