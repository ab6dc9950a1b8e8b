//! # hcs-notify - notification demultiplexing for the host compute service
//!
//! The compute service reports asynchronous events (a system started, a
//! process exited, the service connection dropped) through a single callback
//! function. This crate fans those callbacks out to independent waiters,
//! each blocked on one object and one expected event.
//!
//! ## Core Concepts
//!
//! - **Watcher**: a registered intent to observe one future notification kind
//!   on one object, correlated by a numeric dispatch key
//! - **Hub**: owns the watcher registry and the dispatch engine
//! - **Waiter**: the single-use receiving end that yields exactly one outcome
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use hcs_notify::{NotificationKind, ObjectHandle, WatcherHub, WatcherHubConfig};
//!
//! let hub = WatcherHub::new(WatcherHubConfig::default(), service)?;
//! hcs_notify::native::install(&hub);
//!
//! let (handle, waiter) = hub.open(system, NotificationKind::SystemStartCompleted)?;
//! start_compute_system(system)?;
//! let outcome = waiter.recv_timeout(Duration::from_secs(240));
//! handle.close()?;
//! outcome?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod error;
pub mod native;
pub mod notification;
pub mod service;
pub mod status;
pub mod watcher;

pub use config::WatcherHubConfig;
pub use error::{NotifyError, NotifyResult, WaitError, WaitResult};
pub use notification::{NotificationKind, NotificationScope};
pub use service::{CallbackHandle, ComputeService, ObjectHandle, ServiceError, SimulatedService};
pub use watcher::{
    DispatchOutcome, DispatchStatsSnapshot, Waiter, WatcherHandle, WatcherHub, WatcherInfo, WatcherKey,
};
