#![no_std]

//! # Remote Notification Subscription Registry
//!
//! This crate turns a low-level "deliver events to remote listeners"
//! capability into per-type listener fan-out, and lets application code group
//! any number of registrations and release them in one call.
//! It is designed for `no_std` environments and uses the `alloc` crate for dynamic memory allocation.
//!
//! ## Architecture
//!
//! ### Value Types
//! - [`RemoteId`]: Identifier of a remote resource emitting notifications
//! - [`NotificationType`]: Typed category key, erased to a [`TypeKey`] for storage
//! - [`Notification`]: Remote id, type and payload of one event
//! - [`NotificationListener`]: Callback receiving notifications of one payload type
//!
//! ### Core Infrastructure
//! - [`OnEmptyMap`]: Concurrent map that reports when a removal empties it,
//!   used for cascading cleanup of nested maps
//!
//! ### Fan-out
//! - [`RemoteNotifier`]: The add/remove listener capability consumed and exposed here
//! - [`NotificationManager`]: Dispatches inbound notifications and drives the
//!   subscribe/unsubscribe hooks configured in [`ManagerConfig`]
//!
//! ### Grouping
//! - [`NotificationListenerTracker`]: Records registrations per group and
//!   tears a whole group down at once
//!
//! ## Features
//!
//! - **Exactly-once hooks**: subscribe on the first listener of a `(remote, type)`
//!   pair, unsubscribe on the last
//! - **No empty entries**: every map level prunes itself when emptied
//! - **Lock-free callbacks**: listeners, hooks and remote calls never run under
//!   a registry lock
//! - **Best-effort teardown**: [`NotificationListenerTracker::remove_all`]
//!   attempts every removal even if some fail
//!
//! ## Examples
//!
//! ```rust,ignore
//! use axnotify::{
//!     ManagerConfig, Notification, NotificationListenerTracker, NotificationManager,
//!     NotificationType, RemoteId,
//! };
//!
//! // The manager subscribes on the remote side only while someone listens.
//! let manager = Arc::new(NotificationManager::new(
//!     ManagerConfig::new()
//!         .with_subscribe(|remote_id, ty| connection.subscribe(remote_id, ty))
//!         .with_unsubscribe(|remote_id, ty| connection.unsubscribe(remote_id, ty)),
//! ));
//! connection.set_sink(manager.as_listener::<JobState>());
//!
//! // A session registers through a tracker...
//! let tracker = NotificationListenerTracker::new(Arc::clone(&manager));
//! let state_changed = NotificationType::<JobState>::new("job.state");
//! tracker.add_notification_listener(session_id, RemoteId(12), &state_changed, Arc::new(
//!     |n: &Notification<JobState>| println!("job {} -> {:?}", n.remote_id, n.payload),
//! ))?;
//!
//! // ...and releases everything when it closes.
//! tracker.remove_all(&session_id)?;
//! ```

extern crate alloc;
#[macro_use]
extern crate log;

mod config;
mod error;
mod listener;
mod notify;
mod on_empty;
mod tracker;
mod types;

pub use config::{ManagerConfig, SubscriptionAction};
pub use error::{NotifyError, NotifyResult};
pub use listener::{ListenerId, ListenerRef, NotificationListener};
pub use notify::{ManagerStats, NotificationManager, RemoteNotifier};
pub use on_empty::{OnEmptyMap, Retire, Retired};
pub use tracker::NotificationListenerTracker;
pub use types::{Notification, NotificationType, RemoteId, TypeKey};
