//! Remote notification fan-out.
//!
//! This module adapts a low-level "deliver events to remote listeners"
//! capability into per-type listener fan-out with exactly-once
//! subscribe/unsubscribe hooks.
//!
//! # Architecture
//!
//! ```text
//! ┌────────────────────┐
//! │     Transport      │ Pushes Notification<T> values
//! └─────────┬──────────┘
//!           │ handle(notification)
//!           ▼
//! ┌────────────────────────┐
//! │  NotificationManager   │ implements RemoteNotifier
//! │  - remote_id → table   │
//! │  - subscribe hook      │ fired on first listener of (remote, type)
//! │  - unsubscribe hook    │ fired on last removal of (remote, type)
//! └─────────┬──────────────┘
//!           │ dispatch
//!           ▼
//! ┌────────────────────────┐
//! │    DispatchTable       │ type → listeners, one per remote id
//! └─────────┬──────────────┘
//!           │ handle(notification)
//!           ▼
//! ┌─────────────┐
//! │  Listeners  │
//! └─────────────┘
//! ```
//!
//! # Usage Example
//!
//! ```rust,ignore
//! use axnotify::{ManagerConfig, NotificationManager, NotificationType, RemoteId, RemoteNotifier};
//!
//! let manager = Arc::new(NotificationManager::new(
//!     ManagerConfig::new().with_subscribe(|remote_id, ty| {
//!         debug!("remote {} now interesting for {}", remote_id, ty);
//!         Ok(())
//!     }),
//! ));
//!
//! let state_changed = NotificationType::<JobState>::new("job.state");
//! manager.add_notification_listener(RemoteId(7), &state_changed, Arc::new(|n: &Notification<JobState>| {
//!     println!("job 7 is now {:?}", n.payload);
//! }))?;
//!
//! // Called by the transport for every inbound event.
//! manager.handle_notification(&Notification::new(RemoteId(7), state_changed, JobState::Complete));
//! ```

mod manager;
mod notifier;
mod routing;
mod stats;

pub use manager::NotificationManager;
pub use notifier::RemoteNotifier;
pub use stats::ManagerStats;
