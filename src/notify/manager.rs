//! Notification manager.
//!
//! This module provides the [`NotificationManager`], which turns a raw
//! subscribe/unsubscribe channel into per-type listener fan-out. It is itself a
//! [`RemoteNotifier`] and can be wrapped by a
//! [`NotificationListenerTracker`](crate::NotificationListenerTracker).

use alloc::sync::Arc;
use alloc::vec::Vec;

use crate::config::ManagerConfig;
use crate::error::{NotifyError, NotifyResult};
use crate::listener::{ListenerId, ListenerRef, NotificationListener};
use crate::on_empty::{OnEmptyMap, Retired};
use crate::types::{Notification, NotificationType, RemoteId, TypeKey};

use super::notifier::RemoteNotifier;
use super::routing::DispatchTable;
use super::stats::ManagerStats;

/// Fans inbound notifications out to listeners keyed by remote id and type.
///
/// # Architecture
///
/// - **Remote map**: `remote_id → DispatchTable`, pruned when a table empties
/// - **Dispatch table**: `type → listeners` for one remote id
/// - **Hooks**: the configured subscribe/unsubscribe actions fire exactly once
///   per `(remote_id, type)` on the first add and the last remove
///
/// # Usage
///
/// ```rust,ignore
/// let manager = Arc::new(NotificationManager::new(
///     ManagerConfig::new()
///         .with_subscribe(|remote_id, ty| connection.subscribe(remote_id, ty))
///         .with_unsubscribe(|remote_id, ty| connection.unsubscribe(remote_id, ty)),
/// ));
///
/// // Wire the manager as the sink of the transport.
/// connection.set_listener(manager.as_listener::<JobState>());
///
/// // Listen for state changes of remote job 42.
/// manager.add_notification_listener(RemoteId(42), &STATE_CHANGED, listener)?;
/// ```
pub struct NotificationManager {
    /// Per-remote dispatch tables.
    remotes: OnEmptyMap<RemoteId, Arc<DispatchTable>>,

    /// Subscribe and unsubscribe actions.
    config: ManagerConfig,

    /// Activity counters.
    stats: ManagerStats,
}

impl NotificationManager {
    /// Creates a new notification manager.
    ///
    /// # Arguments
    ///
    /// * `config` - The subscribe and unsubscribe actions to drive.
    pub fn new(config: ManagerConfig) -> Self {
        Self {
            remotes: OnEmptyMap::new(),
            config,
            stats: ManagerStats::new(),
        }
    }

    /// Delivers `notification` to every listener registered for its remote id
    /// and type.
    ///
    /// Never fails; a notification nobody listens to is dropped.
    pub fn handle_notification<T: 'static>(&self, notification: &Notification<T>) {
        let Some(table) = self.remotes.get(&notification.remote_id) else {
            trace!(
                "No listeners on remote {} for {:?}",
                notification.remote_id,
                notification.notification_type
            );
            self.stats.record_unmatched();
            return;
        };

        let delivered = table.dispatch(notification);
        trace!(
            "Dispatched {:?} from remote {} to {} listeners",
            notification.notification_type,
            notification.remote_id,
            delivered
        );
        if delivered == 0 {
            self.stats.record_unmatched();
        } else {
            self.stats.record_dispatch(delivered);
        }
    }

    /// Exposes this manager as a listener for notifications of payload type `T`.
    ///
    /// Every notification handed to the returned listener is dispatched through
    /// [`handle_notification`](Self::handle_notification).
    pub fn as_listener<T: 'static>(self: &Arc<Self>) -> ListenerRef<T> {
        Arc::clone(self) as ListenerRef<T>
    }

    /// Lists the remote ids that currently have listeners.
    pub fn remote_ids(&self) -> Vec<RemoteId> {
        self.remotes.keys()
    }

    /// Gets the number of listeners registered for `(remote_id, notification_type)`.
    pub fn listener_count<T>(&self, remote_id: RemoteId, notification_type: &NotificationType<T>) -> usize {
        self.remotes
            .get(&remote_id)
            .map_or(0, |table| table.listener_count(notification_type.key()))
    }

    /// Checks if the subscribe action is in effect for `(remote_id, key)`.
    pub fn is_subscribed(&self, remote_id: RemoteId, key: &TypeKey) -> bool {
        self.remotes
            .get(&remote_id)
            .is_some_and(|table| table.listener_count(key) > 0)
    }

    /// Gets the activity counters.
    pub fn stats(&self) -> &ManagerStats {
        &self.stats
    }

    fn subscribe(&self, remote_id: RemoteId, key: &TypeKey) -> axerrno::AxResult {
        debug!("Subscribing to {:?} on remote {}", key, remote_id);
        let result = self.config.subscribe(remote_id, key);
        match result {
            Ok(()) => self.stats.record_subscribe(),
            Err(err) => {
                warn!("Subscribe to {:?} on remote {} failed: {:?}", key, remote_id, err);
                self.stats.record_hook_error();
            }
        }
        result
    }

    fn unsubscribe(&self, remote_id: RemoteId, key: &TypeKey) -> axerrno::AxResult {
        debug!("Unsubscribing from {:?} on remote {}", key, remote_id);
        let result = self.config.unsubscribe(remote_id, key);
        match result {
            Ok(()) => self.stats.record_unsubscribe(),
            Err(err) => {
                warn!("Unsubscribe from {:?} on remote {} failed: {:?}", key, remote_id, err);
                self.stats.record_hook_error();
            }
        }
        result
    }
}

impl Default for NotificationManager {
    fn default() -> Self {
        Self::new(ManagerConfig::default())
    }
}

impl RemoteNotifier for NotificationManager {
    fn add_notification_listener<T: 'static>(
        &self,
        remote_id: RemoteId,
        notification_type: &NotificationType<T>,
        listener: ListenerRef<T>,
    ) -> NotifyResult {
        loop {
            let table = match self
                .remotes
                .get_or_insert_with(remote_id, || Arc::new(DispatchTable::new(remote_id)))
            {
                Ok(table) => table,
                Err(Retired) => continue,
            };

            let subscribe = |key: &TypeKey| self.subscribe(remote_id, key);
            match table.add(notification_type, Arc::clone(&listener), subscribe) {
                // Pruned between lookup and insert; a fresh table is created on retry.
                Err(Retired) => continue,
                Ok(Ok(())) => {
                    debug!(
                        "Added listener {:?} for {:?} on remote {}",
                        ListenerId::of(&listener),
                        notification_type.key(),
                        remote_id
                    );
                    return Ok(());
                }
                Ok(Err(err)) => {
                    // A rolled-back subscribe may have left the table empty.
                    if table.is_empty() {
                        self.remotes.prune(&remote_id, &table);
                    }
                    return Err(err);
                }
            }
        }
    }

    fn remove_notification_listener<T: 'static>(
        &self,
        remote_id: RemoteId,
        notification_type: &NotificationType<T>,
        listener: &ListenerRef<T>,
    ) -> NotifyResult {
        let key = notification_type.key();
        let Some(table) = self.remotes.get(&remote_id) else {
            return Err(NotifyError::not_registered(remote_id, key));
        };

        let unsubscribe = |key: &TypeKey| self.unsubscribe(remote_id, key);
        let result = table.remove(key, ListenerId::of(listener), unsubscribe);
        if !matches!(result, Ok(false)) {
            self.remotes.prune(&remote_id, &table);
        }

        debug!(
            "Removed listener {:?} for {:?} on remote {}: {:?}",
            ListenerId::of(listener),
            key,
            remote_id,
            result
        );
        result.map(|_| ())
    }
}

impl<T: 'static> NotificationListener<T> for NotificationManager {
    fn handle(&self, notification: &Notification<T>) {
        self.handle_notification(notification);
    }
}
