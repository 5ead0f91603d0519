//! The remote notification capability.

use alloc::sync::Arc;

use crate::error::NotifyResult;
use crate::listener::ListenerRef;
use crate::types::{NotificationType, RemoteId};

/// Adds and removes listeners for notifications emitted by remote resources.
///
/// Implemented by the transport layer and by [`NotificationManager`], and
/// wrapped by [`NotificationListenerTracker`].
///
/// Implementations may block on I/O; callers in this crate never hold a
/// registry lock while calling them.
///
/// [`NotificationManager`]: crate::NotificationManager
/// [`NotificationListenerTracker`]: crate::NotificationListenerTracker
pub trait RemoteNotifier: Send + Sync {
    /// Registers `listener` for notifications of `notification_type` from `remote_id`.
    ///
    /// # Errors
    ///
    /// Returns an error if the listener is already registered for the pair or
    /// if the remote side rejects the subscription.
    fn add_notification_listener<T: 'static>(
        &self,
        remote_id: RemoteId,
        notification_type: &NotificationType<T>,
        listener: ListenerRef<T>,
    ) -> NotifyResult;

    /// Unregisters `listener` from notifications of `notification_type` from `remote_id`.
    ///
    /// # Errors
    ///
    /// Returns an error if the listener is not registered for the pair or if
    /// the remote side fails to drop the subscription.
    fn remove_notification_listener<T: 'static>(
        &self,
        remote_id: RemoteId,
        notification_type: &NotificationType<T>,
        listener: &ListenerRef<T>,
    ) -> NotifyResult;
}

impl<N: RemoteNotifier> RemoteNotifier for Arc<N> {
    fn add_notification_listener<T: 'static>(
        &self,
        remote_id: RemoteId,
        notification_type: &NotificationType<T>,
        listener: ListenerRef<T>,
    ) -> NotifyResult {
        (**self).add_notification_listener(remote_id, notification_type, listener)
    }

    fn remove_notification_listener<T: 'static>(
        &self,
        remote_id: RemoteId,
        notification_type: &NotificationType<T>,
        listener: &ListenerRef<T>,
    ) -> NotifyResult {
        (**self).remove_notification_listener(remote_id, notification_type, listener)
    }
}
